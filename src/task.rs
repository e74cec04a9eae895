// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 批处理任务与逐图状态机
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{
  fmt,
  path::{Path, PathBuf},
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Instant,
};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{input::InputError, label::LabelError};

/// 导致整个批次中止的错误
#[derive(Error, Debug)]
pub enum TaskError {
  #[error("输入错误: {0}")]
  InputError(#[from] InputError),
  #[error("标注文件错误: {0}")]
  LabelError(#[from] LabelError),
  #[error("无法创建目录 {0}: {1}")]
  CreateDirError(PathBuf, std::io::Error),
  #[error("无法写入图像 {0}: {1}")]
  SaveImageError(PathBuf, image::ImageError),
  #[cfg(feature = "parallel")]
  #[error("线程池创建失败: {0}")]
  ThreadPoolError(#[from] rayon::ThreadPoolBuildError),
}

/// 跳过某张图像的原因
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
  DetectorFailed(String),
  SegmenterFailed(String),
  NoDetections,
  NoPolygons,
  MissingLabel,
  NoRecords,
  Interrupted,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SkipReason::DetectorFailed(e) => write!(f, "检测失败: {}", e),
      SkipReason::SegmenterFailed(e) => write!(f, "分割失败: {}", e),
      SkipReason::NoDetections => write!(f, "没有检测结果"),
      SkipReason::NoPolygons => write!(f, "没有有效多边形"),
      SkipReason::MissingLabel => write!(f, "没有标注文件"),
      SkipReason::NoRecords => write!(f, "标注文件中没有有效记录"),
      SkipReason::Interrupted => write!(f, "任务被中断"),
    }
  }
}

/// 单张图像的处理状态
///
/// 标注: Pending -> Detected -> Segmented -> Encoded -> Written
/// 渲染: Pending -> Decoded -> Written
/// 任意阶段都可能转入 Skipped。
#[derive(Debug, Clone, PartialEq)]
pub enum ImageState {
  Pending,
  Detected(usize),
  Segmented(usize),
  Encoded(usize),
  Decoded(usize),
  Written(PathBuf),
  Skipped(SkipReason),
}

impl ImageState {
  pub fn is_written(&self) -> bool {
    matches!(self, ImageState::Written(_))
  }

  pub fn is_skipped(&self) -> bool {
    matches!(self, ImageState::Skipped(_))
  }
}

/// 跟踪一张图像的状态迁移
pub(crate) struct ImageJob {
  name: String,
  state: ImageState,
}

impl ImageJob {
  pub(crate) fn new(path: &Path) -> Self {
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    Self {
      name,
      state: ImageState::Pending,
    }
  }

  pub(crate) fn name(&self) -> &str {
    &self.name
  }

  pub(crate) fn advance(&mut self, next: ImageState) {
    debug!("{}: {:?} -> {:?}", self.name, self.state, next);
    self.state = next;
  }

  pub(crate) fn skip(mut self, reason: SkipReason) -> ImageState {
    info!("跳过 {}: {}", self.name, reason);
    self.advance(ImageState::Skipped(reason));
    self.state
  }

  pub(crate) fn finish(mut self, path: PathBuf) -> ImageState {
    self.advance(ImageState::Written(path));
    self.state
  }
}

/// 可在图像之间中断批处理的标志
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
  flag: Arc<AtomicBool>,
}

impl Interrupt {
  pub fn new() -> Self {
    Self::default()
  }

  /// 安装 Ctrl-C 处理器，进程内只能调用一次
  pub fn install_ctrlc(&self) -> Result<(), ctrlc::Error> {
    let flag = self.flag.clone();
    ctrlc::set_handler(move || {
      warn!("收到中断信号，当前图像处理完成后退出...");
      flag.store(true, Ordering::SeqCst);
    })
  }

  pub fn trigger(&self) {
    self.flag.store(true, Ordering::SeqCst);
  }

  pub fn is_triggered(&self) -> bool {
    self.flag.load(Ordering::SeqCst)
  }
}

/// 批处理结果，顺序与图像枚举顺序一致
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
  pub outcomes: Vec<(String, ImageState)>,
}

impl BatchReport {
  pub fn written(&self) -> usize {
    self.outcomes.iter().filter(|(_, s)| s.is_written()).count()
  }

  pub fn skipped(&self) -> usize {
    self.outcomes.iter().filter(|(_, s)| s.is_skipped()).count()
  }

  pub fn state_of(&self, name: &str) -> Option<&ImageState> {
    self
      .outcomes
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, s)| s)
  }
}

/// 批处理执行器：顺序执行，或在 `jobs > 1` 时使用线程池并行
#[derive(Debug, Clone)]
pub struct BatchRunner {
  jobs: usize,
  interrupt: Interrupt,
}

impl Default for BatchRunner {
  fn default() -> Self {
    Self {
      jobs: 1,
      interrupt: Interrupt::default(),
    }
  }
}

impl BatchRunner {
  pub fn with_jobs(mut self, jobs: usize) -> Self {
    self.jobs = jobs.max(1);
    self
  }

  pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
    self.interrupt = interrupt;
    self
  }

  fn run_one<F>(&self, path: &Path, job: &F) -> Result<(String, ImageState), TaskError>
  where
    F: Fn(&Path) -> Result<ImageState, TaskError>,
  {
    let pending = ImageJob::new(path);
    let name = pending.name().to_string();
    if self.interrupt.is_triggered() {
      return Ok((name, pending.skip(SkipReason::Interrupted)));
    }
    job(path).map(|state| (name, state))
  }

  /// 对每个路径执行 `job`
  ///
  /// 单张图像的跳过不影响其他图像；`job` 返回错误时整个批次中止。
  pub fn run<F>(&self, task: &str, paths: &[PathBuf], job: F) -> Result<BatchReport, TaskError>
  where
    F: Fn(&Path) -> Result<ImageState, TaskError> + Sync,
  {
    info!("开始{}任务, 共 {} 张图像...", task, paths.len());
    let now = Instant::now();

    let outcomes = if self.jobs > 1 {
      self.run_parallel(paths, &job)?
    } else {
      paths
        .iter()
        .map(|path| self.run_one(path, &job))
        .collect::<Result<Vec<_>, _>>()?
    };

    let report = BatchReport { outcomes };
    info!(
      "{}任务完成, 耗时: {:.2?}, 写入 {} 张, 跳过 {} 张",
      task,
      now.elapsed(),
      report.written(),
      report.skipped()
    );
    Ok(report)
  }

  #[cfg(feature = "parallel")]
  fn run_parallel<F>(&self, paths: &[PathBuf], job: &F) -> Result<Vec<(String, ImageState)>, TaskError>
  where
    F: Fn(&Path) -> Result<ImageState, TaskError> + Sync,
  {
    use rayon::prelude::*;

    debug!("使用 {} 个工作线程", self.jobs);
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(self.jobs)
      .build()?;
    pool.install(|| {
      paths
        .par_iter()
        .map(|path| self.run_one(path, job))
        .collect::<Result<Vec<_>, _>>()
    })
  }

  #[cfg(not(feature = "parallel"))]
  fn run_parallel<F>(&self, paths: &[PathBuf], job: &F) -> Result<Vec<(String, ImageState)>, TaskError>
  where
    F: Fn(&Path) -> Result<ImageState, TaskError> + Sync,
  {
    warn!("未启用 parallel 特性, 改为顺序执行");
    paths.iter().map(|path| self.run_one(path, job)).collect()
  }
}
