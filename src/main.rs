// 该文件是 Shanan （山南西风） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use shanan_seg::{
  FromUrl,
  annotate::AutoAnnotator,
  config::{AnnotateConfig, RenderConfig, default_label_dir, default_output_dir},
  model::{DetectorWrapper, SegmenterWrapper},
  output::OverlayRenderer,
  task::{BatchRunner, Interrupt},
};

use args::{Args, Command, DrawArgs, ImageArgs, ModelArgs};

fn annotate(images: &ImageArgs, model: &ModelArgs, runner: &BatchRunner) -> Result<PathBuf> {
  info!("检测器: {}", model.detector);
  info!("分割器: {}", model.segmenter);

  let detector = DetectorWrapper::from_url(&model.detector)?;
  let segmenter = SegmenterWrapper::from_url(&model.segmenter)?;
  let config = AnnotateConfig {
    label_dir: images.labels.clone(),
    classes: model.classes.clone(),
    max_detections: model.max_det,
  };

  let (label_dir, report) = AutoAnnotator::new(detector, segmenter)
    .with_config(config)
    .annotate(&images.images, runner)?;
  info!(
    "标注完成: {} 张写入, {} 张跳过, 标注目录: {}",
    report.written(),
    report.skipped(),
    label_dir.display()
  );
  Ok(label_dir)
}

fn render(images: &Path, labels: &Path, draw: &DrawArgs, runner: &BatchRunner) -> Result<()> {
  let colors = draw.colors.clone().unwrap_or_default();
  let renderer = OverlayRenderer::new(RenderConfig::new(colors, draw.stroke_width)?);
  let output = draw
    .output
    .clone()
    .unwrap_or_else(|| default_output_dir(images));

  let report = renderer.render(images, labels, &output, runner)?;
  info!(
    "渲染完成: {} 张写入, {} 张跳过, 输出目录: {}",
    report.written(),
    report.skipped(),
    output.display()
  );
  Ok(())
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let interrupt = Interrupt::new();
  interrupt.install_ctrlc()?;
  let runner = BatchRunner::default()
    .with_jobs(args.jobs)
    .with_interrupt(interrupt.clone());

  match &args.command {
    Command::Annotate { images, model } => {
      annotate(images, model, &runner)?;
    }
    Command::Render { images, draw } => {
      let labels = images
        .labels
        .clone()
        .unwrap_or_else(|| default_label_dir(&images.images));
      render(&images.images, &labels, draw, &runner)?;
    }
    Command::Run {
      images,
      model,
      draw,
    } => {
      let labels = annotate(images, model, &runner)?;
      if !interrupt.is_triggered() {
        render(&images.images, &labels, draw, &runner)?;
      }
    }
  }

  if interrupt.is_triggered() {
    warn!("任务被中断, 部分图像未处理");
  }
  Ok(())
}
