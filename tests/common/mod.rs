// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/common/mod.rs - 集成测试公共工具
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

#![allow(dead_code)]

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use image::{Rgb, RgbImage};
use shanan_seg::{
  frame::ImageFrame,
  mask::Mask,
  model::{DetectItem, Detector, Segmenter},
};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StubError(pub String);

/// 按文件名返回预设结果的检测器，未登记的图像没有检测结果
#[derive(Default)]
pub struct StubDetector {
  results: HashMap<String, Result<Vec<DetectItem>, String>>,
}

impl StubDetector {
  pub fn with(mut self, name: &str, items: Vec<DetectItem>) -> Self {
    self.results.insert(name.to_string(), Ok(items));
    self
  }

  pub fn failing(mut self, name: &str, reason: &str) -> Self {
    self.results.insert(name.to_string(), Err(reason.to_string()));
    self
  }
}

impl Detector for StubDetector {
  type Error = StubError;

  fn detect(&self, frame: &ImageFrame) -> Result<Vec<DetectItem>, Self::Error> {
    match self.results.get(&frame.name()) {
      Some(Ok(items)) => Ok(items.clone()),
      Some(Err(reason)) => Err(StubError(reason.clone())),
      None => Ok(Vec::new()),
    }
  }
}

/// 把提示框填满作为掩码
pub struct FillSegmenter;

impl Segmenter for FillSegmenter {
  type Error = StubError;

  fn segment(&self, frame: &ImageFrame, bbox: &[f32; 4]) -> Result<Mask, Self::Error> {
    let mut mask = Mask::new(frame.width(), frame.height());
    mask.fill_rect(bbox[0] as u32, bbox[1] as u32, bbox[2] as u32, bbox[3] as u32);
    Ok(mask)
  }
}

/// 总是返回空掩码
pub struct EmptySegmenter;

impl Segmenter for EmptySegmenter {
  type Error = StubError;

  fn segment(&self, frame: &ImageFrame, _bbox: &[f32; 4]) -> Result<Mask, Self::Error> {
    Ok(Mask::new(frame.width(), frame.height()))
  }
}

pub struct Workspace {
  pub root: tempfile::TempDir,
  pub images: PathBuf,
}

impl Workspace {
  pub fn new() -> Self {
    let root = tempfile::tempdir().unwrap();
    let images = root.path().join("images");
    std::fs::create_dir(&images).unwrap();
    Self { root, images }
  }

  pub fn path(&self, name: &str) -> PathBuf {
    self.root.path().join(name)
  }

  /// 写入一张纯色图像
  pub fn add_image(&self, name: &str, width: u32, height: u32, color: Rgb<u8>) -> PathBuf {
    let path = self.images.join(name);
    RgbImage::from_pixel(width, height, color).save(&path).unwrap();
    path
  }
}

/// 解析标注行中的坐标
pub fn coordinates(line: &str) -> Vec<f32> {
  line
    .split_whitespace()
    .skip(1)
    .map(|t| t.parse().unwrap())
    .collect()
}

pub fn read_label(dir: &Path, stem: &str) -> String {
  std::fs::read_to_string(dir.join(format!("{stem}.txt"))).unwrap()
}
