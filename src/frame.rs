// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 图像帧定义
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

use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};

use crate::input::InputError;

/// 从目录读取的一张图像及其来源路径
#[derive(Debug, Clone)]
pub struct ImageFrame {
  path: PathBuf,
  image: RgbImage,
}

impl ImageFrame {
  pub fn new(path: impl Into<PathBuf>, image: RgbImage) -> Self {
    Self {
      path: path.into(),
      image,
    }
  }

  /// 读取并解码图像文件，统一转换为 RGB
  pub fn open(path: &Path) -> Result<Self, InputError> {
    let image = ImageReader::open(path)
      .map_err(|e| InputError::IoError(path.to_path_buf(), e))?
      .with_guessed_format()
      .map_err(|e| InputError::IoError(path.to_path_buf(), e))?
      .decode()
      .map_err(|e| InputError::ImageLoadError(path.to_path_buf(), e))?
      .to_rgb8();

    Ok(Self::new(path, image))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// 文件名，用于日志与输出命名
  pub fn name(&self) -> String {
    self
      .path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default()
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn dimensions(&self) -> (u32, u32) {
    self.image.dimensions()
  }
}
