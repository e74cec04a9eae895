// 该文件是 Shanan （山南西风） 项目的一部分。
// src/mask.rs - 二值实例掩码
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

use image::{GrayImage, Luma};

const FOREGROUND: Luma<u8> = Luma([255]);
const BACKGROUND: Luma<u8> = Luma([0]);

/// 与源图像同尺寸的二值掩码，前景像素为 255，背景为 0
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
  pixels: GrayImage,
}

impl Mask {
  /// 全背景掩码
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      pixels: GrayImage::new(width, height),
    }
  }

  pub fn from_fn<F: Fn(u32, u32) -> bool>(width: u32, height: u32, f: F) -> Self {
    Self {
      pixels: GrayImage::from_fn(width, height, |x, y| {
        if f(x, y) { FOREGROUND } else { BACKGROUND }
      }),
    }
  }

  /// 灰度值大于阈值的像素视为前景
  pub fn from_gray(image: &GrayImage, threshold: u8) -> Self {
    Self::from_fn(image.width(), image.height(), |x, y| {
      image.get_pixel(x, y)[0] > threshold
    })
  }

  pub fn width(&self) -> u32 {
    self.pixels.width()
  }

  pub fn height(&self) -> u32 {
    self.pixels.height()
  }

  pub fn dimensions(&self) -> (u32, u32) {
    self.pixels.dimensions()
  }

  pub fn get(&self, x: u32, y: u32) -> bool {
    x < self.width() && y < self.height() && self.pixels.get_pixel(x, y)[0] != 0
  }

  pub fn set(&mut self, x: u32, y: u32, value: bool) {
    if x < self.width() && y < self.height() {
      self
        .pixels
        .put_pixel(x, y, if value { FOREGROUND } else { BACKGROUND });
    }
  }

  /// 填充矩形区域 `[x_min, x_max) x [y_min, y_max)`，超出部分被裁剪
  pub fn fill_rect(&mut self, x_min: u32, y_min: u32, x_max: u32, y_max: u32) {
    for y in y_min..y_max.min(self.height()) {
      for x in x_min..x_max.min(self.width()) {
        self.pixels.put_pixel(x, y, FOREGROUND);
      }
    }
  }

  /// 前景像素数
  pub fn area(&self) -> usize {
    self.pixels.pixels().filter(|p| p[0] != 0).count()
  }

  pub fn is_empty(&self) -> bool {
    self.pixels.pixels().all(|p| p[0] == 0)
  }

  pub fn as_gray(&self) -> &GrayImage {
    &self.pixels
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_rect_is_clipped() {
    let mut mask = Mask::new(8, 8);
    mask.fill_rect(6, 6, 20, 20);
    assert_eq!(mask.area(), 4);
    assert!(mask.get(7, 7));
    assert!(!mask.get(5, 7));
    assert!(!mask.get(8, 8));
  }

  #[test]
  fn from_gray_thresholds() {
    let gray = GrayImage::from_fn(4, 1, |x, _| Luma([x as u8 * 60]));
    let mask = Mask::from_gray(&gray, 100);
    assert_eq!(mask.area(), 2);
    assert!(!mask.get(1, 0));
    assert!(mask.get(2, 0));
  }

  #[test]
  fn new_mask_is_empty() {
    let mut mask = Mask::new(3, 3);
    assert!(mask.is_empty());
    mask.set(1, 1, true);
    assert!(!mask.is_empty());
    mask.set(1, 1, false);
    assert!(mask.is_empty());
  }
}
