// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/threshold.rs - 框提示的阈值分割器
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

use image::imageops;
use imageproc::contrast::otsu_level;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::ImageFrame,
  mask::Mask,
  model::{ModelError, Segmenter, clip_bbox, query_param},
};

/// 在框内计算 Otsu 阈值，框内亮于阈值的像素为前景
///
/// URL 形式: `otsu:///?invert=false`，`invert=true` 时取暗于阈值的像素。
#[derive(Debug, Clone, Default)]
pub struct ThresholdSegmenter {
  invert: bool,
}

impl FromUrlWithScheme for ThresholdSegmenter {
  const SCHEME: &'static str = "otsu";
}

impl FromUrl for ThresholdSegmenter {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::SchemeMismatch(url.scheme().to_string()));
    }

    Ok(Self {
      invert: query_param(url, "invert", false)?,
    })
  }
}

impl ThresholdSegmenter {
  pub fn with_invert(mut self, invert: bool) -> Self {
    self.invert = invert;
    self
  }
}

impl Segmenter for ThresholdSegmenter {
  type Error = ModelError;

  fn segment(&self, frame: &ImageFrame, bbox: &[f32; 4]) -> Result<Mask, Self::Error> {
    let (width, height) = frame.dimensions();
    let mut mask = Mask::new(width, height);
    let Some((x0, y0, x1, y1)) = clip_bbox(bbox, width, height) else {
      return Ok(mask);
    };

    let gray = imageops::grayscale(frame.image());
    let crop = imageops::crop_imm(&gray, x0, y0, x1 - x0, y1 - y0).to_image();
    let level = otsu_level(&crop);

    for (x, y, pixel) in crop.enumerate_pixels() {
      let bright = pixel[0] > level;
      if bright != self.invert {
        mask.set(x0 + x, y0 + y, true);
      }
    }
    Ok(mask)
  }
}

/// 直接把提示框当作掩码
///
/// URL 形式: `box:///`
#[derive(Debug, Clone, Default)]
pub struct BoxSegmenter;

impl FromUrlWithScheme for BoxSegmenter {
  const SCHEME: &'static str = "box";
}

impl FromUrl for BoxSegmenter {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(BoxSegmenter)
  }
}

impl Segmenter for BoxSegmenter {
  type Error = ModelError;

  fn segment(&self, frame: &ImageFrame, bbox: &[f32; 4]) -> Result<Mask, Self::Error> {
    let (width, height) = frame.dimensions();
    let mut mask = Mask::new(width, height);
    if let Some((x0, y0, x1, y1)) = clip_bbox(bbox, width, height) {
      mask.fill_rect(x0, y0, x1, y1);
    }
    Ok(mask)
  }
}
