// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/blob.rs - 基于连通域的前景检测器
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

use std::collections::BTreeMap;

use image::{Luma, imageops};
use imageproc::{
  contrast::otsu_level,
  region_labelling::{Connectivity, connected_components},
};
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::ImageFrame,
  mask::Mask,
  model::{DetectItem, Detector, ModelError, query_param},
};

const DEFAULT_MIN_AREA: u32 = 16;

/// Otsu 二值化后按 8 连通域给出边界框，所有目标归为同一类别
///
/// URL 形式: `blob:///?class=0&min_area=16&invert=false`
#[derive(Debug, Clone)]
pub struct BlobDetector {
  class_id: u32,
  min_area: u32,
  invert: bool,
}

impl Default for BlobDetector {
  fn default() -> Self {
    Self {
      class_id: 0,
      min_area: DEFAULT_MIN_AREA,
      invert: false,
    }
  }
}

impl FromUrlWithScheme for BlobDetector {
  const SCHEME: &'static str = "blob";
}

impl FromUrl for BlobDetector {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::SchemeMismatch(url.scheme().to_string()));
    }

    Ok(Self {
      class_id: query_param(url, "class", 0)?,
      min_area: query_param(url, "min_area", DEFAULT_MIN_AREA)?,
      invert: query_param(url, "invert", false)?,
    })
  }
}

impl BlobDetector {
  pub fn with_class(mut self, class_id: u32) -> Self {
    self.class_id = class_id;
    self
  }

  pub fn with_min_area(mut self, min_area: u32) -> Self {
    self.min_area = min_area;
    self
  }

  pub fn with_invert(mut self, invert: bool) -> Self {
    self.invert = invert;
    self
  }
}

impl Detector for BlobDetector {
  type Error = ModelError;

  fn detect(&self, frame: &ImageFrame) -> Result<Vec<DetectItem>, Self::Error> {
    let gray = imageops::grayscale(frame.image());
    let level = otsu_level(&gray);
    let binary = if self.invert {
      Mask::from_fn(gray.width(), gray.height(), |x, y| {
        gray.get_pixel(x, y)[0] <= level
      })
    } else {
      Mask::from_gray(&gray, level)
    };

    let labeled = connected_components(binary.as_gray(), Connectivity::Eight, Luma([0u8]));

    // (min_x, min_y, max_x, max_y, count)，按标签有序以保证输出顺序稳定
    let mut regions: BTreeMap<u32, (u32, u32, u32, u32, u32)> = BTreeMap::new();
    for (x, y, label) in labeled.enumerate_pixels() {
      let label = label[0];
      if label == 0 {
        continue;
      }
      regions
        .entry(label)
        .and_modify(|(min_x, min_y, max_x, max_y, count)| {
          *min_x = (*min_x).min(x);
          *min_y = (*min_y).min(y);
          *max_x = (*max_x).max(x);
          *max_y = (*max_y).max(y);
          *count += 1;
        })
        .or_insert((x, y, x, y, 1));
    }

    let items: Vec<DetectItem> = regions
      .into_values()
      .filter(|&(.., count)| count >= self.min_area)
      .map(|(min_x, min_y, max_x, max_y, _)| {
        DetectItem::new(
          self.class_id,
          [
            min_x as f32,
            min_y as f32,
            (max_x + 1) as f32,
            (max_y + 1) as f32,
          ],
        )
      })
      .collect();

    debug!(
      "{}: Otsu 阈值 {}, 检测到 {} 个连通域",
      frame.name(),
      level,
      items.len()
    );
    Ok(items)
  }
}
