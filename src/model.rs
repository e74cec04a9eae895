// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 检测与分割能力接口
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

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::ImageFrame, mask::Mask};

/// 目标检测器：给出图像中各目标的类别与边界框
pub trait Detector {
  type Error: std::error::Error + Send + Sync + 'static;

  fn detect(&self, frame: &ImageFrame) -> Result<Vec<DetectItem>, Self::Error>;
}

/// 可提示分割器：以边界框为唯一提示，输出与图像同尺寸的掩码
pub trait Segmenter {
  type Error: std::error::Error + Send + Sync + 'static;

  fn segment(&self, frame: &ImageFrame, bbox: &[f32; 4]) -> Result<Mask, Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，像素坐标
}

impl DetectItem {
  pub fn new(class_id: u32, bbox: [f32; 4]) -> Self {
    Self { class_id, bbox }
  }
}

/// 将像素边界框裁剪到图像范围内的整数区域 `[x0, x1) x [y0, y1)`
///
/// 裁剪后为空时返回 `None`。
pub fn clip_bbox(bbox: &[f32; 4], width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
  let (w, h) = (width as f32, height as f32);
  let x0 = bbox[0].floor().clamp(0.0, w) as u32;
  let y0 = bbox[1].floor().clamp(0.0, h) as u32;
  let x1 = bbox[2].ceil().clamp(0.0, w) as u32;
  let y1 = bbox[3].ceil().clamp(0.0, h) as u32;

  if x0 >= x1 || y0 >= y1 {
    return None;
  }
  Some((x0, y0, x1, y1))
}

/// 读取 URL 查询参数，缺省时使用默认值
pub(crate) fn query_param<T: std::str::FromStr>(
  url: &Url,
  key: &str,
  default: T,
) -> Result<T, ModelError> {
  match url.query_pairs().find(|(k, _)| k == key) {
    Some((_, v)) => v
      .parse::<T>()
      .map_err(|_| ModelError::InvalidParameter(key.to_string(), v.into_owned())),
    None => Ok(default),
  }
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("参数无效: {0}={1}")]
  InvalidParameter(String, String),
  #[error("路径解码失败: {0}")]
  PathDecode(String),
  #[error("检测结果读取失败 ({0}): {1}")]
  IoError(std::path::PathBuf, std::io::Error),
  #[error("检测结果格式错误 ({0}, 第 {1} 行): {2}")]
  Format(std::path::PathBuf, usize, String),
}

mod blob;
pub use self::blob::BlobDetector;

mod box_file;
pub use self::box_file::BoxFileDetector;

mod threshold;
pub use self::threshold::{BoxSegmenter, ThresholdSegmenter};

/// 按 URL 方案选择的检测器
pub enum DetectorWrapper {
  Blob(BlobDetector),
  BoxFile(BoxFileDetector),
}

impl FromUrl for DetectorWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      BlobDetector::SCHEME => Ok(DetectorWrapper::Blob(BlobDetector::from_url(url)?)),
      BoxFileDetector::SCHEME => Ok(DetectorWrapper::BoxFile(BoxFileDetector::from_url(url)?)),
      scheme => Err(ModelError::SchemeMismatch(scheme.to_string())),
    }
  }
}

impl Detector for DetectorWrapper {
  type Error = ModelError;

  fn detect(&self, frame: &ImageFrame) -> Result<Vec<DetectItem>, Self::Error> {
    match self {
      DetectorWrapper::Blob(detector) => detector.detect(frame),
      DetectorWrapper::BoxFile(detector) => detector.detect(frame),
    }
  }
}

/// 按 URL 方案选择的分割器
pub enum SegmenterWrapper {
  Threshold(ThresholdSegmenter),
  Box(BoxSegmenter),
}

impl FromUrl for SegmenterWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ThresholdSegmenter::SCHEME => Ok(SegmenterWrapper::Threshold(
        ThresholdSegmenter::from_url(url)?,
      )),
      BoxSegmenter::SCHEME => Ok(SegmenterWrapper::Box(BoxSegmenter::from_url(url)?)),
      scheme => Err(ModelError::SchemeMismatch(scheme.to_string())),
    }
  }
}

impl Segmenter for SegmenterWrapper {
  type Error = ModelError;

  fn segment(&self, frame: &ImageFrame, bbox: &[f32; 4]) -> Result<Mask, Self::Error> {
    match self {
      SegmenterWrapper::Threshold(segmenter) => segmenter.segment(frame, bbox),
      SegmenterWrapper::Box(segmenter) => segmenter.segment(frame, bbox),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clip_bbox_rounds_outwards_and_clamps() {
    assert_eq!(clip_bbox(&[9.6, 10.2, 19.1, 19.9], 100, 100), Some((9, 10, 20, 20)));
    assert_eq!(clip_bbox(&[-5.0, -5.0, 200.0, 50.0], 100, 40), Some((0, 0, 100, 40)));
    assert_eq!(clip_bbox(&[120.0, 0.0, 130.0, 10.0], 100, 100), None);
    assert_eq!(clip_bbox(&[10.0, 10.0, 10.0, 20.0], 100, 100), None);
  }

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = Url::parse("sam:///weights/vit_b.pth").unwrap();
    assert!(matches!(
      DetectorWrapper::from_url(&url),
      Err(ModelError::SchemeMismatch(_))
    ));
    assert!(matches!(
      SegmenterWrapper::from_url(&url),
      Err(ModelError::SchemeMismatch(_))
    ));
  }
}
