// 该文件是 Shanan （山南西风） 项目的一部分。
// src/annotate.rs - 检测 + 分割自动标注
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

use tracing::{error, info, warn};

use crate::{
  config::AnnotateConfig,
  contour,
  frame::ImageFrame,
  input::ImageDirectory,
  label::{AnnotationRecord, label_path, write_records},
  model::{DetectItem, Detector, Segmenter},
  polygon::Polygon,
  task::{BatchReport, BatchRunner, ImageJob, ImageState, SkipReason, TaskError},
};

/// 自动标注器：检测框作为提示输入分割器，掩码轮廓写入标注文件
pub struct AutoAnnotator<D, S> {
  detector: D,
  segmenter: S,
  config: AnnotateConfig,
}

impl<D, S> AutoAnnotator<D, S>
where
  D: Detector + Sync,
  S: Segmenter + Sync,
{
  pub fn new(detector: D, segmenter: S) -> Self {
    Self {
      detector,
      segmenter,
      config: AnnotateConfig::default(),
    }
  }

  pub fn with_config(mut self, config: AnnotateConfig) -> Self {
    self.config = config;
    self
  }

  /// 标注目录下的所有图像，返回标注目录与逐图结果
  pub fn annotate(
    &self,
    image_dir: &Path,
    runner: &BatchRunner,
  ) -> Result<(PathBuf, BatchReport), TaskError> {
    let images = ImageDirectory::open(image_dir)?;
    let label_dir = self.config.label_dir_for(image_dir);
    std::fs::create_dir_all(&label_dir)
      .map_err(|e| TaskError::CreateDirError(label_dir.clone(), e))?;
    info!(
      "图像目录: {}, 标注目录: {}",
      images.root().display(),
      label_dir.display()
    );

    let report = runner.run("自动标注", images.entries(), |path| {
      self.annotate_image(path, &label_dir)
    })?;
    Ok((label_dir, report))
  }

  /// 标注单张图像
  ///
  /// 检测或分割失败只跳过该图像；图像无法读取或标注文件无法写入时返回错误。
  pub fn annotate_image(&self, path: &Path, label_dir: &Path) -> Result<ImageState, TaskError> {
    let mut job = ImageJob::new(path);
    let target = label_path(label_dir, path);
    let frame = ImageFrame::open(path)?;

    let detections = match self.detector.detect(&frame) {
      Ok(detections) => self.select(detections),
      Err(e) => {
        error!("{}: 检测失败: {}", job.name(), e);
        return skip_and_clean(job, &target, SkipReason::DetectorFailed(e.to_string()));
      }
    };
    job.advance(ImageState::Detected(detections.len()));
    if detections.is_empty() {
      return skip_and_clean(job, &target, SkipReason::NoDetections);
    }

    let mut polygons: Vec<(u32, Polygon)> = Vec::new();
    for item in &detections {
      let mask = match self.segmenter.segment(&frame, &item.bbox) {
        Ok(mask) => mask,
        Err(e) => {
          error!("{}: 分割失败: {}", job.name(), e);
          return skip_and_clean(job, &target, SkipReason::SegmenterFailed(e.to_string()));
        }
      };
      if mask.dimensions() != frame.dimensions() {
        let reason = format!(
          "掩码尺寸 {:?} 与图像尺寸 {:?} 不一致",
          mask.dimensions(),
          frame.dimensions()
        );
        error!("{}: {}", job.name(), reason);
        return skip_and_clean(job, &target, SkipReason::SegmenterFailed(reason));
      }
      polygons.extend(
        contour::extract(&mask)
          .into_iter()
          .map(|polygon| (item.class_id, polygon)),
      );
    }
    job.advance(ImageState::Segmented(polygons.len()));

    let (width, height) = frame.dimensions();
    let records: Vec<AnnotationRecord> = polygons
      .iter()
      .filter_map(|(class_id, polygon)| {
        AnnotationRecord::from_pixels(*class_id, polygon, width, height)
          .map_err(|e| warn!("{}: 丢弃类别 {} 的多边形: {}", job.name(), class_id, e))
          .ok()
      })
      .collect();
    job.advance(ImageState::Encoded(records.len()));
    if records.is_empty() {
      return skip_and_clean(job, &target, SkipReason::NoPolygons);
    }

    write_records(&target, &records)?;
    info!(
      "{}: {} 个检测, 写入 {} 条标注",
      job.name(),
      detections.len(),
      records.len()
    );
    Ok(job.finish(target))
  }

  fn select(&self, detections: Vec<DetectItem>) -> Vec<DetectItem> {
    detections
      .into_iter()
      .filter(|item| self.config.accepts_class(item.class_id))
      .take(self.config.max_detections.unwrap_or(usize::MAX))
      .collect()
  }
}

/// 跳过图像，并删除上一次运行遗留的同名标注文件
fn skip_and_clean(job: ImageJob, target: &Path, reason: SkipReason) -> Result<ImageState, TaskError> {
  match std::fs::remove_file(target) {
    Ok(()) => warn!("{}: 删除过期标注文件 {}", job.name(), target.display()),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
    Err(e) => return Err(crate::label::LabelError::from(e).into()),
  }
  Ok(job.skip(reason))
}

/// 使用默认配置顺序标注 `image_dir`，返回标注目录
pub fn annotate<D, S>(image_dir: &Path, detector: D, segmenter: S) -> Result<PathBuf, TaskError>
where
  D: Detector + Sync,
  S: Segmenter + Sync,
{
  let (label_dir, _) =
    AutoAnnotator::new(detector, segmenter).annotate(image_dir, &BatchRunner::default())?;
  Ok(label_dir)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mask::Mask;
  use image::RgbImage;

  #[derive(Debug, thiserror::Error)]
  #[error("stub failure")]
  struct StubError;

  struct FixedDetector(Vec<DetectItem>);

  impl Detector for FixedDetector {
    type Error = StubError;

    fn detect(&self, _frame: &ImageFrame) -> Result<Vec<DetectItem>, Self::Error> {
      Ok(self.0.clone())
    }
  }

  /// 把提示框填满作为掩码
  struct FillSegmenter;

  impl Segmenter for FillSegmenter {
    type Error = StubError;

    fn segment(&self, frame: &ImageFrame, bbox: &[f32; 4]) -> Result<Mask, Self::Error> {
      let mut mask = Mask::new(frame.width(), frame.height());
      mask.fill_rect(bbox[0] as u32, bbox[1] as u32, bbox[2] as u32, bbox[3] as u32);
      Ok(mask)
    }
  }

  fn write_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    RgbImage::new(50, 40).save(&path).unwrap();
    path
  }

  #[test]
  fn class_filter_and_cap_apply_in_detector_order() {
    let detections = vec![
      DetectItem::new(1, [0.0, 0.0, 5.0, 5.0]),
      DetectItem::new(2, [10.0, 10.0, 15.0, 15.0]),
      DetectItem::new(1, [20.0, 20.0, 25.0, 25.0]),
      DetectItem::new(1, [30.0, 30.0, 35.0, 35.0]),
    ];
    let annotator = AutoAnnotator::new(FixedDetector(vec![]), FillSegmenter).with_config(
      AnnotateConfig {
        classes: Some(vec![1]),
        max_detections: Some(2),
        ..Default::default()
      },
    );
    let selected = annotator.select(detections);
    assert_eq!(
      selected,
      vec![
        DetectItem::new(1, [0.0, 0.0, 5.0, 5.0]),
        DetectItem::new(1, [20.0, 20.0, 25.0, 25.0]),
      ]
    );
  }

  #[test]
  fn stale_label_is_removed_when_nothing_is_found() {
    let dir = tempfile::tempdir().unwrap();
    let labels = dir.path().join("labels");
    std::fs::create_dir(&labels).unwrap();
    let image = write_image(dir.path(), "a.png");
    std::fs::write(labels.join("a.txt"), "0 0.1 0.1 0.2 0.1 0.2 0.2\n").unwrap();

    let annotator = AutoAnnotator::new(FixedDetector(vec![]), FillSegmenter);
    let state = annotator.annotate_image(&image, &labels).unwrap();
    assert_eq!(state, ImageState::Skipped(SkipReason::NoDetections));
    assert!(!labels.join("a.txt").exists());
  }

  #[test]
  fn mask_of_wrong_size_skips_image() {
    struct TinySegmenter;
    impl Segmenter for TinySegmenter {
      type Error = StubError;
      fn segment(&self, _frame: &ImageFrame, _bbox: &[f32; 4]) -> Result<Mask, Self::Error> {
        Ok(Mask::new(3, 3))
      }
    }

    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "a.png");
    let annotator = AutoAnnotator::new(
      FixedDetector(vec![DetectItem::new(0, [1.0, 1.0, 9.0, 9.0])]),
      TinySegmenter,
    );
    let state = annotator.annotate_image(&image, dir.path()).unwrap();
    assert!(matches!(
      state,
      ImageState::Skipped(SkipReason::SegmenterFailed(_))
    ));
  }

  #[test]
  fn records_of_all_detections_share_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "multi.png");
    let annotator = AutoAnnotator::new(
      FixedDetector(vec![
        DetectItem::new(4, [5.0, 5.0, 15.0, 15.0]),
        DetectItem::new(9, [20.0, 10.0, 40.0, 30.0]),
      ]),
      FillSegmenter,
    );
    let labels = dir.path().join("labels");
    std::fs::create_dir(&labels).unwrap();
    let state = annotator.annotate_image(&image, &labels).unwrap();
    assert_eq!(state, ImageState::Written(labels.join("multi.txt")));

    let text = std::fs::read_to_string(labels.join("multi.txt")).unwrap();
    let classes: Vec<&str> = text
      .lines()
      .map(|l| l.split_whitespace().next().unwrap())
      .collect();
    assert_eq!(classes, vec!["4", "9"]);
  }
}
