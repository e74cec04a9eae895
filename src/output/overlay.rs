// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/overlay.rs - 标注叠加渲染
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

use std::path::Path;

use image::RgbImage;
use tracing::{info, warn};

use crate::{
  config::{ColorTable, RenderConfig},
  frame::ImageFrame,
  input::ImageDirectory,
  label::{AnnotationRecord, LabelError, label_path, read_records},
  output::{Render, draw::Draw},
  polygon::Polygon,
  task::{BatchReport, BatchRunner, ImageJob, ImageState, SkipReason, TaskError},
  utils::save_image_atomic,
};

/// 把标注文件中的多边形叠加到原图上
pub struct OverlayRenderer {
  config: RenderConfig,
  draw: Draw,
}

impl Default for OverlayRenderer {
  fn default() -> Self {
    Self::new(RenderConfig::default())
  }
}

impl Render for OverlayRenderer {
  type Error = LabelError;

  fn render_result(
    &self,
    frame: &ImageFrame,
    records: &[AnnotationRecord],
  ) -> Result<RgbImage, Self::Error> {
    let (width, height) = frame.dimensions();
    let polygons = records
      .iter()
      .map(|record| Ok((record.class_id, record.to_pixels(width, height)?)))
      .collect::<Result<Vec<(u32, Polygon)>, LabelError>>()?;

    let mut canvas = frame.image().clone();
    self.draw.draw_all(
      &mut canvas,
      polygons.iter().map(|(class_id, polygon)| (*class_id, polygon)),
      &self.config.colors,
    );
    Ok(canvas)
  }
}

impl OverlayRenderer {
  pub fn new(config: RenderConfig) -> Self {
    let draw = Draw::new(config.stroke_width());
    Self { config, draw }
  }

  pub fn config(&self) -> &RenderConfig {
    &self.config
  }

  /// 渲染目录下所有有标注文件的图像
  pub fn render(
    &self,
    image_dir: &Path,
    label_dir: &Path,
    output_dir: &Path,
    runner: &BatchRunner,
  ) -> Result<BatchReport, TaskError> {
    let images = ImageDirectory::open(image_dir)?;
    std::fs::create_dir_all(output_dir)
      .map_err(|e| TaskError::CreateDirError(output_dir.to_path_buf(), e))?;
    info!(
      "标注目录: {}, 输出目录: {}",
      label_dir.display(),
      output_dir.display()
    );

    runner.run("渲染", images.entries(), |path| {
      self.render_image(path, label_dir, output_dir)
    })
  }

  /// 渲染单张图像，输出文件名与原图相同
  pub fn render_image(
    &self,
    path: &Path,
    label_dir: &Path,
    output_dir: &Path,
  ) -> Result<ImageState, TaskError> {
    let mut job = ImageJob::new(path);

    let label = match read_records(&label_path(label_dir, path)) {
      Ok(label) => label,
      Err(e) if e.is_not_found() => return Ok(job.skip(SkipReason::MissingLabel)),
      Err(e) => return Err(e.into()),
    };
    for (line, e) in &label.rejected {
      warn!("{}: 忽略标注第 {} 行: {}", job.name(), line, e);
    }
    if label.records.is_empty() {
      return Ok(job.skip(SkipReason::NoRecords));
    }

    let frame = ImageFrame::open(path)?;
    job.advance(ImageState::Decoded(label.records.len()));
    let canvas = self.render_result(&frame, &label.records)?;

    let target = output_dir.join(frame.name());
    save_image_atomic(&canvas, &target)
      .map_err(|e| TaskError::SaveImageError(target.clone(), e))?;
    info!(
      "{}: 渲染 {} 个多边形 -> {}",
      job.name(),
      label.records.len(),
      target.display()
    );
    Ok(job.finish(target))
  }
}

/// 使用给定颜色表顺序渲染
pub fn render(
  image_dir: &Path,
  label_dir: &Path,
  output_dir: &Path,
  colors: &ColorTable,
) -> Result<BatchReport, TaskError> {
  let renderer = OverlayRenderer::new(RenderConfig::default().with_colors(colors.clone()));
  renderer.render(image_dir, label_dir, output_dir, &BatchRunner::default())
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  fn setup() -> (tempfile::TempDir, std::path::PathBuf, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    let labels = dir.path().join("labels");
    std::fs::create_dir(&images).unwrap();
    std::fs::create_dir(&labels).unwrap();
    (dir, images, labels)
  }

  #[test]
  fn square_label_is_filled_with_first_color() {
    let (dir, images, labels) = setup();
    RgbImage::new(100, 100).save(images.join("a.png")).unwrap();
    std::fs::write(
      labels.join("a.txt"),
      "0 0.100000 0.100000 0.190000 0.100000 0.190000 0.190000 0.100000 0.190000\n",
    )
    .unwrap();

    let colors: ColorTable = "FF3838,48F90A".parse().unwrap();
    let output = dir.path().join("out");
    let report = render(&images, &labels, &output, &colors).unwrap();
    assert_eq!(report.written(), 1);

    let rendered = image::open(output.join("a.png")).unwrap().to_rgb8();
    assert_eq!(*rendered.get_pixel(15, 15), Rgb([0xFF, 0x38, 0x38]));
    assert_eq!(*rendered.get_pixel(10, 10), Rgb([0xFF, 0x38, 0x38]));
    assert_eq!(*rendered.get_pixel(50, 50), Rgb([0, 0, 0]));
  }

  #[test]
  fn class_color_wraps_around_table() {
    let (dir, images, labels) = setup();
    RgbImage::new(50, 50).save(images.join("b.png")).unwrap();
    std::fs::write(labels.join("b.txt"), "3 0.2 0.2 0.6 0.2 0.6 0.6 0.2 0.6\n").unwrap();

    let colors: ColorTable = "FF0000,00FF00,0000FF".parse().unwrap();
    let output = dir.path().join("out");
    render(&images, &labels, &output, &colors).unwrap();
    let rendered = image::open(output.join("b.png")).unwrap().to_rgb8();
    assert_eq!(*rendered.get_pixel(20, 20), Rgb([255, 0, 0]));
  }

  #[test]
  fn images_without_usable_labels_are_skipped() {
    let (dir, images, labels) = setup();
    RgbImage::new(20, 20).save(images.join("none.png")).unwrap();
    RgbImage::new(20, 20).save(images.join("junk.png")).unwrap();
    std::fs::write(labels.join("junk.txt"), "not a record\n0 0.1 0.1\n").unwrap();

    let output = dir.path().join("out");
    let report = OverlayRenderer::default()
      .render(&images, &labels, &output, &BatchRunner::default())
      .unwrap();
    assert_eq!(
      report.state_of("none.png"),
      Some(&ImageState::Skipped(SkipReason::MissingLabel))
    );
    assert_eq!(
      report.state_of("junk.png"),
      Some(&ImageState::Skipped(SkipReason::NoRecords))
    );
    assert!(!output.join("none.png").exists());
    assert!(!output.join("junk.png").exists());
  }

  #[test]
  fn bad_lines_do_not_hide_good_ones() {
    let (dir, images, labels) = setup();
    RgbImage::new(40, 40).save(images.join("c.png")).unwrap();
    std::fs::write(
      labels.join("c.txt"),
      "abc 0.1 0.2 0.3\n0 0.1 0.1 nan 0.1 0.5 0.5\n1 0.25 0.25 0.75 0.25 0.75 0.75 0.25 0.75\n",
    )
    .unwrap();

    let colors: ColorTable = "FF0000,00FF00".parse().unwrap();
    let output = dir.path().join("out");
    let report = render(&images, &labels, &output, &colors).unwrap();
    assert_eq!(
      report.state_of("c.png"),
      Some(&ImageState::Written(output.join("c.png")))
    );
    let rendered = image::open(output.join("c.png")).unwrap().to_rgb8();
    assert_eq!(*rendered.get_pixel(20, 20), Rgb([0, 255, 0]));
  }

  #[test]
  fn undecodable_line_does_not_abort_render() {
    let (dir, images, labels) = setup();
    RgbImage::new(40, 40).save(images.join("d.png")).unwrap();
    RgbImage::new(40, 40).save(images.join("e.png")).unwrap();
    std::fs::write(labels.join("d.txt"), b"\xff\xfe\n0 0.1 0.1 0.9 0.1 0.9 0.9\n").unwrap();
    std::fs::write(labels.join("e.txt"), "0 0.1 0.1 0.9 0.1 0.9 0.9\n").unwrap();

    let output = dir.path().join("out");
    let report = render(&images, &labels, &output, &ColorTable::default()).unwrap();
    assert_eq!(report.written(), 2);
    assert!(output.join("d.png").exists());
    assert!(output.join("e.png").exists());
  }
}
