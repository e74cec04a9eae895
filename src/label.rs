// 该文件是 Shanan （山南西风） 项目的一部分。
// src/label.rs - 归一化多边形标注编解码
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

//! 标注文件格式：每行一个记录 `class_id x1 y1 x2 y2 ... xn yn`，
//! 坐标按图像宽高归一化到 [0, 1]。

use std::{
  fmt::Write as _,
  path::{Path, PathBuf},
};

use imageproc::point::Point;
use thiserror::Error;

use crate::{polygon::Polygon, utils::write_atomic};

/// 标注文件扩展名
pub const LABEL_EXTENSION: &str = "txt";

/// 坐标小数位数，对边长小于 500000 像素的图像可保证 ±0.5 像素内往返
const COORD_PRECISION: usize = 6;

const MIN_VERTICES: usize = 3;

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("图像尺寸无效: {width}x{height}")]
  InvalidDimensions { width: u32, height: u32 },
  #[error("多边形顶点不足: 需要至少 3 个, 实际 {0} 个")]
  DegeneratePolygon(usize),
  #[error("标注行格式错误: {0}")]
  Parse(String),
  #[error("标注文件不存在: {0}")]
  NotFound(PathBuf),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

impl LabelError {
  fn parse(reason: impl Into<String>) -> Self {
    LabelError::Parse(reason.into())
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, LabelError::NotFound(_))
  }
}

/// 一条标注记录，多边形为归一化坐标
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
  pub class_id: u32,
  pub polygon: Polygon,
}

fn check_dimensions(width: u32, height: u32) -> Result<(), LabelError> {
  if width == 0 || height == 0 {
    return Err(LabelError::InvalidDimensions { width, height });
  }
  Ok(())
}

impl AnnotationRecord {
  /// 由像素坐标多边形构造记录
  pub fn from_pixels(
    class_id: u32,
    polygon: &Polygon,
    width: u32,
    height: u32,
  ) -> Result<Self, LabelError> {
    check_dimensions(width, height)?;
    if polygon.len() < MIN_VERTICES {
      return Err(LabelError::DegeneratePolygon(polygon.len()));
    }

    let (w, h) = (width as f32, height as f32);
    let polygon = polygon.map(|p| Point::new((p.x / w).clamp(0.0, 1.0), (p.y / h).clamp(0.0, 1.0)));
    Ok(Self { class_id, polygon })
  }

  /// 还原为像素坐标，四舍五入到整数像素
  pub fn to_pixels(&self, width: u32, height: u32) -> Result<Polygon, LabelError> {
    check_dimensions(width, height)?;
    let (w, h) = (width as f32, height as f32);
    Ok(self.polygon.map(|p| Point::new((p.x * w).round(), (p.y * h).round())))
  }

  /// 序列化为一行文本（不含换行符）
  pub fn to_line(&self) -> String {
    let mut line = self.class_id.to_string();
    for p in self.polygon.points() {
      // 写入 String 不会失败
      let _ = write!(
        line,
        " {:.prec$} {:.prec$}",
        p.x,
        p.y,
        prec = COORD_PRECISION
      );
    }
    line
  }

  /// 解析一行文本
  pub fn parse_line(line: &str) -> Result<Self, LabelError> {
    let mut tokens = line.split_whitespace();
    let class_token = tokens.next().ok_or_else(|| LabelError::parse("空行"))?;
    let class_id = class_token
      .parse::<u32>()
      .map_err(|_| LabelError::parse(format!("类别编号无效: '{}'", class_token)))?;

    let coords = tokens
      .map(|token| match token.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value.clamp(0.0, 1.0)),
        _ => Err(LabelError::parse(format!("坐标无效: '{}'", token))),
      })
      .collect::<Result<Vec<f32>, _>>()?;

    if coords.len() % 2 != 0 {
      return Err(LabelError::parse(format!(
        "坐标数量为奇数: {}",
        coords.len()
      )));
    }
    if coords.len() / 2 < MIN_VERTICES {
      return Err(LabelError::parse(format!(
        "多边形顶点不足: {}",
        coords.len() / 2
      )));
    }

    let polygon = coords
      .chunks_exact(2)
      .map(|xy| Point::new(xy[0], xy[1]))
      .collect();
    Ok(Self { class_id, polygon })
  }
}

/// 像素多边形编码为一行标注文本
pub fn encode(
  class_id: u32,
  polygon: &Polygon,
  width: u32,
  height: u32,
) -> Result<String, LabelError> {
  AnnotationRecord::from_pixels(class_id, polygon, width, height).map(|r| r.to_line())
}

/// 解码一行标注文本为像素多边形
pub fn decode(line: &str, width: u32, height: u32) -> Result<(u32, Polygon), LabelError> {
  let record = AnnotationRecord::parse_line(line)?;
  let polygon = record.to_pixels(width, height)?;
  Ok((record.class_id, polygon))
}

/// 标注文件路径：`<label_dir>/<stem>.txt`
pub fn label_path(label_dir: &Path, image_path: &Path) -> PathBuf {
  let mut name = image_path
    .file_stem()
    .unwrap_or(image_path.as_os_str())
    .to_os_string();
  name.push(".");
  name.push(LABEL_EXTENSION);
  label_dir.join(name)
}

/// 写入标注文件，每行一个记录
pub fn write_records(path: &Path, records: &[AnnotationRecord]) -> Result<(), LabelError> {
  let mut contents = String::new();
  for record in records {
    contents.push_str(&record.to_line());
    contents.push('\n');
  }
  write_atomic(path, contents.as_bytes())?;
  Ok(())
}

/// 读取到的标注文件
#[derive(Debug, Default)]
pub struct LabelFile {
  pub records: Vec<AnnotationRecord>,
  /// 被丢弃的行：(行号, 错误)，行号从 1 开始
  pub rejected: Vec<(usize, LabelError)>,
}

/// 读取标注文件
///
/// 文件不存在时返回 [`LabelError::NotFound`]；空文件返回零条记录。
/// 格式错误的行不会导致整体失败，而是记录在 [`LabelFile::rejected`] 中。
pub fn read_records(path: &Path) -> Result<LabelFile, LabelError> {
  let contents = match std::fs::read(path) {
    Ok(contents) => contents,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      return Err(LabelError::NotFound(path.to_path_buf()));
    }
    Err(e) => return Err(e.into()),
  };

  // 逐行解码，单行编码错误只丢弃该行
  let mut file = LabelFile::default();
  for (index, bytes) in contents.split(|&b| b == b'\n').enumerate() {
    let parsed = std::str::from_utf8(bytes)
      .map_err(|e| LabelError::parse(format!("不是有效的 UTF-8: {}", e)))
      .and_then(|line| {
        if line.trim().is_empty() {
          Ok(None)
        } else {
          AnnotationRecord::parse_line(line).map(Some)
        }
      });
    match parsed {
      Ok(Some(record)) => file.records.push(record),
      Ok(None) => {}
      Err(e) => file.rejected.push((index + 1, e)),
    }
  }
  Ok(file)
}
