// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 标注与渲染配置
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

use std::{
  path::{Path, PathBuf},
  str::FromStr,
};

use image::Rgb;
use thiserror::Error;

const LABEL_DIR_SUFFIX: &str = "_auto_annotate_labels";
const OUTPUT_DIR_SUFFIX: &str = "_auto_annotate_overlays";
const DEFAULT_COLOR_COUNT: usize = 80; // COCO 类别数
const DEFAULT_STROKE_WIDTH: u32 = 2;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("颜色表不能为空")]
  EmptyColorTable,
  #[error("颜色格式无效: '{0}'，应为 RRGGBB 十六进制")]
  InvalidColor(String),
  #[error("描边宽度必须为正整数")]
  InvalidStrokeWidth,
}

/// 类别颜色表，类别按 `class_id mod len` 取色
///
/// 类别数多于颜色数时会出现颜色重复，这是允许的。
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTable {
  colors: Vec<Rgb<u8>>,
}

impl ColorTable {
  pub fn new(colors: Vec<Rgb<u8>>) -> Result<Self, ConfigError> {
    if colors.is_empty() {
      return Err(ConfigError::EmptyColorTable);
    }
    Ok(Self { colors })
  }

  /// 在色相环上均匀取 `count` 种颜色
  pub fn hsv(count: usize) -> Result<Self, ConfigError> {
    Self::new(hue_wheel(count))
  }

  pub fn color_for(&self, class_id: u32) -> Rgb<u8> {
    self.colors[class_id as usize % self.colors.len()]
  }

  pub fn len(&self) -> usize {
    self.colors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.colors.is_empty()
  }
}

impl Default for ColorTable {
  fn default() -> Self {
    Self {
      colors: hue_wheel(DEFAULT_COLOR_COUNT),
    }
  }
}

/// 逗号分隔的十六进制颜色列表，例如 `FF3838,#48F90A`
impl FromStr for ColorTable {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let colors = s
      .split(',')
      .map(str::trim)
      .filter(|c| !c.is_empty())
      .map(parse_hex_color)
      .collect::<Result<Vec<_>, _>>()?;
    Self::new(colors)
  }
}

pub fn parse_hex_color(s: &str) -> Result<Rgb<u8>, ConfigError> {
  let hex = s.strip_prefix('#').unwrap_or(s);
  if hex.len() != 6 || !hex.is_ascii() {
    return Err(ConfigError::InvalidColor(s.to_string()));
  }
  let channel = |i: usize| {
    u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ConfigError::InvalidColor(s.to_string()))
  };
  Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

fn hue_wheel(count: usize) -> Vec<Rgb<u8>> {
  (0..count)
    .map(|i| {
      let hue = (i as f32 / count as f32) * 360.0;
      hsv_to_rgb(hue, 0.8, 0.9)
    })
    .collect()
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}

fn sibling_dir(image_dir: &Path, suffix: &str) -> PathBuf {
  let name = image_dir
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| "images".to_string());
  let parent = image_dir.parent().unwrap_or(Path::new(""));
  parent.join(format!("{}{}", name, suffix))
}

/// 默认标注目录：与图像目录同级的 `<name>_auto_annotate_labels`
pub fn default_label_dir(image_dir: &Path) -> PathBuf {
  sibling_dir(image_dir, LABEL_DIR_SUFFIX)
}

/// 默认渲染输出目录：与图像目录同级的 `<name>_auto_annotate_overlays`
pub fn default_output_dir(image_dir: &Path) -> PathBuf {
  sibling_dir(image_dir, OUTPUT_DIR_SUFFIX)
}

/// 自动标注配置
#[derive(Debug, Clone, Default)]
pub struct AnnotateConfig {
  /// 标注输出目录，缺省时使用 [`default_label_dir`]
  pub label_dir: Option<PathBuf>,
  /// 只保留这些类别的检测结果
  pub classes: Option<Vec<u32>>,
  /// 每张图像最多分割的检测数
  pub max_detections: Option<usize>,
}

impl AnnotateConfig {
  pub fn label_dir_for(&self, image_dir: &Path) -> PathBuf {
    self
      .label_dir
      .clone()
      .unwrap_or_else(|| default_label_dir(image_dir))
  }

  pub fn accepts_class(&self, class_id: u32) -> bool {
    self
      .classes
      .as_ref()
      .map(|classes| classes.contains(&class_id))
      .unwrap_or(true)
  }
}

/// 叠加渲染配置
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
  pub colors: ColorTable,
  stroke_width: u32,
}

impl Default for RenderConfig {
  fn default() -> Self {
    Self {
      colors: ColorTable::default(),
      stroke_width: DEFAULT_STROKE_WIDTH,
    }
  }
}

impl RenderConfig {
  pub fn new(colors: ColorTable, stroke_width: u32) -> Result<Self, ConfigError> {
    if stroke_width == 0 {
      return Err(ConfigError::InvalidStrokeWidth);
    }
    Ok(Self {
      colors,
      stroke_width,
    })
  }

  pub fn with_colors(mut self, colors: ColorTable) -> Self {
    self.colors = colors;
    self
  }

  pub fn stroke_width(&self) -> u32 {
    self.stroke_width
  }
}
