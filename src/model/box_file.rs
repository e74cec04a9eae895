// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/box_file.rs - 读取预先计算的检测结果
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

use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::ImageFrame,
  model::{DetectItem, Detector, ModelError},
};

/// 外部检测器离线产出的边界框
///
/// URL 形式: `boxes:///path/to/dir`，每张图像对应 `<dir>/<stem>.txt`，
/// 每行 `class x_min y_min x_max y_max`（像素坐标）。
/// 文件不存在表示该图像没有检测结果。
#[derive(Debug, Clone)]
pub struct BoxFileDetector {
  directory: PathBuf,
}

impl FromUrlWithScheme for BoxFileDetector {
  const SCHEME: &'static str = "boxes";
}

impl FromUrl for BoxFileDetector {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::SchemeMismatch(url.scheme().to_string()));
    }

    let path = urlencoding::decode(url.path())
      .map_err(|e| ModelError::PathDecode(e.to_string()))?
      .into_owned();
    Ok(Self::new(path))
  }
}

impl BoxFileDetector {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
    }
  }

  fn boxes_path(&self, image_path: &Path) -> PathBuf {
    let mut name = image_path
      .file_stem()
      .unwrap_or(image_path.as_os_str())
      .to_os_string();
    name.push(".txt");
    self.directory.join(name)
  }
}

fn parse_box_line(line: &str) -> Result<DetectItem, String> {
  let tokens: Vec<&str> = line.split_whitespace().collect();
  if tokens.len() != 5 {
    return Err(format!("需要 5 个字段, 实际 {} 个", tokens.len()));
  }
  let class_id = tokens[0]
    .parse::<u32>()
    .map_err(|_| format!("类别编号无效: '{}'", tokens[0]))?;

  let mut bbox = [0f32; 4];
  for (slot, token) in bbox.iter_mut().zip(&tokens[1..]) {
    *slot = token
      .parse::<f32>()
      .ok()
      .filter(|v| v.is_finite())
      .ok_or_else(|| format!("坐标无效: '{}'", token))?;
  }
  Ok(DetectItem::new(class_id, bbox))
}

impl Detector for BoxFileDetector {
  type Error = ModelError;

  fn detect(&self, frame: &ImageFrame) -> Result<Vec<DetectItem>, Self::Error> {
    let path = self.boxes_path(frame.path());
    let contents = match std::fs::read_to_string(&path) {
      Ok(contents) => contents,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!("{}: 没有检测结果文件 {}", frame.name(), path.display());
        return Ok(Vec::new());
      }
      Err(e) => return Err(ModelError::IoError(path, e)),
    };

    contents
      .lines()
      .enumerate()
      .filter(|(_, line)| !line.trim().is_empty())
      .map(|(index, line)| {
        parse_box_line(line).map_err(|reason| ModelError::Format(path.clone(), index + 1, reason))
      })
      .collect()
  }
}
