// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input.rs - 图像目录输入
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

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("无法读取图像目录 {0}: {1}")]
  DirectoryError(PathBuf, std::io::Error),
  #[error("I/O error ({0}): {1}")]
  IoError(PathBuf, std::io::Error),
  #[error("Image loading error ({0}): {1}")]
  ImageLoadError(PathBuf, image::ImageError),
}

/// 支持的图像扩展名（小写）
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp", "tif", "tiff"];

pub fn is_image_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
    .unwrap_or(false)
}

/// 图像目录，条目按文件名字典序排列
#[derive(Debug, Clone)]
pub struct ImageDirectory {
  root: PathBuf,
  entries: Vec<PathBuf>,
}

impl ImageDirectory {
  /// 枚举目录下的图像文件（不递归），忽略子目录和其他文件
  pub fn open(root: &Path) -> Result<Self, InputError> {
    let read_dir =
      std::fs::read_dir(root).map_err(|e| InputError::DirectoryError(root.to_path_buf(), e))?;

    let mut entries = Vec::new();
    for entry in read_dir {
      let entry = entry.map_err(|e| InputError::DirectoryError(root.to_path_buf(), e))?;
      let path = entry.path();
      if path.is_file() && is_image_file(&path) {
        entries.push(path);
      } else {
        debug!("忽略非图像条目: {}", path.display());
      }
    }
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(Self {
      root: root.to_path_buf(),
      entries,
    })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn entries(&self) -> &[PathBuf] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn entries_are_sorted_and_filtered() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["b.png", "a.JPG", "c.txt", "a0.jpeg"] {
      std::fs::write(dir.path().join(name), b"").unwrap();
    }
    std::fs::create_dir(dir.path().join("d.png")).unwrap();

    let images = ImageDirectory::open(dir.path()).unwrap();
    let names: Vec<String> = images
      .entries()
      .iter()
      .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
      .collect();
    assert_eq!(names, vec!["a.JPG", "a0.jpeg", "b.png"]);
  }

  #[test]
  fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
      ImageDirectory::open(&dir.path().join("nope")),
      Err(InputError::DirectoryError(..))
    ));
  }
}
