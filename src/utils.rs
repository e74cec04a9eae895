// 该文件是 Shanan （山南西风） 项目的一部分。
// src/utils.rs - 文件系统工具
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
  io::{BufWriter, Write},
  path::Path,
};

use image::{ImageError, ImageFormat, RgbImage};
use tempfile::NamedTempFile;

const TEMP_PREFIX: &str = ".shanan-";
const TEMP_SUFFIX: &str = ".part";

/// 在目标文件所在目录创建临时文件
fn temp_beside(path: &Path) -> std::io::Result<NamedTempFile> {
  let dir = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };
  tempfile::Builder::new()
    .prefix(TEMP_PREFIX)
    .suffix(TEMP_SUFFIX)
    .tempfile_in(dir)
}

/// 先写临时文件再重命名，读者不会看到写了一半的文件
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
  let mut file = temp_beside(path)?;
  file.write_all(contents)?;
  file.as_file().sync_all()?;
  file.persist(path).map_err(|e| e.error)?;
  Ok(())
}

/// 原子地保存图像，格式由目标文件扩展名决定
pub fn save_image_atomic(image: &RgbImage, path: &Path) -> Result<(), ImageError> {
  let format = ImageFormat::from_path(path)?;
  let mut file = temp_beside(path)?;
  {
    let mut writer = BufWriter::new(file.as_file_mut());
    image.write_to(&mut writer, format)?;
    writer.flush()?;
  }
  file.persist(path).map_err(|e| ImageError::IoError(e.error))?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn atomic_write_replaces_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    std::fs::write(&path, "old contents that are longer").unwrap();
    write_atomic(&path, b"new").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");

    let leftovers = std::fs::read_dir(dir.path())
      .unwrap()
      .filter(|e| {
        e.as_ref()
          .unwrap()
          .file_name()
          .to_string_lossy()
          .starts_with(TEMP_PREFIX)
      })
      .count();
    assert_eq!(leftovers, 0);
  }

  #[test]
  fn image_format_follows_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.png");
    let image = RgbImage::from_pixel(4, 3, image::Rgb([1, 2, 3]));
    save_image_atomic(&image, &path).unwrap();
    let loaded = image::open(&path).unwrap().to_rgb8();
    assert_eq!(loaded, image);
  }

  #[test]
  fn unknown_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.unknown");
    let image = RgbImage::new(2, 2);
    assert!(save_image_atomic(&image, &path).is_err());
    assert!(!path.exists());
  }
}
