// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use url::Url;

use shanan_seg::config::ColorTable;

/// Shanan 自动标注工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 同时处理的图像数
  #[arg(long, global = true, default_value_t = 1, value_name = "COUNT")]
  pub jobs: usize,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 检测 + 分割，生成多边形标注文件
  Annotate {
    #[command(flatten)]
    images: ImageArgs,
    #[command(flatten)]
    model: ModelArgs,
  },
  /// 把标注文件渲染到图像上
  Render {
    #[command(flatten)]
    images: ImageArgs,
    #[command(flatten)]
    draw: DrawArgs,
  },
  /// 先标注，再渲染
  Run {
    #[command(flatten)]
    images: ImageArgs,
    #[command(flatten)]
    model: ModelArgs,
    #[command(flatten)]
    draw: DrawArgs,
  },
}

#[derive(ClapArgs, Debug)]
pub struct ImageArgs {
  /// 图像目录
  #[arg(long, value_name = "DIR")]
  pub images: PathBuf,

  /// 标注目录，默认为图像目录旁的 <name>_auto_annotate_labels
  #[arg(long, value_name = "DIR")]
  pub labels: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct ModelArgs {
  /// 检测器
  /// 支持:
  /// - blob:///?class=0&min_area=16&invert=false
  /// - boxes:///path/to/boxes
  #[arg(long, value_name = "DETECTOR")]
  pub detector: Url,

  /// 分割器
  /// 支持:
  /// - otsu:///?invert=false
  /// - box:///
  #[arg(long, value_name = "SEGMENTER")]
  pub segmenter: Url,

  /// 只标注这些类别（逗号分隔）
  #[arg(long, value_delimiter = ',', value_name = "IDS")]
  pub classes: Option<Vec<u32>>,

  /// 每张图像最多分割的检测数
  #[arg(long = "max-det", value_name = "COUNT")]
  pub max_det: Option<usize>,
}

#[derive(ClapArgs, Debug)]
pub struct DrawArgs {
  /// 渲染输出目录，默认为图像目录旁的 <name>_auto_annotate_overlays
  #[arg(long, value_name = "DIR")]
  pub output: Option<PathBuf>,

  /// 类别颜色表，逗号分隔的 RRGGBB
  #[arg(long, value_name = "COLORS")]
  pub colors: Option<ColorTable>,

  /// 轮廓描边宽度（像素）
  #[arg(long, default_value_t = 2, value_name = "PIXELS")]
  pub stroke_width: u32,
}
