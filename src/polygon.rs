// 该文件是 Shanan （山南西风） 项目的一部分。
// src/polygon.rs - 多边形定义
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

use imageproc::point::Point;

/// 闭合多边形，最后一个顶点隐式连接到第一个顶点
///
/// 顶点可以是像素坐标，也可以是归一化坐标，由使用方决定。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
  points: Vec<Point<f32>>,
}

impl Polygon {
  pub fn new(points: Vec<Point<f32>>) -> Self {
    Self { points }
  }

  pub fn from_xy(coords: &[(f32, f32)]) -> Self {
    coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
  }

  pub fn points(&self) -> &[Point<f32>] {
    &self.points
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  /// 互不相同的顶点数
  pub fn distinct_vertices(&self) -> usize {
    let mut keys: Vec<(u32, u32)> = self
      .points
      .iter()
      .map(|p| (p.x.to_bits(), p.y.to_bits()))
      .collect();
    keys.sort_unstable();
    keys.dedup();
    keys.len()
  }

  /// 对每个顶点做坐标变换
  pub fn map<F: Fn(Point<f32>) -> Point<f32>>(&self, f: F) -> Self {
    self.points.iter().copied().map(f).collect()
  }

  /// 转换为绘制用的整数像素坐标
  ///
  /// 连续重复的顶点以及与首点重合的尾点会被去掉，
  /// `imageproc` 的多边形填充不接受首尾相同的输入。
  pub fn to_draw_points(&self) -> Vec<Point<i32>> {
    let mut points: Vec<Point<i32>> = self
      .points
      .iter()
      .map(|p| Point::new(p.x.round() as i32, p.y.round() as i32))
      .collect();
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
      points.pop();
    }
    points
  }
}

impl FromIterator<Point<f32>> for Polygon {
  fn from_iter<I: IntoIterator<Item = Point<f32>>>(iter: I) -> Self {
    Self {
      points: iter.into_iter().collect(),
    }
  }
}
