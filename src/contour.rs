// 该文件是 Shanan （山南西风） 项目的一部分。
// src/contour.rs - 掩码轮廓提取
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

use imageproc::{
  contours::{BorderType, Contour, find_contours},
  point::Point,
};
use tracing::debug;

use crate::{mask::Mask, polygon::Polygon};

const MIN_DISTINCT_VERTICES: usize = 3;

/// 从二值掩码中提取外轮廓多边形（像素坐标）
///
/// 使用 Suzuki-Abe 边界跟踪，只保留外边界，内部空洞会被填充而不是挖空。
/// 轮廓按首个像素的光栅扫描顺序输出，顶点按跟踪顺序输出，结果可复现。
/// 简化后不足 3 个不同顶点的轮廓被丢弃；空掩码返回空列表。
pub fn extract(mask: &Mask) -> Vec<Polygon> {
  let contours: Vec<Contour<i32>> = find_contours(mask.as_gray());

  let total = contours.len();
  let polygons: Vec<Polygon> = contours
    .into_iter()
    .filter(|c| c.border_type == BorderType::Outer)
    .map(|c| {
      simplify(&c.points)
        .into_iter()
        .map(|p| Point::new(p.x as f32, p.y as f32))
        .collect::<Polygon>()
    })
    .filter(|polygon| polygon.distinct_vertices() >= MIN_DISTINCT_VERTICES)
    .collect();

  debug!("轮廓提取: {} 条边界, 保留 {} 个多边形", total, polygons.len());
  polygons
}

/// 去掉重复点以及直线段中间的点，只留下拐点
fn simplify(points: &[Point<i32>]) -> Vec<Point<i32>> {
  let mut ring = points.to_vec();
  ring.dedup();
  while ring.len() > 1 && ring.first() == ring.last() {
    ring.pop();
  }

  loop {
    let n = ring.len();
    if n < MIN_DISTINCT_VERTICES {
      return ring;
    }

    let kept: Vec<Point<i32>> = (0..n)
      .filter(|&i| !is_straight(ring[(i + n - 1) % n], ring[i], ring[(i + 1) % n]))
      .map(|i| ring[i])
      .collect();

    if kept.len() == n {
      return ring;
    }
    ring = kept;
  }
}

/// `cur` 位于 `prev -> next` 同向直线的中间
fn is_straight(prev: Point<i32>, cur: Point<i32>, next: Point<i32>) -> bool {
  let (ax, ay) = (cur.x - prev.x, cur.y - prev.y);
  let (bx, by) = (next.x - cur.x, next.y - cur.y);
  ax * by - ay * bx == 0 && ax * bx + ay * by > 0
}
