// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 多边形标注可视化
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

use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut},
  point::Point,
};

use crate::{config::ColorTable, polygon::Polygon};

/// 在图像上绘制带类别颜色的实心多边形
pub struct Draw {
  stroke_width: u32,
}

impl Draw {
  pub fn new(stroke_width: u32) -> Self {
    Self {
      stroke_width: stroke_width.max(1),
    }
  }

  /// 先描闭合轮廓，再以同色实心填充
  pub fn draw_polygon(&self, image: &mut RgbImage, polygon: &Polygon, color: Rgb<u8>) {
    let points = polygon.to_draw_points();
    if points.is_empty() {
      return;
    }

    for (i, &start) in points.iter().enumerate() {
      let end = points[(i + 1) % points.len()];
      self.draw_stroke(image, start, end, color);
    }

    // draw_polygon_mut 要求首尾不重合，to_draw_points 已去掉闭合点
    if points.len() >= 3 {
      draw_polygon_mut(image, &points, color);
    }
  }

  /// 按记录顺序绘制，后绘制的覆盖先绘制的
  pub fn draw_all<'p>(
    &self,
    image: &mut RgbImage,
    polygons: impl IntoIterator<Item = (u32, &'p Polygon)>,
    colors: &ColorTable,
  ) {
    for (class_id, polygon) in polygons {
      self.draw_polygon(image, polygon, colors.color_for(class_id));
    }
  }

  fn draw_stroke(&self, image: &mut RgbImage, start: Point<i32>, end: Point<i32>, color: Rgb<u8>) {
    let from = (start.x as f32, start.y as f32);
    let to = (end.x as f32, end.y as f32);
    if self.stroke_width == 1 {
      draw_line_segment_mut(image, from, to, color);
      return;
    }

    let half = self.stroke_width as f32 / 2.0;
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let length = (dx * dx + dy * dy).sqrt();
    if length > 0.0 {
      // 沿法线方向展开成四边形
      let (nx, ny) = (-dy / length * half, dx / length * half);
      let corner = |(x, y): (f32, f32), sign: f32| {
        Point::new((x + sign * nx).round() as i32, (y + sign * ny).round() as i32)
      };
      let quad = [
        corner(from, 1.0),
        corner(to, 1.0),
        corner(to, -1.0),
        corner(from, -1.0),
      ];
      if quad[0] != quad[3] {
        draw_polygon_mut(image, &quad, color);
      } else {
        draw_line_segment_mut(image, from, to, color);
      }
    }

    // 圆形连接点
    let radius = half.floor() as i32;
    draw_filled_circle_mut(image, (start.x, start.y), radius, color);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const RED: Rgb<u8> = Rgb([255, 0, 0]);
  const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

  fn square() -> Polygon {
    Polygon::from_xy(&[(10.0, 10.0), (19.0, 10.0), (19.0, 19.0), (10.0, 19.0)])
  }

  #[test]
  fn square_is_filled_and_outside_untouched() {
    let mut image = RgbImage::new(40, 40);
    Draw::new(1).draw_polygon(&mut image, &square(), RED);

    for (x, y) in [(10, 10), (15, 15), (19, 19), (10, 19), (14, 10)] {
      assert_eq!(*image.get_pixel(x, y), RED, "({x}, {y})");
    }
    for (x, y) in [(9, 9), (20, 20), (30, 5), (0, 0)] {
      assert_eq!(*image.get_pixel(x, y), BLACK, "({x}, {y})");
    }
  }

  #[test]
  fn wide_stroke_spreads_past_the_outline() {
    let mut image = RgbImage::new(40, 40);
    Draw::new(4).draw_polygon(&mut image, &square(), RED);
    assert_eq!(*image.get_pixel(8, 15), RED);
    assert_eq!(*image.get_pixel(15, 21), RED);
    assert_eq!(*image.get_pixel(30, 30), BLACK);
  }

  #[test]
  fn degenerate_polygons_do_not_panic() {
    let mut image = RgbImage::new(20, 20);
    let draw = Draw::new(3);
    draw.draw_polygon(&mut image, &Polygon::default(), RED);
    draw.draw_polygon(&mut image, &Polygon::from_xy(&[(5.0, 5.0), (5.2, 4.9)]), RED);
    draw.draw_polygon(
      &mut image,
      &Polygon::from_xy(&[(2.0, 2.0), (8.0, 2.0), (14.0, 2.0)]),
      RED,
    );
    assert_eq!(*image.get_pixel(8, 2), RED);
  }

  #[test]
  fn later_records_paint_over_earlier_ones() {
    let colors: ColorTable = "FF0000,0000FF".parse().unwrap();
    let mut image = RgbImage::new(40, 40);
    let first = square();
    let second = Polygon::from_xy(&[(15.0, 15.0), (30.0, 15.0), (30.0, 30.0), (15.0, 30.0)]);
    Draw::new(1).draw_all(&mut image, [(0, &first), (1, &second)], &colors);

    assert_eq!(*image.get_pixel(12, 12), Rgb([255, 0, 0]));
    assert_eq!(*image.get_pixel(17, 17), Rgb([0, 0, 255]));
  }
}
