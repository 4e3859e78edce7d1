// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Audit overlays drawn on top of a floor plan raster

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::types::{Annotation, CornerSet, Point2D};

/// A segment to draw over the plan, e.g. a drawn bearing or its reference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayLine {
    pub from: Point2D,
    pub to: Point2D,
    pub color: [u8; 3],
}

/// Overlay colors and marker sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Annotation bounding boxes
    pub box_color: [u8; 3],
    /// Link from each annotation's centroid to its attributed corner
    pub link_color: [u8; 3],
    pub corner_color: [u8; 3],
    /// Radius of the innermost corner ring (pixels)
    pub corner_radius: i32,
    /// Measured lines that passed their check
    pub pass_color: [u8; 3],
    /// Measured lines that failed their check
    pub fail_color: [u8; 3],
    /// Reference directions the measured lines are compared against
    pub reference_color: [u8; 3],
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            box_color: [255, 0, 255],
            link_color: [0, 160, 255],
            corner_color: [0, 0, 0],
            corner_radius: 6,
            pass_color: [0, 170, 0],
            fail_color: [220, 0, 0],
            reference_color: [255, 160, 0],
        }
    }
}

#[inline]
fn to_f32(p: &Point2D) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

/// Copy of `plan` with annotations, corner labels and extra lines drawn on.
///
/// Corner `cN` is labelled with N concentric rings. Every annotation gets
/// its bounding box, a dot at its centroid and a link to the corner it was
/// attributed to; `lines` are drawn last.
pub fn draw_overlay(
    plan: &RgbImage,
    annotations: &[&Annotation],
    corners: &CornerSet,
    lines: &[OverlayLine],
    style: &OverlayStyle,
) -> RgbImage {
    let mut canvas = plan.clone();
    let corner_color = Rgb(style.corner_color);
    let spacing = style.corner_radius.max(1);

    for (index, point) in corners.points.iter().enumerate() {
        let center = (point.x.round() as i32, point.y.round() as i32);
        for ring in 1..=(index as i32 + 1) {
            draw_hollow_circle_mut(&mut canvas, center, ring * spacing, corner_color);
        }
    }

    for annotation in annotations {
        let bbox = annotation.bbox;
        let rect = Rect::at(bbox.x_min as i32, bbox.y_min as i32).of_size(bbox.width(), bbox.height());
        draw_hollow_rect_mut(&mut canvas, rect, Rgb(style.box_color));

        let corner = corners.get(annotation.corner);
        draw_line_segment_mut(&mut canvas, to_f32(&annotation.centroid), to_f32(&corner), Rgb(style.link_color));
        let c = &annotation.centroid;
        draw_filled_circle_mut(&mut canvas, (c.x.round() as i32, c.y.round() as i32), 2, Rgb(style.link_color));
    }

    for line in lines {
        draw_line_segment_mut(&mut canvas, to_f32(&line.from), to_f32(&line.to), Rgb(line.color));
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Corner, Footprint, PixelBox};
    use sketchmap_geometry::Level;

    fn annotation() -> Annotation {
        Annotation {
            class: "red".to_string(),
            level: Level::Mid,
            centroid: Point2D::new(90.0, 10.0),
            area: 100,
            bbox: PixelBox { x_min: 80, y_min: 10, x_max: 89, y_max: 19 },
            footprint: Footprint::default(),
            corner: Corner::C1,
            corner_distance: 20.0,
        }
    }

    #[test]
    fn test_overlay_marks_box_and_link() {
        let plan = RgbImage::from_pixel(100, 60, Rgb([255, 255, 255]));
        let corners = CornerSet::raster_frame(100, 60);
        let style = OverlayStyle::default();
        let a = annotation();
        let out = draw_overlay(&plan, &[&a], &corners, &[], &style);

        assert_eq!(out.dimensions(), plan.dimensions());
        // Box edges
        assert_eq!(out.get_pixel(80, 15).0, style.box_color);
        assert_eq!(out.get_pixel(85, 19).0, style.box_color);
        // Box interior stays untouched
        assert_eq!(out.get_pixel(84, 15).0, [255, 255, 255]);
        // Link runs diagonally from the centroid up to c1 at (100, 0)
        assert_eq!(out.get_pixel(95, 5).0, style.link_color);
        // Input is left as it was
        assert!(plan.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_corner_rings_count_the_corner_number() {
        let plan = RgbImage::from_pixel(200, 200, Rgb([255, 255, 255]));
        let corners = CornerSet {
            points: [
                Point2D::new(150.0, 50.0),
                Point2D::new(150.0, 150.0),
                Point2D::new(50.0, 150.0),
                Point2D::new(50.0, 50.0),
            ],
        };
        let style = OverlayStyle::default();
        let out = draw_overlay(&plan, &[], &corners, &[], &style);
        let rings = |cx: u32, cy: u32| {
            (1..=5)
                .filter(|k| out.get_pixel(cx + k * 6, cy).0 == style.corner_color)
                .count()
        };
        assert_eq!(rings(150, 50), 1);
        assert_eq!(rings(150, 150), 2);
        assert_eq!(rings(50, 150), 3);
        assert_eq!(rings(50, 50), 4);
    }

    #[test]
    fn test_lines_drawn_in_their_color() {
        let plan = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
        let corners = CornerSet::raster_frame(50, 50);
        let line = OverlayLine {
            from: Point2D::new(10.0, 25.0),
            to: Point2D::new(40.0, 25.0),
            color: [0, 200, 0],
        };
        let out = draw_overlay(&plan, &[], &corners, &[line], &OverlayStyle::default());
        assert_eq!(out.get_pixel(25, 25).0, [0, 200, 0]);
    }
}
