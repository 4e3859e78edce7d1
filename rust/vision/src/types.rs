// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for floor plan rasters and annotations

use std::fmt;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use sketchmap_geometry::Level;

use crate::color::{default_classes, ColorClass};
use crate::keypoints::KeypointConfig;
use crate::ransac::RansacConfig;

/// A 2D point in pixel space (simplified for serialization)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_nalgebra(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn from_nalgebra(p: &Point2<f64>) -> Self {
        Self { x: p.x, y: p.y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One of the four canonical building corners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    C1,
    C2,
    C3,
    C4,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::C1, Corner::C2, Corner::C3, Corner::C4];

    /// 0-based position in [`Corner::ALL`]
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Corner::C1 => 0,
            Corner::C2 => 1,
            Corner::C3 => 2,
            Corner::C4 => 3,
        }
    }

    /// 1-based corner number used in variable names
    #[inline]
    pub fn number(self) -> usize {
        self.index() + 1
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.number())
    }
}

/// The four canonical corners in raster pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerSet {
    pub points: [Point2D; 4],
}

impl CornerSet {
    /// Corners of the raster frame: c1 top-right, c2 bottom-right,
    /// c3 bottom-left, c4 top-left
    pub fn raster_frame(width: u32, height: u32) -> Self {
        let w = width as f64;
        let h = height as f64;
        Self {
            points: [
                Point2D::new(w, 0.0),
                Point2D::new(w, h),
                Point2D::new(0.0, h),
                Point2D::new(0.0, 0.0),
            ],
        }
    }

    #[inline]
    pub fn get(&self, corner: Corner) -> Point2D {
        self.points[corner.index()]
    }

    /// Nearest corner by Euclidean distance; ties go to the lowest index
    pub fn nearest(&self, p: &Point2D) -> (Corner, f64) {
        let mut best = (Corner::C1, p.distance_to(&self.points[0]));
        for corner in &Corner::ALL[1..] {
            let d = p.distance_to(&self.points[corner.index()]);
            if d < best.1 {
                best = (*corner, d);
            }
        }
        best
    }
}

impl Default for CornerSet {
    fn default() -> Self {
        let raster = RasterConfig::default();
        Self::raster_frame(raster.width, raster.height)
    }
}

/// Inclusive pixel bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl PixelBox {
    pub fn width(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    pub fn height(&self) -> u32 {
        self.y_max - self.y_min + 1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn intersection_area(&self, other: &PixelBox) -> u64 {
        let x0 = self.x_min.max(other.x_min);
        let y0 = self.y_min.max(other.y_min);
        let x1 = self.x_max.min(other.x_max);
        let y1 = self.y_max.min(other.y_max);
        if x0 > x1 || y0 > y1 {
            return 0;
        }
        (x1 - x0 + 1) as u64 * (y1 - y0 + 1) as u64
    }
}

/// Horizontal pixel run `[x_start, x_end)` on row `y`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub y: u32,
    pub x_start: u32,
    pub x_end: u32,
}

/// Pixel footprint of a component as row-major runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    /// Sorted by `(y, x_start)`, non-overlapping
    pub spans: Vec<Span>,
}

impl Footprint {
    pub fn area(&self) -> u64 {
        self.spans
            .iter()
            .map(|s| (s.x_end - s.x_start) as u64)
            .sum()
    }

    /// Number of pixels present in both footprints
    pub fn intersection_area(&self, other: &Footprint) -> u64 {
        let (a, b) = (&self.spans, &other.spans);
        let (mut i, mut j) = (0, 0);
        let mut total = 0u64;
        while i < a.len() && j < b.len() {
            let (sa, sb) = (&a[i], &b[j]);
            if sa.y != sb.y {
                if sa.y < sb.y {
                    i += 1;
                } else {
                    j += 1;
                }
                continue;
            }
            let start = sa.x_start.max(sb.x_start);
            let end = sa.x_end.min(sb.x_end);
            if end > start {
                total += (end - start) as u64;
            }
            if sa.x_end <= sb.x_end {
                i += 1;
            } else {
                j += 1;
            }
        }
        total
    }
}

/// A detected colored region on one floor raster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    /// Color class name
    pub class: String,
    /// Floor the raster was projected from
    pub level: Level,
    /// Mean pixel position
    pub centroid: Point2D,
    /// Pixel count
    pub area: u64,
    pub bbox: PixelBox,
    pub footprint: Footprint,
    /// Nearest canonical corner
    pub corner: Corner,
    pub corner_distance: f64,
}

/// Raster rendering parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    pub width: u32,
    pub height: u32,
    /// Uniform margin around the fitted footprint (pixels)
    pub padding: u32,
    pub background: [u8; 3],
    /// Used for faces without material or vertex color
    pub default_face_color: [u8; 3],
    /// Stroke polygon outlines so faces seen edge-on stay visible
    pub draw_edges: bool,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            width: 2960,
            height: 1640,
            padding: 40,
            background: [255, 255, 255],
            default_face_color: [40, 40, 40],
            draw_edges: true,
        }
    }
}

/// Annotation extraction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub classes: Vec<ColorClass>,
    /// Components with fewer pixels are noise
    pub min_component_area: u64,
    /// Morphological opening radius applied to each mask (0 = off)
    pub open_radius: u8,
    /// Dilation radius applied after opening (0 = off)
    pub dilate_radius: u8,
}

impl ExtractionConfig {
    pub fn class(&self, name: &str) -> Option<&ColorClass> {
        self.classes.iter().find(|c| c.name == name)
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            classes: default_classes(),
            min_component_area: 300,
            open_radius: 1,
            dilate_radius: 1,
        }
    }
}

/// Rotation estimation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    pub keypoints: KeypointConfig,
    pub ransac: RansacConfig,
    /// Fewer keypoints or matches than this fail with insufficient features
    pub min_matches: usize,
    /// Lowe ratio between best and second-best descriptor distance
    pub match_ratio: f32,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            keypoints: KeypointConfig::default(),
            ransac: RansacConfig::default(),
            min_matches: 8,
            match_ratio: 0.9,
        }
    }
}
