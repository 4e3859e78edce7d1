// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color classes and per-pixel membership masks
//!
//! HSV values follow the 8-bit OpenCV convention: hue in [0, 180],
//! saturation and value in [0, 255].

use image::{GrayImage, Luma, RgbImage};
use serde::{Deserialize, Serialize};

/// Color space a range is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    #[default]
    Hsv,
    Rgb,
}

/// Inclusive per-channel range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ColorRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn contains(&self, value: [u8; 3]) -> bool {
        (0..3).all(|c| self.lower[c] <= value[c] && value[c] <= self.upper[c])
    }
}

/// A named color class; a pixel belongs to it if any range matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorClass {
    pub name: String,
    #[serde(default)]
    pub space: ColorSpace,
    pub ranges: Vec<ColorRange>,
}

impl ColorClass {
    pub fn hsv(name: &str, ranges: &[ColorRange]) -> Self {
        Self {
            name: name.to_string(),
            space: ColorSpace::Hsv,
            ranges: ranges.to_vec(),
        }
    }

    pub fn rgb(name: &str, ranges: &[ColorRange]) -> Self {
        Self {
            name: name.to_string(),
            space: ColorSpace::Rgb,
            ranges: ranges.to_vec(),
        }
    }

    /// Membership test for one RGB pixel
    #[inline]
    pub fn contains_rgb(&self, rgb: [u8; 3]) -> bool {
        let value = match self.space {
            ColorSpace::Hsv => rgb_to_hsv(rgb),
            ColorSpace::Rgb => rgb,
        };
        self.ranges.iter().any(|r| r.contains(value))
    }

    /// Binary mask: 255 where the pixel belongs to the class, 0 elsewhere
    pub fn mask(&self, image: &RgbImage) -> GrayImage {
        let mut mask = GrayImage::new(image.width(), image.height());
        for (x, y, pixel) in image.enumerate_pixels() {
            if self.contains_rgb(pixel.0) {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        mask
    }
}

/// 8-bit RGB to OpenCV-style HSV
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let r = rgb[0] as f32;
    let g = rgb[1] as f32;
    let b = rgb[2] as f32;
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };
    let h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [
        (h / 2.0).round().min(180.0) as u8,
        s.round() as u8,
        v as u8,
    ]
}

/// Class of the reference crosses and of the patch ends in overlap and
/// angle rules
pub const CROSS_CLASS: &str = "red";

/// Class of the corner strokes. Wider than [`CROSS_CLASS`] at low
/// saturation and value, so dark or faint scribbles still count.
pub const STROKE_CLASS: &str = "stroke";

/// The experiment's palette
pub fn default_classes() -> Vec<ColorClass> {
    vec![
        ColorClass::hsv(
            "red",
            &[
                ColorRange::new([0, 50, 50], [25, 255, 255]),
                ColorRange::new([155, 50, 50], [180, 255, 255]),
            ],
        ),
        ColorClass::hsv("green", &[ColorRange::new([35, 50, 50], [85, 255, 255])]),
        ColorClass::hsv("brown", &[ColorRange::new([5, 50, 50], [30, 200, 200])]),
        ColorClass::hsv("blue", &[ColorRange::new([90, 50, 50], [130, 255, 255])]),
        ColorClass::hsv("grey", &[ColorRange::new([0, 0, 50], [180, 40, 180])]),
        ColorClass::hsv(
            STROKE_CLASS,
            &[
                ColorRange::new([0, 30, 30], [20, 255, 255]),
                ColorRange::new([160, 30, 30], [180, 255, 255]),
            ],
        ),
    ]
}
