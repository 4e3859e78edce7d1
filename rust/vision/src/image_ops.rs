// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Image processing operations for plan rasters

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;

/// Morphological dilation with a square kernel - expands white regions
pub fn dilate(image: &GrayImage, radius: u8) -> GrayImage {
    imageproc::morphology::dilate(image, Norm::LInf, radius)
}

/// Morphological erosion with a square kernel - shrinks white regions
pub fn erode(image: &GrayImage, radius: u8) -> GrayImage {
    imageproc::morphology::erode(image, Norm::LInf, radius)
}

/// Morphological opening (erode then dilate) - removes small noise
pub fn morphological_open(image: &GrayImage, radius: u8) -> GrayImage {
    let eroded = erode(image, radius);
    dilate(&eroded, radius)
}

/// Opening followed by dilation, each skipped when its radius is 0
pub fn clean_mask(mask: &GrayImage, open_radius: u8, dilate_radius: u8) -> GrayImage {
    let opened = if open_radius > 0 {
        morphological_open(mask, open_radius)
    } else {
        mask.clone()
    };
    if dilate_radius > 0 {
        dilate(&opened, dilate_radius)
    } else {
        opened
    }
}

/// Convert an RGB raster to grayscale
pub fn rgb_to_grayscale(image: &RgbImage) -> GrayImage {
    let mut gray = GrayImage::new(image.width(), image.height());

    for (x, y, pixel) in image.enumerate_pixels() {
        let r = pixel.0[0] as f32;
        let g = pixel.0[1] as f32;
        let b = pixel.0[2] as f32;
        // Standard luminance formula (ITU-R BT.601)
        let luma = (0.299 * r + 0.587 * g + 0.114 * b).round().min(255.0) as u8;
        gray.put_pixel(x, y, Luma([luma]));
    }

    gray
}

/// Bilinear sample with edge clamping
#[inline]
pub fn sample_bilinear(image: &GrayImage, x: f32, y: f32) -> f32 {
    let max_x = (image.width() - 1) as f32;
    let max_y = (image.height() - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let x1 = (x0 + 1.0).min(max_x);
    let y1 = (y0 + 1.0).min(max_y);

    let p = |px: f32, py: f32| image.get_pixel(px as u32, py as u32).0[0] as f32;
    let top = p(x0, y0) * (1.0 - fx) + p(x1, y0) * fx;
    let bottom = p(x0, y1) * (1.0 - fx) + p(x1, y1) * fx;
    top * (1.0 - fy) + bottom * fy
}
