// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Keypoints, rotation-invariant descriptors and matching
//!
//! Keypoints are FAST-9 corners thinned by non-maximum suppression. The
//! descriptor samples concentric rings around a keypoint and keeps, per
//! ring, the mean and the magnitudes of the first Fourier harmonics, which
//! do not change when the ring is rotated.

use std::f32::consts::TAU;

use image::GrayImage;
use imageproc::corners::corners_fast9;
use serde::{Deserialize, Serialize};

use crate::image_ops::sample_bilinear;

/// Keypoint detection and description parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeypointConfig {
    /// FAST intensity threshold
    pub fast_threshold: u8,
    /// Strongest keypoints kept after suppression
    pub max_keypoints: usize,
    /// Minimum distance between kept keypoints (pixels)
    pub nms_radius: f32,
    /// Descriptor ring radii (pixels)
    pub ring_radii: Vec<f32>,
    /// Samples per ring
    pub ring_samples: usize,
    /// Fourier harmonics kept per ring
    pub harmonics: usize,
}

impl KeypointConfig {
    /// Keypoints closer than this to the border cannot be described
    pub fn border(&self) -> u32 {
        let r = self.ring_radii.iter().copied().fold(0.0f32, f32::max);
        r.ceil() as u32 + 1
    }
}

impl Default for KeypointConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            max_keypoints: 500,
            nms_radius: 3.0,
            ring_radii: vec![3.0, 6.0, 9.0, 12.0, 15.0],
            ring_samples: 32,
            harmonics: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

/// Descriptor vector, one block of `1 + harmonics` values per ring
pub type Descriptor = Vec<f32>;

/// Index pair into the two keypoint lists
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub reference: usize,
    pub moved: usize,
    pub distance: f32,
}

/// Detect keypoints, strongest first
pub fn detect_keypoints(image: &GrayImage, config: &KeypointConfig) -> Vec<Keypoint> {
    let border = config.border();
    if image.width() <= 2 * border || image.height() <= 2 * border {
        return Vec::new();
    }
    let (max_x, max_y) = (image.width() - border, image.height() - border);

    let mut corners: Vec<_> = corners_fast9(image, config.fast_threshold)
        .into_iter()
        .filter(|c| c.x >= border && c.y >= border && c.x < max_x && c.y < max_y)
        .collect();
    corners.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.y.cmp(&b.y))
            .then(a.x.cmp(&b.x))
    });

    let r2 = config.nms_radius * config.nms_radius;
    let mut kept: Vec<Keypoint> = Vec::new();
    for c in corners {
        if kept.len() >= config.max_keypoints {
            break;
        }
        let (x, y) = (c.x as f32, c.y as f32);
        let crowded = kept.iter().any(|k| {
            let dx = k.x - x;
            let dy = k.y - y;
            dx * dx + dy * dy < r2
        });
        if !crowded {
            kept.push(Keypoint {
                x,
                y,
                score: c.score,
            });
        }
    }
    kept
}

/// Describe one keypoint
pub fn describe(image: &GrayImage, keypoint: &Keypoint, config: &KeypointConfig) -> Descriptor {
    let n = config.ring_samples.max(4);
    let mut descriptor = Vec::with_capacity(config.ring_radii.len() * (1 + config.harmonics));
    let mut ring = vec![0.0f32; n];

    for &radius in &config.ring_radii {
        for (k, value) in ring.iter_mut().enumerate() {
            let theta = TAU * k as f32 / n as f32;
            *value = sample_bilinear(
                image,
                keypoint.x + radius * theta.cos(),
                keypoint.y + radius * theta.sin(),
            ) / 255.0;
        }

        let mean = ring.iter().sum::<f32>() / n as f32;
        descriptor.push(mean);
        for h in 1..=config.harmonics {
            let (mut re, mut im) = (0.0f32, 0.0f32);
            for (k, value) in ring.iter().enumerate() {
                let phase = TAU * (h * k) as f32 / n as f32;
                re += value * phase.cos();
                im -= value * phase.sin();
            }
            descriptor.push((re * re + im * im).sqrt() / n as f32);
        }
    }
    descriptor
}

/// Describe every keypoint
pub fn describe_keypoints(
    image: &GrayImage,
    keypoints: &[Keypoint],
    config: &KeypointConfig,
) -> Vec<Descriptor> {
    keypoints
        .iter()
        .map(|k| describe(image, k, config))
        .collect()
}

#[inline]
fn distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Nearest neighbour of `query` in `pool`: (index, best, second best)
fn nearest(query: &[f32], pool: &[Descriptor]) -> Option<(usize, f32, f32)> {
    let mut best: Option<(usize, f32)> = None;
    let mut second = f32::INFINITY;
    for (i, candidate) in pool.iter().enumerate() {
        let d = distance(query, candidate);
        match best {
            Some((_, bd)) if d >= bd => second = second.min(d),
            Some((_, bd)) => {
                second = bd;
                best = Some((i, d));
            }
            None => best = Some((i, d)),
        }
    }
    best.map(|(i, d)| (i, d, second))
}

/// Mutual nearest neighbours passing the ratio test
pub fn match_descriptors(reference: &[Descriptor], moved: &[Descriptor], ratio: f32) -> Vec<Match> {
    let mut matches = Vec::new();
    for (r, query) in reference.iter().enumerate() {
        let Some((m, d, second)) = nearest(query, moved) else {
            continue;
        };
        if second.is_finite() && d > ratio * second {
            continue;
        }
        let mutual = nearest(&moved[m], reference).is_some_and(|(back, _, _)| back == r);
        if mutual {
            matches.push(Match {
                reference: r,
                moved: m,
                distance: d,
            });
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{imageops, Luma};

    fn block_image() -> GrayImage {
        let mut img = GrayImage::from_pixel(64, 64, Luma([200]));
        for x in 24..40 {
            for y in 24..40 {
                img.put_pixel(x, y, Luma([30]));
            }
        }
        img
    }

    #[test]
    fn test_detects_block_corners() {
        let keypoints = detect_keypoints(&block_image(), &KeypointConfig::default());
        assert!(!keypoints.is_empty());
        // Every keypoint sits near one of the four block corners
        for k in &keypoints {
            let near = [(24.0, 24.0), (39.0, 24.0), (24.0, 39.0), (39.0, 39.0)]
                .iter()
                .any(|(cx, cy): &(f32, f32)| (k.x - cx).abs() <= 3.0 && (k.y - cy).abs() <= 3.0);
            assert!(near, "unexpected keypoint at {:?}", k);
        }
    }

    #[test]
    fn test_flat_image_has_no_keypoints() {
        let img = GrayImage::from_pixel(64, 64, Luma([128]));
        assert!(detect_keypoints(&img, &KeypointConfig::default()).is_empty());
    }

    #[test]
    fn test_descriptor_invariant_to_quarter_turn() {
        let config = KeypointConfig::default();
        let img = block_image();
        let turned = imageops::rotate90(&img);
        // (x, y) -> (h - 1 - y, x)
        let k = Keypoint { x: 24.0, y: 39.0, score: 0.0 };
        let k_turned = Keypoint { x: 63.0 - 39.0, y: 24.0, score: 0.0 };
        let a = describe(&img, &k, &config);
        let b = describe(&turned, &k_turned, &config);
        assert_eq!(a.len(), 5 * 4);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-4);
        }
    }

    #[test]
    fn test_mutual_matching() {
        let reference = vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![5.0, 5.0]];
        let moved = vec![vec![1.1, 1.0], vec![0.1, 0.0]];
        let matches = match_descriptors(&reference, &moved, 1.0);
        assert_eq!(matches.len(), 2);
        assert_eq!((matches[0].reference, matches[0].moved), (0, 1));
        assert_eq!((matches[1].reference, matches[1].moved), (1, 0));
    }
}
