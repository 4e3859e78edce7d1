// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor-to-floor rotation estimation

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::keypoints::{describe_keypoints, detect_keypoints, match_descriptors};
use crate::ransac::{ransac, PointPair, Similarity2};
use crate::types::RotationConfig;

/// Rotation that maps the reference raster onto the moved raster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationEstimate {
    /// Image-space angle in [0, 360), clockwise on screen
    pub angle_deg: f64,
    pub scale: f64,
    pub translation: [f64; 2],
    pub reference_keypoints: usize,
    pub moved_keypoints: usize,
    pub matches: usize,
    pub inliers: usize,
}

/// Estimate the dominant rotation between two rasters.
///
/// Keypoints are matched across the images and a similarity transform is
/// fitted with RANSAC, so wrong matches do not pull the angle. Fails with
/// `InsufficientFeatures` when either image has too few keypoints or too
/// few matches survive, and with `NoConsensus` when no model gathers
/// enough inliers.
pub fn estimate_rotation(
    reference: &GrayImage,
    moved: &GrayImage,
    config: &RotationConfig,
) -> Result<RotationEstimate> {
    let kp_ref = detect_keypoints(reference, &config.keypoints);
    let kp_mov = detect_keypoints(moved, &config.keypoints);
    let found = kp_ref.len().min(kp_mov.len());
    if found < config.min_matches {
        return Err(Error::InsufficientFeatures {
            stage: "keypoints",
            found,
            required: config.min_matches,
        });
    }

    let desc_ref = describe_keypoints(reference, &kp_ref, &config.keypoints);
    let desc_mov = describe_keypoints(moved, &kp_mov, &config.keypoints);
    let matches = match_descriptors(&desc_ref, &desc_mov, config.match_ratio);
    if matches.len() < config.min_matches {
        return Err(Error::InsufficientFeatures {
            stage: "matches",
            found: matches.len(),
            required: config.min_matches,
        });
    }

    let pairs: Vec<PointPair> = matches
        .iter()
        .map(|m| PointPair {
            from: [kp_ref[m.reference].x as f64, kp_ref[m.reference].y as f64],
            to: [kp_mov[m.moved].x as f64, kp_mov[m.moved].y as f64],
        })
        .collect();

    let fit = ransac::<Similarity2>(&pairs, &config.ransac)?;

    let estimate = RotationEstimate {
        angle_deg: fit.model.angle_deg(),
        scale: fit.model.scale(),
        translation: fit.model.t,
        reference_keypoints: kp_ref.len(),
        moved_keypoints: kp_mov.len(),
        matches: matches.len(),
        inliers: fit.inliers.len(),
    };
    tracing::debug!(
        angle = estimate.angle_deg,
        scale = estimate.scale,
        matches = estimate.matches,
        inliers = estimate.inliers,
        "rotation estimated"
    );
    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{imageops, Luma};
    use rand::prelude::*;

    /// Random gray rectangles on a mid-gray canvas
    fn texture(size: u32, seed: u64) -> GrayImage {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut img = GrayImage::from_pixel(size, size, Luma([128]));
        for _ in 0..60 {
            let w = rng.gen_range(6..28);
            let h = rng.gen_range(6..28);
            let x0 = rng.gen_range(0..size - w);
            let y0 = rng.gen_range(0..size - h);
            let value = Luma([rng.gen_range(0..=255u8)]);
            for x in x0..x0 + w {
                for y in y0..y0 + h {
                    img.put_pixel(x, y, value);
                }
            }
        }
        img
    }

    fn circular_gap(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    #[test]
    fn test_identity() {
        let img = texture(200, 11);
        let est = estimate_rotation(&img, &img, &RotationConfig::default()).unwrap();
        assert!(circular_gap(est.angle_deg, 0.0) < 0.5, "angle {}", est.angle_deg);
        assert!((est.scale - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_quarter_turns() {
        let img = texture(200, 21);
        let config = RotationConfig::default();
        for (turned, expected) in [
            (imageops::rotate90(&img), 90.0),
            (imageops::rotate180(&img), 180.0),
            (imageops::rotate270(&img), 270.0),
        ] {
            let est = estimate_rotation(&img, &turned, &config).unwrap();
            assert!(
                circular_gap(est.angle_deg, expected) < 1.0,
                "expected {}, got {}",
                expected,
                est.angle_deg
            );
            assert!(est.inliers >= config.ransac.min_inliers);
        }
    }

    #[test]
    fn test_blank_raster_is_insufficient() {
        let blank = GrayImage::from_pixel(200, 200, Luma([255]));
        let img = texture(200, 3);
        assert!(matches!(
            estimate_rotation(&img, &blank, &RotationConfig::default()),
            Err(Error::InsufficientFeatures { stage: "keypoints", .. })
        ));
    }
}
