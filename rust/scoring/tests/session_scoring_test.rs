// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scoring a whole session from hand-built rasters

use approx::assert_abs_diff_eq;
use image::{imageops, GrayImage, Luma, Rgb, RgbImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use rand::prelude::*;
use sketchmap_geometry::{Axis, Bounds3, Level, Point3};
use sketchmap_scoring::{
    circular_difference_deg, score_rotations, score_session, ConditionRules, Family, ReasonCode,
    RotationRule, RuleBook, ScoringConfig, ScoringContext, SessionKey,
};
use sketchmap_vision::{
    estimate_rotation, extract_annotations, CornerSet, ExtractionConfig, FloorPlanRaster,
    PlanTransform, RasterConfig, RotationConfig,
};

const SIZE: u32 = 200;

fn texture(seed: u64) -> GrayImage {
    texture_of_size(SIZE, seed)
}

/// Random gray rectangles on a mid-gray canvas
fn texture_of_size(size: u32, seed: u64) -> GrayImage {
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

fn rotation_book(mid_expected: f64, top_expected: f64) -> RuleBook {
    let rule = |variable: &str, moved: Level, expected: f64| RotationRule {
        variable: variable.to_string(),
        reference: Level::Ground,
        moved,
        expected_deg: vec![expected],
    };
    RuleBook {
        stroke_class: "red".to_string(),
        conditions: vec![ConditionRules {
            condition: 0,
            rotations: vec![rule("MidRotation", Level::Mid, mid_expected), rule("TopRotation", Level::Top, top_expected)],
            ..Default::default()
        }],
    }
}

#[test]
fn quarter_turn_matches_expected_ninety_only() {
    let ground = texture(42);
    let turned = imageops::rotate90(&ground);
    let session = SessionKey::new("synthetic", 0);
    let config = ScoringConfig::default();
    let corners = CornerSet::raster_frame(SIZE, SIZE);

    // Mid expects 90, Top expects 180; both floors are the same quarter turn
    let book = rotation_book(90.0, 180.0);
    let ctx = ScoringContext::new(&session, &book, &config).unwrap();
    let table = score_session(&ctx, &[], &corners, [&ground, &turned, &turned], &RotationConfig::default());

    assert_eq!(table.len(), 2);
    let mid = table.get("MidRotation").unwrap();
    assert_eq!(mid.outcome, 1);
    assert!(mid.deviation.unwrap() < 1.0);
    let top = table.get("TopRotation").unwrap();
    assert_eq!(top.outcome, 0);
    assert!((top.deviation.unwrap() - 90.0).abs() < 1.0);
}

/// `image` turned clockwise on screen by `degrees` about its center
fn turned(image: &GrayImage, degrees: f32) -> GrayImage {
    rotate_about_center(image, degrees.to_radians(), Interpolation::Bilinear, Luma([128]))
}

#[test]
fn arbitrary_angles_are_recovered() {
    let ground = texture_of_size(300, 11);
    let config = RotationConfig::default();
    for degrees in [30.0, 135.0] {
        let estimate = estimate_rotation(&ground, &turned(&ground, degrees), &config).unwrap();
        let error = circular_difference_deg(estimate.angle_deg, degrees as f64);
        assert!(error < 1.0, "turned {degrees}, estimated {}", estimate.angle_deg);
        assert!(estimate.inliers >= config.min_matches);
    }
}

#[test]
fn rotation_tolerance_edge() {
    // Both floors expect a quarter turn; one is off by 24 degrees, the other by 26
    let ground = texture_of_size(300, 11);
    let mid = turned(&ground, 114.0);
    let top = turned(&ground, 116.0);
    let session = SessionKey::new("synthetic", 0);
    let config = ScoringConfig::default();
    let book = rotation_book(90.0, 90.0);
    let ctx = ScoringContext::new(&session, &book, &config).unwrap();

    let records = score_rotations(&ctx, [&ground, &mid, &top], &RotationConfig::default());
    assert_eq!(records.len(), 2);

    let inside = &records[0];
    assert_eq!(inside.metric, "MidRotation");
    assert_abs_diff_eq!(inside.deviation.unwrap(), 24.0, epsilon = 1.0);
    assert_eq!(inside.tolerance, Some(25.0));
    assert_eq!(inside.outcome, 1);

    let outside = &records[1];
    assert_eq!(outside.metric, "TopRotation");
    assert_abs_diff_eq!(outside.deviation.unwrap(), 26.0, epsilon = 1.0);
    assert_eq!(outside.outcome, 0);
    assert!(outside.reason.is_none());
}

/// Floor raster with filled squares painted in the given colors
fn painted(level: Level, squares: &[(u32, u32, [u8; 3])]) -> FloorPlanRaster {
    let raster = RasterConfig {
        width: 400,
        height: 300,
        padding: 0,
        ..Default::default()
    };
    let mut image = RgbImage::from_pixel(raster.width, raster.height, Rgb([255, 255, 255]));
    for &(x0, y0, color) in squares {
        for x in x0..x0 + 30 {
            for y in y0..y0 + 30 {
                image.put_pixel(x, y, Rgb(color));
            }
        }
    }
    let bounds = Bounds3 {
        min: Point3::new(0.0, 0.0, 0.0),
        max: Point3::new(400.0, 300.0, 1.0),
    };
    let transform = PlanTransform::fit_bounds(&bounds, Axis::Z, raster.width, raster.height, 0).unwrap();
    FloorPlanRaster {
        level,
        image,
        transform,
    }
}

#[test]
fn default_rules_on_painted_floors() {
    const RED: [u8; 3] = [230, 20, 20];
    const GREEN: [u8; 3] = [30, 200, 40];

    // Condition 0: H2 ground c1, H3 mid c2, H1H4 green@c2 ground over red@c2 mid,
    // H12 green@c2 toward red@c1 on the ground
    let ground = painted(Level::Ground, &[(360, 5, RED), (360, 250, GREEN)]);
    let mid = painted(Level::Mid, &[(365, 260, RED)]);
    let top = painted(Level::Top, &[]);

    let corners = CornerSet::raster_frame(400, 300);
    let extraction = ExtractionConfig::default();
    let annotations: Vec<_> = [&ground, &mid, &top]
        .iter()
        .flat_map(|r| extract_annotations(r, &extraction, &corners))
        .collect();

    let session = SessionKey::new("painted", 0);
    let book = RuleBook::default();
    let config = ScoringConfig::default();
    let ctx = ScoringContext::new(&session, &book, &config).unwrap();
    let blank = GrayImage::from_pixel(400, 300, Luma([255]));
    let table = score_session(&ctx, &annotations, &corners, [&blank, &blank, &blank], &RotationConfig::default());

    let flags: Vec<(&str, u8)> = table
        .family(Family::Corner)
        .map(|r| (r.metric.as_str(), r.outcome))
        .collect();
    assert_eq!(
        flags,
        vec![("H2", 1), ("H3", 1), ("H4", 0), ("H5", 0), ("M2", 0), ("M3", 0), ("M5", 0), ("M4", 0)]
    );

    assert_eq!(table.get("H1H4").unwrap().outcome, 1);
    assert_eq!(table.get("H3H6").unwrap().reason, Some(ReasonCode::MissingPatch));
    assert_eq!(table.get("H12").unwrap().outcome, 1);
    assert_eq!(table.get("H56").unwrap().reason, Some(ReasonCode::MissingPatch));
    assert!(table
        .family(Family::Rotation)
        .all(|r| r.reason == Some(ReasonCode::InsufficientFeatures)));

    let csv = table.to_csv();
    assert_eq!(csv.lines().count(), table.len() + 1);
    assert!(csv.contains("painted,0,corner,H2,ground,1,"));
}
