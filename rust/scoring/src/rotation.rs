// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor rotation scoring

use image::GrayImage;
use sketchmap_vision::{estimate_rotation, Error as VisionError, RotationConfig, RotationEstimate};

use crate::angle::circular_difference_deg;
use crate::context::ScoringContext;
use crate::record::{Family, ReasonCode, ScoreRecord};
use crate::rules::RotationRule;

/// Smallest circular difference between `angle` and any expected angle
pub fn expected_deviation_deg(angle: f64, expected: &[f64]) -> Option<f64> {
    expected
        .iter()
        .map(|&e| circular_difference_deg(angle, e))
        .min_by(f64::total_cmp)
}

fn failure_reason(err: &VisionError) -> ReasonCode {
    match err {
        VisionError::InsufficientFeatures { .. } => ReasonCode::InsufficientFeatures,
        VisionError::NoConsensus { .. } => ReasonCode::NoConsensus,
        _ => ReasonCode::InvalidRaster,
    }
}

/// Score one rule from an estimate, or from the soft failure that replaced it
pub fn score_rotation_estimate(
    ctx: &ScoringContext<'_>,
    rule: &RotationRule,
    estimate: Result<&RotationEstimate, &VisionError>,
) -> ScoreRecord {
    let tolerance = ctx.config.rotation_tolerance_deg;
    let estimate = match estimate {
        Ok(estimate) => estimate,
        Err(err) => {
            tracing::warn!(
                session = %ctx.session,
                metric = %rule.variable,
                error = %err,
                "rotation estimation failed, scoring 0"
            );
            let mut record = ctx.zero(Family::Rotation, &rule.variable, rule.floors(), failure_reason(err));
            record.tolerance = Some(tolerance);
            return record;
        }
    };

    let Some(deviation) = expected_deviation_deg(estimate.angle_deg, &rule.expected_deg) else {
        return ctx.zero(Family::Rotation, &rule.variable, rule.floors(), ReasonCode::NotApplicable);
    };

    let mut record = ctx.record(Family::Rotation, &rule.variable, rule.floors());
    record.measured = Some(estimate.angle_deg);
    record.deviation = Some(deviation);
    record.tolerance = Some(tolerance);
    record.outcome = u8::from(deviation <= tolerance);
    record
}

/// One record per rotation rule; `floors` are the grayscale rasters in
/// Ground, Mid, Top order
pub fn score_rotations(
    ctx: &ScoringContext<'_>,
    floors: [&GrayImage; 3],
    config: &RotationConfig,
) -> Vec<ScoreRecord> {
    ctx.rules
        .rotations
        .iter()
        .map(|rule| {
            let estimate = estimate_rotation(floors[rule.reference.index()], floors[rule.moved.index()], config);
            score_rotation_estimate(ctx, rule, estimate.as_ref())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::record::SessionKey;
    use crate::rules::RuleBook;
    use approx::assert_relative_eq;
    use image::Luma;

    fn estimate(angle_deg: f64) -> RotationEstimate {
        RotationEstimate {
            angle_deg,
            scale: 1.0,
            translation: [0.0, 0.0],
            reference_keypoints: 40,
            moved_keypoints: 40,
            matches: 30,
            inliers: 28,
        }
    }

    #[test]
    fn test_expected_alternatives() {
        assert_relative_eq!(expected_deviation_deg(265.0, &[90.0, 270.0]).unwrap(), 5.0);
        assert_relative_eq!(expected_deviation_deg(350.0, &[180.0]).unwrap(), 170.0);
        assert!(expected_deviation_deg(10.0, &[]).is_none());
    }

    #[test]
    fn test_tolerance_boundary() {
        let session = SessionKey::new("p", 0);
        let book = RuleBook::default();
        let config = ScoringConfig::default();
        let ctx = ScoringContext::new(&session, &book, &config).unwrap();
        let mid = &ctx.rules.rotations[0];
        let top = &ctx.rules.rotations[1];

        assert_eq!(score_rotation_estimate(&ctx, mid, Ok(&estimate(115.0))).outcome, 1);
        assert_eq!(score_rotation_estimate(&ctx, mid, Ok(&estimate(116.0))).outcome, 0);
        assert_eq!(score_rotation_estimate(&ctx, mid, Ok(&estimate(250.0))).outcome, 1);

        let record = score_rotation_estimate(&ctx, top, Ok(&estimate(90.0)));
        assert_eq!(record.outcome, 0);
        assert_eq!(record.floors, "ground/top");
        assert_relative_eq!(record.deviation.unwrap(), 90.0);
        assert_relative_eq!(record.measured.unwrap(), 90.0);
    }

    #[test]
    fn test_soft_failures_become_reason_codes() {
        let session = SessionKey::new("p", 3);
        let book = RuleBook::default();
        let config = ScoringConfig::default();
        let ctx = ScoringContext::new(&session, &book, &config).unwrap();
        let rule = &ctx.rules.rotations[0];

        let err = VisionError::InsufficientFeatures {
            stage: "keypoints",
            found: 2,
            required: 8,
        };
        let record = score_rotation_estimate(&ctx, rule, Err(&err));
        assert_eq!(record.outcome, 0);
        assert_eq!(record.reason, Some(ReasonCode::InsufficientFeatures));

        let err = VisionError::NoConsensus { inliers: 3, required: 6 };
        let record = score_rotation_estimate(&ctx, rule, Err(&err));
        assert_eq!(record.reason, Some(ReasonCode::NoConsensus));
    }

    #[test]
    fn test_blank_floors_do_not_fail_the_session() {
        let session = SessionKey::new("p", 0);
        let book = RuleBook::default();
        let config = ScoringConfig::default();
        let ctx = ScoringContext::new(&session, &book, &config).unwrap();

        let blank = GrayImage::from_pixel(120, 120, Luma([255]));
        let records = score_rotations(&ctx, [&blank, &blank, &blank], &RotationConfig::default());
        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|r| r.reason == Some(ReasonCode::InsufficientFeatures)));
    }
}
