// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vertical overlap scoring
//!
//! Footprints from different floors are comparable only because every floor
//! of a session is rendered under the same plan transform.

use sketchmap_vision::Annotation;

use crate::config::OverlapMode;
use crate::context::{select, ScoringContext};
use crate::record::{Family, ReasonCode, ScoreRecord};

/// Intersection and the two footprint areas, in pixels
pub fn footprint_overlap(a: &Annotation, b: &Annotation, mode: OverlapMode) -> (u64, u64, u64) {
    match mode {
        OverlapMode::Mask => (
            a.footprint.intersection_area(&b.footprint),
            a.footprint.area(),
            b.footprint.area(),
        ),
        OverlapMode::BoundingBox => (a.bbox.intersection_area(&b.bbox), a.bbox.area(), b.bbox.area()),
    }
}

/// Intersection over the smaller footprint, in [0, 1]
pub fn overlap_fraction(a: &Annotation, b: &Annotation, mode: OverlapMode) -> f64 {
    let (inter, area_a, area_b) = footprint_overlap(a, b, mode);
    let smaller = area_a.min(area_b);
    if smaller == 0 {
        return 0.0;
    }
    inter as f64 / smaller as f64
}

/// One record per overlap rule of the session's condition
pub fn score_overlaps(ctx: &ScoringContext<'_>, annotations: &[Annotation]) -> Vec<ScoreRecord> {
    let mode = ctx.config.overlap_mode;
    let threshold = ctx.config.min_overlap_fraction;

    ctx.rules
        .overlaps
        .iter()
        .map(|rule| {
            let floors = format!("{}/{}", rule.patch.level, rule.reference.level);
            let Some(patch) = select(annotations, &rule.patch) else {
                return ctx.zero(Family::Overlap, &rule.variable, floors, ReasonCode::MissingPatch);
            };
            let Some(reference) = select(annotations, &rule.reference) else {
                return ctx.zero(Family::Overlap, &rule.variable, floors, ReasonCode::MissingReference);
            };

            let (inter, _, _) = footprint_overlap(patch, reference, mode);
            let fraction = overlap_fraction(patch, reference, mode);
            let mut record = ctx.record(Family::Overlap, &rule.variable, floors);
            record.measured = Some(fraction);
            record.tolerance = Some(threshold);
            record.outcome = u8::from(inter > 0 && fraction >= threshold);
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::context::fixtures::square;
    use crate::record::SessionKey;
    use crate::rules::RuleBook;
    use approx::assert_relative_eq;
    use sketchmap_geometry::Level;
    use sketchmap_vision::{Corner, Footprint, Span};

    fn records(config: &ScoringConfig, annotations: &[Annotation]) -> Vec<ScoreRecord> {
        let session = SessionKey::new("p", 0);
        let book = RuleBook::default();
        let ctx = ScoringContext::new(&session, &book, config).unwrap();
        score_overlaps(&ctx, annotations)
    }

    #[test]
    fn test_patch_over_cross() {
        let annotations = vec![
            square("green", Level::Ground, Corner::C2, 100, 100, 20),
            square("red", Level::Mid, Corner::C2, 110, 110, 20),
        ];
        let out = records(&ScoringConfig::default(), &annotations);
        assert_eq!(out[0].metric, "H1H4");
        assert_eq!(out[0].outcome, 1);
        assert_eq!(out[0].floors, "ground/mid");
        assert_relative_eq!(out[0].measured.unwrap(), 0.25);

        assert_eq!(out[1].metric, "H3H6");
        assert_eq!(out[1].reason, Some(ReasonCode::MissingPatch));
    }

    #[test]
    fn test_disjoint_footprints() {
        let annotations = vec![
            square("green", Level::Ground, Corner::C2, 100, 100, 20),
            square("red", Level::Mid, Corner::C2, 200, 200, 20),
        ];
        let out = records(&ScoringConfig::default(), &annotations);
        assert_eq!(out[0].outcome, 0);
        assert_eq!(out[0].measured, Some(0.0));
        assert_eq!(out[0].reason, None);
    }

    #[test]
    fn test_missing_reference() {
        let annotations = vec![square("brown", Level::Top, Corner::C3, 0, 0, 20)];
        let out = records(&ScoringConfig::default(), &annotations);
        assert_eq!(out[1].reason, Some(ReasonCode::MissingReference));
    }

    #[test]
    fn test_threshold() {
        let annotations = vec![
            square("green", Level::Ground, Corner::C2, 100, 100, 20),
            square("red", Level::Mid, Corner::C2, 110, 110, 20),
        ];
        let config = ScoringConfig {
            min_overlap_fraction: 0.5,
            ..Default::default()
        };
        assert_eq!(records(&config, &annotations)[0].outcome, 0);
    }

    #[test]
    fn test_bbox_mode_sees_through_holes() {
        // Ring-shaped patch with an empty middle, cross inside the hole
        let mut ring = square("green", Level::Ground, Corner::C2, 0, 0, 30);
        ring.footprint = Footprint {
            spans: (0..30)
                .flat_map(|y| {
                    if (5..25).contains(&y) {
                        vec![
                            Span { y, x_start: 0, x_end: 5 },
                            Span { y, x_start: 25, x_end: 30 },
                        ]
                    } else {
                        vec![Span { y, x_start: 0, x_end: 30 }]
                    }
                })
                .collect(),
        };
        let cross = square("red", Level::Mid, Corner::C2, 10, 10, 10);

        assert_eq!(overlap_fraction(&ring, &cross, OverlapMode::Mask), 0.0);
        assert_relative_eq!(overlap_fraction(&ring, &cross, OverlapMode::BoundingBox), 1.0);
    }
}
