// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sketchmap Scoring
//!
//! Turns the annotations and rasters of one session into score records:
//! corner attribution (H/M), vertical overlap, angular deviation and floor
//! rotation. Each family is driven by a [`RuleBook`] entry for the
//! session's experimental condition.

pub mod angle;
pub mod config;
pub mod context;
pub mod corners;
pub mod error;
pub mod overlap;
pub mod record;
pub mod rotation;
pub mod rules;

pub use angle::{
    angle_lines, bearing_deg, circular_difference_deg, line_deviation_deg, score_angles,
    signed_deviation_deg, AngleLine,
};
pub use config::{AngleMode, OverlapMode, ScoringConfig};
pub use context::{select, select_at, ScoringContext};
pub use corners::score_corners;
pub use error::{Error, Result};
pub use overlap::{overlap_fraction, score_overlaps};
pub use record::{Family, ReasonCode, ScoreRecord, ScoreTable, SessionKey};
pub use rotation::{expected_deviation_deg, score_rotation_estimate, score_rotations};
pub use rules::{AngleRule, ClassLookup, ConditionRules, CornerRule, OverlapRule, RotationRule, RuleBook};

use image::GrayImage;
use sketchmap_vision::{Annotation, CornerSet, RotationConfig};

/// Run all four scorers for one session, in corner, overlap, angle,
/// rotation order
pub fn score_session(
    ctx: &ScoringContext<'_>,
    annotations: &[Annotation],
    corners: &CornerSet,
    floors: [&GrayImage; 3],
    rotation: &RotationConfig,
) -> ScoreTable {
    let mut table = ScoreTable::new();
    table.extend(score_corners(ctx, annotations));
    table.extend(score_overlaps(ctx, annotations));
    table.extend(score_angles(ctx, annotations, corners));
    table.extend(score_rotations(ctx, floors, rotation));
    table
}
