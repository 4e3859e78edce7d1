// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Corner attribution (H/M) scoring

use sketchmap_vision::Annotation;

use crate::context::{select_at, ScoringContext};
use crate::record::{Family, ReasonCode, ScoreRecord};

/// One record per corner variable in the rule book.
///
/// A variable is 1 when a stroke on the rule's floor is attributed to the
/// rule's corner. Variables that belong to other conditions are 0 with
/// `not_applicable`; a missing stroke is 0 with `missing_patch`.
pub fn score_corners(ctx: &ScoringContext<'_>, annotations: &[Annotation]) -> Vec<ScoreRecord> {
    let stroke = ctx.stroke_class();
    let max_distance = ctx.config.corner_max_distance;

    ctx.book
        .corner_variables()
        .into_iter()
        .map(|variable| {
            let Some(rule) = ctx.rules.corners.iter().find(|r| r.variable == variable) else {
                return ctx.zero(Family::Corner, variable, String::new(), ReasonCode::NotApplicable);
            };
            let floors = rule.level.to_string();
            let Some(hit) = select_at(annotations, stroke, rule.level, rule.corner) else {
                return ctx.zero(Family::Corner, variable, floors, ReasonCode::MissingPatch);
            };

            let mut record = ctx.record(Family::Corner, variable, floors);
            record.measured = Some(hit.corner_distance);
            record.tolerance = max_distance;
            let within = max_distance.map_or(true, |d| hit.corner_distance <= d);
            record.outcome = u8::from(within);
            record
        })
        .collect()
}
