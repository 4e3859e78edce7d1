// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Angular deviation scoring and angle helpers

use sketchmap_geometry::Level;
use sketchmap_vision::{Annotation, CornerSet, Point2D};

use crate::config::AngleMode;
use crate::context::{select, ScoringContext};
use crate::record::{Family, ReasonCode, ScoreRecord};
use crate::rules::AngleRule;

/// Bearing of the line `from -> to` in pixel space, in [0, 360)
pub fn bearing_deg(from: &Point2D, to: &Point2D) -> f64 {
    let deg = (to.y - from.y).atan2(to.x - from.x).to_degrees().rem_euclid(360.0);
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}

/// `measured - reference` wrapped to (-180, 180]
pub fn signed_deviation_deg(measured: f64, reference: f64) -> f64 {
    let d = (measured - reference).rem_euclid(360.0);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Absolute circular difference in [0, 180]
pub fn circular_difference_deg(a: f64, b: f64) -> f64 {
    signed_deviation_deg(a, b).abs()
}

/// Signed difference between two undirected lines, in (-90, 90]
pub fn line_deviation_deg(measured: f64, reference: f64) -> f64 {
    let d = (measured - reference).rem_euclid(180.0);
    if d > 90.0 {
        d - 180.0
    } else {
        d
    }
}

/// Deviation of the drawn bearing from the reference under `mode`
pub fn deviation_deg(measured: f64, reference: f64, mode: AngleMode) -> f64 {
    match mode {
        AngleMode::Directed => signed_deviation_deg(measured, reference),
        AngleMode::Undirected => line_deviation_deg(measured, reference),
    }
}

/// Reference corner line for a rule, flipped when the annotations were
/// found at fallback corners on the opposite ends
fn reference_line(rule: &AngleRule, patch: &Annotation, cross: &Annotation, corners: &CornerSet) -> (Point2D, Point2D) {
    let [near, far] = rule.reference;
    if patch.corner == far || cross.corner == near {
        (corners.get(far), corners.get(near))
    } else {
        (corners.get(near), corners.get(far))
    }
}

/// The line a participant drew for one angle rule and the corner line it
/// is measured against
#[derive(Debug, Clone, PartialEq)]
pub struct AngleLine {
    pub variable: String,
    pub level: Level,
    /// Patch centroid to cross centroid
    pub drawn: (Point2D, Point2D),
    /// Reference corner line, near to far
    pub reference: (Point2D, Point2D),
}

fn resolve(
    rule: &AngleRule,
    annotations: &[Annotation],
    corners: &CornerSet,
) -> std::result::Result<AngleLine, ReasonCode> {
    let patch = select(annotations, &rule.patch).ok_or(ReasonCode::MissingPatch)?;
    let cross = select(annotations, &rule.cross).ok_or(ReasonCode::MissingReference)?;
    Ok(AngleLine {
        variable: rule.variable.clone(),
        level: rule.patch.level,
        drawn: (patch.centroid, cross.centroid),
        reference: reference_line(rule, patch, cross, corners),
    })
}

/// Lines of every angle rule whose patch and cross were both found
pub fn angle_lines(ctx: &ScoringContext<'_>, annotations: &[Annotation], corners: &CornerSet) -> Vec<AngleLine> {
    ctx.rules
        .angles
        .iter()
        .filter_map(|rule| resolve(rule, annotations, corners).ok())
        .collect()
}

/// One record per angle rule of the session's condition.
///
/// `measured` holds the drawn bearing and `deviation` the signed deviation
/// from the reference line.
pub fn score_angles(
    ctx: &ScoringContext<'_>,
    annotations: &[Annotation],
    corners: &CornerSet,
) -> Vec<ScoreRecord> {
    let tolerance = ctx.config.angle_tolerance_deg;
    let mode = ctx.config.angle_mode;

    ctx.rules
        .angles
        .iter()
        .map(|rule| {
            let floors = rule.patch.level.to_string();
            let line = match resolve(rule, annotations, corners) {
                Ok(line) => line,
                Err(reason) => return ctx.zero(Family::Angle, &rule.variable, floors, reason),
            };

            let drawn = bearing_deg(&line.drawn.0, &line.drawn.1);
            let reference = bearing_deg(&line.reference.0, &line.reference.1);
            let deviation = deviation_deg(drawn, reference, mode);

            let mut record = ctx.record(Family::Angle, &rule.variable, floors);
            record.measured = Some(drawn);
            record.deviation = Some(deviation);
            record.tolerance = Some(tolerance);
            record.outcome = u8::from(deviation.abs() <= tolerance);
            record
        })
        .collect()
}
