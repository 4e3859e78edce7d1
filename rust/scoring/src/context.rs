// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-session scoring context and annotation selection

use sketchmap_geometry::Level;
use sketchmap_vision::{Annotation, Corner};

use crate::config::ScoringConfig;
use crate::error::{Error, Result};
use crate::record::{Family, ReasonCode, ScoreRecord, SessionKey};
use crate::rules::{ClassLookup, ConditionRules, RuleBook};

/// Everything a scorer needs besides the measurements
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub session: &'a SessionKey,
    pub book: &'a RuleBook,
    pub rules: &'a ConditionRules,
    pub config: &'a ScoringConfig,
}

impl<'a> ScoringContext<'a> {
    /// Fails when the book has no rules for the session's condition
    pub fn new(session: &'a SessionKey, book: &'a RuleBook, config: &'a ScoringConfig) -> Result<Self> {
        let rules = book
            .condition(session.condition)
            .ok_or(Error::UnknownCondition(session.condition))?;
        Ok(Self {
            session,
            book,
            rules,
            config,
        })
    }

    pub fn stroke_class(&self) -> &'a str {
        &self.book.stroke_class
    }

    /// Record with the session filled in and no measurement
    pub(crate) fn record(&self, family: Family, metric: &str, floors: String) -> ScoreRecord {
        ScoreRecord {
            participant: self.session.participant.clone(),
            condition: self.session.condition,
            family,
            metric: metric.to_string(),
            floors,
            outcome: 0,
            measured: None,
            deviation: None,
            tolerance: None,
            reason: None,
        }
    }

    pub(crate) fn zero(&self, family: Family, metric: &str, floors: String, reason: ReasonCode) -> ScoreRecord {
        ScoreRecord::zero(self.session, family, metric, floors, reason)
    }
}

/// Largest annotation of `class` on `level` attributed to `corner`.
/// Ties go to the earliest in raster order.
pub fn select_at<'b>(
    annotations: &'b [Annotation],
    class: &str,
    level: Level,
    corner: Corner,
) -> Option<&'b Annotation> {
    let mut best: Option<&Annotation> = None;
    for a in annotations {
        if a.class != class || a.level != level || a.corner != corner {
            continue;
        }
        if best.map_or(true, |b| a.area > b.area) {
            best = Some(a);
        }
    }
    best
}

/// First corner of the lookup that has a match wins
pub fn select<'b>(annotations: &'b [Annotation], lookup: &ClassLookup) -> Option<&'b Annotation> {
    lookup
        .corners
        .iter()
        .find_map(|&corner| select_at(annotations, &lookup.class, lookup.level, corner))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use sketchmap_geometry::Level;
    use sketchmap_vision::{Annotation, Corner, Footprint, PixelBox, Point2D, Span};

    /// Filled square annotation of side `size` with its top-left at `(x, y)`
    pub fn square(class: &str, level: Level, corner: Corner, x: u32, y: u32, size: u32) -> Annotation {
        let spans = (y..y + size)
            .map(|row| Span {
                y: row,
                x_start: x,
                x_end: x + size,
            })
            .collect();
        let half = (size as f64 - 1.0) / 2.0;
        Annotation {
            class: class.to_string(),
            level,
            centroid: Point2D::new(x as f64 + half, y as f64 + half),
            area: size as u64 * size as u64,
            bbox: PixelBox {
                x_min: x,
                y_min: y,
                x_max: x + size - 1,
                y_max: y + size - 1,
            },
            footprint: Footprint { spans },
            corner,
            corner_distance: 0.0,
        }
    }

    /// Point-like annotation at a centroid
    pub fn at(class: &str, level: Level, corner: Corner, x: f64, y: f64) -> Annotation {
        let mut a = square(class, level, corner, x as u32, y as u32, 1);
        a.centroid = Point2D::new(x, y);
        a
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::square;
    use super::*;

    #[test]
    fn test_select_prefers_largest_then_earliest() {
        let annotations = vec![
            square("red", Level::Mid, Corner::C2, 0, 0, 4),
            square("red", Level::Mid, Corner::C2, 10, 10, 6),
            square("red", Level::Mid, Corner::C2, 20, 20, 6),
            square("red", Level::Top, Corner::C2, 30, 30, 9),
        ];
        let chosen = select_at(&annotations, "red", Level::Mid, Corner::C2).unwrap();
        assert_eq!(chosen.bbox.x_min, 10);
        assert!(select_at(&annotations, "red", Level::Mid, Corner::C1).is_none());
    }

    #[test]
    fn test_select_falls_back_in_order() {
        let annotations = vec![
            square("brown", Level::Top, Corner::C3, 0, 0, 4),
            square("brown", Level::Top, Corner::C1, 50, 0, 8),
        ];
        let lookup = ClassLookup::new("brown", Level::Top, &[Corner::C4, Corner::C3, Corner::C1]);
        assert_eq!(select(&annotations, &lookup).unwrap().corner, Corner::C3);
    }

    #[test]
    fn test_unknown_condition() {
        let session = SessionKey::new("p", 9);
        let book = RuleBook::default();
        let config = ScoringConfig::default();
        assert!(matches!(
            ScoringContext::new(&session, &book, &config),
            Err(Error::UnknownCondition(9))
        ));
    }
}
