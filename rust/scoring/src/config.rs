// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

/// How bearings are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleMode {
    /// Bearings in [0, 360), difference wrapped to [0, 180]
    #[default]
    Directed,
    /// Line angles modulo 180, difference wrapped to [0, 90]
    Undirected,
}

/// Which footprint the overlap test intersects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapMode {
    /// Pixel masks
    #[default]
    Mask,
    /// Axis-aligned bounding boxes
    BoundingBox,
}

/// Tolerances and modes shared by the scorers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub angle_tolerance_deg: f64,
    pub angle_mode: AngleMode,
    pub overlap_mode: OverlapMode,
    /// Intersection over the smaller footprint required for an overlap hit
    pub min_overlap_fraction: f64,
    pub rotation_tolerance_deg: f64,
    /// Strokes farther than this from their corner (pixels) do not count
    pub corner_max_distance: Option<f64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            angle_tolerance_deg: 20.0,
            angle_mode: AngleMode::Directed,
            overlap_mode: OverlapMode::Mask,
            min_overlap_fraction: 0.0,
            rotation_tolerance_deg: 25.0,
            corner_max_distance: None,
        }
    }
}
