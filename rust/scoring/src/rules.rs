// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rule tables mapping corners and colors to score variables
//!
//! Which floor, color and corner feed which `H`/`M` variable is not derived
//! from variable names. Each experimental condition carries an explicit
//! [`ConditionRules`] entry, and [`RuleBook::default`] reproduces the four
//! counterbalanced sets of the recall experiment.

use serde::{Deserialize, Serialize};
use sketchmap_geometry::Level;
use sketchmap_vision::{Corner, CROSS_CLASS, STROKE_CLASS};

/// Where to look for an annotation: class on a floor, at one of several
/// corners tried in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassLookup {
    pub class: String,
    pub level: Level,
    pub corners: Vec<Corner>,
}

impl ClassLookup {
    pub fn new(class: &str, level: Level, corners: &[Corner]) -> Self {
        Self {
            class: class.to_string(),
            level,
            corners: corners.to_vec(),
        }
    }
}

/// Stroke on `level` attributed to `corner` sets `variable`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CornerRule {
    pub variable: String,
    pub level: Level,
    pub corner: Corner,
}

/// Patch footprint must intersect the reference footprint on another floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapRule {
    pub variable: String,
    pub patch: ClassLookup,
    pub reference: ClassLookup,
}

/// Bearing from patch to cross compared with the corner-to-corner line.
/// `reference[0]` is the corner on the patch side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleRule {
    pub variable: String,
    pub patch: ClassLookup,
    pub cross: ClassLookup,
    pub reference: [Corner; 2],
}

/// Rotation of `moved` relative to `reference`, accepted near any of
/// `expected_deg`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationRule {
    pub variable: String,
    pub reference: Level,
    pub moved: Level,
    pub expected_deg: Vec<f64>,
}

impl RotationRule {
    pub fn floors(&self) -> String {
        format!("{}/{}", self.reference, self.moved)
    }
}

/// All rules for one experimental condition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionRules {
    pub condition: u32,
    pub corners: Vec<CornerRule>,
    pub overlaps: Vec<OverlapRule>,
    pub angles: Vec<AngleRule>,
    pub rotations: Vec<RotationRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleBook {
    /// Color class of corner strokes
    pub stroke_class: String,
    pub conditions: Vec<ConditionRules>,
}

impl RuleBook {
    pub fn condition(&self, condition: u32) -> Option<&ConditionRules> {
        self.conditions.iter().find(|c| c.condition == condition)
    }

    /// Corner variables over all conditions, in first-appearance order
    pub fn corner_variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for rule in self.conditions.iter().flat_map(|c| &c.corners) {
            push_unique(&mut names, &rule.variable);
        }
        names
    }

    /// Every color class a rule refers to, including the stroke class
    pub fn referenced_classes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = vec![self.stroke_class.as_str()];
        for c in &self.conditions {
            for rule in &c.overlaps {
                push_unique(&mut names, &rule.patch.class);
                push_unique(&mut names, &rule.reference.class);
            }
            for rule in &c.angles {
                push_unique(&mut names, &rule.patch.class);
                push_unique(&mut names, &rule.cross.class);
            }
        }
        names
    }
}

fn push_unique<'a>(names: &mut Vec<&'a str>, name: &'a str) {
    if !names.contains(&name) {
        names.push(name);
    }
}

fn lookup(class: &str, level: Level, corners: &[Corner]) -> ClassLookup {
    ClassLookup::new(class, level, corners)
}

fn corner(variable: &str, level: Level, corner: Corner) -> CornerRule {
    CornerRule {
        variable: variable.to_string(),
        level,
        corner,
    }
}

fn overlap(variable: &str, patch: ClassLookup, reference: ClassLookup) -> OverlapRule {
    OverlapRule {
        variable: variable.to_string(),
        patch,
        reference,
    }
}

fn angle(variable: &str, patch: ClassLookup, cross: ClassLookup, reference: [Corner; 2]) -> AngleRule {
    AngleRule {
        variable: variable.to_string(),
        patch,
        cross,
        reference,
    }
}

fn default_rotations() -> Vec<RotationRule> {
    vec![
        RotationRule {
            variable: "MidRotation".to_string(),
            reference: Level::Ground,
            moved: Level::Mid,
            expected_deg: vec![90.0, 270.0],
        },
        RotationRule {
            variable: "TopRotation".to_string(),
            reference: Level::Ground,
            moved: Level::Top,
            expected_deg: vec![180.0],
        },
    ]
}

/// Conditions 0 and 1 score `H` variables, 2 and 3 score `M` variables
fn default_condition(condition: u32) -> ConditionRules {
    use Corner::*;
    use Level::*;
    let red = CROSS_CLASS;

    match condition {
        0 | 1 => {
            let (mid_second, top, h36) = if condition == 0 { (C3, C4, C3) } else { (C4, C3, C4) };
            ConditionRules {
                condition,
                corners: vec![
                    corner("H2", Ground, C1),
                    corner("H3", Mid, C2),
                    corner("H4", Mid, mid_second),
                    corner("H5", Top, top),
                ],
                overlaps: vec![
                    overlap("H1H4", lookup("green", Ground, &[C2]), lookup(red, Mid, &[C2])),
                    overlap("H3H6", lookup("brown", Top, &[h36]), lookup(red, Mid, &[h36])),
                ],
                angles: vec![
                    angle("H12", lookup("green", Ground, &[C2]), lookup(red, Ground, &[C1]), [C2, C1]),
                    angle("H56", lookup("brown", Top, &[C4, C3]), lookup(red, Top, &[C3, C4]), [C4, C3]),
                ],
                rotations: default_rotations(),
            }
        }
        _ => {
            let (mid_second, top, m46) = if condition == 2 { (C1, C2, C1) } else { (C2, C1, C2) };
            ConditionRules {
                condition,
                corners: vec![
                    corner("M2", Ground, C3),
                    corner("M3", Mid, C4),
                    corner("M5", Mid, mid_second),
                    corner("M4", Top, top),
                ],
                overlaps: vec![
                    overlap("M1M3", lookup("blue", Ground, &[C4]), lookup(red, Mid, &[C4])),
                    overlap("M4M6", lookup("grey", Top, &[m46]), lookup(red, Mid, &[m46])),
                ],
                angles: vec![
                    angle("M12", lookup("blue", Ground, &[C4]), lookup(red, Ground, &[C3]), [C4, C3]),
                    angle("M56", lookup("grey", Top, &[C1, C2]), lookup(red, Top, &[C2, C1]), [C1, C2]),
                ],
                rotations: default_rotations(),
            }
        }
    }
}

impl Default for RuleBook {
    fn default() -> Self {
        Self {
            stroke_class: STROKE_CLASS.to_string(),
            conditions: (0..4).map(default_condition).collect(),
        }
    }
}
