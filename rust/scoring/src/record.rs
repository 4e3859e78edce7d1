// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Score records and CSV tables

use std::fmt::{self, Write as _};
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Participant and experimental condition a record belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub participant: String,
    pub condition: u32,
}

impl SessionKey {
    pub fn new(participant: impl Into<String>, condition: u32) -> Self {
        Self {
            participant: participant.into(),
            condition,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.participant, self.condition)
    }
}

/// Scoring family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Corner,
    Overlap,
    Angle,
    Rotation,
}

impl Family {
    pub const ALL: [Family; 4] = [Family::Corner, Family::Overlap, Family::Angle, Family::Rotation];

    pub fn name(self) -> &'static str {
        match self {
            Family::Corner => "corner",
            Family::Overlap => "overlap",
            Family::Angle => "angle",
            Family::Rotation => "rotation",
        }
    }
}

/// Why a record scored 0 without a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// The drawn stroke or patch was not found
    MissingPatch,
    /// The reference cross was not found
    MissingReference,
    /// The variable has no rule under this condition
    NotApplicable,
    InsufficientFeatures,
    NoConsensus,
    InvalidRaster,
}

impl ReasonCode {
    pub fn name(self) -> &'static str {
        match self {
            ReasonCode::MissingPatch => "missing_patch",
            ReasonCode::MissingReference => "missing_reference",
            ReasonCode::NotApplicable => "not_applicable",
            ReasonCode::InsufficientFeatures => "insufficient_features",
            ReasonCode::NoConsensus => "no_consensus",
            ReasonCode::InvalidRaster => "invalid_raster",
        }
    }
}

/// One row of the output table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub participant: String,
    pub condition: u32,
    pub family: Family,
    /// Variable name, e.g. `H2`, `H1H4`, `M56`, `MidRotation`
    pub metric: String,
    /// Floors involved, e.g. `mid` or `ground/top`
    pub floors: String,
    /// 0/1 flag
    pub outcome: u8,
    /// Raw quantity: corner distance, overlap fraction, drawn bearing or
    /// estimated rotation
    pub measured: Option<f64>,
    /// Angular deviation from the reference, where one applies
    pub deviation: Option<f64>,
    pub tolerance: Option<f64>,
    pub reason: Option<ReasonCode>,
}

impl ScoreRecord {
    /// A zero record carrying only a reason
    pub fn zero(
        session: &SessionKey,
        family: Family,
        metric: &str,
        floors: String,
        reason: ReasonCode,
    ) -> Self {
        Self {
            participant: session.participant.clone(),
            condition: session.condition,
            family,
            metric: metric.to_string(),
            floors,
            outcome: 0,
            measured: None,
            deviation: None,
            tolerance: None,
            reason: Some(reason),
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome == 1
    }
}

const CSV_HEADER: &str =
    "participant,condition,family,metric,floors,outcome,measured,deviation,tolerance,reason";

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        let escaped = value.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        value.to_string()
    }
}

fn csv_number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.4}", v),
        _ => String::new(),
    }
}

/// Append-only collection of score records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    pub records: Vec<ScoreRecord>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ScoreRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = ScoreRecord>) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn family(&self, family: Family) -> impl Iterator<Item = &ScoreRecord> {
        self.records.iter().filter(move |r| r.family == family)
    }

    pub fn get(&self, metric: &str) -> Option<&ScoreRecord> {
        self.records.iter().find(|r| r.metric == metric)
    }

    /// Records of one family, in insertion order
    pub fn family_table(&self, family: Family) -> ScoreTable {
        ScoreTable {
            records: self.family(family).cloned().collect(),
        }
    }

    /// Render as CSV with a header row
    pub fn to_csv(&self) -> String {
        let mut out = String::with_capacity(64 * (self.records.len() + 1));
        out.push_str(CSV_HEADER);
        out.push('\n');
        for r in &self.records {
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{},{},{},{}",
                csv_escape(&r.participant),
                r.condition,
                r.family.name(),
                csv_escape(&r.metric),
                csv_escape(&r.floors),
                r.outcome,
                csv_number(r.measured),
                csv_number(r.deviation),
                csv_number(r.tolerance),
                r.reason.map(ReasonCode::name).unwrap_or(""),
            );
        }
        out
    }

    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(self.to_csv().as_bytes())?;
        Ok(())
    }
}
