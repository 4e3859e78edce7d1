// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for configuration, stages and sessions

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Invalid configuration, fatal before any session runs
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {message}")]
    Invalid { field: String, message: String },

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Pipeline stage names used in logs and session errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Load,
    Sanitize,
    Segment,
    Project,
    Extract,
    Score,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Sanitize => "sanitize",
            Stage::Segment => "segment",
            Stage::Project => "project",
            Stage::Extract => "extract",
            Stage::Score => "score",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure inside one stage
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Mesh file error: {0}")]
    Obj(#[from] sketchmap_core::Error),

    #[error(transparent)]
    Geometry(#[from] sketchmap_geometry::Error),

    #[error(transparent)]
    Vision(#[from] sketchmap_vision::Error),

    #[error(transparent)]
    Scoring(#[from] sketchmap_scoring::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid session name {0:?}: expected <participant>_<condition>")]
    SessionName(String),

    #[error("Session {0} appears more than once in the batch")]
    DuplicateSession(String),
}

impl StageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for stages
pub type Result<T> = std::result::Result<T, StageError>;

/// A session that failed, with the stage it failed in
#[derive(Debug, Error)]
#[error("Session {session} failed at {stage}: {source}")]
pub struct SessionError {
    pub session: String,
    pub stage: Stage,
    pub source: StageError,
}
