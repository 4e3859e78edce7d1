// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for raster operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from projection, extraction and rotation estimation
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not enough {stage}: found {found}, need {required}")]
    InsufficientFeatures {
        stage: &'static str,
        found: usize,
        required: usize,
    },

    #[error("No rotation consensus: best model has {inliers} inliers, need {required}")]
    NoConsensus { inliers: usize, required: usize },

    #[error("Invalid raster: {0}")]
    InvalidRaster(String),

    #[error("Raster size mismatch: {left:?} vs {right:?}")]
    SizeMismatch { left: (u32, u32), right: (u32, u32) },
}
