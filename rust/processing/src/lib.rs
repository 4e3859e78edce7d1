// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session pipeline for sketch map scoring
//!
//! Ties the stages together: a validated [`PipelineConfig`], per-session
//! stages that persist their artifacts, and a parallel batch runner that
//! isolates failing sessions.

pub mod artifacts;
pub mod batch;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod session;

pub use artifacts::{read_mesh, write_mesh, ArtifactStore};
pub use batch::{collect_inputs, run_batch, BatchReport};
pub use config::{ArtifactConfig, CornerAnchors, PipelineConfig};
pub use error::{ConfigError, Result, SessionError, Stage, StageError};
pub use pipeline::{Pipeline, SessionOutput};
pub use session::SessionId;
