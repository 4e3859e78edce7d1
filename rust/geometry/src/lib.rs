// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sketchmap Geometry
//!
//! Mesh model for VR sketches, cleanup of export artifacts and splitting
//! of the sketch into its three floors. Uses nalgebra for positions.

pub mod error;
pub mod mesh;
pub mod sanitize;
pub mod segment;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use error::{Error, Result};
pub use mesh::{Axis, Bounds3, Face, MaterialInfo, Mesh, Rgb8, INVALID_INDEX};
pub use sanitize::{sanitize, SanitizeConfig, SanitizeReport};
pub use segment::{
    dominant_axis, segment_levels, BandMethod, Level, LevelMesh, Segmentation,
    SegmentationConfig,
};
