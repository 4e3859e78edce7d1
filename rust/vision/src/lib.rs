// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor plan rasters and colored annotations for VR sketch maps
//!
//! This crate provides:
//! 1. A top-down projector that renders each floor into a fixed-size
//!    raster under one world-to-pixel transform per session
//! 2. Color-class masks and connected components that turn strokes and
//!    patches into annotations attributed to canonical corners
//! 3. Keypoint matching with a RANSAC similarity fit to recover the
//!    rotation between two floors
//! 4. Audit overlays of annotations, corners and measured lines
//!
//! # Usage
//!
//! ```rust,ignore
//! use sketchmap_vision::{extract_annotations, project_session, CornerSet};
//!
//! let rasters = project_session(&segmentation, &RasterConfig::default(), None)?;
//! let corners = CornerSet::default();
//! for raster in &rasters.rasters {
//!     let annotations = extract_annotations(raster, &ExtractionConfig::default(), &corners);
//! }
//! ```

pub mod annotation;
pub mod color;
pub mod error;
pub mod image_ops;
pub mod keypoints;
pub mod overlay;
pub mod projector;
pub mod ransac;
pub mod rotation;
pub mod transform;
pub mod types;

// Re-export commonly used types and functions
pub use annotation::{extract_annotations, extract_class};
pub use color::{
    default_classes, rgb_to_hsv, ColorClass, ColorRange, ColorSpace, CROSS_CLASS, STROKE_CLASS,
};
pub use error::{Error, Result};
pub use image_ops::rgb_to_grayscale;
pub use keypoints::{
    describe_keypoints, detect_keypoints, match_descriptors, Descriptor, Keypoint, KeypointConfig,
    Match,
};
pub use overlay::{draw_overlay, OverlayLine, OverlayStyle};
pub use projector::{project_level, project_session, FloorPlanRaster, SessionRasters};
pub use ransac::{ransac, PointPair, RansacConfig, RansacResult, RobustModel, Similarity2};
pub use rotation::{estimate_rotation, RotationEstimate};
pub use transform::PlanTransform;
pub use types::{
    Annotation, Corner, CornerSet, ExtractionConfig, Footprint, PixelBox, Point2D, RasterConfig,
    RotationConfig, Span,
};
