// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Sketchmap Core
//!
//! Reader and writer for the Wavefront OBJ/MTL files exported by the VR
//! sketching tool, built with [nom](https://docs.rs/nom).
//!
//! ## Overview
//!
//! - **Statement parsing**: nom combinators per line, numbers via
//!   [fast-float](https://docs.rs/fast-float) and [lexical-core](https://docs.rs/lexical-core)
//! - **Line scanning**: [memchr](https://docs.rs/memchr) accelerated
//! - **Materials**: `usemtl`/`g` bookkeeping plus `Kd` colors from MTL files
//! - **Writing**: round-trip safe OBJ output for pipeline artifacts
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sketchmap_core::{parse_obj, parse_mtl};
//!
//! let mut doc = parse_obj(&obj_text)?;
//! doc.apply_materials(&parse_mtl(&mtl_text)?);
//! println!("{} vertices, {} faces", doc.vertices.len(), doc.faces.len());
//! ```

pub mod document;
pub mod error;
pub mod mtl;
pub mod parser;
pub mod writer;

pub use document::{ObjDocument, ObjFace};
pub use error::{Error, Result};
pub use mtl::{parse_mtl, Material, MaterialLibrary};
pub use parser::{parse_obj, parse_statement, LineScanner, Statement};
pub use writer::{write_mtl, write_obj};
