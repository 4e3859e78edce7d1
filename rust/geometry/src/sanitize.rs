// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh sanitizer
//!
//! Removes export artifacts (e.g. the tool's `LayerSurface` helper layer)
//! and faces that cannot be rendered: fewer than three indices, references
//! to missing vertices, non-finite coordinates or zero area.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mesh::{Face, Mesh};

/// Sanitizer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeConfig {
    /// Material or group names whose faces are dropped
    pub artifact_layers: Vec<String>,
    /// Match artifact names exactly instead of ignoring ASCII case
    pub case_sensitive: bool,
    /// Faces with area at or below this are degenerate
    pub min_face_area: f64,
    /// Drop vertices no longer referenced by any face
    pub compact: bool,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            artifact_layers: vec!["LayerSurface".to_string()],
            case_sensitive: false,
            min_face_area: 1e-12,
            compact: true,
        }
    }
}

/// What the sanitizer removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeReport {
    pub input_faces: usize,
    pub kept_faces: usize,
    pub removed_artifact: usize,
    pub removed_too_few_indices: usize,
    pub removed_invalid_index: usize,
    pub removed_degenerate: usize,
    pub input_vertices: usize,
    pub kept_vertices: usize,
}

impl SanitizeReport {
    /// Total number of faces removed
    pub fn removed_faces(&self) -> usize {
        self.input_faces - self.kept_faces
    }
}

enum Verdict {
    Keep,
    Artifact,
    TooFewIndices,
    InvalidIndex,
    Degenerate,
}

fn name_matches(name: &str, config: &SanitizeConfig) -> bool {
    config.artifact_layers.iter().any(|layer| {
        if config.case_sensitive {
            layer == name
        } else {
            layer.eq_ignore_ascii_case(name)
        }
    })
}

fn is_artifact(mesh: &Mesh, face: &Face, config: &SanitizeConfig) -> bool {
    let material = face
        .material
        .and_then(|m| mesh.materials.get(m as usize))
        .is_some_and(|m| name_matches(&m.name, config));
    let group = face
        .group
        .and_then(|g| mesh.groups.get(g as usize))
        .is_some_and(|g| name_matches(g, config));
    material || group
}

fn classify(mesh: &Mesh, face: &Face, config: &SanitizeConfig) -> Verdict {
    if is_artifact(mesh, face, config) {
        return Verdict::Artifact;
    }
    if face.indices.len() < 3 {
        return Verdict::TooFewIndices;
    }
    if !mesh.face_is_valid(face) {
        return Verdict::InvalidIndex;
    }
    let finite = face.indices.iter().all(|&i| {
        let p = &mesh.positions[i as usize];
        p.x.is_finite() && p.y.is_finite() && p.z.is_finite()
    });
    if !finite || mesh.face_area(face) <= config.min_face_area {
        return Verdict::Degenerate;
    }
    Verdict::Keep
}

/// Clean a mesh.
///
/// Surviving faces keep their relative order and, with compaction, so do
/// the surviving vertices. Running the sanitizer on its own output removes
/// nothing. Fails if no face survives.
pub fn sanitize(mesh: &Mesh, config: &SanitizeConfig) -> Result<(Mesh, SanitizeReport)> {
    let mut report = SanitizeReport {
        input_faces: mesh.face_count(),
        input_vertices: mesh.vertex_count(),
        ..Default::default()
    };

    let mut kept = Vec::with_capacity(mesh.face_count());
    for (idx, face) in mesh.faces.iter().enumerate() {
        match classify(mesh, face, config) {
            Verdict::Keep => kept.push(idx),
            Verdict::Artifact => report.removed_artifact += 1,
            Verdict::TooFewIndices => report.removed_too_few_indices += 1,
            Verdict::InvalidIndex => report.removed_invalid_index += 1,
            Verdict::Degenerate => report.removed_degenerate += 1,
        }
    }

    if kept.is_empty() {
        return Err(Error::MalformedMesh(format!(
            "no usable faces out of {} (artifact {}, too few indices {}, invalid index {}, degenerate {})",
            report.input_faces,
            report.removed_artifact,
            report.removed_too_few_indices,
            report.removed_invalid_index,
            report.removed_degenerate
        )));
    }

    let cleaned = mesh.subset(&kept, config.compact);
    report.kept_faces = cleaned.face_count();
    report.kept_vertices = cleaned.vertex_count();
    Ok((cleaned, report))
}
