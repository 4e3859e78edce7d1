// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On-disk store for per-stage session artifacts.
//!
//! Every stage writes its output under one directory, named by session and
//! floor, so a later stage can be re-run from what is already on disk.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::{de::DeserializeOwned, Serialize};
use sketchmap_core::{parse_mtl, parse_obj, write_mtl, write_obj};
use sketchmap_geometry::{Level, Mesh};
use sketchmap_scoring::{Family, ScoreTable};
use sketchmap_vision::{Annotation, PlanTransform};

use crate::error::{Result, StageError};
use crate::session::SessionId;

/// Read an OBJ file and resolve the colors of any MTL library it names.
///
/// Libraries are looked up next to the OBJ file; a missing library only
/// leaves its materials uncolored.
pub fn read_mesh(path: &Path) -> Result<Mesh> {
    let text = fs::read_to_string(path).map_err(|e| StageError::io(path, e))?;
    let mut doc = parse_obj(&text)?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    for lib in doc.material_libraries.clone() {
        let lib_path = dir.join(&lib);
        match fs::read_to_string(&lib_path) {
            Ok(mtl) => {
                let resolved = doc.apply_materials(&parse_mtl(&mtl)?);
                tracing::debug!(library = %lib_path.display(), resolved, "applied material library");
            }
            Err(e) => {
                tracing::warn!(library = %lib_path.display(), error = %e, "material library not readable");
            }
        }
    }
    Ok(Mesh::from_obj(&doc))
}

/// Write a mesh as OBJ plus a sibling MTL carrying its material colors
pub fn write_mesh(path: &Path, mesh: &Mesh) -> Result<()> {
    let mut doc = mesh.to_obj();
    if !doc.materials.is_empty() {
        let mtl_path = path.with_extension("mtl");
        fs::write(&mtl_path, write_mtl(&doc)).map_err(|e| StageError::io(&mtl_path, e))?;
        if let Some(name) = mtl_path.file_name().and_then(|n| n.to_str()) {
            doc.material_libraries = vec![name.to_string()];
        }
    }
    fs::write(path, write_obj(&doc)).map_err(|e| StageError::io(path, e))
}

/// Directory of session artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open a store, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StageError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sanitized_mesh_path(&self, session: &SessionId) -> PathBuf {
        self.root.join(format!("{}_sanitized.obj", session))
    }

    pub fn level_mesh_path(&self, session: &SessionId, level: Level) -> PathBuf {
        self.root.join(format!("{}_{}.obj", session, level))
    }

    pub fn raster_path(&self, session: &SessionId, level: Level) -> PathBuf {
        self.root.join(format!("{}_{}_plan.png", session, level))
    }

    pub fn overlay_path(&self, session: &SessionId, level: Level) -> PathBuf {
        self.root.join(format!("{}_{}_overlay.png", session, level))
    }

    pub fn transform_path(&self, session: &SessionId) -> PathBuf {
        self.root.join(format!("{}_transform.json", session))
    }

    pub fn annotations_path(&self, session: &SessionId) -> PathBuf {
        self.root.join(format!("{}_annotations.json", session))
    }

    pub fn scores_path(&self, session: &SessionId) -> PathBuf {
        self.root.join(format!("{}_scores.csv", session))
    }

    /// Combined table of one family across a batch
    pub fn family_table_path(&self, family: Family) -> PathBuf {
        self.root.join(format!("scores_{}.csv", family.name()))
    }

    pub fn write_sanitized(&self, session: &SessionId, mesh: &Mesh) -> Result<PathBuf> {
        let path = self.sanitized_mesh_path(session);
        write_mesh(&path, mesh)?;
        Ok(path)
    }

    pub fn read_sanitized(&self, session: &SessionId) -> Result<Mesh> {
        read_mesh(&self.sanitized_mesh_path(session))
    }

    pub fn write_level_mesh(&self, session: &SessionId, level: Level, mesh: &Mesh) -> Result<PathBuf> {
        let path = self.level_mesh_path(session, level);
        write_mesh(&path, mesh)?;
        Ok(path)
    }

    pub fn write_raster(&self, session: &SessionId, level: Level, image: &RgbImage) -> Result<PathBuf> {
        let path = self.raster_path(session, level);
        image.save(&path)?;
        Ok(path)
    }

    pub fn read_raster(&self, session: &SessionId, level: Level) -> Result<RgbImage> {
        Ok(image::open(self.raster_path(session, level))?.to_rgb8())
    }

    /// Plan of one floor with annotation boxes, corner labels and the
    /// session's angle lines drawn on
    pub fn write_overlay(&self, session: &SessionId, level: Level, image: &RgbImage) -> Result<PathBuf> {
        let path = self.overlay_path(session, level);
        image.save(&path)?;
        Ok(path)
    }

    pub fn write_transform(&self, session: &SessionId, transform: &PlanTransform) -> Result<PathBuf> {
        self.write_json(self.transform_path(session), transform)
    }

    pub fn read_transform(&self, session: &SessionId) -> Result<PlanTransform> {
        self.read_json(&self.transform_path(session))
    }

    pub fn write_annotations(&self, session: &SessionId, annotations: &[Annotation]) -> Result<PathBuf> {
        self.write_json(self.annotations_path(session), &annotations)
    }

    pub fn read_annotations(&self, session: &SessionId) -> Result<Vec<Annotation>> {
        self.read_json(&self.annotations_path(session))
    }

    pub fn write_scores(&self, session: &SessionId, table: &ScoreTable) -> Result<PathBuf> {
        let path = self.scores_path(session);
        fs::write(&path, table.to_csv()).map_err(|e| StageError::io(&path, e))?;
        Ok(path)
    }

    /// One CSV per scoring family
    pub fn write_family_tables(&self, table: &ScoreTable) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(Family::ALL.len());
        for family in Family::ALL {
            let path = self.family_table_path(family);
            let csv = table.family_table(family).to_csv();
            fs::write(&path, csv).map_err(|e| StageError::io(&path, e))?;
            written.push(path);
        }
        Ok(written)
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: PathBuf, value: &T) -> Result<PathBuf> {
        let json = serde_json::to_vec_pretty(value)?;
        fs::write(&path, json).map_err(|e| StageError::io(&path, e))?;
        Ok(path)
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let bytes = fs::read(path).map_err(|e| StageError::io(path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
