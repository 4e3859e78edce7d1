// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session pipeline: sanitize, segment, project, extract, score.
//!
//! Each stage consumes the previous stage's output and persists its own
//! through the [`ArtifactStore`]. Failures carry the session and stage
//! they happened in.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use image::RgbImage;
use serde::Serialize;
use sketchmap_geometry::{sanitize, segment_levels, Level, Mesh, SanitizeReport, Segmentation};
use sketchmap_scoring::{angle_lines, score_session, AngleLine, ScoreTable, ScoringContext};
use sketchmap_vision::{
    draw_overlay, extract_annotations, project_session, rgb_to_grayscale, Annotation, CornerSet,
    OverlayLine, PlanTransform, Point2D, SessionRasters,
};

use crate::artifacts::{read_mesh, ArtifactStore};
use crate::config::PipelineConfig;
use crate::error::{Result, SessionError, Stage};
use crate::session::SessionId;

/// Summary of one completed session
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutput {
    pub session: SessionId,
    pub sanitize: SanitizeReport,
    /// Faces per floor, ground to top
    pub level_faces: [usize; 3],
    pub annotations: usize,
    pub table: ScoreTable,
    pub elapsed_ms: u64,
}

/// Runs sessions against one validated configuration and artifact store
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    store: ArtifactStore,
}

impl Pipeline {
    pub fn new(config: Arc<PipelineConfig>, store: ArtifactStore) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn load_stage(&self, path: &Path) -> Result<Mesh> {
        let mesh = read_mesh(path)?;
        tracing::debug!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            materials = mesh.materials.len(),
            "mesh loaded"
        );
        Ok(mesh)
    }

    pub fn sanitize_stage(&self, session: &SessionId, raw: &Mesh) -> Result<(Mesh, SanitizeReport)> {
        let (mesh, report) = sanitize(raw, &self.config.sanitize)?;
        tracing::debug!(
            kept = report.kept_faces,
            artifacts = report.removed_artifact,
            invalid = report.removed_invalid_index + report.removed_too_few_indices,
            degenerate = report.removed_degenerate,
            "mesh sanitized"
        );
        if self.config.artifacts.meshes {
            self.store.write_sanitized(session, &mesh)?;
        }
        Ok((mesh, report))
    }

    pub fn segment_stage(&self, session: &SessionId, mesh: &Mesh) -> Result<Segmentation> {
        let segmentation = segment_levels(mesh, &self.config.segmentation)?;
        tracing::debug!(
            axis = ?segmentation.axis,
            centers = ?segmentation.centers,
            ground = segmentation.levels[0].mesh.face_count(),
            mid = segmentation.levels[1].mesh.face_count(),
            top = segmentation.levels[2].mesh.face_count(),
            "levels segmented"
        );
        for level in &segmentation.levels {
            if level.is_empty() {
                tracing::warn!(level = %level.level, "floor has no faces");
            }
            if self.config.artifacts.meshes {
                self.store.write_level_mesh(session, level.level, &level.mesh)?;
            }
        }
        Ok(segmentation)
    }

    /// Render the three floors under one fitted transform
    pub fn project_stage(&self, session: &SessionId, segmentation: &Segmentation) -> Result<SessionRasters> {
        let rasters = project_session(segmentation, &self.config.raster, None)?;
        tracing::debug!(
            scale = rasters.transform.scale,
            width = rasters.transform.width,
            height = rasters.transform.height,
            "floors projected"
        );
        self.store.write_transform(session, &rasters.transform)?;
        if self.config.artifacts.rasters {
            for raster in &rasters.rasters {
                self.store.write_raster(session, raster.level, &raster.image)?;
            }
        }
        Ok(rasters)
    }

    /// Annotations of all floors plus the corners they were attributed to
    pub fn extract_stage(
        &self,
        session: &SessionId,
        rasters: &SessionRasters,
    ) -> Result<(CornerSet, Vec<Annotation>)> {
        let corners = self.config.corners.resolve(&rasters.transform);
        let annotations: Vec<Annotation> = rasters
            .rasters
            .iter()
            .flat_map(|raster| extract_annotations(raster, &self.config.extraction, &corners))
            .collect();
        for level in Level::ALL {
            tracing::debug!(
                level = %level,
                count = annotations.iter().filter(|a| a.level == level).count(),
                "annotations extracted"
            );
        }
        self.store.write_annotations(session, &annotations)?;
        Ok((corners, annotations))
    }

    /// All four score families from the floor images and annotations
    pub fn score_stage(
        &self,
        session: &SessionId,
        images: [&RgbImage; 3],
        corners: &CornerSet,
        annotations: &[Annotation],
    ) -> Result<ScoreTable> {
        let key = session.key();
        let ctx = ScoringContext::new(&key, &self.config.rules, &self.config.scoring)?;
        let grays = images.map(rgb_to_grayscale);
        let table = score_session(
            &ctx,
            annotations,
            corners,
            [&grays[0], &grays[1], &grays[2]],
            &self.config.rotation,
        );
        tracing::debug!(
            records = table.len(),
            passed = table.records.iter().filter(|r| r.passed()).count(),
            "session scored"
        );
        self.store.write_scores(session, &table)?;
        if self.config.artifacts.overlays {
            let lines = angle_lines(&ctx, annotations, corners);
            self.write_overlays(session, images, corners, annotations, &lines, &table)?;
        }
        Ok(table)
    }

    /// One audit image per floor: annotations, their corners, and each
    /// angle rule's drawn line next to its reference direction
    pub fn write_overlays(
        &self,
        session: &SessionId,
        images: [&RgbImage; 3],
        corners: &CornerSet,
        annotations: &[Annotation],
        lines: &[AngleLine],
        table: &ScoreTable,
    ) -> Result<()> {
        let style = &self.config.artifacts.overlay_style;
        for level in Level::ALL {
            let on_level: Vec<&Annotation> = annotations.iter().filter(|a| a.level == level).collect();
            let mut drawn = Vec::new();
            for line in lines.iter().filter(|l| l.level == level) {
                let passed = table.get(&line.variable).is_some_and(|r| r.passed());
                let (from, to) = line.drawn;
                drawn.push(OverlayLine {
                    from,
                    to,
                    color: if passed { style.pass_color } else { style.fail_color },
                });
                if let Some(reference_end) = reference_through(line) {
                    drawn.push(OverlayLine {
                        from,
                        to: reference_end,
                        color: style.reference_color,
                    });
                }
            }
            let overlay = draw_overlay(images[level.index()], &on_level, corners, &drawn, style);
            self.store.write_overlay(session, level, &overlay)?;
        }
        tracing::debug!(lines = lines.len(), "overlays written");
        Ok(())
    }

    /// Run every stage for one mesh file
    pub fn run_session(&self, path: &Path) -> std::result::Result<SessionOutput, SessionError> {
        let start = Instant::now();
        let session = SessionId::from_path(path).map_err(|source| {
            let session = path.display().to_string();
            tracing::error!(session = %session, stage = %Stage::Load, error = %source, "stage failed");
            SessionError {
                session,
                stage: Stage::Load,
                source,
            }
        })?;
        let span = tracing::info_span!("session", session = %session);
        let _enter = span.enter();
        tracing::info!(input = %path.display(), "session started");

        let raw = run_stage(&session, Stage::Load, || self.load_stage(path))?;
        let (mesh, report) = run_stage(&session, Stage::Sanitize, || self.sanitize_stage(&session, &raw))?;
        let segmentation = run_stage(&session, Stage::Segment, || self.segment_stage(&session, &mesh))?;
        let rasters = run_stage(&session, Stage::Project, || self.project_stage(&session, &segmentation))?;
        let (corners, annotations) = run_stage(&session, Stage::Extract, || self.extract_stage(&session, &rasters))?;
        let [ground, mid, top] = &rasters.rasters;
        let table = run_stage(&session, Stage::Score, || {
            self.score_stage(&session, [&ground.image, &mid.image, &top.image], &corners, &annotations)
        })?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            records = table.len(),
            passed = table.records.iter().filter(|r| r.passed()).count(),
            elapsed_ms,
            "session complete"
        );
        Ok(SessionOutput {
            level_faces: segmentation.levels.each_ref().map(|l| l.mesh.face_count()),
            session,
            sanitize: report,
            annotations: annotations.len(),
            table,
            elapsed_ms,
        })
    }

    /// Score again from the rasters, transform and annotations on disk
    pub fn rescore_session(&self, session: &SessionId) -> std::result::Result<ScoreTable, SessionError> {
        let span = tracing::info_span!("session", session = %session);
        let _enter = span.enter();

        let (images, transform, annotations) = run_stage(session, Stage::Load, || {
            let images = [
                self.store.read_raster(session, Level::Ground)?,
                self.store.read_raster(session, Level::Mid)?,
                self.store.read_raster(session, Level::Top)?,
            ];
            let transform: PlanTransform = self.store.read_transform(session)?;
            let annotations = self.store.read_annotations(session)?;
            Ok((images, transform, annotations))
        })?;
        let corners = self.config.corners.resolve(&transform);
        run_stage(session, Stage::Score, || {
            self.score_stage(session, [&images[0], &images[1], &images[2]], &corners, &annotations)
        })
    }
}

/// End of a segment from the drawn line's start, along the reference
/// direction and as long as the drawn line
fn reference_through(line: &AngleLine) -> Option<Point2D> {
    let (from, to) = line.drawn;
    let (r0, r1) = line.reference;
    let (dx, dy) = (r1.x - r0.x, r1.y - r0.y);
    let norm = dx.hypot(dy);
    if norm <= f64::EPSILON {
        return None;
    }
    let length = from.distance_to(&to);
    Some(Point2D::new(from.x + dx / norm * length, from.y + dy / norm * length))
}

/// Run one stage, logging its duration or its failure
fn run_stage<T>(
    session: &SessionId,
    stage: Stage,
    f: impl FnOnce() -> Result<T>,
) -> std::result::Result<T, SessionError> {
    let span = tracing::debug_span!("stage", stage = %stage);
    let _enter = span.enter();
    let start = Instant::now();
    match f() {
        Ok(value) => {
            tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "stage complete");
            Ok(value)
        }
        Err(source) => {
            tracing::error!(session = %session, stage = %stage, error = %source, "stage failed");
            Err(SessionError {
                session: session.to_string(),
                stage,
                source,
            })
        }
    }
}
