// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline configuration loaded from JSON and validated once at startup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sketchmap_geometry::{SanitizeConfig, SegmentationConfig};
use sketchmap_scoring::{RuleBook, ScoringConfig};
use sketchmap_vision::{
    ColorSpace, CornerSet, ExtractionConfig, OverlayStyle, PlanTransform, RasterConfig,
    RotationConfig,
};

use crate::error::ConfigError;

/// Where the four canonical corners sit in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CornerAnchors {
    /// Corners of the raster frame
    #[default]
    Frame,
    /// Corners of the fitted building footprint
    Footprint,
    /// Explicit pixel positions
    Fixed(CornerSet),
}

impl CornerAnchors {
    pub fn resolve(&self, transform: &PlanTransform) -> CornerSet {
        match self {
            CornerAnchors::Frame => CornerSet::raster_frame(transform.width, transform.height),
            CornerAnchors::Footprint => CornerSet {
                points: transform.footprint_corners(),
            },
            CornerAnchors::Fixed(set) => *set,
        }
    }
}

/// Which intermediate artifacts are written besides annotations and scores
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Sanitized and per-floor OBJ/MTL files
    pub meshes: bool,
    /// Per-floor PNG plans
    pub rasters: bool,
    /// Per-floor PNG plans with annotations, corners and angle lines drawn on
    pub overlays: bool,
    pub overlay_style: OverlayStyle,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            meshes: true,
            rasters: true,
            overlays: true,
            overlay_style: OverlayStyle::default(),
        }
    }
}

/// Every tunable of the pipeline, one section per stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sanitize: SanitizeConfig,
    pub segmentation: SegmentationConfig,
    pub raster: RasterConfig,
    pub extraction: ExtractionConfig,
    pub corners: CornerAnchors,
    pub rotation: RotationConfig,
    pub scoring: ScoringConfig,
    pub rules: RuleBook,
    pub artifacts: ArtifactConfig,
    /// Sessions processed in parallel; defaults to the CPU count
    pub worker_threads: Option<usize>,
}

fn check(ok: bool, field: &str, message: impl FnOnce() -> String) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, message()))
    }
}

fn check_angle(value: f64, field: &str) -> Result<(), ConfigError> {
    check(value.is_finite() && value > 0.0 && value <= 180.0, field, || {
        format!("{} is not in (0, 180]", value)
    })
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(num_cpus::get)
    }

    /// Reject values no session could run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_geometry()?;
        self.validate_raster()?;
        self.validate_extraction()?;
        self.validate_rotation()?;
        self.validate_scoring()?;
        self.validate_rules()?;
        if let Some(n) = self.worker_threads {
            check(n > 0, "worker_threads", || "must be at least 1".to_string())?;
        }
        Ok(())
    }

    fn validate_geometry(&self) -> Result<(), ConfigError> {
        let area = self.sanitize.min_face_area;
        check(area.is_finite() && area >= 0.0, "sanitize.min_face_area", || {
            format!("{} is not a finite non-negative area", area)
        })?;
        check(
            self.segmentation.max_iterations > 0,
            "segmentation.max_iterations",
            || "must be at least 1".to_string(),
        )?;
        let spread = self.segmentation.min_spread;
        check(spread.is_finite() && spread >= 0.0, "segmentation.min_spread", || {
            format!("{} is not a finite non-negative spread", spread)
        })
    }

    fn validate_raster(&self) -> Result<(), ConfigError> {
        let r = &self.raster;
        check(r.width > 0 && r.height > 0, "raster", || {
            format!("size {}x{} is empty", r.width, r.height)
        })?;
        check(
            2 * (r.padding as u64) < r.width.min(r.height) as u64,
            "raster.padding",
            || format!("{} leaves no room in {}x{}", r.padding, r.width, r.height),
        )?;

        if let CornerAnchors::Fixed(set) = &self.corners {
            for (i, p) in set.points.iter().enumerate() {
                let inside = p.is_finite()
                    && (0.0..=r.width as f64).contains(&p.x)
                    && (0.0..=r.height as f64).contains(&p.y);
                check(inside, "corners.points", || {
                    format!("c{} at ({}, {}) is outside the raster", i + 1, p.x, p.y)
                })?;
            }
        }
        Ok(())
    }

    fn validate_extraction(&self) -> Result<(), ConfigError> {
        let classes = &self.extraction.classes;
        check(!classes.is_empty(), "extraction.classes", || "no color classes".to_string())?;
        for (i, class) in classes.iter().enumerate() {
            let field = format!("extraction.classes[{}]", class.name);
            check(!class.name.is_empty(), &field, || "class name is empty".to_string())?;
            check(
                !classes[..i].iter().any(|c| c.name == class.name),
                &field,
                || "defined more than once".to_string(),
            )?;
            check(!class.ranges.is_empty(), &field, || "has no ranges".to_string())?;
            for range in &class.ranges {
                check((0..3).all(|c| range.lower[c] <= range.upper[c]), &field, || {
                    format!("lower {:?} exceeds upper {:?}", range.lower, range.upper)
                })?;
                if class.space == ColorSpace::Hsv {
                    check(range.upper[0] <= 180, &field, || {
                        format!("hue {} is above 180", range.upper[0])
                    })?;
                }
            }
        }
        Ok(())
    }

    fn validate_rotation(&self) -> Result<(), ConfigError> {
        let rot = &self.rotation;
        check(rot.ransac.max_iters > 0, "rotation.ransac.max_iters", || {
            "must be at least 1".to_string()
        })?;
        let t = rot.ransac.inlier_threshold;
        check(t.is_finite() && t > 0.0, "rotation.ransac.inlier_threshold", || {
            format!("{} is not a positive distance", t)
        })?;
        check(rot.min_matches >= 2, "rotation.min_matches", || {
            format!("{} is below the two matches a similarity needs", rot.min_matches)
        })?;
        check(
            rot.match_ratio > 0.0 && rot.match_ratio <= 1.0,
            "rotation.match_ratio",
            || format!("{} is not in (0, 1]", rot.match_ratio),
        )?;
        let kp = &rot.keypoints;
        check(kp.max_keypoints > 0, "rotation.keypoints.max_keypoints", || {
            "must be at least 1".to_string()
        })?;
        check(kp.ring_samples >= 4, "rotation.keypoints.ring_samples", || {
            format!("{} is below 4", kp.ring_samples)
        })?;
        check(
            !kp.ring_radii.is_empty() && kp.ring_radii.iter().all(|r| r.is_finite() && *r > 0.0),
            "rotation.keypoints.ring_radii",
            || "must be a non-empty list of positive radii".to_string(),
        )
    }

    fn validate_scoring(&self) -> Result<(), ConfigError> {
        let s = &self.scoring;
        check_angle(s.angle_tolerance_deg, "scoring.angle_tolerance_deg")?;
        check_angle(s.rotation_tolerance_deg, "scoring.rotation_tolerance_deg")?;
        let f = s.min_overlap_fraction;
        check((0.0..=1.0).contains(&f), "scoring.min_overlap_fraction", || {
            format!("{} is not in [0, 1]", f)
        })?;
        if let Some(d) = s.corner_max_distance {
            check(d.is_finite() && d > 0.0, "scoring.corner_max_distance", || {
                format!("{} is not a positive distance", d)
            })?;
        }
        Ok(())
    }

    fn validate_rules(&self) -> Result<(), ConfigError> {
        let rules = &self.rules;
        for name in rules.referenced_classes() {
            check(self.extraction.class(name).is_some(), "rules", || {
                format!("color class {:?} is not defined in extraction.classes", name)
            })?;
        }
        for (i, c) in rules.conditions.iter().enumerate() {
            check(
                !rules.conditions[..i].iter().any(|o| o.condition == c.condition),
                "rules.conditions",
                || format!("condition {} is defined more than once", c.condition),
            )?;
            for rule in &c.rotations {
                check(
                    !rule.expected_deg.is_empty() && rule.expected_deg.iter().all(|a| a.is_finite()),
                    "rules.rotations",
                    || format!("{} needs finite expected angles", rule.variable),
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchmap_vision::Point2D;

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::Invalid { field, .. } => field,
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_default_is_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "raster": { "width": 1480, "height": 820 },
                "scoring": { "angle_tolerance_deg": 15 },
                "corners": { "mode": "footprint" },
                "worker_threads": 2
            }"#,
        )
        .unwrap();
        assert_eq!(config.raster.width, 1480);
        assert_eq!(config.raster.padding, 40);
        assert_eq!(config.scoring.angle_tolerance_deg, 15.0);
        assert_eq!(config.scoring.rotation_tolerance_deg, 25.0);
        assert_eq!(config.corners, CornerAnchors::Footprint);
        assert_eq!(config.worker_threads(), 2);
        assert_eq!(config.rules.conditions.len(), 4);
        config.validate().unwrap();
    }

    #[test]
    fn test_round_trip_json() {
        let config = PipelineConfig::default();
        let json = config.to_json_pretty().unwrap();
        let back = PipelineConfig::from_json_str(&json).unwrap();
        assert_eq!(back.rules, config.rules);
        assert_eq!(back.extraction.classes, config.extraction.classes);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.scoring.min_overlap_fraction = 1.5;
        assert_eq!(field_of(config.validate().unwrap_err()), "scoring.min_overlap_fraction");

        let mut config = PipelineConfig::default();
        config.scoring.angle_tolerance_deg = 0.0;
        assert_eq!(field_of(config.validate().unwrap_err()), "scoring.angle_tolerance_deg");

        let mut config = PipelineConfig::default();
        config.raster.padding = 900;
        assert_eq!(field_of(config.validate().unwrap_err()), "raster.padding");

        let mut config = PipelineConfig::default();
        config.extraction.classes[1].ranges[0].upper[0] = 200;
        assert_eq!(field_of(config.validate().unwrap_err()), "extraction.classes[green]");

        let mut config = PipelineConfig::default();
        config.rotation.ransac.max_iters = 0;
        assert_eq!(field_of(config.validate().unwrap_err()), "rotation.ransac.max_iters");

        let mut config = PipelineConfig::default();
        config.worker_threads = Some(0);
        assert_eq!(field_of(config.validate().unwrap_err()), "worker_threads");
    }

    #[test]
    fn test_rules_must_name_known_classes() {
        let mut config = PipelineConfig::default();
        config.extraction.classes.retain(|c| c.name != "brown");
        assert_eq!(field_of(config.validate().unwrap_err()), "rules");
    }

    #[test]
    fn test_fixed_corners_inside_raster() {
        let mut config = PipelineConfig::default();
        let mut set = CornerSet::default();
        set.points[0] = Point2D::new(-5.0, 0.0);
        config.corners = CornerAnchors::Fixed(set);
        assert_eq!(field_of(config.validate().unwrap_err()), "corners.points");
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::from_json_file(Path::new("/nonexistent/sketchmap.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
