// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Level segmentation
//!
//! Sketches are drawn as three stacked floors. The vertical axis is the one
//! with the largest spread; vertices are split into three height bands by a
//! deterministic 1-D k-means, and every face follows the band holding most
//! of its vertices.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mesh::{Axis, Mesh};

/// One of the three floors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Ground,
    Mid,
    Top,
}

impl Level {
    /// Bottom to top
    pub const ALL: [Level; 3] = [Level::Ground, Level::Mid, Level::Top];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Level::Ground => 0,
            Level::Mid => 1,
            Level::Top => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Level::Ground => "ground",
            Level::Mid => "mid",
            Level::Top => "top",
        }
    }

    /// Inverse of [`Level::name`]
    pub fn from_name(name: &str) -> Option<Level> {
        Level::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How height bands are found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandMethod {
    /// Lloyd iterations on the sorted heights, seeded at the 1/6, 1/2 and
    /// 5/6 quantiles
    #[default]
    KMeans,
    /// Equal-count thirds
    Quantile,
}

/// Segmenter settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub method: BandMethod,
    pub max_iterations: usize,
    /// Spreads at or below this along the vertical axis are rejected
    pub min_spread: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            method: BandMethod::KMeans,
            max_iterations: 100,
            min_spread: 1e-9,
        }
    }
}

/// A floor cut out of the full mesh
#[derive(Debug, Clone)]
pub struct LevelMesh {
    pub level: Level,
    /// Source vertices whose height falls in this band
    pub vertices: Vec<u32>,
    /// Source faces assigned to this level, in source order
    pub faces: Vec<u32>,
    /// Compacted mesh of the assigned faces
    pub mesh: Mesh,
}

impl LevelMesh {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mesh.is_empty()
    }
}

/// Result of splitting a mesh into three levels
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Vertical axis
    pub axis: Axis,
    /// Band centers, ascending
    pub centers: [f64; 3],
    /// Upper bounds of the ground and mid bands (inclusive)
    pub boundaries: [f64; 2],
    /// Band of every source vertex
    pub vertex_levels: Vec<Level>,
    /// Ground, mid, top
    pub levels: [LevelMesh; 3],
}

impl Segmentation {
    #[inline]
    pub fn level(&self, level: Level) -> &LevelMesh {
        &self.levels[level.index()]
    }
}

/// Axis with the largest extent over all finite vertices.
///
/// Ties resolve to the earlier axis (X before Y before Z).
pub fn dominant_axis(mesh: &Mesh) -> Option<Axis> {
    let bounds = mesh.bounds()?;
    let mut best = Axis::X;
    for axis in [Axis::Y, Axis::Z] {
        if bounds.span(axis) > bounds.span(best) {
            best = axis;
        }
    }
    Some(best)
}

/// Value at fraction `p` of a sorted slice (nearest rank)
#[inline]
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[inline]
fn band_of(value: f64, boundaries: &[f64; 2]) -> Level {
    if value <= boundaries[0] {
        Level::Ground
    } else if value <= boundaries[1] {
        Level::Mid
    } else {
        Level::Top
    }
}

/// Lloyd's algorithm on sorted 1-D data with k = 3.
///
/// On sorted input each cluster is a contiguous run, so an iteration is a
/// pair of cut positions plus prefix-sum means.
fn kmeans_centers(sorted: &[f64], max_iterations: usize) -> [f64; 3] {
    let mut prefix = Vec::with_capacity(sorted.len() + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &v in sorted {
        acc += v;
        prefix.push(acc);
    }
    let mean = |lo: usize, hi: usize| (prefix[hi] - prefix[lo]) / (hi - lo) as f64;

    let mut centers = [
        quantile(sorted, 1.0 / 6.0),
        quantile(sorted, 0.5),
        quantile(sorted, 5.0 / 6.0),
    ];
    let mut cuts = (usize::MAX, usize::MAX);

    for _ in 0..max_iterations {
        let b0 = (centers[0] + centers[1]) * 0.5;
        let b1 = (centers[1] + centers[2]) * 0.5;
        let c0 = sorted.partition_point(|&v| v <= b0);
        let c1 = sorted.partition_point(|&v| v <= b1).max(c0);
        if (c0, c1) == cuts {
            break;
        }
        cuts = (c0, c1);

        // Empty clusters keep their previous center
        if c0 > 0 {
            centers[0] = mean(0, c0);
        }
        if c1 > c0 {
            centers[1] = mean(c0, c1);
        }
        if sorted.len() > c1 {
            centers[2] = mean(c1, sorted.len());
        }
    }
    centers
}

/// Split a sanitized mesh into ground, mid and top levels.
///
/// Every vertex lands in exactly one band; a face goes to the band with the
/// most of its vertices, ties going to the lower band. Levels may be empty.
pub fn segment_levels(mesh: &Mesh, config: &SegmentationConfig) -> Result<Segmentation> {
    let axis = dominant_axis(mesh)
        .ok_or_else(|| Error::Segmentation("mesh has no finite vertices".to_string()))?;

    let heights: Vec<f64> = (0..mesh.vertex_count())
        .map(|i| mesh.coordinate(i, axis))
        .collect();
    let mut sorted: Vec<f64> = heights.iter().copied().filter(|h| h.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);

    let spread = sorted[sorted.len() - 1] - sorted[0];
    if spread <= config.min_spread {
        return Err(Error::Segmentation(format!(
            "vertical spread {} along {:?} is too small to separate levels",
            spread, axis
        )));
    }

    let (centers, boundaries) = match config.method {
        BandMethod::KMeans => {
            let c = kmeans_centers(&sorted, config.max_iterations.max(1));
            (c, [(c[0] + c[1]) * 0.5, (c[1] + c[2]) * 0.5])
        }
        BandMethod::Quantile => {
            let n = sorted.len();
            let b = [sorted[(n - 1) / 3], sorted[(2 * (n - 1)) / 3]];
            let run_mean = |lo: usize, hi: usize| {
                if hi > lo {
                    sorted[lo..hi].iter().sum::<f64>() / (hi - lo) as f64
                } else {
                    b[0]
                }
            };
            let c0 = sorted.partition_point(|&v| v <= b[0]);
            let c1 = sorted.partition_point(|&v| v <= b[1]).max(c0);
            (
                [run_mean(0, c0), run_mean(c0, c1), run_mean(c1, n)],
                b,
            )
        }
    };

    // Non-finite heights go to the ground band; the sanitizer never keeps
    // faces that reference them.
    let vertex_levels: Vec<Level> = heights
        .iter()
        .map(|&h| {
            if h.is_finite() {
                band_of(h, &boundaries)
            } else {
                Level::Ground
            }
        })
        .collect();

    let mut band_vertices: [Vec<u32>; 3] = Default::default();
    for (i, level) in vertex_levels.iter().enumerate() {
        band_vertices[level.index()].push(i as u32);
    }

    let mut band_faces: [Vec<usize>; 3] = Default::default();
    for (f, face) in mesh.faces.iter().enumerate() {
        let mut counts = [0usize; 3];
        for &i in &face.indices {
            if let Some(level) = vertex_levels.get(i as usize) {
                counts[level.index()] += 1;
            }
        }
        let mut best = 0;
        for b in 1..3 {
            if counts[b] > counts[best] {
                best = b;
            }
        }
        band_faces[best].push(f);
    }

    let [gv, mv, tv] = band_vertices;
    let [gf, mf, tf] = band_faces;
    let build = |level: Level, vertices: Vec<u32>, faces: Vec<usize>| LevelMesh {
        level,
        vertices,
        mesh: mesh.subset(&faces, true),
        faces: faces.into_iter().map(|f| f as u32).collect(),
    };

    Ok(Segmentation {
        axis,
        centers,
        boundaries,
        vertex_levels,
        levels: [
            build(Level::Ground, gv, gf),
            build(Level::Mid, mv, mf),
            build(Level::Top, tv, tf),
        ],
    })
}
