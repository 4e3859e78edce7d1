// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generic RANSAC and the 2-D similarity model used for floor rotation

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A model that can be fitted to a subset of data and scored per datum
pub trait RobustModel: Sized {
    type Datum;

    /// Size of a minimal sample
    const SAMPLE_SIZE: usize;

    /// Fit to the data at `indices`. Must accept any count `>= SAMPLE_SIZE`;
    /// returns `None` for degenerate samples.
    fn fit(data: &[Self::Datum], indices: &[usize]) -> Option<Self>;

    /// Distance of a datum from the model
    fn residual(&self, datum: &Self::Datum) -> f64;
}

/// RANSAC parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
    /// Hard cap on sampling rounds
    pub max_iters: usize,
    /// Residual below which a datum counts as inlier
    pub inlier_threshold: f64,
    /// Minimum consensus size for a valid fit
    pub min_inliers: usize,
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iters: 1000,
            inlier_threshold: 3.0,
            min_inliers: 6,
            seed: 0x5eed,
        }
    }
}

/// Best model and the data indices that support it
#[derive(Debug, Clone)]
pub struct RansacResult<M> {
    pub model: M,
    pub inliers: Vec<usize>,
}

/// Sample `k` distinct indices from `0..n` using Fisher–Yates partial shuffle.
fn sample_indices(rng: &mut impl rand::Rng, n: usize, k: usize) -> Vec<usize> {
    debug_assert!(k <= n);
    let mut indices: Vec<usize> = (0..n).collect();
    for i in 0..k {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
    indices.truncate(k);
    indices
}

fn inliers_of<M: RobustModel>(model: &M, data: &[M::Datum], threshold: f64) -> Vec<usize> {
    data.iter()
        .enumerate()
        .filter(|(_, d)| model.residual(d) < threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Fit `M` robustly.
///
/// Draws minimal samples from a seeded RNG for at most `max_iters` rounds,
/// keeps the model with the largest consensus, then refits it on all of its
/// inliers. The same data and seed always give the same result.
pub fn ransac<M: RobustModel>(data: &[M::Datum], config: &RansacConfig) -> Result<RansacResult<M>> {
    use rand::prelude::*;

    let n = data.len();
    let required = M::SAMPLE_SIZE.max(config.min_inliers);
    if n < required {
        return Err(Error::InsufficientFeatures {
            stage: "matches",
            found: n,
            required,
        });
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<(M, Vec<usize>)> = None;

    for _ in 0..config.max_iters {
        let sample = sample_indices(&mut rng, n, M::SAMPLE_SIZE);
        let Some(model) = M::fit(data, &sample) else {
            continue;
        };
        let inliers = inliers_of(&model, data, config.inlier_threshold);
        if best.as_ref().map_or(true, |(_, b)| inliers.len() > b.len()) {
            let done = inliers.len() * 10 > n * 9;
            best = Some((model, inliers));
            // Early exit: if >90% of points are inliers, stop searching
            if done {
                break;
            }
        }
    }

    let (model, inliers) = best.ok_or(Error::NoConsensus {
        inliers: 0,
        required: config.min_inliers,
    })?;
    if inliers.len() < config.min_inliers {
        return Err(Error::NoConsensus {
            inliers: inliers.len(),
            required: config.min_inliers,
        });
    }

    // Re-fit to all inliers, keep the sample model if that degenerates
    let refit = M::fit(data, &inliers).and_then(|m| {
        let support = inliers_of(&m, data, config.inlier_threshold);
        (support.len() >= inliers.len()).then_some((m, support))
    });
    let (model, inliers) = refit.unwrap_or((model, inliers));

    Ok(RansacResult { model, inliers })
}

/// Point correspondence `from -> to`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPair {
    pub from: [f64; 2],
    pub to: [f64; 2],
}

/// 2-D similarity `to = a * from + t` with `a` a complex number
/// (`a = s * e^{i theta}`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity2 {
    pub a: [f64; 2],
    pub t: [f64; 2],
}

impl Similarity2 {
    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [
            self.a[0] * p[0] - self.a[1] * p[1] + self.t[0],
            self.a[1] * p[0] + self.a[0] * p[1] + self.t[1],
        ]
    }

    /// Rotation in degrees, normalized to [0, 360)
    pub fn angle_deg(&self) -> f64 {
        let deg = self.a[1].atan2(self.a[0]).to_degrees();
        let wrapped = deg.rem_euclid(360.0);
        if wrapped >= 360.0 {
            0.0
        } else {
            wrapped
        }
    }

    pub fn scale(&self) -> f64 {
        (self.a[0] * self.a[0] + self.a[1] * self.a[1]).sqrt()
    }
}

impl RobustModel for Similarity2 {
    type Datum = PointPair;
    const SAMPLE_SIZE: usize = 2;

    /// Least squares over the selected pairs (exact for two)
    fn fit(data: &[PointPair], indices: &[usize]) -> Option<Self> {
        if indices.len() < Self::SAMPLE_SIZE {
            return None;
        }
        let k = indices.len() as f64;
        let mut pc = [0.0; 2];
        let mut qc = [0.0; 2];
        for &i in indices {
            pc[0] += data[i].from[0];
            pc[1] += data[i].from[1];
            qc[0] += data[i].to[0];
            qc[1] += data[i].to[1];
        }
        pc = pc.map(|v| v / k);
        qc = qc.map(|v| v / k);

        // a = sum(q' * conj(p')) / sum(|p'|^2)
        let mut num = [0.0; 2];
        let mut den = 0.0;
        for &i in indices {
            let p = [data[i].from[0] - pc[0], data[i].from[1] - pc[1]];
            let q = [data[i].to[0] - qc[0], data[i].to[1] - qc[1]];
            num[0] += q[0] * p[0] + q[1] * p[1];
            num[1] += q[1] * p[0] - q[0] * p[1];
            den += p[0] * p[0] + p[1] * p[1];
        }
        if den < 1e-9 {
            return None;
        }
        let a = [num[0] / den, num[1] / den];
        let t = [
            qc[0] - (a[0] * pc[0] - a[1] * pc[1]),
            qc[1] - (a[1] * pc[0] + a[0] * pc[1]),
        ];
        Some(Self { a, t })
    }

    fn residual(&self, datum: &PointPair) -> f64 {
        let p = self.apply(datum.from);
        let dx = p[0] - datum.to[0];
        let dy = p[1] - datum.to[1];
        (dx * dx + dy * dy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::prelude::*;

    fn rotated_pairs(angle_deg: f64, n: usize, outliers: usize, seed: u64) -> Vec<PointPair> {
        let (s, c) = angle_deg.to_radians().sin_cos();
        let truth = Similarity2 {
            a: [c, s],
            t: [40.0, -12.0],
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let mut pairs: Vec<PointPair> = (0..n)
            .map(|_| {
                let from = [rng.gen_range(0.0..200.0), rng.gen_range(0.0..200.0)];
                PointPair { from, to: truth.apply(from) }
            })
            .collect();
        for i in 0..outliers {
            pairs[i * 3].to = [rng.gen_range(0.0..200.0), rng.gen_range(0.0..200.0)];
        }
        pairs
    }

    #[test]
    fn test_similarity_from_two_points() {
        let data = vec![
            PointPair { from: [0.0, 0.0], to: [5.0, 5.0] },
            PointPair { from: [1.0, 0.0], to: [5.0, 6.0] },
        ];
        let m = Similarity2::fit(&data, &[0, 1]).unwrap();
        assert_relative_eq!(m.angle_deg(), 90.0, epsilon = 1e-9);
        assert_relative_eq!(m.scale(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(m.t[0], 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_coincident_points_are_degenerate() {
        let data = vec![
            PointPair { from: [3.0, 3.0], to: [0.0, 0.0] },
            PointPair { from: [3.0, 3.0], to: [1.0, 0.0] },
        ];
        assert!(Similarity2::fit(&data, &[0, 1]).is_none());
    }

    #[test]
    fn test_ransac_rejects_outliers() {
        let data = rotated_pairs(270.0, 60, 15, 3);
        let config = RansacConfig::default();
        let result = ransac::<Similarity2>(&data, &config).unwrap();

        assert_relative_eq!(result.model.angle_deg(), 270.0, epsilon = 1e-6);
        assert_eq!(result.inliers.len(), 45);
        assert!(result.inliers.iter().all(|i| i % 3 != 0 || *i >= 45));
    }

    #[test]
    fn test_ransac_is_deterministic() {
        let data = rotated_pairs(33.0, 40, 10, 9);
        let config = RansacConfig::default();
        let a = ransac::<Similarity2>(&data, &config).unwrap();
        let b = ransac::<Similarity2>(&data, &config).unwrap();
        assert_eq!(a.model, b.model);
        assert_eq!(a.inliers, b.inliers);
    }

    #[test]
    fn test_ransac_too_few() {
        let data = rotated_pairs(0.0, 3, 0, 1);
        assert!(matches!(
            ransac::<Similarity2>(&data, &RansacConfig::default()),
            Err(Error::InsufficientFeatures { found: 3, .. })
        ));
    }

    #[test]
    fn test_ransac_no_consensus() {
        let mut rng = StdRng::seed_from_u64(5);
        let data: Vec<PointPair> = (0..20)
            .map(|_| PointPair {
                from: [rng.gen_range(0.0..500.0), rng.gen_range(0.0..500.0)],
                to: [rng.gen_range(0.0..500.0), rng.gen_range(0.0..500.0)],
            })
            .collect();
        let config = RansacConfig {
            min_inliers: 10,
            inlier_threshold: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            ransac::<Similarity2>(&data, &config),
            Err(Error::NoConsensus { .. })
        ));
    }
}
