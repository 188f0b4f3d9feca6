//! K-Means Clustering Module
//! Lloyd's algorithm with k-means++ seeding, used to place the proposed facility.

use crate::config::RunContext;
use crate::data::Dataset;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Iteration cap per restart
pub const MAX_ITERATIONS: usize = 300;
/// Relative convergence tolerance, scaled by the mean feature variance
pub const TOLERANCE: f64 = 1e-4;
/// Number of seeded restarts; the lowest inertia wins
pub const N_INIT: usize = 10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocatorError {
    #[error("{clusters} clusters requested but only {points} points available")]
    TooFewPoints { points: usize, clusters: usize },
}

/// Cluster center in (latitude, longitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CentroidPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Result of a k-means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub centers: Vec<[f64; 2]>,
    pub labels: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
}

/// K-means over two-dimensional points.
#[derive(Debug, Clone)]
pub struct KMeans {
    clusters: usize,
    max_iter: usize,
    tolerance: f64,
    n_init: usize,
    seed: u64,
}

impl KMeans {
    pub fn new(clusters: usize, seed: u64) -> Self {
        Self {
            clusters,
            max_iter: MAX_ITERATIONS,
            tolerance: TOLERANCE,
            n_init: N_INIT,
            seed,
        }
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    /// Fit centers to `points`. Deterministic for a given seed.
    pub fn fit(&self, points: &[[f64; 2]]) -> Result<KMeansFit, LocatorError> {
        if self.clusters == 0 || points.len() < self.clusters {
            return Err(LocatorError::TooFewPoints {
                points: points.len(),
                clusters: self.clusters,
            });
        }

        let tol = Self::scaled_tolerance(points, self.tolerance);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let init = Self::init_plus_plus(points, self.clusters, &mut rng);
        let mut best = self.lloyd(points, init, tol);

        for run in 1..self.n_init {
            let init = Self::init_plus_plus(points, self.clusters, &mut rng);
            let fit = self.lloyd(points, init, tol);
            debug!(run, inertia = fit.inertia, iterations = fit.iterations, "k-means restart");
            if fit.inertia < best.inertia {
                best = fit;
            }
        }

        Ok(best)
    }

    /// Mean per-feature variance times the relative tolerance.
    fn scaled_tolerance(points: &[[f64; 2]], tolerance: f64) -> f64 {
        let n = points.len() as f64;
        let mut variance_sum = 0.0;
        for dim in 0..2 {
            let mean = points.iter().map(|p| p[dim]).sum::<f64>() / n;
            variance_sum += points.iter().map(|p| (p[dim] - mean).powi(2)).sum::<f64>() / n;
        }
        variance_sum / 2.0 * tolerance
    }

    /// k-means++ seeding: each new center is drawn proportionally to squared distance.
    fn init_plus_plus(points: &[[f64; 2]], k: usize, rng: &mut StdRng) -> Vec<[f64; 2]> {
        let mut centers = Vec::with_capacity(k);
        let first = points[rng.gen_range(0..points.len())];
        centers.push(first);

        let mut closest: Vec<f64> = points.iter().map(|p| squared_distance(p, &first)).collect();

        while centers.len() < k {
            let next = match WeightedIndex::new(&closest) {
                Ok(weights) => weights.sample(rng),
                // Every point already coincides with a center
                Err(_) => rng.gen_range(0..points.len()),
            };
            let center = points[next];
            centers.push(center);
            for (dist, p) in closest.iter_mut().zip(points) {
                *dist = dist.min(squared_distance(p, &center));
            }
        }

        centers
    }

    fn lloyd(&self, points: &[[f64; 2]], mut centers: Vec<[f64; 2]>, tol: f64) -> KMeansFit {
        let mut labels = vec![usize::MAX; points.len()];
        let mut iterations = 0;

        for iter in 1..=self.max_iter {
            iterations = iter;
            let new_labels = Self::assign(points, &centers);
            let changed = new_labels != labels;
            labels = new_labels;

            let new_centers = Self::update(points, &labels, &centers);
            let shift: f64 = centers
                .iter()
                .zip(&new_centers)
                .map(|(a, b)| squared_distance(a, b))
                .sum();
            centers = new_centers;

            if !changed || shift <= tol {
                break;
            }
        }

        let labels = Self::assign(points, &centers);
        let inertia = points
            .iter()
            .zip(&labels)
            .map(|(p, &l)| squared_distance(p, &centers[l]))
            .sum();

        KMeansFit {
            centers,
            labels,
            inertia,
            iterations,
        }
    }

    /// Nearest-center label for every point (ties go to the lower index).
    fn assign(points: &[[f64; 2]], centers: &[[f64; 2]]) -> Vec<usize> {
        points
            .par_iter()
            .map(|p| {
                let mut best = 0;
                let mut best_dist = f64::INFINITY;
                for (idx, c) in centers.iter().enumerate() {
                    let d = squared_distance(p, c);
                    if d < best_dist {
                        best = idx;
                        best_dist = d;
                    }
                }
                best
            })
            .collect()
    }

    /// Recompute centers as member means. Sums run sequentially so results are reproducible.
    fn update(points: &[[f64; 2]], labels: &[usize], previous: &[[f64; 2]]) -> Vec<[f64; 2]> {
        let k = previous.len();
        let mut sums = vec![[0.0f64; 2]; k];
        let mut counts = vec![0usize; k];

        for (p, &label) in points.iter().zip(labels) {
            sums[label][0] += p[0];
            sums[label][1] += p[1];
            counts[label] += 1;
        }

        let mut centers: Vec<[f64; 2]> = (0..k)
            .map(|i| {
                if counts[i] == 0 {
                    previous[i]
                } else {
                    [sums[i][0] / counts[i] as f64, sums[i][1] / counts[i] as f64]
                }
            })
            .collect();

        // Empty clusters take the point farthest from its own center
        let mut taken = vec![false; points.len()];
        for i in (0..k).filter(|&i| counts[i] == 0) {
            let farthest = points
                .iter()
                .enumerate()
                .filter(|(idx, _)| !taken[*idx])
                .map(|(idx, p)| (idx, squared_distance(p, &previous[labels[idx]])))
                .fold(None, |acc: Option<(usize, f64)>, (idx, d)| match acc {
                    Some((_, best)) if best >= d => acc,
                    _ => Some((idx, d)),
                });
            if let Some((idx, _)) = farthest {
                taken[idx] = true;
                centers[i] = points[idx];
            }
        }

        centers
    }
}

fn squared_distance(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

/// Places the proposed facility at the k-means center(s) of all school coordinates.
pub struct Locator;

impl Locator {
    /// `Ok(None)` when the dataset is empty.
    pub fn locate(
        dataset: &Dataset,
        ctx: &RunContext,
    ) -> Result<Option<Vec<CentroidPoint>>, LocatorError> {
        if dataset.is_empty() {
            return Ok(None);
        }

        let fit = KMeans::new(ctx.cluster_count.get(), ctx.seed).fit(&dataset.coordinates())?;
        info!(
            clusters = fit.centers.len(),
            inertia = fit.inertia,
            iterations = fit.iterations,
            "clustering converged"
        );

        Ok(Some(
            fit.centers
                .iter()
                .map(|c| CentroidPoint {
                    latitude: c[0],
                    longitude: c[1],
                })
                .collect(),
        ))
    }
}
