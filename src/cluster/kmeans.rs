//! K-means with k-means++ seeding and Lloyd iterations.
//!
//! Each fit runs `n_init` independent restarts from a single seeded RNG and keeps the
//! run with the lowest inertia (first one wins ties), so a fixed seed gives a fixed
//! assignment.
//!
//! ## Convergence
//!
//! A run stops when no label changes, or when the total squared centroid shift drops
//! to `tol` times the mean per-dimension variance of the data, or after `max_iter`
//! iterations.
//!
//! ## Empty clusters
//!
//! A centroid that loses all of its points is moved onto the point farthest from its
//! own centroid, so every run ends with exactly `k` centroids.

use super::traits::Clustering;
use super::util::{squared_euclidean, to_matrix};
use crate::error::{Error, Result};
use rand::prelude::*;

/// K-means clusterer.
#[derive(Debug, Clone)]
pub struct Kmeans {
    k: usize,
    max_iter: usize,
    tol: f64,
    n_init: usize,
    seed: Option<u64>,
}

/// Result of a k-means fit.
#[derive(Debug, Clone)]
pub struct KmeansFit {
    /// Cluster label per input point, in `0..k`.
    pub labels: Vec<usize>,
    /// Final centroids, one per cluster.
    pub centroids: Vec<Vec<f32>>,
    /// Sum of squared distances from each point to its centroid.
    pub inertia: f64,
    /// Lloyd iterations used by the winning restart.
    pub n_iter: usize,
}

impl KmeansFit {
    /// Number of distinct labels actually used.
    ///
    /// Can be lower than `k` when the data has fewer distinct points than clusters.
    pub fn n_distinct(&self) -> usize {
        let mut seen = vec![false; self.centroids.len()];
        for &l in &self.labels {
            seen[l] = true;
        }
        seen.into_iter().filter(|&s| s).count()
    }
}

impl Kmeans {
    /// Create a k-means clusterer for `k` clusters.
    ///
    /// Defaults: 300 iterations, tolerance `1e-4`, 10 restarts, unseeded.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 300,
            tol: 1e-4,
            n_init: 10,
            seed: None,
        }
    }

    /// Set the maximum number of Lloyd iterations per restart.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the relative convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the number of restarts.
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Fix the RNG seed for reproducible fits.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Fit on dense vectors.
    pub fn fit(&self, data: &[Vec<f32>]) -> Result<KmeansFit> {
        let data = to_matrix(data)?;
        let n = data.len();

        if self.k == 0 {
            return Err(Error::InvalidParameter {
                name: "k",
                message: "must be at least 1",
            });
        }
        if self.k > n {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: n,
            });
        }
        if self.n_init == 0 {
            return Err(Error::InvalidParameter {
                name: "n_init",
                message: "must be at least 1",
            });
        }

        let mut rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        let tol = self.tol * mean_variance(&data);

        let mut best: Option<KmeansFit> = None;
        for _ in 0..self.n_init {
            let run = self.lloyd(&data, tol, &mut rng);
            if best.as_ref().is_none_or(|b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }
        best.ok_or(Error::EmptyInput)
    }

    fn lloyd(&self, data: &[Vec<f32>], tol: f64, rng: &mut StdRng) -> KmeansFit {
        let n = data.len();
        let d = data[0].len();
        let mut centroids = init_plus_plus(data, self.k, rng);
        let mut labels = vec![usize::MAX; n];
        let mut n_iter = 0;

        for _ in 0..self.max_iter {
            n_iter += 1;

            let mut changed = false;
            for (i, point) in data.iter().enumerate() {
                let (c, _) = nearest(point, &centroids);
                if labels[i] != c {
                    labels[i] = c;
                    changed = true;
                }
            }
            if !changed {
                break;
            }

            let mut sums = vec![vec![0.0f64; d]; self.k];
            let mut counts = vec![0usize; self.k];
            for (point, &l) in data.iter().zip(labels.iter()) {
                counts[l] += 1;
                for (s, &x) in sums[l].iter_mut().zip(point.iter()) {
                    *s += f64::from(x);
                }
            }

            let mut updated: Vec<Vec<f32>> = sums
                .iter()
                .zip(counts.iter())
                .zip(centroids.iter())
                .map(|((sum, &count), old)| {
                    if count == 0 {
                        old.clone()
                    } else {
                        sum.iter().map(|s| (s / count as f64) as f32).collect()
                    }
                })
                .collect();

            // Relocate empty clusters onto the worst-fitting points.
            let mut taken = vec![false; n];
            for c in (0..self.k).filter(|&c| counts[c] == 0) {
                let far = data
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !taken[*i])
                    .map(|(i, p)| (i, squared_euclidean(p, &updated[labels[i]])))
                    .max_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(i, _)| i);
                if let Some(i) = far {
                    taken[i] = true;
                    updated[c] = data[i].clone();
                    labels[i] = c;
                }
            }

            let shift: f64 = centroids
                .iter()
                .zip(updated.iter())
                .map(|(a, b)| f64::from(squared_euclidean(a, b)))
                .sum();
            centroids = updated;
            if shift <= tol {
                break;
            }
        }

        // Final assignment against the final centroids.
        let mut inertia = 0.0;
        for (i, point) in data.iter().enumerate() {
            let (c, dist) = nearest(point, &centroids);
            labels[i] = c;
            inertia += f64::from(dist);
        }

        KmeansFit {
            labels,
            centroids,
            inertia,
            n_iter,
        }
    }
}

impl Clustering for Kmeans {
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>> {
        Ok(self.fit(data)?.labels)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

/// Index of and squared distance to the nearest centroid. Ties go to the lowest index.
fn nearest(point: &[f32], centroids: &[Vec<f32>]) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    for (c, centroid) in centroids.iter().enumerate() {
        let dist = squared_euclidean(point, centroid);
        if dist < best.1 {
            best = (c, dist);
        }
    }
    best
}

/// k-means++ seeding: first centre uniform, each next one sampled proportionally to
/// the squared distance from the closest centre chosen so far.
fn init_plus_plus(data: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let n = data.len();
    let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);
    centroids.push(data[rng.random_range(0..n)].clone());

    let mut closest: Vec<f64> = data
        .iter()
        .map(|p| f64::from(squared_euclidean(p, &centroids[0])))
        .collect();

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();
        let idx = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut acc = 0.0;
            let mut pick = n - 1;
            for (i, &w) in closest.iter().enumerate() {
                acc += w;
                if acc > target {
                    pick = i;
                    break;
                }
            }
            pick
        } else {
            // All remaining mass is zero: every point coincides with a centre.
            rng.random_range(0..n)
        };

        let centre = data[idx].clone();
        for (c, p) in closest.iter_mut().zip(data.iter()) {
            *c = c.min(f64::from(squared_euclidean(p, &centre)));
        }
        centroids.push(centre);
    }
    centroids
}

fn mean_variance(data: &[Vec<f32>]) -> f64 {
    let n = data.len() as f64;
    let d = data[0].len();
    let mut total = 0.0;
    for j in 0..d {
        let mean = data.iter().map(|p| f64::from(p[j])).sum::<f64>() / n;
        total += data
            .iter()
            .map(|p| {
                let x = f64::from(p[j]) - mean;
                x * x
            })
            .sum::<f64>()
            / n;
    }
    total / d as f64
}
