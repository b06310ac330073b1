//! Automatic k selection: run k-means for every k in a range, keep the best silhouette.

use super::kmeans::Kmeans;
use super::silhouette::silhouette_score;
use super::util::{normalize_in_place, to_matrix};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which silhouette scores are allowed to win the k scan.
///
/// Selection is always a strict `>` against the running best, starting from a floor,
/// and k is scanned in increasing order, so the lowest k wins ties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Floor of `0.0`: a range where every score is `<= 0` yields no split.
    #[default]
    PositiveOnly,
    /// No floor: the best scorable k wins even when its score is negative.
    BestAvailable,
}

impl Selection {
    fn floor(self) -> f64 {
        match self {
            Selection::PositiveOnly => 0.0,
            Selection::BestAvailable => f64::NEG_INFINITY,
        }
    }
}

/// One k-means trial in the scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// Requested number of clusters.
    pub k: usize,
    /// Number of clusters k-means actually produced.
    pub distinct: usize,
    /// Silhouette score, `None` when undefined for this assignment.
    pub score: Option<f64>,
}

/// The winning assignment of a k scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    /// Winning k.
    pub k: usize,
    /// Cluster label per input point, renumbered to `0..distinct`.
    pub labels: Vec<usize>,
    /// Silhouette score of `labels`.
    pub score: f64,
    /// Every trial of the scan, in k order.
    pub trials: Vec<Trial>,
}

/// Splits a set of embeddings into the k (within a range) with the best silhouette.
#[derive(Debug, Clone)]
pub struct ClusterSplitter {
    n_init: usize,
    seed: u64,
    selection: Selection,
}

impl Default for ClusterSplitter {
    fn default() -> Self {
        Self {
            n_init: 10,
            seed: 42,
            selection: Selection::PositiveOnly,
        }
    }
}

impl ClusterSplitter {
    /// Splitter with 10 k-means restarts, seed 42 and [`Selection::PositiveOnly`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of k-means restarts per k.
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set the k-means seed. Every k uses the same seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the selection floor.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Scan `k` in `min_k..=max_k` and return the best-scoring assignment.
    ///
    /// Embeddings are L2-normalized before clustering. Returns `Ok(None)` when no k
    /// beats the selection floor.
    ///
    /// # Errors
    ///
    /// `min_k < 2`, `max_k < min_k`, fewer points than `max_k`, empty or ragged input.
    pub fn split<V: AsRef<[f32]>>(
        &self,
        embeddings: &[V],
        min_k: usize,
        max_k: usize,
    ) -> Result<Option<Split>> {
        if min_k < 2 {
            return Err(Error::InvalidParameter {
                name: "min_k",
                message: "must be at least 2",
            });
        }
        if max_k < min_k {
            return Err(Error::InvalidParameter {
                name: "max_k",
                message: "must be at least min_k",
            });
        }

        let mut data = to_matrix(embeddings)?;
        if data.len() < max_k {
            return Err(Error::InvalidClusterCount {
                requested: max_k,
                n_items: data.len(),
            });
        }
        for row in &mut data {
            normalize_in_place(row);
        }

        let mut trials = Vec::with_capacity(max_k - min_k + 1);
        let mut highest = self.selection.floor();
        let mut best: Option<(usize, Vec<usize>, f64)> = None;

        for k in min_k..=max_k {
            let fit = Kmeans::new(k)
                .with_n_init(self.n_init)
                .with_seed(self.seed)
                .fit(&data)?;
            let distinct = fit.n_distinct();
            let score = if distinct > 1 {
                silhouette_score(&data, &fit.labels)
            } else {
                None
            };
            debug!(k, distinct, score, "k-means trial");
            trials.push(Trial { k, distinct, score });

            if let Some(s) = score {
                if s > highest {
                    highest = s;
                    best = Some((k, fit.labels, s));
                }
            }
        }

        Ok(best.map(|(k, labels, score)| Split {
            k,
            labels: compact_labels(&labels),
            score,
            trials,
        }))
    }
}

/// Renumber labels to `0..distinct`, keeping their relative order.
fn compact_labels(labels: &[usize]) -> Vec<usize> {
    let mut ids = labels.to_vec();
    ids.sort_unstable();
    ids.dedup();
    labels
        .iter()
        .map(|l| ids.partition_point(|id| id < l))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directions() -> Vec<Vec<f32>> {
        // Three tight bundles of directions on the unit circle (scaled to test renormalization).
        vec![
            vec![1.0, 0.0],
            vec![2.0, 0.1],
            vec![0.9, -0.05],
            vec![0.0, 1.0],
            vec![0.1, 3.0],
            vec![-0.05, 0.8],
            vec![-1.0, 0.0],
            vec![-4.0, 0.1],
            vec![-1.0, -0.1],
        ]
    }

    #[test]
    fn picks_the_natural_k() {
        let split = ClusterSplitter::new()
            .split(&directions(), 2, 5)
            .unwrap()
            .expect("positive silhouette expected");
        assert_eq!(split.k, 3);
        assert_eq!(split.trials.len(), 4);
        assert!(split.score > 0.5);
        assert_eq!(split.labels[0], split.labels[1]);
        assert_eq!(split.labels[3], split.labels[4]);
        assert_eq!(split.labels[6], split.labels[7]);
        assert_ne!(split.labels[0], split.labels[3]);
    }

    #[test]
    fn labels_are_compacted() {
        assert_eq!(compact_labels(&[2, 0, 2, 5]), vec![1, 0, 1, 2]);
        assert_eq!(compact_labels(&[3, 3]), vec![0, 0]);
    }

    #[test]
    fn repeated_splits_are_identical() {
        let splitter = ClusterSplitter::new().with_seed(9);
        let a = splitter.split(&directions(), 2, 4).unwrap();
        let b = splitter.split(&directions(), 2, 4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn lowest_k_wins_ties() {
        // Only two distinct directions: k = 3 reproduces the k = 2 assignment.
        let data = vec![
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        ];
        let split = ClusterSplitter::new().split(&data, 2, 3).unwrap().unwrap();
        assert_eq!(split.k, 2);
        let k3 = split.trials[1];
        assert_eq!(k3.k, 3);
        assert_eq!(k3.distinct, 2);
        assert_eq!(k3.score, Some(split.score));
    }

    #[test]
    fn identical_points_yield_nothing() {
        let data = vec![vec![0.5, 0.5]; 5];
        let split = ClusterSplitter::new()
            .with_selection(Selection::BestAvailable)
            .split(&data, 2, 3)
            .unwrap();
        assert!(split.is_none());
    }

    /// Orthonormal vectors: every pair is the same distance apart, so every assignment
    /// scores exactly zero.
    fn simplex() -> Vec<Vec<f32>> {
        (0..4)
            .map(|i| {
                let mut v = vec![0.0; 4];
                v[i] = 1.0;
                v
            })
            .collect()
    }

    #[test]
    fn zero_scores_only_pass_without_a_floor() {
        let none = ClusterSplitter::new().split(&simplex(), 2, 3).unwrap();
        assert!(none.is_none());

        let split = ClusterSplitter::new()
            .with_selection(Selection::BestAvailable)
            .split(&simplex(), 2, 3)
            .unwrap()
            .unwrap();
        assert_eq!(split.k, 2);
        assert_eq!(split.score, 0.0);
        assert_eq!(split.trials.len(), 2);
        assert!(split.trials.iter().all(|t| t.score == Some(0.0)));
    }

    #[test]
    fn rejects_bad_ranges() {
        let data = directions();
        let splitter = ClusterSplitter::new();
        assert!(matches!(
            splitter.split(&data, 1, 3),
            Err(Error::InvalidParameter { name: "min_k", .. })
        ));
        assert!(matches!(
            splitter.split(&data, 4, 3),
            Err(Error::InvalidParameter { name: "max_k", .. })
        ));
        assert!(matches!(
            splitter.split(&data, 2, 10),
            Err(Error::InvalidClusterCount {
                requested: 10,
                n_items: 9
            })
        ));
    }
}
