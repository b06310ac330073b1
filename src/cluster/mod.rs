//! Clustering primitives for dense embedding vectors.
//!
//! ## K-means
//!
//! Assign each point to the nearest centroid, then move centroids to the mean of their
//! points. Repeat.
//!
//! **Objective**: minimize the within-cluster sum of squares:
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! K-means needs k up front. For label embeddings the right k is rarely known, so
//! [`ClusterSplitter`] scans a range of k and keeps the assignment with the best
//! [`silhouette_score`].
//!
//! ## Usage
//!
//! ```rust
//! use strata::cluster::{ClusterSplitter, Clustering, Kmeans};
//!
//! let data = vec![
//!     vec![1.0, 0.0],
//!     vec![0.9, 0.1],
//!     vec![0.0, 1.0],
//!     vec![0.1, 0.9],
//! ];
//!
//! let labels = Kmeans::new(2).with_seed(42).fit_predict(&data).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//!
//! let split = ClusterSplitter::new().split(&data, 2, 3).unwrap().unwrap();
//! assert_eq!(split.k, 2);
//! ```

mod kmeans;
mod silhouette;
mod split;
mod traits;
pub(crate) mod util;

pub use kmeans::{Kmeans, KmeansFit};
pub use silhouette::silhouette_score;
pub use split::{ClusterSplitter, Selection, Split, Trial};
pub use traits::Clustering;
