//! Layered label taxonomies.
//!
//! `strata` turns a flat set of short text labels into a multi-layer taxonomy:
//! labels are embedded through an injected [`TextEncoder`], partitioned with k-means
//! (k chosen by silhouette score), and every cluster is subdivided again, layer by layer.
//!
//! The public API is split in two:
//! - [`cluster`]: k-means, silhouette scoring, and the k-selecting [`ClusterSplitter`]
//! - [`taxonomy`]: the [`TaxonomyBuilder`], the annotated [`Taxonomy`] table, and the
//!   coherence/coverage [`TaxonomyEvaluator`]

#![forbid(unsafe_code)]

pub mod cache;
pub mod cluster;
pub mod encoder;
pub mod error;
pub mod taxonomy;

pub use cache::EmbeddingCache;
pub use cluster::{
    silhouette_score, ClusterSplitter, Clustering, Kmeans, KmeansFit, Selection, Split, Trial,
};
pub use encoder::TextEncoder;
pub use error::{Error, Result};
pub use taxonomy::{
    name_clusters, ClusterEvaluation, ClusterNamer, ClusterNames, ClusterPath, DefinitionSource,
    Definitions, Evaluation, GroupReport, LabeledItem, LayerEvaluation, LayerReport, Taxonomy,
    TaxonomyBuilder, TaxonomyEvaluator, TaxonomyParams, TaxonomyRow, TaxonomyTree, TreeNode,
};
