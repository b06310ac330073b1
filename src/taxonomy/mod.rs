//! Multi-layer taxonomies over embedded labels.
//!
//! [`TaxonomyBuilder`] embeds every item's augmented label, partitions all items with
//! [`ClusterSplitter`](crate::cluster::ClusterSplitter), then subdivides each cluster
//! independently, one layer at a time. The result is a [`Taxonomy`]: the input rows,
//! each annotated with one cluster id per layer.
//!
//! Cluster ids below layer 1 are only unique within their parent; a [`ClusterPath`]
//! (the ids from layer 1 down) identifies a cluster globally.
//!
//! Naming clusters is left to a [`ClusterNamer`]; [`TaxonomyEvaluator`] then scores
//! how well the names describe their members.

mod builder;
mod evaluate;
mod item;
mod naming;
mod params;
mod table;
mod tree;

pub use builder::TaxonomyBuilder;
pub use evaluate::{ClusterEvaluation, Evaluation, LayerEvaluation, TaxonomyEvaluator};
pub use item::{normalize_label, DefinitionSource, Definitions, LabeledItem};
pub use naming::{name_clusters, ClusterNamer, ClusterNames};
pub use params::TaxonomyParams;
pub use table::{ClusterPath, GroupReport, LayerReport, Taxonomy, TaxonomyRow};
pub use tree::{TaxonomyTree, TreeNode};
