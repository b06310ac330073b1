use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::item::LabeledItem;

/// Cluster ids from layer 1 down to some layer; the global key of a cluster.
///
/// A path of length `i` names a layer-`i` cluster. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterPath(Vec<usize>);

impl ClusterPath {
    /// The root (every item).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Layer of the cluster this path names (0 for the root).
    pub fn layer(&self) -> usize {
        self.0.len()
    }

    /// Cluster ids, layer 1 first.
    pub fn ids(&self) -> &[usize] {
        &self.0
    }

    /// Id within the parent, or `None` for the root.
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Path of the enclosing cluster, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.0.split_last()?;
        Some(Self(head.to_vec()))
    }

    /// Path of sub-cluster `id`.
    pub fn child(&self, id: usize) -> Self {
        let mut ids = self.0.clone();
        ids.push(id);
        Self(ids)
    }

    /// Whether `self` equals `other` or encloses it.
    pub fn contains(&self, other: &ClusterPath) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl From<Vec<usize>> for ClusterPath {
    fn from(ids: Vec<usize>) -> Self {
        Self(ids)
    }
}

impl fmt::Display for ClusterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("root");
        }
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

/// One annotated row of a taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyRow {
    /// The input item.
    pub item: LabeledItem,
    /// The text that was embedded.
    pub augmented_label: String,
    /// Embedding of `augmented_label`, shared with every row with the same text.
    pub embedding: Arc<[f32]>,
    /// Cluster id per layer; `clusters[0]` is layer 1. Ids are unique within the parent.
    pub clusters: Vec<usize>,
}

impl TaxonomyRow {
    /// Cluster id at `layer` (1-based).
    pub fn cluster(&self, layer: usize) -> Option<usize> {
        layer.checked_sub(1).and_then(|i| self.clusters.get(i).copied())
    }

    /// Path of this row's cluster at `layer` (1-based), clamped to the built layers.
    pub fn path(&self, layer: usize) -> ClusterPath {
        ClusterPath(self.clusters[..layer.min(self.clusters.len())].to_vec())
    }
}

/// How one group was split at one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupReport {
    /// The group that was split (root at layer 1).
    pub parent: ClusterPath,
    /// Number of rows in the group.
    pub size: usize,
    /// Number of sub-clusters assigned.
    pub k: usize,
    /// Silhouette of the winning split; `None` when the group was left whole.
    pub score: Option<f64>,
}

impl GroupReport {
    /// Whether the group was left whole (one sub-cluster, no score).
    pub fn abstained(&self) -> bool {
        self.score.is_none()
    }
}

/// Split reports for one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerReport {
    /// 1-based layer number.
    pub layer: usize,
    /// One report per parent group, in path order.
    pub groups: Vec<GroupReport>,
}

/// Items annotated with one cluster id per layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub(crate) rows: Vec<TaxonomyRow>,
    pub(crate) layers: Vec<LayerReport>,
}

impl Taxonomy {
    /// Rows, in input order.
    pub fn rows(&self) -> &[TaxonomyRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the taxonomy has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of layers built.
    pub fn number_of_layers(&self) -> usize {
        self.layers.len()
    }

    /// Split reports, layer 1 first.
    pub fn layer_reports(&self) -> &[LayerReport] {
        &self.layers
    }

    /// Row indices of every cluster at `layer`, keyed by path.
    pub fn clusters(&self, layer: usize) -> BTreeMap<ClusterPath, Vec<usize>> {
        let mut out: BTreeMap<ClusterPath, Vec<usize>> = BTreeMap::new();
        for (i, row) in self.rows.iter().enumerate() {
            out.entry(row.path(layer)).or_default().push(i);
        }
        out
    }

    /// Sorted distinct leaf labels under `path`.
    pub fn labels_under(&self, path: &ClusterPath) -> Vec<String> {
        let mut labels: Vec<String> = self
            .rows
            .iter()
            .filter(|r| path.contains(&r.path(path.layer())))
            .map(|r| r.item.label.clone())
            .collect();
        labels.sort();
        labels.dedup();
        labels
    }
}
