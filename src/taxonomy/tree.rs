//! Nested view of a taxonomy: cluster ids as keys, leaf labels at the bottom.
//!
//! ```json
//! { "0": { "0": ["cafe", "tea room"], "1": ["shop"] },
//!   "1": { "0": ["gallery", "museum"] } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::table::{ClusterPath, Taxonomy};
use crate::error::Result;

/// A node of a [`TaxonomyTree`].
///
/// Deserialization goes through [`serde_json::Value`] so that numeric object keys parse
/// at every depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, try_from = "Value")]
pub enum TreeNode {
    /// Sub-clusters keyed by their id within this cluster.
    Branch(BTreeMap<usize, TreeNode>),
    /// Sorted distinct leaf labels of a deepest-layer cluster.
    Leaf(Vec<String>),
}

impl TryFrom<Value> for TreeNode {
    type Error = String;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::String(label) => Ok(label),
                    other => Err(format!("expected a label, found {other}")),
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(TreeNode::Leaf),
            Value::Object(map) => map
                .into_iter()
                .map(|(key, v)| {
                    let id = key
                        .parse::<usize>()
                        .map_err(|_| format!("invalid cluster id {key:?}"))?;
                    Ok((id, TreeNode::try_from(v)?))
                })
                .collect::<std::result::Result<BTreeMap<_, _>, String>>()
                .map(TreeNode::Branch),
            other => Err(format!("expected a cluster or a label list, found {other}")),
        }
    }
}

/// Layer-1 clusters keyed by id, nested down to the deepest layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonomyTree {
    roots: BTreeMap<usize, TreeNode>,
}

impl TaxonomyTree {
    /// Nest every row of `taxonomy` under its cluster path.
    pub fn from_taxonomy(taxonomy: &Taxonomy) -> Self {
        let depth = taxonomy.number_of_layers();
        let mut tree = Self::default();
        if depth == 0 {
            return tree;
        }
        for (path, _) in taxonomy.clusters(depth) {
            let labels = taxonomy.labels_under(&path);
            tree.insert(path.ids(), labels);
        }
        tree
    }

    fn insert(&mut self, ids: &[usize], labels: Vec<String>) {
        let Some((&last, parents)) = ids.split_last() else {
            return;
        };
        let mut level = &mut self.roots;
        for &id in parents {
            let node = level
                .entry(id)
                .or_insert_with(|| TreeNode::Branch(BTreeMap::new()));
            if let TreeNode::Leaf(_) = node {
                *node = TreeNode::Branch(BTreeMap::new());
            }
            let TreeNode::Branch(children) = node else {
                return;
            };
            level = children;
        }
        level.insert(last, TreeNode::Leaf(labels));
    }

    /// Layer-1 clusters.
    pub fn roots(&self) -> &BTreeMap<usize, TreeNode> {
        &self.roots
    }

    /// Node at `path`, if present.
    pub fn get(&self, path: &ClusterPath) -> Option<&TreeNode> {
        let (first, rest) = path.ids().split_first()?;
        let mut node = self.roots.get(first)?;
        for id in rest {
            node = match node {
                TreeNode::Branch(children) => children.get(id)?,
                TreeNode::Leaf(_) => return None,
            };
        }
        Some(node)
    }

    /// Number of layers (0 for an empty tree).
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf(_) => 1,
                TreeNode::Branch(children) => {
                    1 + children.values().map(node_depth).max().unwrap_or(0)
                }
            }
        }
        self.roots.values().map(node_depth).max().unwrap_or(0)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse JSON produced by [`TaxonomyTree::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
