use std::collections::HashMap;

use tracing::debug;

use super::table::{ClusterPath, Taxonomy};
use crate::error::{Error, Result};

/// Cluster names keyed by path.
pub type ClusterNames = HashMap<ClusterPath, String>;

/// Turns the leaf labels of a cluster into a short human-readable name.
///
/// Usually backed by a text-generation model; the taxonomy code only consumes the names.
pub trait ClusterNamer {
    /// Name a cluster from its sorted, distinct leaf labels.
    fn name_cluster(&self, members: &[String]) -> Result<String>;
}

impl<F> ClusterNamer for F
where
    F: Fn(&[String]) -> Result<String>,
{
    fn name_cluster(&self, members: &[String]) -> Result<String> {
        self(members)
    }
}

/// Name every cluster of layers `1..=layer_count`.
///
/// The namer is called once per cluster, with that cluster's sorted distinct labels.
pub fn name_clusters<N: ClusterNamer + ?Sized>(
    taxonomy: &Taxonomy,
    layer_count: usize,
    namer: &N,
) -> Result<ClusterNames> {
    if layer_count > taxonomy.number_of_layers() {
        return Err(Error::InvalidParameter {
            name: "layer_count",
            message: "exceeds the number of layers in the taxonomy",
        });
    }

    let mut names = ClusterNames::new();
    for layer in 1..=layer_count {
        for path in taxonomy.clusters(layer).into_keys() {
            let members = taxonomy.labels_under(&path);
            let name = namer.name_cluster(&members)?;
            debug!(%path, members = members.len(), name = %name, "named cluster");
            names.insert(path, name);
        }
    }
    Ok(names)
}
