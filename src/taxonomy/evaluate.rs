//! Coherence and coverage of a named taxonomy.
//!
//! For every row and layer, the similarity between the row's leaf label and the name of
//! its cluster is the dot product of their (normalized) embeddings. Per cluster:
//!
//! - **mean** similarity feeds *coherence*;
//! - **10th percentile** similarity feeds *coverage*, which stays low when a few members
//!   are badly described even if the mean looks fine.
//!
//! Rows repeating a label within the same deepest evaluated cluster are scored once.
//! Clusters are combined per layer with a size-weighted mean; layers are combined with a
//! plain mean. Layers without any named cluster are skipped, and a taxonomy without any
//! scored layer yields `NaN`.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::naming::ClusterNames;
use super::table::{ClusterPath, Taxonomy, TaxonomyRow};
use crate::cluster::util::{dot, normalize_in_place};
use crate::encoder::TextEncoder;
use crate::error::{Error, Result};

/// Scores for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterEvaluation {
    /// The cluster.
    pub path: ClusterPath,
    /// Distinct labels scored in the cluster (the weight of its scores).
    pub size: usize,
    /// Mean label/name similarity.
    pub mean: f64,
    /// Low-quantile label/name similarity.
    pub low_quantile: f64,
}

/// Scores for one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEvaluation {
    /// 1-based layer number.
    pub layer: usize,
    /// Size-weighted mean of cluster means (`NaN` when nothing was scored).
    pub coherence: f64,
    /// Size-weighted mean of cluster low quantiles (`NaN` when nothing was scored).
    pub coverage: f64,
    /// Per-cluster scores, in path order.
    pub clusters: Vec<ClusterEvaluation>,
}

/// Scores for a whole taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Mean of layer coherences.
    pub coherence: f64,
    /// Mean of layer coverages.
    pub coverage: f64,
    /// Per-layer scores, layer 1 first.
    pub layers: Vec<LayerEvaluation>,
}

/// Scores cluster names against cluster members with an embedding model.
#[derive(Debug)]
pub struct TaxonomyEvaluator<E> {
    encoder: E,
    quantile: f64,
}

impl<E: TextEncoder> TaxonomyEvaluator<E> {
    /// Evaluator using `encoder` and the 10th percentile for coverage.
    pub fn new(encoder: E) -> Self {
        Self {
            encoder,
            quantile: 0.10,
        }
    }

    /// Use another quantile (in `[0, 1]`) for coverage.
    pub fn with_quantile(mut self, quantile: f64) -> Self {
        self.quantile = quantile;
        self
    }

    /// Score layers `1..=layer_count` of `taxonomy` against `names`.
    ///
    /// Rows whose cluster has no name are ignored. A label that repeats under the same
    /// layer `layer_count` path counts once.
    pub fn evaluate(
        &self,
        taxonomy: &Taxonomy,
        layer_count: usize,
        names: &ClusterNames,
    ) -> Result<Evaluation> {
        if layer_count > taxonomy.number_of_layers() {
            return Err(Error::InvalidParameter {
                name: "layer_count",
                message: "exceeds the number of layers in the taxonomy",
            });
        }
        if !(0.0..=1.0).contains(&self.quantile) {
            return Err(Error::InvalidParameter {
                name: "quantile",
                message: "must be within [0, 1]",
            });
        }

        let rows = distinct_rows(taxonomy, layer_count);
        let layers = (1..=layer_count)
            .map(|layer| self.evaluate_layer(&rows, layer, names))
            .collect::<Result<Vec<_>>>()?;

        let scored: Vec<&LayerEvaluation> =
            layers.iter().filter(|l| !l.coherence.is_nan()).collect();
        let (coherence, coverage) = if scored.is_empty() {
            (f64::NAN, f64::NAN)
        } else {
            let n = scored.len() as f64;
            (
                scored.iter().map(|l| l.coherence).sum::<f64>() / n,
                scored.iter().map(|l| l.coverage).sum::<f64>() / n,
            )
        };

        Ok(Evaluation {
            coherence,
            coverage,
            layers,
        })
    }

    fn evaluate_layer(
        &self,
        rows: &[&TaxonomyRow],
        layer: usize,
        names: &ClusterNames,
    ) -> Result<LayerEvaluation> {
        // (row label, cluster name, cluster path) for every row with a named cluster.
        let pairs: Vec<(&str, &str, ClusterPath)> = rows
            .iter()
            .filter_map(|row| {
                let path = row.path(layer);
                names
                    .get(&path)
                    .map(|name| (row.item.label.as_str(), name.as_str(), path))
            })
            .collect();

        if pairs.is_empty() {
            debug!(layer, "no named clusters in layer");
            return Ok(LayerEvaluation {
                layer,
                coherence: f64::NAN,
                coverage: f64::NAN,
                clusters: Vec::new(),
            });
        }

        // Distinct texts, labels first, in first-seen order.
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut texts: Vec<String> = Vec::new();
        let labels = pairs.iter().map(|p| p.0);
        let cluster_names = pairs.iter().map(|p| p.1);
        for text in labels.chain(cluster_names) {
            index.entry(text).or_insert_with(|| {
                texts.push(text.to_string());
                texts.len() - 1
            });
        }

        let mut embeddings = self.encoder.encode(&texts)?;
        if embeddings.len() != texts.len() {
            return Err(Error::Encoder(format!(
                "returned {} embeddings for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }
        for v in &mut embeddings {
            normalize_in_place(v);
        }

        let mut similarities: BTreeMap<ClusterPath, Vec<f64>> = BTreeMap::new();
        for (label, name, path) in pairs {
            let a = &embeddings[index[label]];
            let b = &embeddings[index[name]];
            if a.len() != b.len() {
                return Err(Error::DimensionMismatch {
                    expected: a.len(),
                    found: b.len(),
                });
            }
            similarities
                .entry(path)
                .or_default()
                .push(f64::from(dot(a, b)));
        }

        let clusters: Vec<ClusterEvaluation> = similarities
            .into_iter()
            .map(|(path, mut sims)| {
                let size = sims.len();
                let mean = sims.iter().sum::<f64>() / sims.len() as f64;
                sims.sort_by(f64::total_cmp);
                let low_quantile = quantile_sorted(&sims, self.quantile);
                ClusterEvaluation {
                    path,
                    size,
                    mean,
                    low_quantile,
                }
            })
            .collect();

        let total: f64 = clusters.iter().map(|c| c.size as f64).sum();
        let coherence = clusters.iter().map(|c| c.mean * c.size as f64).sum::<f64>() / total;
        let coverage = clusters
            .iter()
            .map(|c| c.low_quantile * c.size as f64)
            .sum::<f64>()
            / total;
        debug!(layer, coherence, coverage, clusters = clusters.len(), "evaluated layer");

        Ok(LayerEvaluation {
            layer,
            coherence,
            coverage,
            clusters,
        })
    }
}

/// Rows with a distinct `(label, layer path)` pair, first occurrence kept.
fn distinct_rows(taxonomy: &Taxonomy, layer: usize) -> Vec<&TaxonomyRow> {
    let mut seen = HashSet::new();
    taxonomy
        .rows()
        .iter()
        .filter(|row| seen.insert((row.item.label.as_str(), row.path(layer))))
        .collect()
}

/// Quantile of sorted, non-empty `values` with linear interpolation between closest ranks.
fn quantile_sorted(values: &[f64], q: f64) -> f64 {
    let pos = q * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::item::LabeledItem;
    use crate::taxonomy::table::LayerReport;
    use std::sync::Arc;

    /// Maps a text to a fixed vector derived from its bytes.
    #[derive(Debug)]
    struct Bytes;

    impl TextEncoder for Bytes {
        fn name(&self) -> &str {
            "bytes"
        }

        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let sum: u32 = t.bytes().map(u32::from).sum();
                    vec![1.0, (sum % 13) as f32, t.len() as f32]
                })
                .collect())
        }
    }

    fn taxonomy(rows: &[(&str, usize)]) -> Taxonomy {
        Taxonomy {
            rows: rows
                .iter()
                .map(|&(label, id)| TaxonomyRow {
                    item: LabeledItem::new(label, ""),
                    augmented_label: format!("{label}."),
                    embedding: Arc::from(vec![0.0f32]),
                    clusters: vec![id],
                })
                .collect(),
            layers: vec![LayerReport {
                layer: 1,
                groups: Vec::new(),
            }],
        }
    }

    fn names() -> ClusterNames {
        ClusterNames::from([
            (ClusterPath::from(vec![0]), "food".to_string()),
            (ClusterPath::from(vec![1]), "building part".to_string()),
        ])
    }

    #[test]
    fn repeated_labels_are_scored_once() {
        let distinct = taxonomy(&[
            ("cafe", 0),
            ("shop", 0),
            ("bar", 0),
            ("roof", 1),
            ("door", 1),
        ]);
        let repeated = taxonomy(&[
            ("cafe", 0),
            ("shop", 0),
            ("bar", 0),
            ("roof", 1),
            ("door", 1),
            ("cafe", 0),
            ("cafe", 0),
            ("roof", 1),
        ]);

        let evaluator = TaxonomyEvaluator::new(Bytes);
        let a = evaluator.evaluate(&distinct, 1, &names()).unwrap();
        let b = evaluator.evaluate(&repeated, 1, &names()).unwrap();
        assert_eq!(a.coherence.to_bits(), b.coherence.to_bits());
        assert_eq!(a.coverage.to_bits(), b.coverage.to_bits());
        let sizes: Vec<usize> = b.layers[0].clusters.iter().map(|c| c.size).collect();
        assert_eq!(sizes, vec![3, 2]);
    }

    #[test]
    fn a_label_in_two_clusters_counts_in_both() {
        let tax = taxonomy(&[("cafe", 0), ("shop", 0), ("cafe", 1), ("roof", 1)]);
        let evaluation = TaxonomyEvaluator::new(Bytes)
            .evaluate(&tax, 1, &names())
            .unwrap();
        let sizes: Vec<usize> = evaluation.layers[0]
            .clusters
            .iter()
            .map(|c| c.size)
            .collect();
        assert_eq!(sizes, vec![2, 2]);
    }

    #[test]
    fn quantile_interpolates_like_pandas() {
        let v = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert!((quantile_sorted(&v, 0.10) - 1.0).abs() < 1e-12);
        let v = [0.2, 0.4, 0.9];
        // pos = 0.2 -> 0.2 + 0.2 * 0.2
        assert!((quantile_sorted(&v, 0.10) - 0.24).abs() < 1e-12);
        assert_eq!(quantile_sorted(&[0.7], 0.10), 0.7);
        assert_eq!(quantile_sorted(&v, 1.0), 0.9);
    }
}
