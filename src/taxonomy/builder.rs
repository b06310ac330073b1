//! Layer-by-layer taxonomy construction.
//!
//! ## Embedding phase
//!
//! Every item gets an augmented label (template, label, definition). The sorted distinct
//! augmented labels not yet in the builder's [`EmbeddingCache`] are encoded in one
//! batch; each row then receives the cached vector, so rows with equal text share one
//! embedding.
//!
//! ## Layering phase
//!
//! Layer 1 splits all rows with k in `[min_k, max_k]`. Layer `i > 1` groups rows by
//! their layer `i - 1` path and splits each group with k in
//! `[2, min(max_sub_k, size - 1)]`.
//!
//! A group abstains (every member gets sub-cluster `0`, score `None`) when it has at most
//! two rows, or when no k in range clears the selection floor.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::item::{normalize_label, LabeledItem};
use super::params::TaxonomyParams;
use super::table::{ClusterPath, GroupReport, LayerReport, Taxonomy, TaxonomyRow};
use crate::cache::EmbeddingCache;
use crate::cluster::ClusterSplitter;
use crate::encoder::TextEncoder;
use crate::error::{Error, Result};

/// Builds taxonomies with one encoder and one set of parameters.
///
/// The builder owns an embedding cache that persists across
/// [`generate_taxonomy`](TaxonomyBuilder::generate_taxonomy) calls.
#[derive(Debug)]
pub struct TaxonomyBuilder<E> {
    encoder: E,
    params: TaxonomyParams,
    cache: EmbeddingCache,
}

impl<E: TextEncoder> TaxonomyBuilder<E> {
    /// Create a builder.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when `params` fail [`TaxonomyParams::validate`].
    pub fn new(encoder: E, params: TaxonomyParams) -> Result<Self> {
        params.validate()?;
        let cache = EmbeddingCache::new(encoder.name());
        Ok(Self {
            encoder,
            params,
            cache,
        })
    }

    /// Replace the embedding cache, e.g. with one loaded from disk.
    ///
    /// # Errors
    ///
    /// [`Error::CacheMismatch`] when the cache belongs to another encoder.
    pub fn with_cache(mut self, cache: EmbeddingCache) -> Result<Self> {
        cache.check_encoder(self.encoder.name())?;
        self.cache = cache;
        Ok(self)
    }

    /// Build parameters.
    pub fn params(&self) -> &TaxonomyParams {
        &self.params
    }

    /// The embedding cache.
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// Take the embedding cache back, e.g. to persist it.
    pub fn into_cache(self) -> EmbeddingCache {
        self.cache
    }

    /// Embed `items` and cluster them into `number_of_layers` layers.
    ///
    /// # Errors
    ///
    /// Empty input, empty labels, fewer items than `max_k`, and any encoder failure.
    pub fn generate_taxonomy(&mut self, items: &[LabeledItem]) -> Result<Taxonomy> {
        if items.is_empty() {
            return Err(Error::EmptyInput);
        }
        if let Some(index) = items.iter().position(|i| normalize_label(&i.label).is_empty()) {
            return Err(Error::EmptyLabel { index });
        }

        let mut rows = self.embed(items)?;
        let splitter = self.params.splitter();
        let mut layers = Vec::with_capacity(self.params.number_of_layers);

        for layer in 1..=self.params.number_of_layers {
            let report = self.cluster_layer(&splitter, &mut rows, layer)?;
            info!(
                layer,
                groups = report.groups.len(),
                abstained = report.groups.iter().filter(|g| g.abstained()).count(),
                "built taxonomy layer"
            );
            layers.push(report);
        }

        Ok(Taxonomy { rows, layers })
    }

    fn embed(&mut self, items: &[LabeledItem]) -> Result<Vec<TaxonomyRow>> {
        let template = &self.params.sentence_template;
        let source = self.params.definition_source;
        let augmented: Vec<String> = items
            .iter()
            .map(|i| i.augmented_label(template, source))
            .collect();

        let mut unique: Vec<String> = augmented.iter().filter(|t| !t.is_empty()).cloned().collect();
        unique.sort();
        unique.dedup();
        let vectors = self.cache.get_or_encode(&self.encoder, &unique)?;
        let lookup: BTreeMap<&str, Arc<[f32]>> = unique
            .iter()
            .map(String::as_str)
            .zip(vectors)
            .collect();
        debug!(items = items.len(), unique = unique.len(), "embedded augmented labels");

        items
            .iter()
            .zip(augmented)
            .map(|(item, augmented_label)| {
                let embedding = lookup.get(augmented_label.as_str()).cloned().ok_or_else(|| {
                    Error::Encoder(format!("no embedding for {augmented_label:?}"))
                })?;
                Ok(TaxonomyRow {
                    item: item.clone(),
                    augmented_label,
                    embedding,
                    clusters: Vec::with_capacity(self.params.number_of_layers),
                })
            })
            .collect()
    }

    fn cluster_layer(
        &self,
        splitter: &ClusterSplitter,
        rows: &mut [TaxonomyRow],
        layer: usize,
    ) -> Result<LayerReport> {
        let mut groups: BTreeMap<ClusterPath, Vec<usize>> = BTreeMap::new();
        for (i, row) in rows.iter().enumerate() {
            groups.entry(row.path(layer - 1)).or_default().push(i);
        }

        let mut reports = Vec::with_capacity(groups.len());
        for (parent, members) in groups {
            let bounds = if layer == 1 {
                Some((self.params.min_k, self.params.max_k))
            } else {
                sub_cluster_bounds(members.len(), self.params.max_sub_k)
            };

            let split = match bounds {
                Some((min_k, max_k)) => {
                    let embeddings: Vec<&[f32]> =
                        members.iter().map(|&i| &*rows[i].embedding).collect();
                    let split = splitter.split(&embeddings, min_k, max_k)?;
                    if split.is_none() {
                        warn!(
                            layer,
                            %parent,
                            size = members.len(),
                            min_k,
                            max_k,
                            "no k produced a usable silhouette; leaving group whole"
                        );
                    }
                    split
                }
                None => {
                    debug!(layer, %parent, size = members.len(), "group too small to split");
                    None
                }
            };

            let report = match split {
                Some(split) => {
                    for (&i, &label) in members.iter().zip(split.labels.iter()) {
                        rows[i].clusters.push(label);
                    }
                    GroupReport {
                        parent,
                        size: members.len(),
                        k: split.k,
                        score: Some(split.score),
                    }
                }
                None => {
                    for &i in &members {
                        rows[i].clusters.push(0);
                    }
                    GroupReport {
                        parent,
                        size: members.len(),
                        k: 1,
                        score: None,
                    }
                }
            };
            reports.push(report);
        }

        Ok(LayerReport {
            layer,
            groups: reports,
        })
    }
}

/// k range for sub-clustering a group of `size` rows: `[2, min(max_sub_k, size - 1)]`.
///
/// `None` when the group is too small to split (two rows or fewer).
pub(crate) fn sub_cluster_bounds(size: usize, max_sub_k: usize) -> Option<(usize, usize)> {
    let min_k = 2usize.max(2usize.min(size));
    let max_k = max_sub_k.min(size.saturating_sub(1));
    (max_k >= min_k).then_some((min_k, max_k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Selection;
    use crate::taxonomy::DefinitionSource;

    /// Encodes a text as a unit vector pointing to one of a few fixed directions,
    /// chosen by the first word after the template.
    #[derive(Debug)]
    struct Compass;

    impl TextEncoder for Compass {
        fn name(&self) -> &str {
            "compass"
        }

        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let word = t.split_whitespace().next().unwrap_or("");
                    let angle = match word.trim_end_matches('.') {
                        "north" => 0.0f32,
                        "east" => 1.6,
                        "south" => 3.1,
                        _ => 4.7,
                    };
                    // Small, text-dependent jitter.
                    let jitter = (t.len() % 7) as f32 * 0.01;
                    vec![(angle + jitter).cos(), (angle + jitter).sin()]
                })
                .collect())
        }
    }

    /// Two far-apart groups, `a0..a3` and `b0..b3`. Members of a group are mutually
    /// equidistant, so no split of a group scores above zero.
    #[derive(Debug)]
    struct Simplex;

    impl TextEncoder for Simplex {
        fn name(&self) -> &str {
            "simplex"
        }

        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            texts
                .iter()
                .map(|t| {
                    let mut chars = t.chars();
                    let group = usize::from(chars.next() == Some('b'));
                    let member = chars
                        .next()
                        .and_then(|c| c.to_digit(10))
                        .ok_or_else(|| Error::Encoder(format!("unexpected text {t:?}")))?;
                    let mut v = vec![0.0; 10];
                    v[group] = 10.0;
                    v[2 + 4 * group + member as usize] = 1.0;
                    Ok(v)
                })
                .collect()
        }
    }

    fn items(labels: &[&str]) -> Vec<LabeledItem> {
        labels.iter().map(|l| LabeledItem::new(l, "")).collect()
    }

    #[test]
    fn sub_cluster_bounds_follow_group_size() {
        assert_eq!(sub_cluster_bounds(1, 10), None);
        assert_eq!(sub_cluster_bounds(2, 10), None);
        assert_eq!(sub_cluster_bounds(3, 10), Some((2, 2)));
        assert_eq!(sub_cluster_bounds(7, 10), Some((2, 6)));
        assert_eq!(sub_cluster_bounds(50, 10), Some((2, 10)));
        assert_eq!(sub_cluster_bounds(50, 4), Some((2, 4)));
    }

    #[test]
    fn rejects_bad_configuration_before_clustering() {
        let err = TaxonomyBuilder::new(Compass, TaxonomyParams::default().with_k_range(1, 3))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { name: "min_k", .. }));

        let err =
            TaxonomyBuilder::new(Compass, TaxonomyParams::default().with_layers(0)).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfig {
                name: "number_of_layers",
                ..
            }
        ));
    }

    #[test]
    fn layer_one_separates_directions() {
        let params = TaxonomyParams::default().with_layers(1).with_k_range(2, 4);
        let mut builder = TaxonomyBuilder::new(Compass, params).unwrap();
        let taxonomy = builder
            .generate_taxonomy(&items(&[
                "north", "north a", "north bb", "east", "east a", "east bb", "south", "south a",
                "south bb",
            ]))
            .unwrap();

        let ids: Vec<usize> = taxonomy.rows().iter().map(|r| r.clusters[0]).collect();
        assert_eq!(ids[0], ids[1]);
        assert_eq!(ids[1], ids[2]);
        assert_eq!(ids[3], ids[5]);
        assert_eq!(ids[6], ids[8]);
        assert_ne!(ids[0], ids[3]);
        assert_ne!(ids[3], ids[6]);
        let report = &taxonomy.layer_reports()[0];
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].k, 3);
    }

    #[test]
    fn small_groups_abstain_at_lower_layers() {
        // Two tight pairs: layer 1 splits them, layer 2 cannot split a pair.
        let params = TaxonomyParams::default().with_layers(2).with_k_range(2, 2);
        let mut builder = TaxonomyBuilder::new(Compass, params).unwrap();
        let taxonomy = builder
            .generate_taxonomy(&items(&["north", "north a", "south", "south a"]))
            .unwrap();

        let layer2 = &taxonomy.layer_reports()[1];
        assert_eq!(layer2.groups.len(), 2);
        for group in &layer2.groups {
            assert_eq!(group.size, 2);
            assert!(group.abstained());
            assert_eq!(group.k, 1);
        }
        assert!(taxonomy.rows().iter().all(|r| r.clusters[1] == 0));
    }

    #[test]
    fn groups_without_a_positive_silhouette_are_left_whole() {
        let input = items(&["a0", "a1", "a2", "a3", "b0", "b1", "b2", "b3"]);
        let params = TaxonomyParams::default()
            .with_layers(2)
            .with_k_range(2, 2)
            .with_max_sub_k(3);

        let taxonomy = TaxonomyBuilder::new(Simplex, params.clone())
            .unwrap()
            .generate_taxonomy(&input)
            .unwrap();
        let layer1 = &taxonomy.layer_reports()[0];
        assert_eq!(layer1.groups[0].k, 2);
        assert!(layer1.groups[0].score.is_some_and(|s| s > 0.0));
        let layer2 = &taxonomy.layer_reports()[1];
        assert_eq!(layer2.groups.len(), 2);
        for group in &layer2.groups {
            assert_eq!(group.size, 4);
            assert_eq!((group.k, group.score), (1, None));
        }
        assert!(taxonomy.rows().iter().all(|r| r.clusters[1] == 0));

        let taxonomy = TaxonomyBuilder::new(
            Simplex,
            params.with_selection(Selection::BestAvailable),
        )
        .unwrap()
        .generate_taxonomy(&input)
        .unwrap();
        for group in &taxonomy.layer_reports()[1].groups {
            assert_eq!((group.k, group.score), (2, Some(0.0)));
        }
    }

    #[test]
    fn definitions_change_what_gets_embedded() {
        let params = TaxonomyParams::default()
            .with_layers(1)
            .with_k_range(2, 2)
            .with_sentence_template("the use is")
            .with_definition_source(DefinitionSource::Wiki);
        let mut builder = TaxonomyBuilder::new(Compass, params).unwrap();
        let input = vec![
            LabeledItem::new("cafe", "").with_definition(DefinitionSource::Wiki, "a restaurant"),
            LabeledItem::new("shop", ""),
            LabeledItem::new("roof", ""),
        ];
        let taxonomy = builder.generate_taxonomy(&input).unwrap();
        assert_eq!(
            taxonomy.rows()[0].augmented_label,
            "the use is cafe. a restaurant"
        );
        assert_eq!(taxonomy.rows()[1].augmented_label, "the use is shop.");
    }

    #[test]
    fn rejects_empty_input_and_empty_labels() {
        let params = TaxonomyParams::default().with_k_range(2, 2);
        let mut builder = TaxonomyBuilder::new(Compass, params).unwrap();
        assert!(matches!(
            builder.generate_taxonomy(&[]),
            Err(Error::EmptyInput)
        ));
        let mut input = items(&["north", "south", "east"]);
        input[1].label = "  ".into();
        assert!(matches!(
            builder.generate_taxonomy(&input),
            Err(Error::EmptyLabel { index: 1 })
        ));
        input[1].label = "north".into();
        input[2].label = " ? \n".into();
        assert!(matches!(
            builder.generate_taxonomy(&input),
            Err(Error::EmptyLabel { index: 2 })
        ));
    }

    #[test]
    fn too_few_items_for_layer_one_is_an_error() {
        let params = TaxonomyParams::default().with_k_range(2, 5);
        let mut builder = TaxonomyBuilder::new(Compass, params).unwrap();
        assert!(matches!(
            builder.generate_taxonomy(&items(&["north", "south", "east"])),
            Err(Error::InvalidClusterCount { requested: 5, n_items: 3 })
        ));
    }

    #[test]
    fn cache_survives_between_builds() {
        let params = TaxonomyParams::default().with_layers(1).with_k_range(2, 2);
        let mut builder = TaxonomyBuilder::new(Compass, params).unwrap();
        let input = items(&["north", "south", "east"]);
        builder.generate_taxonomy(&input).unwrap();
        builder.generate_taxonomy(&input).unwrap();
        assert_eq!(builder.cache().len(), 3);
        assert_eq!(builder.cache().stats(), (3, 3));

        let foreign = EmbeddingCache::new("other");
        assert!(matches!(
            TaxonomyBuilder::new(Compass, TaxonomyParams::default())
                .unwrap()
                .with_cache(foreign),
            Err(Error::CacheMismatch { .. })
        ));
    }
}
