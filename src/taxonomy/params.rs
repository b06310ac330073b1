use serde::{Deserialize, Serialize};

use super::item::DefinitionSource;
use crate::cluster::{ClusterSplitter, Selection};
use crate::error::{Error, Result};

/// Taxonomy build settings.
///
/// Deserializes with every field optional, falling back to [`Default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyParams {
    /// Sentence prefix placed before every label, e.g. `"The new use of the building is"`.
    pub sentence_template: String,

    /// Which definition is appended to labels.
    pub definition_source: DefinitionSource,

    /// Number of layers to build.
    pub number_of_layers: usize,

    /// Smallest k tried at layer 1.
    pub min_k: usize,

    /// Largest k tried at layer 1.
    pub max_k: usize,

    /// Largest number of sub-clusters per parent at layers 2 and below.
    pub max_sub_k: usize,

    /// k-means seed.
    pub seed: u64,

    /// k-means restarts per k.
    pub n_init: usize,

    /// Selection floor for the k scan.
    pub selection: Selection,
}

impl Default for TaxonomyParams {
    fn default() -> Self {
        Self {
            sentence_template: String::new(),
            definition_source: DefinitionSource::None,
            number_of_layers: 2,
            min_k: 10,
            max_k: 20,
            max_sub_k: 10,
            seed: 42,
            n_init: 10,
            selection: Selection::PositiveOnly,
        }
    }
}

impl TaxonomyParams {
    /// Set the sentence template.
    pub fn with_sentence_template(mut self, template: impl Into<String>) -> Self {
        self.sentence_template = template.into();
        self
    }

    /// Set the definition source.
    pub fn with_definition_source(mut self, source: DefinitionSource) -> Self {
        self.definition_source = source;
        self
    }

    /// Set the number of layers.
    pub fn with_layers(mut self, number_of_layers: usize) -> Self {
        self.number_of_layers = number_of_layers;
        self
    }

    /// Set the layer-1 k range.
    pub fn with_k_range(mut self, min_k: usize, max_k: usize) -> Self {
        self.min_k = min_k;
        self.max_k = max_k;
        self
    }

    /// Set the per-parent sub-cluster cap.
    pub fn with_max_sub_k(mut self, max_sub_k: usize) -> Self {
        self.max_sub_k = max_sub_k;
        self
    }

    /// Set the k-means seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of k-means restarts per k.
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set the selection floor.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Reject settings that cannot produce a taxonomy.
    pub fn validate(&self) -> Result<()> {
        if self.number_of_layers < 1 {
            return Err(Error::InvalidConfig {
                name: "number_of_layers",
                message: "the taxonomy must have at least one layer",
            });
        }
        if self.min_k < 2 {
            return Err(Error::InvalidConfig {
                name: "min_k",
                message: "the taxonomy must have at least two clusters",
            });
        }
        if self.max_k < 2 {
            return Err(Error::InvalidConfig {
                name: "max_k",
                message: "the taxonomy must have at least two clusters",
            });
        }
        if self.max_k < self.min_k {
            return Err(Error::InvalidConfig {
                name: "max_k",
                message: "must be at least min_k",
            });
        }
        if self.max_sub_k < 2 {
            return Err(Error::InvalidConfig {
                name: "max_sub_k",
                message: "sub-clustering needs at least two clusters",
            });
        }
        if self.n_init < 1 {
            return Err(Error::InvalidConfig {
                name: "n_init",
                message: "must be at least 1",
            });
        }
        Ok(())
    }

    pub(crate) fn splitter(&self) -> ClusterSplitter {
        ClusterSplitter::new()
            .with_n_init(self.n_init)
            .with_seed(self.seed)
            .with_selection(self.selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        TaxonomyParams::default().validate().unwrap();
    }

    #[test]
    fn rejects_each_bad_setting() {
        let cases = [
            (TaxonomyParams::default().with_layers(0), "number_of_layers"),
            (TaxonomyParams::default().with_k_range(1, 5), "min_k"),
            (TaxonomyParams::default().with_k_range(2, 1), "max_k"),
            (TaxonomyParams::default().with_k_range(6, 5), "max_k"),
            (TaxonomyParams::default().with_max_sub_k(1), "max_sub_k"),
            (TaxonomyParams::default().with_n_init(0), "n_init"),
        ];
        for (params, expected) in cases {
            match params.validate() {
                Err(Error::InvalidConfig { name, .. }) => assert_eq!(name, expected),
                other => panic!("expected config error for {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn partial_json_fills_defaults() {
        let params: TaxonomyParams = serde_json::from_str(
            r#"{
                "sentence_template": "This label refers to",
                "definition_source": "llm",
                "min_k": 3,
                "max_k": 6,
                "selection": "best_available"
            }"#,
        )
        .unwrap();
        assert_eq!(params.definition_source, DefinitionSource::Llm);
        assert_eq!((params.min_k, params.max_k), (3, 6));
        assert_eq!(params.number_of_layers, 2);
        assert_eq!(params.selection, Selection::BestAvailable);
    }
}
