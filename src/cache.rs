//! Memoized embeddings keyed by text.
//!
//! A cache belongs to exactly one encoder identity. Identical texts map to one shared
//! `Arc<[f32]>`, so every row built from the same augmented label holds the same
//! allocation. Caches can be persisted as JSON and pre-seeded on the next run.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::encoder::TextEncoder;
use crate::error::{Error, Result};

/// Embedding cache for a single encoder.
#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    encoder: String,
    entries: HashMap<String, Arc<[f32]>>,
    hits: u64,
    misses: u64,
}

/// On-disk layout. `BTreeMap` keeps files diff-friendly.
#[derive(Serialize, Deserialize)]
struct CacheFile {
    encoder: String,
    embeddings: BTreeMap<String, Vec<f32>>,
}

impl EmbeddingCache {
    /// Empty cache for the encoder identified by `encoder`.
    pub fn new(encoder: impl Into<String>) -> Self {
        Self {
            encoder: encoder.into(),
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Identity of the encoder this cache belongs to.
    pub fn encoder(&self) -> &str {
        &self.encoder
    }

    /// Number of cached texts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `text` has a cached embedding.
    pub fn contains(&self, text: &str) -> bool {
        self.entries.contains_key(text)
    }

    /// Cached embedding for `text`.
    pub fn get(&self, text: &str) -> Option<Arc<[f32]>> {
        self.entries.get(text).cloned()
    }

    /// Insert (or replace) the embedding for `text`.
    pub fn insert(&mut self, text: impl Into<String>, embedding: Vec<f32>) -> Arc<[f32]> {
        let embedding: Arc<[f32]> = embedding.into();
        self.entries.insert(text.into(), Arc::clone(&embedding));
        embedding
    }

    /// `(hits, misses)` counted by [`EmbeddingCache::get_or_encode`].
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    /// Embeddings for `texts`, encoding only the texts not cached yet, in one batch.
    ///
    /// Duplicate texts are encoded once. The encoder must be the one this cache belongs
    /// to, and must return one vector per text with a consistent dimension.
    pub fn get_or_encode<E: TextEncoder + ?Sized>(
        &mut self,
        encoder: &E,
        texts: &[String],
    ) -> Result<Vec<Arc<[f32]>>> {
        self.check_encoder(encoder.name())?;

        let mut missing: Vec<String> = texts
            .iter()
            .filter(|t| !self.entries.contains_key(t.as_str()))
            .cloned()
            .collect();
        missing.sort();
        missing.dedup();

        self.misses += missing.len() as u64;
        self.hits += (texts.len() - missing.len()) as u64;

        if !missing.is_empty() {
            let vectors = encoder.encode(&missing)?;
            if vectors.len() != missing.len() {
                return Err(Error::Encoder(format!(
                    "returned {} embeddings for {} texts",
                    vectors.len(),
                    missing.len()
                )));
            }
            let expected = self
                .dimension()
                .or_else(|| vectors.first().map(Vec::len))
                .unwrap_or(0);
            for v in &vectors {
                if v.len() != expected || expected == 0 {
                    return Err(Error::DimensionMismatch {
                        expected,
                        found: v.len(),
                    });
                }
            }
            info!(encoder = %self.encoder, count = missing.len(), "encoded texts");
            for (text, v) in missing.into_iter().zip(vectors) {
                self.insert(text, v);
            }
        }

        texts
            .iter()
            .map(|t| {
                self.get(t)
                    .ok_or_else(|| Error::Encoder(format!("no embedding for {t:?}")))
            })
            .collect()
    }

    /// Dimension of the cached vectors, if any are cached.
    pub fn dimension(&self) -> Option<usize> {
        self.entries.values().next().map(|v| v.len())
    }

    /// Load a cache persisted by [`EmbeddingCache::save`].
    ///
    /// Fails with [`Error::CacheMismatch`] if the file was written for another encoder.
    pub fn load(path: impl AsRef<Path>, encoder: &str) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let stored: CacheFile = serde_json::from_reader(BufReader::new(file))?;
        if stored.encoder != encoder {
            return Err(Error::CacheMismatch {
                expected: encoder.to_string(),
                found: stored.encoder,
            });
        }
        let mut cache = Self::new(stored.encoder);
        for (text, v) in stored.embeddings {
            cache.insert(text, v);
        }
        debug!(path = %path.as_ref().display(), entries = cache.len(), "loaded embedding cache");
        Ok(cache)
    }

    /// Load a cache if `path` exists, otherwise start empty.
    pub fn load_or_new(path: impl AsRef<Path>, encoder: &str) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path, encoder)
        } else {
            Ok(Self::new(encoder))
        }
    }

    /// Persist the cache as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let stored = CacheFile {
            encoder: self.encoder.clone(),
            embeddings: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_vec()))
                .collect(),
        };
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer(&mut writer, &stored)?;
        writer.flush()?;
        debug!(path = %path.as_ref().display(), entries = self.len(), "saved embedding cache");
        Ok(())
    }

    pub(crate) fn check_encoder(&self, name: &str) -> Result<()> {
        if self.encoder == name {
            Ok(())
        } else {
            Err(Error::CacheMismatch {
                expected: name.to_string(),
                found: self.encoder.clone(),
            })
        }
    }
}
