#![allow(dead_code)]

use rand::prelude::*;
use strata::{LabeledItem, Result, TextEncoder};

/// Deterministic fake encoder: every text maps to a pseudo-random unit vector seeded by
/// an FNV-1a hash of the text.
#[derive(Debug)]
pub struct HashEncoder {
    pub dim: usize,
}

impl HashEncoder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

pub fn fnv1a(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

impl TextEncoder for HashEncoder {
    fn name(&self) -> &str {
        "hash-encoder"
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(fnv1a(t));
                let mut v: Vec<f32> = (0..self.dim)
                    .map(|_| rng.random::<f32>() * 2.0 - 1.0)
                    .collect();
                let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
                v.iter_mut().for_each(|x| *x /= norm);
                v
            })
            .collect())
    }
}

pub fn items(labels: &[&str]) -> Vec<LabeledItem> {
    labels
        .iter()
        .map(|l| LabeledItem::new(l, format!("The building is now a {l}.")))
        .collect()
}
