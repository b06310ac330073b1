//! The text-embedding seam.
//!
//! Any sentence-embedding model can drive a taxonomy build: a local ONNX model, a remote
//! API, or a deterministic fake in tests. The crate only needs a batch `encode` and a
//! stable identity for cache bookkeeping.

use crate::error::Result;

/// Maps text to fixed-length embedding vectors.
pub trait TextEncoder {
    /// Stable identity of the model (for example its name). Embedding caches are tagged
    /// with it so vectors from different models never mix.
    fn name(&self) -> &str;

    /// Embed a batch of texts, returning one vector per input, in order.
    ///
    /// Outputs are expected to be unit-normalized; callers renormalize where it matters.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

impl<E: TextEncoder + ?Sized> TextEncoder for &E {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).encode(texts)
    }
}

impl<E: TextEncoder + ?Sized> TextEncoder for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).encode(texts)
    }
}
