//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends (Ark, OpenAI, Qwen)
/// behind a unified async interface. The default
/// [`embed_batch`](EmbeddingProvider::embed_batch) implementation calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends that support
/// native batching should override it.
///
/// The width of the produced vectors is not declared up front. The index
/// reconciler discovers it by embedding a probe string.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::EmbeddingProvider;
///
/// let embedding = provider.embed("hello world").await?;
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// A short label used in logs and errors.
    fn name(&self) -> &str;

    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

/// A deterministic offline embedder.
///
/// Hashes character trigrams into a fixed number of buckets and
/// L2-normalizes the result, so texts sharing vocabulary land close together.
/// Useful for local runs without provider credentials.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    fn name(&self) -> &str {
        "hash"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        let chars: Vec<char> = text.to_lowercase().chars().collect();
        for window in chars.windows(3) {
            // FNV-1a over the trigram
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for c in window {
                hash ^= u64::from(*c);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            vector[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }
}
