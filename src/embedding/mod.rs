//! Text-to-vector embedding.
//!
//! Provides the [`EmbeddingProvider`] trait and an OpenAI-compatible HTTP
//! implementation. The provider is created via [`create_provider`] from
//! configuration.

pub mod openai;

use anyhow::Result;

/// Trait for embedding text into vectors.
///
/// All methods are blocking. Callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text])?;
        batch
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedding provider returned no vectors"))
    }

    /// Embed a batch of texts, one vector per input, in input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;

    /// Model identifier recorded alongside stored vectors.
    fn model(&self) -> &str;
}

/// Create an embedding provider from config.
///
/// Currently only `"openai"` is supported, which covers any server exposing an
/// OpenAI-compatible `/embeddings` endpoint.
pub fn create_provider(config: &crate::config::EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(openai::OpenAiEmbeddingProvider::from_config(config)?)),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: openai"),
    }
}
