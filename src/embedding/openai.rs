//! OpenAI-compatible `/embeddings` client.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::KnowledgeError;

pub struct OpenAiEmbeddingProvider {
    api_key: Option<String>,
    endpoint: String,
    model: String,
    dimensions: usize,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingProvider {
    /// The API key is read from the variable named by `api_key_env`. A missing
    /// key is allowed for local servers that do not check it.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!(var = %config.api_key_env, "embedding API key not set");
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            api_key,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            client,
        })
    }

    fn url(&self) -> String {
        format!("{}/embeddings", self.endpoint)
    }
}

impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.post(self.url()).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .with_context(|| format!("embedding request to {} failed", self.url()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!(status = %status, body = %body, "embedding request rejected");
            anyhow::bail!("embedding endpoint returned HTTP {status}: {body}");
        }

        let parsed: EmbeddingResponse = response.json().context("failed to parse embedding response")?;
        let vectors = order_vectors(parsed, texts.len())?;
        for v in &vectors {
            if v.len() != self.dimensions {
                return Err(KnowledgeError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: v.len(),
                    context: format!("model {}", self.model),
                }
                .into());
            }
        }
        tracing::debug!(count = vectors.len(), model = %self.model, "embedded batch");
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Put response vectors back in input order and check the count.
fn order_vectors(mut response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    anyhow::ensure!(
        response.data.len() == expected,
        "embedding endpoint returned {} vectors for {} inputs",
        response.data.len(),
        expected
    );
    response.data.sort_by_key(|d| d.index);
    Ok(response.data.into_iter().map(|d| d.embedding).collect())
}
