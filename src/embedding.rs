//! Embedding provider client: the core consumes only the resulting vector,
//! never the text->vector mechanism. Modeled as a trait so the HTTP-backed
//! production implementation and the deterministic test fallback are
//! interchangeable at every call site.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, Result};

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The fixed dimension this provider's embeddings carry.
    fn dimension(&self) -> usize;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Posts `{ "input": text }` to a configured URL and expects
/// `{ "embedding": [f32; d] }` back, bearer-authenticated.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    dim: usize,
}

impl HttpEmbeddingProvider {
    pub fn new(url: String, token: Option<String>, dim: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            token,
            dim,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(CoreError::InvalidInput("text must not be empty".to_string()));
        }
        let mut req = self.client.post(&self.url).json(&EmbedRequest { input: text });
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| CoreError::EmbeddingFailure(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(CoreError::EmbeddingFailure(format!(
                "provider returned status {}",
                resp.status()
            )));
        }
        let body: EmbedResponse = resp
            .json()
            .await
            .map_err(|e| CoreError::EmbeddingFailure(e.to_string()))?;
        if body.embedding.len() != self.dim {
            return Err(CoreError::EmbeddingFailure(format!(
                "provider returned {} dims, expected {}",
                body.embedding.len(),
                self.dim
            )));
        }
        Ok(body.embedding)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

/// Deterministic offline fallback: projects a stable hash of the input's
/// tokens into `d` dimensions. Not a mock; a real, documented, reproducible
/// function used when no provider URL is configured and in tests.
pub struct FixedEmbeddingProvider {
    dim: usize,
}

impl FixedEmbeddingProvider {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn hash_token(token: &str) -> u64 {
        // FNV-1a, chosen for its simplicity and stability across runs/platforms.
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in token.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(CoreError::InvalidInput("text must not be empty".to_string()));
        }
        let mut v = vec![0.0f32; self.dim];
        for token in text.split_whitespace() {
            let h = Self::hash_token(token);
            for (i, slot) in v.iter_mut().enumerate() {
                let shifted = h.rotate_left((i as u32) % 64);
                let bucket = (shifted % 2000) as f32 / 1000.0 - 1.0;
                *slot += bucket;
            }
        }
        crate::vector::normalize(&mut v);
        Ok(v)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}
