use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use triage::{CollaboratorError, Embedder};

use crate::config::EmbeddingEndpoint;
use crate::{expect_success, read_json, transport_error};

/// Embedder backed by an OpenAI-compatible embeddings endpoint.
pub struct HttpEmbedder {
    endpoint: EmbeddingEndpoint,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpEmbedder {
    pub fn new(endpoint: EmbeddingEndpoint, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            endpoint,
            client,
            timeout,
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        let url = format!("{}/embeddings", self.endpoint.url.trim_end_matches('/'));
        let body = json!({
            "model": self.endpoint.model,
            "input": text,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let resp_json = read_json(expect_success(response).await?).await?;

        let raw = resp_json["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| CollaboratorError::Parse("missing data[0].embedding".into()))?;
        let vector: Vec<f32> = raw
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<_>>()
            .ok_or_else(|| CollaboratorError::Parse("non-numeric embedding component".into()))?;

        normalize(vector)
    }
}

/// Scale to unit L2 length. Empty or all-zero vectors are rejected.
fn normalize(mut vector: Vec<f32>) -> Result<Vec<f32>, CollaboratorError> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if vector.is_empty() || norm == 0.0 {
        return Err(CollaboratorError::Parse("empty embedding".into()));
    }
    vector.iter_mut().for_each(|v| *v /= norm);
    Ok(vector)
}
