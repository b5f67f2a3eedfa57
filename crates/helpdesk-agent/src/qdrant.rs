//! Qdrant-backed vector index.
//!
//! Points carry `troubleshooter_id`, `ps_command_id` and `name` payload
//! fields; the query API returns them best-first.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use triage::{CollaboratorError, Neighbor, RemedyPayload, SearchParams, VectorIndex};

use crate::config::QdrantEndpoint;
use crate::{expect_success, read_json, transport_error};

pub struct QdrantIndex {
    endpoint: QdrantEndpoint,
    client: reqwest::Client,
    timeout: Duration,
}

impl QdrantIndex {
    pub fn new(endpoint: QdrantEndpoint, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            endpoint,
            client,
            timeout,
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn nearest(
        &self,
        vector: &[f32],
        params: SearchParams,
    ) -> Result<Vec<Neighbor>, CollaboratorError> {
        let url = format!(
            "{}/collections/{}/points/query",
            self.endpoint.url.trim_end_matches('/'),
            self.endpoint.collection
        );
        let body = json!({
            "query": vector,
            "limit": params.limit,
            "with_payload": true,
            "params": { "hnsw_ef": params.search_effort },
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let resp_json = read_json(expect_success(response).await?).await?;

        let points = resp_json["result"]["points"]
            .as_array()
            .ok_or_else(|| CollaboratorError::Parse("missing result.points".into()))?;
        points.iter().map(neighbor).collect()
    }
}

fn neighbor(point: &Value) -> Result<Neighbor, CollaboratorError> {
    let score = point["score"]
        .as_f64()
        .ok_or_else(|| CollaboratorError::Parse("point without score".into()))? as f32;
    let payload = &point["payload"];
    let id = id_field(&payload["troubleshooter_id"])
        .ok_or_else(|| CollaboratorError::Parse("point without troubleshooter_id".into()))?;

    Ok(Neighbor {
        payload: RemedyPayload {
            id,
            secondary_id: id_field(&payload["ps_command_id"]),
            display_name: payload["name"].as_str().unwrap_or_default().to_string(),
        },
        score,
    })
}

/// Ids are stored as either strings or integers.
fn id_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
