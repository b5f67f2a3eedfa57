//! Helpdesk agent: HTTP implementations of the triage collaborator traits
//! and the match service.
//!
//! - [`HttpEmbedder`]: OpenAI-compatible `/embeddings`
//! - [`QdrantIndex`]: Qdrant `points/query`
//! - [`ServiceNowClient`]: incident create / fetch / update over the Table API
//! - [`KnowledgeClient`]: SOP answers from the knowledge chat API
//! - [`service`]: axum router exposing `POST /match`, the conversation
//!   endpoints and `GET /health`

pub mod config;
pub mod embedding;
pub mod knowledge;
pub mod qdrant;
pub mod service;
pub mod servicenow;

pub use config::AgentConfig;
pub use embedding::HttpEmbedder;
pub use knowledge::KnowledgeClient;
pub use qdrant::QdrantIndex;
pub use servicenow::{ServiceNowClient, TicketingDisabled};

use std::time::Duration;
use triage::CollaboratorError;

/// Build the shared reqwest client used by every adapter.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, CollaboratorError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CollaboratorError::Request(e.to_string()))
}

/// Map a transport error, keeping timeouts distinguishable.
pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> CollaboratorError {
    if err.is_timeout() {
        CollaboratorError::Timeout(timeout)
    } else {
        CollaboratorError::Request(err.to_string())
    }
}

/// Turn a non-success response into `CollaboratorError::Status`.
pub(crate) async fn expect_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CollaboratorError::Status {
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn read_json(
    response: reqwest::Response,
) -> Result<serde_json::Value, CollaboratorError> {
    response
        .json()
        .await
        .map_err(|e| CollaboratorError::Parse(e.to_string()))
}
