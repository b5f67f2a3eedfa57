use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use triage::{SoftwareCatalog, TriageConfig};

/// Text-embedding endpoint (OpenAI-compatible `/embeddings`).
#[derive(Debug, Clone)]
pub struct EmbeddingEndpoint {
    pub url: String,
    pub model: String,
}

/// Qdrant collection holding troubleshooter vectors.
#[derive(Debug, Clone)]
pub struct QdrantEndpoint {
    pub url: String,
    pub collection: String,
}

/// ServiceNow Table API credentials.
#[derive(Debug, Clone)]
pub struct ServiceNowEndpoint {
    /// Full base URL, e.g. `https://acme.service-now.com`
    pub base_url: String,
    pub username: String,
    pub password: String,
}

/// Knowledge/SOP chat endpoint.
#[derive(Debug, Clone)]
pub struct KnowledgeEndpoint {
    pub url: String,
    pub bearer_token: String,
    /// `domain_name` for deeper-remedy (SOP) lookups
    pub domain: String,
    pub hr_domain: String,
    pub workelevate_domain: String,
    pub user: String,
}

/// Process configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub embedding: EmbeddingEndpoint,
    pub qdrant: QdrantEndpoint,
    /// None disables ticket creation and lookup
    pub servicenow: Option<ServiceNowEndpoint>,
    pub knowledge: KnowledgeEndpoint,
    /// None disables the software sub-flow
    pub catalog_path: Option<PathBuf>,
    pub triage_config_path: Option<PathBuf>,
    pub port: u16,
    /// Per-request HTTP timeout for every collaborator client
    pub http_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingEndpoint {
                url: std::env::var("EMBEDDING_URL")
                    .unwrap_or_else(|_| "http://localhost:8081/v1".into()),
                model: std::env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "all-mpnet-base-v2".into()),
            },
            qdrant: QdrantEndpoint {
                url: std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6333".into()),
                collection: std::env::var("QDRANT_COLLECTION")
                    .unwrap_or_else(|_| "troubleshooters".into()),
            },
            servicenow: Self::servicenow_from_env(),
            knowledge: KnowledgeEndpoint {
                url: std::env::var("KNOWLEDGE_API_URL")
                    .unwrap_or_else(|_| "http://localhost:5001/v1/chat-messages".into()),
                bearer_token: std::env::var("KNOWLEDGE_BEARER_TOKEN").unwrap_or_default(),
                domain: std::env::var("KNOWLEDGE_DOMAIN").unwrap_or_else(|_| "it".into()),
                hr_domain: std::env::var("KNOWLEDGE_HR_DOMAIN").unwrap_or_else(|_| "hr".into()),
                workelevate_domain: std::env::var("KNOWLEDGE_WORKELEVATE_DOMAIN")
                    .unwrap_or_else(|_| "workelevate".into()),
                user: std::env::var("KNOWLEDGE_USER").unwrap_or_else(|_| "helpdesk-agent".into()),
            },
            catalog_path: std::env::var("SOFTWARE_CATALOG_PATH").ok().map(PathBuf::from),
            triage_config_path: std::env::var("TRIAGE_CONFIG_PATH").ok().map(PathBuf::from),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            http_timeout: Duration::from_secs(
                std::env::var("HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

impl AgentConfig {
    fn servicenow_from_env() -> Option<ServiceNowEndpoint> {
        let instance = std::env::var("SERVICENOW_INSTANCE").ok()?;
        let username = std::env::var("SERVICENOW_USERNAME").ok()?;
        let password = std::env::var("SERVICENOW_PASSWORD").ok()?;
        Some(ServiceNowEndpoint {
            base_url: instance_url(&instance),
            username,
            password,
        })
    }

    /// Triage config from `TRIAGE_CONFIG_PATH`, or defaults plus `TRIAGE_*` overrides.
    pub fn load_triage_config(&self) -> Result<TriageConfig> {
        match &self.triage_config_path {
            Some(path) => TriageConfig::load(path)
                .with_context(|| format!("Failed to load triage config from {}", path.display())),
            None => TriageConfig::from_env().context("Invalid TRIAGE_* environment override"),
        }
    }

    pub fn load_catalog(&self) -> Result<Option<SoftwareCatalog>> {
        let Some(path) = &self.catalog_path else {
            return Ok(None);
        };
        let catalog = SoftwareCatalog::load(path)
            .with_context(|| format!("Failed to load software catalog from {}", path.display()))?;
        Ok(Some(catalog))
    }
}

/// A bare instance name expands to its service-now.com URL; anything with a
/// scheme is used as-is.
pub fn instance_url(instance: &str) -> String {
    let instance = instance.trim().trim_end_matches('/');
    if instance.starts_with("http://") || instance.starts_with("https://") {
        instance.to_string()
    } else {
        format!("https://{instance}.service-now.com")
    }
}
