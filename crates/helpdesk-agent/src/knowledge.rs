use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use triage::{CollaboratorError, DeeperRemedySource, KnowledgeBase, KnowledgeDomain};

use crate::config::KnowledgeEndpoint;
use crate::{expect_success, read_json, transport_error};

/// Deeper-remedy source and HR / WorkElevate knowledge base backed by the
/// knowledge chat API. The two roles differ only in `domain_name`.
pub struct KnowledgeClient {
    endpoint: KnowledgeEndpoint,
    client: reqwest::Client,
    timeout: Duration,
}

impl KnowledgeClient {
    pub fn new(endpoint: KnowledgeEndpoint, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            endpoint,
            client,
            timeout,
        }
    }

    async fn ask(&self, domain_name: &str, query: &str) -> Result<String, CollaboratorError> {
        let body = json!({
            "inputs": { "domain_name": domain_name },
            "query": query,
            "response_mode": "blocking",
            "conversation_id": "",
            "user": self.endpoint.user,
        });

        let response = self
            .client
            .post(&self.endpoint.url)
            .bearer_auth(&self.endpoint.bearer_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let resp_json = read_json(expect_success(response).await?).await?;

        let raw = resp_json["answer"].as_str().unwrap_or_default();
        let answer = strip_reasoning(raw);
        if answer.is_empty() {
            return Err(CollaboratorError::Parse("empty answer".into()));
        }
        Ok(answer.to_string())
    }
}

#[async_trait]
impl DeeperRemedySource for KnowledgeClient {
    async fn fetch(&self, query: &str) -> Result<String, CollaboratorError> {
        self.ask(&self.endpoint.domain, query).await
    }
}

#[async_trait]
impl KnowledgeBase for KnowledgeClient {
    async fn answer(
        &self,
        domain: KnowledgeDomain,
        query: &str,
    ) -> Result<String, CollaboratorError> {
        let domain_name = match domain {
            KnowledgeDomain::Hr => &self.endpoint.hr_domain,
            KnowledgeDomain::WorkElevate => &self.endpoint.workelevate_domain,
        };
        tracing::debug!(%domain, domain_name = domain_name.as_str(), "Asking knowledge base");
        self.ask(domain_name, query).await
    }
}

/// Drop a model reasoning block: everything up to the last `</think>`.
fn strip_reasoning(raw: &str) -> &str {
    match raw.rfind("</think>") {
        Some(end) => raw[end + "</think>".len()..].trim(),
        None => raw.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client(url: String) -> KnowledgeClient {
        let timeout = Duration::from_secs(10);
        KnowledgeClient::new(
            KnowledgeEndpoint {
                url,
                bearer_token: "secret".into(),
                domain: "it".into(),
                hr_domain: "hr-policies".into(),
                workelevate_domain: "workelevate".into(),
                user: "helpdesk-agent".into(),
            },
            crate::http_client(timeout).unwrap(),
            timeout,
        )
    }

    #[test]
    fn test_strip_reasoning() {
        assert_eq!(strip_reasoning("<think>hmm</think>\n Restart it."), "Restart it.");
        assert_eq!(strip_reasoning("  Plain answer "), "Plain answer");
        assert_eq!(strip_reasoning("<think>only thoughts</think>"), "");
    }

    #[tokio::test]
    async fn test_fetch_sends_query_and_bearer() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat-messages")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(json!({
                "inputs": {"domain_name": "it"},
                "query": "vpn keeps dropping",
                "response_mode": "blocking"
            })))
            .with_status(200)
            .with_body(r#"{"answer": "<think>check vpn</think>1. Reinstall the VPN profile."}"#)
            .create_async()
            .await;

        let answer = client(format!("{}/v1/chat-messages", server.url()))
            .fetch("vpn keeps dropping")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(answer, "1. Reinstall the VPN profile.");
    }

    #[tokio::test]
    async fn test_answer_uses_domain_name() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat-messages")
            .match_body(Matcher::PartialJson(json!({
                "inputs": {"domain_name": "hr-policies"},
                "query": "how many leave days do I get?",
                "user": "helpdesk-agent"
            })))
            .with_status(200)
            .with_body(r#"{"answer": "<think>policy 4.2</think>You get 24 days."}"#)
            .create_async()
            .await;

        let answer = client(format!("{}/v1/chat-messages", server.url()))
            .answer(KnowledgeDomain::Hr, "how many leave days do I get?")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(answer, "You get 24 days.");
    }

    #[tokio::test]
    async fn test_answer_error_status() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/kb")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let err = client(format!("{}/kb", server.url()))
            .answer(KnowledgeDomain::WorkElevate, "course list")
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Status { status: 500, .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_empty_answer_is_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/sop")
            .with_status(200)
            .with_body(r#"{"answer": ""}"#)
            .create_async()
            .await;

        let err = client(format!("{}/sop", server.url())).fetch("q").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Parse(_)));
    }
}
