//! HTTP surface.
//!
//! - `POST /match` `{query}` → `{matches: [{id, secondaryId, displayName, score}]}`
//! - `POST /sessions/{id}` `{caller?}` opens a conversation
//! - `POST /sessions/{id}/events` runs one [`Event`] through the hub
//! - `DELETE /sessions/{id}` ends a conversation
//! - `GET /health`

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use triage::{
    CandidateMatch, ConversationHub, Directive, Event, SemanticMatcher, Stage, TriageError,
};

#[derive(Clone)]
pub struct AppState {
    pub matcher: SemanticMatcher,
    pub hub: Arc<ConversationHub>,
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    pub id: String,
    pub secondary_id: Option<String>,
    pub display_name: String,
    pub score: f32,
}

impl From<CandidateMatch> for MatchView {
    fn from(c: CandidateMatch) -> Self {
        Self {
            id: c.id,
            secondary_id: c.secondary_id,
            display_name: c.display_name,
            score: c.score,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchResponse {
    pub matches: Vec<MatchView>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenSession {
    #[serde(default)]
    pub caller: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub directives: Vec<Directive>,
    /// None once the session has ended
    pub stage: Option<Stage>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    active_sessions: usize,
}

/// Handler error rendered as `{"error": ..}`.
#[derive(Debug)]
pub enum ApiError {
    Unavailable(String),
    NotFound(String),
}

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/match", post(match_query))
        .route("/sessions/{id}", post(open_session).delete(end_session))
        .route("/sessions/{id}/events", post(post_event))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        active_sessions: state.hub.active_sessions().await,
    })
}

async fn match_query(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, ApiError> {
    let found = state.matcher.find(&request.query).await.map_err(|e| {
        tracing::warn!(error = %e, "Match query failed");
        ApiError::from(e)
    })?;
    Ok(Json(MatchResponse {
        matches: found.into_iter().map(MatchView::from).collect(),
    }))
}

async fn open_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<OpenSession>>,
) -> StatusCode {
    let caller = body.and_then(|Json(b)| b.caller);
    state.hub.open(&id, caller).await;
    StatusCode::NO_CONTENT
}

async fn post_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(event): Json<Event>,
) -> Json<EventResponse> {
    let directives = state.hub.handle(&id, event).await;
    let stage = state.hub.stage(&id).await;
    Json(EventResponse { directives, stage })
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.hub.end(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("no session {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use triage::{
        CollaboratorError, DeeperRemedySource, Embedder, EscalationStateMachine, EscalationTicket,
        MatcherConfig, Neighbor, RemedyPayload, SearchParams, TicketReceipt, Ticketing,
        TriageConfig, VectorIndex,
    };

    struct Fixed;

    #[async_trait]
    impl Embedder for Fixed {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, CollaboratorError> {
            Ok(vec![1.0])
        }
    }

    struct TwoHits {
        fail: bool,
    }

    #[async_trait]
    impl VectorIndex for TwoHits {
        async fn nearest(
            &self,
            _: &[f32],
            _: SearchParams,
        ) -> Result<Vec<Neighbor>, CollaboratorError> {
            if self.fail {
                return Err(CollaboratorError::Request("connection refused".into()));
            }
            Ok(vec![
                Neighbor {
                    payload: RemedyPayload {
                        id: "12".into(),
                        secondary_id: Some("PS-3".into()),
                        display_name: "Reset VPN client".into(),
                    },
                    score: 0.8,
                },
                Neighbor {
                    payload: RemedyPayload {
                        id: "13".into(),
                        secondary_id: None,
                        display_name: "Clear print queue".into(),
                    },
                    score: 0.2,
                },
            ])
        }
    }

    struct Desk;

    #[async_trait]
    impl Ticketing for Desk {
        async fn create_incident(
            &self,
            _: Option<&str>,
            _: &EscalationTicket,
        ) -> Result<TicketReceipt, CollaboratorError> {
            Ok(TicketReceipt {
                number: "INC0000001".into(),
            })
        }
    }

    struct Sop;

    #[async_trait]
    impl DeeperRemedySource for Sop {
        async fn fetch(&self, _: &str) -> Result<String, CollaboratorError> {
            Ok("Reinstall the VPN profile.".into())
        }
    }

    fn app(fail: bool) -> Router {
        let index = Arc::new(TwoHits { fail });
        let matcher = SemanticMatcher::new(Arc::new(Fixed), index, MatcherConfig::default());
        let machine = EscalationStateMachine::new(
            TriageConfig::default(),
            matcher.clone(),
            Arc::new(Desk),
            Arc::new(Sop),
        );
        router(AppState {
            matcher,
            hub: Arc::new(ConversationHub::new(machine)),
        })
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_match_filters_by_floor() {
        let response = app(false)
            .oneshot(post_json("/match", serde_json::json!({"query": "vpn broken"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body,
            serde_json::json!({"matches": [
                {"id": "12", "secondaryId": "PS-3", "displayName": "Reset VPN client", "score": 0.8}
            ]})
        );
    }

    #[tokio::test]
    async fn test_blank_match_is_empty() {
        let response = app(true)
            .oneshot(post_json("/match", serde_json::json!({"query": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!({"matches": []}));
    }

    #[tokio::test]
    async fn test_match_unavailable_is_503() {
        let response = app(true)
            .oneshot(post_json("/match", serde_json::json!({"query": "vpn broken"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("match unavailable"));
    }

    #[tokio::test]
    async fn test_event_round_trip() {
        let response = app(false)
            .oneshot(post_json(
                "/sessions/c1/events",
                serde_json::json!({"type": "issue_described", "text": "vpn broken"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["stage"], "awaiting_troubleshooter_selection");
        assert_eq!(body["directives"][0]["type"], "choose");
        assert_eq!(body["directives"][0]["options"][1]["token"], "not-listed");
    }

    #[tokio::test]
    async fn test_user_ticket_event() {
        let response = app(false)
            .oneshot(post_json(
                "/sessions/c2/events",
                serde_json::json!({"type": "create_ticket", "short_description": "No sound"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["stage"], "idle");
        assert_eq!(body["directives"][0]["type"], "ticket_opened");
        assert_eq!(body["directives"][0]["ticket"]["reason"], "user_requested");
        assert_eq!(body["directives"][0]["ticket"]["category"], "Inquiry / Help");
    }

    #[tokio::test]
    async fn test_end_unknown_session_is_404() {
        let response = app(false)
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/sessions/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(false)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }
}
