//! Semantic remedy matching over a nearest-neighbour index.
//!
//! ```text
//! query text ──► Embedder ──► unit vector ──► VectorIndex (K, ef) ──► neighbours
//!                                                                        │
//!                      CandidateMatch list ◄── drop score < floor ◄──────┘
//! ```
//!
//! Index order is preserved; the matcher never re-sorts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::MatcherConfig;
use crate::error::{CollaboratorError, TriageError, TriageResult};

/// Text embedding collaborator.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `text` into a fixed-length, L2-normalised vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError>;
}

/// Parameters for one nearest-neighbour query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    pub limit: usize,
    pub search_effort: u32,
}

/// Payload stored alongside each remedy vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemedyPayload {
    pub id: String,
    #[serde(default)]
    pub secondary_id: Option<String>,
    pub display_name: String,
}

/// One hit returned by the index.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub payload: RemedyPayload,
    pub score: f32,
}

/// Vector index collaborator.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Nearest neighbours of `vector`, best first.
    async fn nearest(
        &self,
        vector: &[f32],
        params: SearchParams,
    ) -> Result<Vec<Neighbor>, CollaboratorError>;
}

/// A ranked automated-remedy suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_id: Option<String>,
    pub score: f32,
}

impl From<Neighbor> for CandidateMatch {
    fn from(n: Neighbor) -> Self {
        Self {
            id: n.payload.id,
            display_name: n.payload.display_name,
            secondary_id: n.payload.secondary_id,
            score: n.score,
        }
    }
}

/// Thresholded top-K remedy matcher.
#[derive(Clone)]
pub struct SemanticMatcher {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    config: MatcherConfig,
}

impl SemanticMatcher {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        config: MatcherConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    /// Rank remedies for `query`.
    ///
    /// Blank input returns an empty list without touching any collaborator.
    /// Embedding plus index lookup share one timeout; any failure is
    /// `TriageError::MatchUnavailable`.
    pub async fn find(&self, query: &str) -> TriageResult<Vec<CandidateMatch>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let budget = self.config.timeout();
        let lookup = async {
            let vector = self.embedder.embed(query).await?;
            let params = SearchParams {
                limit: self.config.top_k,
                search_effort: self.config.search_effort,
            };
            self.index.nearest(&vector, params).await
        };

        let neighbours = match tokio::time::timeout(budget, lookup).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(TriageError::MatchUnavailable(e)),
            Err(_) => return Err(TriageError::MatchUnavailable(CollaboratorError::Timeout(budget))),
        };

        let floor = self.config.similarity_floor;
        let candidates: Vec<CandidateMatch> = neighbours
            .into_iter()
            .filter(|n| n.score >= floor)
            .take(self.config.top_k)
            .map(CandidateMatch::from)
            .collect();

        tracing::debug!(
            query_len = query.len(),
            candidates = candidates.len(),
            floor,
            "Semantic match complete"
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0, 0.0])
        }
    }

    struct ScriptedIndex {
        hits: Vec<(String, f32)>,
        last_params: std::sync::Mutex<Option<SearchParams>>,
    }

    impl ScriptedIndex {
        fn new(hits: &[(&str, f32)]) -> Self {
            Self {
                hits: hits.iter().map(|(n, s)| (n.to_string(), *s)).collect(),
                last_params: std::sync::Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl VectorIndex for ScriptedIndex {
        async fn nearest(
            &self,
            _vector: &[f32],
            params: SearchParams,
        ) -> Result<Vec<Neighbor>, CollaboratorError> {
            *self.last_params.lock().unwrap() = Some(params);
            Ok(self
                .hits
                .iter()
                .take(params.limit)
                .enumerate()
                .map(|(i, (name, score))| Neighbor {
                    payload: RemedyPayload {
                        id: format!("ts-{i}"),
                        secondary_id: Some(format!("ps-{i}")),
                        display_name: name.clone(),
                    },
                    score: *score,
                })
                .collect())
        }
    }

    struct FailingIndex;

    #[async_trait]
    impl VectorIndex for FailingIndex {
        async fn nearest(
            &self,
            _: &[f32],
            _: SearchParams,
        ) -> Result<Vec<Neighbor>, CollaboratorError> {
            Err(CollaboratorError::Status {
                status: 503,
                body: "qdrant down".into(),
            })
        }
    }

    struct SlowEmbedder;

    #[async_trait]
    impl Embedder for SlowEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, CollaboratorError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![1.0])
        }
    }

    fn matcher(index: Arc<dyn VectorIndex>, floor: f32) -> (SemanticMatcher, Arc<FixedEmbedder>) {
        let embedder = Arc::new(FixedEmbedder {
            calls: AtomicUsize::new(0),
        });
        let config = MatcherConfig {
            similarity_floor: floor,
            ..Default::default()
        };
        (SemanticMatcher::new(embedder.clone(), index, config), embedder)
    }

    #[tokio::test]
    async fn test_blank_query_skips_collaborators() {
        let (m, embedder) = matcher(Arc::new(ScriptedIndex::new(&[("x", 0.9)])), 0.45);
        assert!(m.find("   ").await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_floor_and_order() {
        let index = Arc::new(ScriptedIndex::new(&[
            ("Reset network adapter", 0.81),
            ("Clear print queue", 0.62),
            ("Restart spooler", 0.40),
        ]));
        let (m, _) = matcher(index.clone(), 0.45);
        let found = m.find("printer not working").await.unwrap();
        let names: Vec<&str> = found.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(names, vec!["Reset network adapter", "Clear print queue"]);
        assert_eq!(found[0].secondary_id.as_deref(), Some("ps-0"));
        assert_eq!(
            *index.last_params.lock().unwrap(),
            Some(SearchParams {
                limit: 3,
                search_effort: 64
            })
        );
    }

    #[tokio::test]
    async fn test_no_padding_below_floor() {
        let index = Arc::new(ScriptedIndex::new(&[("a", 0.5), ("b", 0.2), ("c", 0.1)]));
        let (m, _) = matcher(index, 0.45);
        assert_eq!(m.find("q").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_raising_floor_never_adds_results() {
        let hits = [("a", 0.9), ("b", 0.7), ("c", 0.5)];
        let mut previous = usize::MAX;
        for floor in [0.0, 0.3, 0.5, 0.6, 0.8, 0.95] {
            let (m, _) = matcher(Arc::new(ScriptedIndex::new(&hits)), floor);
            let found = m.find("q").await.unwrap();
            assert!(found.iter().all(|c| c.score >= floor));
            assert!(found.len() <= previous);
            previous = found.len();
        }
    }

    #[tokio::test]
    async fn test_result_capped_at_k_even_if_index_overshoots() {
        struct Greedy;
        #[async_trait]
        impl VectorIndex for Greedy {
            async fn nearest(
                &self,
                _: &[f32],
                _: SearchParams,
            ) -> Result<Vec<Neighbor>, CollaboratorError> {
                Ok((0..10)
                    .map(|i| Neighbor {
                        payload: RemedyPayload {
                            id: i.to_string(),
                            secondary_id: None,
                            display_name: format!("r{i}"),
                        },
                        score: 0.9,
                    })
                    .collect())
            }
        }
        let (m, _) = matcher(Arc::new(Greedy), 0.45);
        assert_eq!(m.find("q").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_index_failure_is_match_unavailable() {
        let (m, _) = matcher(Arc::new(FailingIndex), 0.45);
        let err = m.find("vpn broken").await.unwrap_err();
        assert!(matches!(err, TriageError::MatchUnavailable(CollaboratorError::Status { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_match_unavailable() {
        let m = SemanticMatcher::new(
            Arc::new(SlowEmbedder),
            Arc::new(ScriptedIndex::new(&[])),
            MatcherConfig::default(),
        );
        let err = m.find("slow").await.unwrap_err();
        assert!(matches!(err, TriageError::MatchUnavailable(CollaboratorError::Timeout(_))));
    }
}
