//! Deeper-remedy (SOP) and knowledge-answer collaborators.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CollaboratorError;

/// Fetches a detailed, non-self-service solution for an issue.
#[async_trait]
pub trait DeeperRemedySource: Send + Sync {
    /// Remedy text for `query`. An empty answer should be reported as an error.
    async fn fetch(&self, query: &str) -> Result<String, CollaboratorError>;
}

/// Knowledge area a policy question is asked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeDomain {
    Hr,
    WorkElevate,
}

impl fmt::Display for KnowledgeDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hr => write!(f, "HR"),
            Self::WorkElevate => write!(f, "WorkElevate"),
        }
    }
}

/// Answers HR and WorkElevate questions.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Answer text for `query`. An empty answer should be reported as an error.
    async fn answer(
        &self,
        domain: KnowledgeDomain,
        query: &str,
    ) -> Result<String, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_names() {
        let json = serde_json::to_string(&KnowledgeDomain::WorkElevate).unwrap();
        assert_eq!(json, "\"work_elevate\"");
        let hr: KnowledgeDomain = serde_json::from_str("\"hr\"").unwrap();
        assert_eq!(hr.to_string(), "HR");
    }
}
