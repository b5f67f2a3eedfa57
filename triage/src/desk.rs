//! Ticket desk: status lookups and updates on existing incidents.
//!
//! Independent of the remedy cycle; nothing here touches a session's stage.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use crate::error::{CollaboratorError, TriageError, TriageResult};

const INCIDENT_PATTERN: &str = r"INC\d{6,}";
const EMAIL_PATTERN: &str = r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}";

static INCIDENT_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b{INCIDENT_PATTERN}\b")).expect("INCIDENT_NUMBER regex should compile")
});
static EMAIL_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("EMAIL_ADDRESS regex should compile"));
static EXACT_INCIDENT_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{INCIDENT_PATTERN}$"))
        .expect("EXACT_INCIDENT_NUMBER regex should compile")
});
static EXACT_EMAIL_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{EMAIL_PATTERN}$")).expect("EXACT_EMAIL_ADDRESS regex should compile")
});

/// Whether `text` is exactly one incident number, with nothing around it.
pub fn is_incident_number(text: &str) -> bool {
    EXACT_INCIDENT_NUMBER.is_match(text)
}

/// Whether `text` is exactly one e-mail address, with nothing around it.
pub fn is_email_address(text: &str) -> bool {
    EXACT_EMAIL_ADDRESS.is_match(text)
}

/// Incident state as reported by the back-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentState {
    New,
    InProgress,
    OnHold,
    Closed,
    Unknown,
}

impl IncidentState {
    /// Map a back-end state code ("1".."4").
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1" => Self::New,
            "2" => Self::InProgress,
            "3" => Self::OnHold,
            "4" => Self::Closed,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for IncidentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "New"),
            Self::InProgress => write!(f, "In Progress"),
            Self::OnHold => write!(f, "On Hold"),
            Self::Closed => write!(f, "Closed"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub number: String,
    pub description: String,
    pub state: IncidentState,
}

/// The only state changes users may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatusChange {
    Resolved,
    Closed,
}

impl TicketStatusChange {
    /// Back-end state code to write.
    pub fn state_code(self) -> u8 {
        match self {
            Self::Resolved => 6,
            Self::Closed => 7,
        }
    }
}

impl FromStr for TicketStatusChange {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "resolved" | "resolve" => Ok(Self::Resolved),
            "closed" | "close" => Ok(Self::Closed),
            other => Err(TriageError::LookupFailure(format!(
                "status '{other}' is not allowed; use resolved or closed"
            ))),
        }
    }
}

/// A requested change to an existing incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum TicketUpdate {
    Description(String),
    Status(TicketStatusChange),
}

/// What a free-text lookup request refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketReference {
    Number(String),
    Caller(String),
}

impl TicketReference {
    /// Pull an incident number or e-mail out of free text. A number wins.
    pub fn extract(text: &str) -> Option<Self> {
        if let Some(m) = INCIDENT_NUMBER.find(text) {
            return Some(Self::Number(m.as_str().to_string()));
        }
        EMAIL_ADDRESS
            .find(text)
            .map(|m| Self::Caller(m.as_str().to_string()))
    }
}

impl fmt::Display for TicketReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Caller(caller) => write!(f, "{caller}"),
        }
    }
}

/// Incident lookup/update collaborator.
#[async_trait]
pub trait TicketLookup: Send + Sync {
    async fn find_by_number(
        &self,
        number: &str,
    ) -> Result<Option<TicketSummary>, CollaboratorError>;

    async fn latest_for_caller(
        &self,
        caller: &str,
    ) -> Result<Option<TicketSummary>, CollaboratorError>;

    /// Newest first.
    async fn recent_for_caller(
        &self,
        caller: &str,
        limit: usize,
    ) -> Result<Vec<TicketSummary>, CollaboratorError>;

    async fn update_description(
        &self,
        number: &str,
        description: &str,
    ) -> Result<TicketSummary, CollaboratorError>;

    async fn update_status(
        &self,
        number: &str,
        change: TicketStatusChange,
    ) -> Result<TicketSummary, CollaboratorError>;
}

/// Bounded front for a [`TicketLookup`].
#[derive(Clone)]
pub struct TicketDesk {
    lookup: Arc<dyn TicketLookup>,
    timeout: Duration,
}

impl TicketDesk {
    pub fn new(lookup: Arc<dyn TicketLookup>, timeout: Duration) -> Self {
        Self { lookup, timeout }
    }

    /// Tickets for a reference: the numbered one, or the caller's latest.
    /// Empty when nothing is found.
    pub async fn status(&self, reference: &TicketReference) -> TriageResult<Vec<TicketSummary>> {
        let found = match reference {
            TicketReference::Number(number) => {
                let number = checked_number(number)?;
                self.bounded(self.lookup.find_by_number(number)).await?
            }
            TicketReference::Caller(caller) => {
                let caller = checked_caller(caller)?;
                self.bounded(self.lookup.latest_for_caller(caller)).await?
            }
        };
        Ok(found.into_iter().collect())
    }

    pub async fn recent(&self, caller: &str, limit: usize) -> TriageResult<Vec<TicketSummary>> {
        let caller = checked_caller(caller)?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut tickets = self.bounded(self.lookup.recent_for_caller(caller, limit)).await?;
        tickets.truncate(limit);
        Ok(tickets)
    }

    pub async fn update(&self, number: &str, update: &TicketUpdate) -> TriageResult<TicketSummary> {
        let number = checked_number(number)?;
        match update {
            TicketUpdate::Description(text) if text.trim().is_empty() => Err(
                TriageError::LookupFailure("new description is empty".to_string()),
            ),
            TicketUpdate::Description(text) => {
                self.bounded(self.lookup.update_description(number, text.trim())).await
            }
            TicketUpdate::Status(change) => {
                self.bounded(self.lookup.update_status(number, *change)).await
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, CollaboratorError>>,
    ) -> TriageResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(TriageError::TicketingFailure(e)),
            Err(_) => Err(TriageError::TicketingFailure(CollaboratorError::Timeout(self.timeout))),
        }
    }
}

fn checked_number(number: &str) -> TriageResult<&str> {
    let number = number.trim();
    if !is_incident_number(number) {
        return Err(TriageError::LookupFailure(format!(
            "'{number}' is not an incident number"
        )));
    }
    Ok(number)
}

fn checked_caller(caller: &str) -> TriageResult<&str> {
    let caller = caller.trim();
    if !is_email_address(caller) {
        return Err(TriageError::LookupFailure(format!(
            "'{caller}' is not an e-mail address"
        )));
    }
    Ok(caller)
}
