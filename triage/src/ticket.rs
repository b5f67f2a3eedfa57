//! Escalation tickets and the ticketing collaborator.
//!
//! Tickets are write-only: the core builds one, hands it to [`Ticketing`],
//! and keeps nothing but the returned number.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::CatalogEntry;
use crate::config::TicketingConfig;
use crate::error::CollaboratorError;

/// Why a conversation was escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    /// No troubleshooter matched and the user asked for a ticket
    NoRemedyFound,
    /// Troubleshooter and deeper remedy both failed
    RemediesExhausted,
    /// Restricted or licensed software needs sign-off
    ApprovalRequired,
    /// Requested software is not in the catalog
    SoftwareNotFound,
    /// Software install requested without a name
    SoftwareUnspecified,
    /// Requested software is not allowed on company devices
    SoftwareBlacklisted,
    /// User was not satisfied with a knowledge answer
    AnswerRejected,
    /// User asked for a ticket directly
    UserRequested,
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRemedyFound => write!(f, "no remedy found"),
            Self::RemediesExhausted => write!(f, "remedies exhausted"),
            Self::ApprovalRequired => write!(f, "approval required"),
            Self::SoftwareNotFound => write!(f, "software not found"),
            Self::SoftwareUnspecified => write!(f, "software unspecified"),
            Self::SoftwareBlacklisted => write!(f, "software blacklisted"),
            Self::AnswerRejected => write!(f, "answer rejected"),
            Self::UserRequested => write!(f, "user requested"),
        }
    }
}

/// Incident payload handed to the ticketing back-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationTicket {
    pub short_description: String,
    pub description: String,
    pub category: String,
    pub reason: EscalationReason,
}

impl EscalationTicket {
    pub fn no_remedy_found(query: &str, config: &TicketingConfig) -> Self {
        Self {
            short_description: "No troubleshooter available".to_string(),
            description: format!(
                "User issue:\n{query}\n\nNo relevant troubleshooter was found.\n\
                 User requested ticket creation."
            ),
            category: config.technical_category.clone(),
            reason: EscalationReason::NoRemedyFound,
        }
    }

    pub fn remedies_exhausted(query: &str, config: &TicketingConfig) -> Self {
        Self {
            short_description: "Troubleshooter and SOP did not resolve issue".to_string(),
            description: format!(
                "User issue:\n{query}\nTroubleshooter and SOP were provided.\n\
                 User is still facing the issue and requested ticket creation."
            ),
            category: config.technical_category.clone(),
            reason: EscalationReason::RemediesExhausted,
        }
    }

    pub fn approval_required(entry: &CatalogEntry, config: &TicketingConfig) -> Self {
        let name = entry.display_name();
        Self {
            short_description: format!("Software request: {name}"),
            description: format!(
                "User requested installation of {name}.\nSource: {}\nLicense type: {}\n\
                 Approval required.",
                entry.source, entry.license_type
            ),
            category: config.software_category.clone(),
            reason: EscalationReason::ApprovalRequired,
        }
    }

    pub fn software_not_found(requested: &str, config: &TicketingConfig) -> Self {
        Self {
            short_description: format!("Software installation request - {requested} not found"),
            description: format!(
                "User requested installation of '{requested}'.\n\
                 The software was not found in the approved catalog."
            ),
            category: config.software_category.clone(),
            reason: EscalationReason::SoftwareNotFound,
        }
    }

    pub fn software_unspecified(config: &TicketingConfig) -> Self {
        Self {
            short_description: "Software installation request - software not specified".to_string(),
            description: "User requested software installation but did not specify the \
                          software name.\nPlease contact the user to confirm the required software."
                .to_string(),
            category: config.software_category.clone(),
            reason: EscalationReason::SoftwareUnspecified,
        }
    }

    pub fn software_blacklisted(entry: &CatalogEntry, config: &TicketingConfig) -> Self {
        let name = entry.display_name();
        Self {
            short_description: format!("Blocked software request: {name}"),
            description: format!(
                "User requested installation of {name}.\nSource: {}\nLicense type: {}\n\
                 This software is not allowed on company devices.",
                entry.source, entry.license_type
            ),
            category: config.software_category.clone(),
            reason: EscalationReason::SoftwareBlacklisted,
        }
    }

    pub fn answer_rejected(query: &str, config: &TicketingConfig) -> Self {
        Self {
            short_description: "Unresolved HR / WorkElevate query".to_string(),
            description: format!(
                "User query:\n{query}\n\nUser was not satisfied with the response."
            ),
            category: config.inquiry_category.clone(),
            reason: EscalationReason::AnswerRejected,
        }
    }

    /// Ticket raised on the user's own request. A missing description reuses
    /// the short description; a missing category falls back to the inquiry
    /// category.
    pub fn user_requested(
        short_description: &str,
        description: Option<&str>,
        category: Option<&str>,
        config: &TicketingConfig,
    ) -> Self {
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(short_description);
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(config.inquiry_category.as_str());
        Self {
            short_description: short_description.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            reason: EscalationReason::UserRequested,
        }
    }
}

/// Identifier returned by a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketReceipt {
    pub number: String,
}

/// Ticket creation collaborator.
///
/// On failure the error's `Display` text is shown to the user verbatim, so
/// implementations should use [`CollaboratorError::Rejected`] for backend
/// messages meant for end users.
#[async_trait]
pub trait Ticketing: Send + Sync {
    async fn create_incident(
        &self,
        caller: Option<&str>,
        ticket: &EscalationTicket,
    ) -> Result<TicketReceipt, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LicenseType;

    fn photoshop() -> CatalogEntry {
        CatalogEntry {
            key: "photoshop".into(),
            aliases: vec![],
            is_blacklisted: false,
            is_restricted: false,
            license_type: LicenseType::Licensed,
            source: "Adobe".into(),
        }
    }

    #[test]
    fn test_technical_tickets_carry_query() {
        let config = TicketingConfig::default();
        let t = EscalationTicket::no_remedy_found("printer not working", &config);
        assert_eq!(t.category, "Technical");
        assert!(t.description.contains("printer not working"));
        assert_eq!(t.reason, EscalationReason::NoRemedyFound);

        let t = EscalationTicket::remedies_exhausted("vpn drops", &config);
        assert!(t.description.contains("vpn drops"));
        assert_eq!(t.reason, EscalationReason::RemediesExhausted);
    }

    #[test]
    fn test_approval_ticket_has_source_and_license() {
        let t = EscalationTicket::approval_required(&photoshop(), &TicketingConfig::default());
        assert_eq!(t.short_description, "Software request: Photoshop");
        assert!(t.description.contains("Source: Adobe"));
        assert!(t.description.contains("License type: licensed"));
        assert_eq!(t.category, "Software");
    }

    #[test]
    fn test_category_follows_config() {
        let config = TicketingConfig {
            software_category: "Software Request".into(),
            ..Default::default()
        };
        let t = EscalationTicket::software_unspecified(&config);
        assert_eq!(t.category, "Software Request");
    }

    #[test]
    fn test_answer_rejected_ticket() {
        let config = TicketingConfig::default();
        let t = EscalationTicket::answer_rejected("how many leave days?", &config);
        assert_eq!(t.short_description, "Unresolved HR / WorkElevate query");
        assert_eq!(
            t.description,
            "User query:\nhow many leave days?\n\nUser was not satisfied with the response."
        );
        assert_eq!(t.category, "Inquiry / Help");
    }

    #[test]
    fn test_user_requested_defaults() {
        let config = TicketingConfig::default();
        let t = EscalationTicket::user_requested("Laptop fan is loud", None, Some("  "), &config);
        assert_eq!(t.description, "Laptop fan is loud");
        assert_eq!(t.category, "Inquiry / Help");
        assert_eq!(t.reason, EscalationReason::UserRequested);

        let t = EscalationTicket::user_requested(
            "Laptop fan is loud",
            Some("Started after the last update"),
            Some("Hardware"),
            &config,
        );
        assert_eq!(t.description, "Started after the last update");
        assert_eq!(t.category, "Hardware");
    }

    #[test]
    fn test_reason_serde_and_display() {
        let json = serde_json::to_string(&EscalationReason::ApprovalRequired).unwrap();
        assert_eq!(json, "\"approval_required\"");
        assert_eq!(EscalationReason::RemediesExhausted.to_string(), "remedies exhausted");
    }
}
