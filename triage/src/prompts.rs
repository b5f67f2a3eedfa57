//! User-facing prompt text, keyed by [`PromptKey`].
//!
//! The decision core never hard-codes message text: every directive carries a
//! key plus the rendered text so the rendering layer can localise by key or
//! display the text as-is. Text may contain `{placeholder}` slots.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stable identifiers for every message the core can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKey {
    DescribeIssue,
    OfferTicket,
    SelectTroubleshooter,
    NotListedOption,
    NotListedAck,
    RemedyRun,
    DidItWork,
    YesOrNo,
    ResolvedThanks,
    SopResolved,
    TicketDeclined,
    RaisingTicket,
    TicketCreated,
    TicketFailed,
    TryAgainLater,
    RemedyUnavailable,
    SoftwareChoose,
    SoftwareApproval,
    SoftwareInstalled,
    SoftwareNotFound,
    SoftwareUnspecified,
    SoftwareBlacklisted,
    Fallback,
    Goodbye,
    TicketReferenceMissing,
    TicketUpdated,
    LookupUnavailable,
    NoTicketFound,
    AnswerSatisfied,
    AnswerAccepted,
    KnowledgeUnavailable,
    TicketDetailsMissing,
}

impl PromptKey {
    fn default_text(self) -> &'static str {
        match self {
            Self::DescribeIssue => "Please describe your issue.",
            Self::OfferTicket => {
                "I couldn't find a matching troubleshooter. Would you like me to create a ticket?"
            }
            Self::SelectTroubleshooter => {
                "I found these relevant troubleshooters. Please select one to run:"
            }
            Self::NotListedOption => "My issue isn't listed here",
            Self::NotListedAck => "Got it. I'll look for a more detailed solution instead.",
            Self::RemedyRun => "I've run the troubleshooter: {name}.",
            Self::DidItWork => "Did this solution work for you?",
            Self::YesOrNo => "Please reply with yes or no.",
            Self::ResolvedThanks => "Great! Let me know if you need anything else.",
            Self::SopResolved => "Glad that helped! Let me know if you need anything else.",
            Self::TicketDeclined => "Alright. Let me know if you need anything else.",
            Self::RaisingTicket => "I'll raise a ticket for you.",
            Self::TicketCreated => "Your ticket has been created with ticket Id - {number}",
            Self::TicketFailed => "Failed to create the ticket : {error}",
            Self::TryAgainLater => {
                "I'm having trouble analyzing your issue right now. Please try again later."
            }
            Self::RemedyUnavailable => {
                "I couldn't fetch a more detailed solution right now. Please try again later."
            }
            Self::SoftwareChoose => "I found multiple matching softwares. Please choose one:",
            Self::SoftwareApproval => {
                "{name} requires approval before installation.\nI'll raise a request for approval."
            }
            Self::SoftwareInstalled => "{name} installation has been triggered successfully.",
            Self::SoftwareNotFound => {
                "I couldn't find that software in our approved catalog. \
                 I'll raise a ticket for you."
            }
            Self::SoftwareUnspecified => {
                "I couldn't identify the software. I'll raise a ticket for you."
            }
            Self::SoftwareBlacklisted => {
                "{name} is not allowed on company devices. I'll raise a ticket for you."
            }
            Self::Fallback => {
                "Sorry, I don't understand that. \
                 Can you please rephrase or describe the issue you are facing?"
            }
            Self::Goodbye => "Thanks for chatting! Have a great day.",
            Self::TicketReferenceMissing => {
                "Please provide either a ticket ID or an email Id to fetch the tickets."
            }
            Self::TicketUpdated => "Ticket {number} has been updated.",
            Self::LookupUnavailable => "Ticket lookup is not available right now.",
            Self::NoTicketFound => "No ticket found for {reference}.",
            Self::AnswerSatisfied => "Are you happy with the solution?",
            Self::AnswerAccepted => {
                "Great! I'm glad I could help. Let me know if you need anything else."
            }
            Self::KnowledgeUnavailable => {
                "I couldn't reach the knowledge base right now. Please try again later."
            }
            Self::TicketDetailsMissing => {
                "Please give a short description of the problem so I can raise a ticket."
            }
        }
    }
}

/// Prompt text table: built-in defaults plus configured overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptBook {
    overrides: HashMap<PromptKey, String>,
}

impl PromptBook {
    /// Override the text for a single key.
    pub fn with(mut self, key: PromptKey, text: impl Into<String>) -> Self {
        self.overrides.insert(key, text.into());
        self
    }

    /// Raw template for a key.
    pub fn template(&self, key: PromptKey) -> &str {
        self.overrides
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_text())
    }

    /// Render a key, substituting `{name}` style slots.
    pub fn render(&self, key: PromptKey, vars: &[(&str, &str)]) -> String {
        let mut text = self.template(key).to_string();
        for (name, value) in vars {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_override() {
        let book = PromptBook::default().with(PromptKey::DidItWork, "Fixed now?");
        assert_eq!(book.template(PromptKey::DidItWork), "Fixed now?");
        assert_eq!(book.template(PromptKey::YesOrNo), "Please reply with yes or no.");
    }

    #[test]
    fn test_render_substitutes_slots() {
        let book = PromptBook::default();
        let text = book.render(PromptKey::SoftwareInstalled, &[("name", "Zoom")]);
        assert_eq!(text, "Zoom installation has been triggered successfully.");
    }

    #[test]
    fn test_overrides_deserialize_from_toml_table() {
        let book: PromptBook = toml::from_str("offer_ticket = \"Open a ticket?\"").unwrap();
        assert_eq!(book.template(PromptKey::OfferTicket), "Open a ticket?");
    }
}
