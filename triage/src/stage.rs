//! Conversation stages and legal transition guards.
//!
//! Every stage change is validated against the transition table and recorded
//! so a session's path can be replayed for diagnostics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The remedy/feedback cycle of one session.
///
/// `Resolved` and `Escalated` are terminal: they are recorded, then the
/// session collapses to `Idle` in the same turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// No open issue.
    #[default]
    Idle,
    /// Candidate troubleshooters offered, waiting for a pick.
    AwaitingTroubleshooterSelection,
    /// Nothing matched; "create a ticket?" was asked.
    NoMatchFound,
    /// A troubleshooter ran; "did it work?" was asked.
    AwaitingListFeedback,
    /// A deeper remedy (SOP) was shown; "did it work?" was asked.
    AwaitingSopFeedback,
    /// A knowledge answer was shown; "are you happy?" was asked.
    AwaitingAnswerFeedback,
    /// User confirmed the issue is fixed. Terminal.
    Resolved,
    /// Issue handed to a ticket. Terminal.
    Escalated,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Escalated)
    }

    /// Stages in which a yes/no reply is expected.
    pub fn awaits_feedback(self) -> bool {
        matches!(
            self,
            Self::NoMatchFound
                | Self::AwaitingListFeedback
                | Self::AwaitingSopFeedback
                | Self::AwaitingAnswerFeedback
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::AwaitingTroubleshooterSelection => write!(f, "AwaitingTroubleshooterSelection"),
            Self::NoMatchFound => write!(f, "NoMatchFound"),
            Self::AwaitingListFeedback => write!(f, "AwaitingListFeedback"),
            Self::AwaitingSopFeedback => write!(f, "AwaitingSopFeedback"),
            Self::AwaitingAnswerFeedback => write!(f, "AwaitingAnswerFeedback"),
            Self::Resolved => write!(f, "Resolved"),
            Self::Escalated => write!(f, "Escalated"),
        }
    }
}

/// Legal edges of the stage graph.
///
/// ```text
/// Idle → NoMatchFound | AwaitingTroubleshooterSelection | AwaitingAnswerFeedback
/// AwaitingTroubleshooterSelection → AwaitingListFeedback | AwaitingSopFeedback
/// NoMatchFound → Escalated | Idle
/// AwaitingListFeedback → Resolved | AwaitingSopFeedback
/// AwaitingSopFeedback → Resolved | Escalated
/// AwaitingAnswerFeedback → Resolved | Escalated
/// Resolved | Escalated → Idle
/// ```
///
/// Resetting to `Idle` (end of session, ticket failure) bypasses this table.
pub fn is_legal_transition(from: Stage, to: Stage) -> bool {
    use Stage::*;

    matches!(
        (from, to),
        (Idle, NoMatchFound)
            | (Idle, AwaitingTroubleshooterSelection)
            | (Idle, AwaitingAnswerFeedback)
            | (AwaitingTroubleshooterSelection, AwaitingListFeedback)
            // "not listed" jumps straight to the deeper remedy
            | (AwaitingTroubleshooterSelection, AwaitingSopFeedback)
            | (NoMatchFound, Escalated)
            | (NoMatchFound, Idle)
            | (AwaitingListFeedback, Resolved)
            | (AwaitingListFeedback, AwaitingSopFeedback)
            | (AwaitingSopFeedback, Resolved)
            | (AwaitingSopFeedback, Escalated)
            | (AwaitingAnswerFeedback, Resolved)
            | (AwaitingAnswerFeedback, Escalated)
            | (Resolved, Idle)
            | (Escalated, Idle)
    )
}

/// A single recorded stage change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: Stage,
    pub to: Stage,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: Stage,
    pub to: Stage,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal stage transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Stage; 8] = [
        Stage::Idle,
        Stage::AwaitingTroubleshooterSelection,
        Stage::NoMatchFound,
        Stage::AwaitingListFeedback,
        Stage::AwaitingSopFeedback,
        Stage::AwaitingAnswerFeedback,
        Stage::Resolved,
        Stage::Escalated,
    ];

    #[test]
    fn test_terminal_stages_only_collapse_to_idle() {
        for terminal in [Stage::Resolved, Stage::Escalated] {
            for to in ALL {
                let legal = is_legal_transition(terminal, to);
                assert_eq!(legal, to == Stage::Idle, "{terminal} → {to}");
            }
        }
    }

    #[test]
    fn test_no_self_loops() {
        for s in ALL {
            assert!(!is_legal_transition(s, s), "{s} → {s}");
        }
    }

    #[test]
    fn test_cannot_skip_to_feedback_from_idle() {
        assert!(!is_legal_transition(Stage::Idle, Stage::AwaitingListFeedback));
        assert!(!is_legal_transition(Stage::Idle, Stage::Escalated));
        assert!(!is_legal_transition(Stage::AwaitingListFeedback, Stage::Escalated));
    }

    #[test]
    fn test_terminal_stages_are_reached_only_from_feedback_stages() {
        for from in ALL {
            for to in ALL.into_iter().filter(|s| s.is_terminal()) {
                if is_legal_transition(from, to) {
                    assert!(from.awaits_feedback(), "{from} → {to}");
                }
            }
        }
    }

    #[test]
    fn test_awaits_feedback() {
        assert!(Stage::NoMatchFound.awaits_feedback());
        assert!(Stage::AwaitingAnswerFeedback.awaits_feedback());
        assert!(!Stage::AwaitingTroubleshooterSelection.awaits_feedback());
        assert!(!Stage::Idle.awaits_feedback());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Stage::AwaitingSopFeedback).unwrap();
        assert_eq!(json, "\"awaiting_sop_feedback\"");
    }

    #[test]
    fn test_illegal_display() {
        let err = IllegalTransition {
            from: Stage::Idle,
            to: Stage::Resolved,
        };
        assert_eq!(err.to_string(), "Illegal stage transition: Idle → Resolved");
    }
}
