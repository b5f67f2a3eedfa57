//! Per-conversation session state.
//!
//! A session is exclusively owned by whoever is handling its current event;
//! nothing in here is shared between sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matcher::CandidateMatch;
use crate::remedy::KnowledgeDomain;
use crate::stage::{is_legal_transition, IllegalTransition, Stage, TransitionRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Identity used as ticket caller (e-mail in the ServiceNow backend)
    pub caller: Option<String>,
    stage: Stage,
    /// Issue text used for matching; kept until resolved or escalated
    pub pending_query: Option<String>,
    /// Candidates from the latest match, cleared when leaving a stage
    pub pending_candidates: Vec<CandidateMatch>,
    /// Remedy the user chose to run
    pub selected_candidate: Option<String>,
    /// Knowledge domain of an answer awaiting feedback
    pub pending_domain: Option<KnowledgeDomain>,
    /// Catalog keys offered for software disambiguation
    pub software_choices: Vec<String>,
    transitions: Vec<TransitionRecord>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>, caller: Option<String>) -> Self {
        Self {
            id: id.into(),
            caller,
            stage: Stage::Idle,
            pending_query: None,
            pending_candidates: Vec::new(),
            selected_candidate: None,
            pending_domain: None,
            software_choices: Vec::new(),
            transitions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Move to `to` if the edge is legal.
    ///
    /// Leaving any non-Idle stage clears the pending candidates; arriving at
    /// `Idle` also drops the pending query, selection and domain.
    pub fn advance(&mut self, to: Stage, reason: Option<&str>) -> Result<(), IllegalTransition> {
        let from = self.stage;
        if !is_legal_transition(from, to) {
            return Err(IllegalTransition { from, to });
        }

        if from != Stage::Idle {
            self.pending_candidates.clear();
        }
        if to == Stage::Idle {
            self.pending_query = None;
            self.selected_candidate = None;
            self.pending_domain = None;
        }

        tracing::debug!(session = %self.id, from = %from, to = %to, "Stage transition");
        self.transitions.push(TransitionRecord {
            from,
            to,
            at: Utc::now(),
            reason: reason.map(String::from),
        });
        self.stage = to;
        Ok(())
    }

    /// Record a terminal stage and collapse back to `Idle`.
    pub fn finish(&mut self, terminal: Stage, reason: &str) -> Result<(), IllegalTransition> {
        if !terminal.is_terminal() {
            return Err(IllegalTransition {
                from: self.stage,
                to: terminal,
            });
        }
        self.advance(terminal, Some(reason))?;
        self.advance(Stage::Idle, None)
    }

    /// Clear every field and return to `Idle`, whatever the current stage.
    pub fn reset(&mut self, reason: &str) {
        let from = self.stage;
        if from != Stage::Idle {
            tracing::debug!(session = %self.id, from = %from, reason, "Session reset");
            self.transitions.push(TransitionRecord {
                from,
                to: Stage::Idle,
                at: Utc::now(),
                reason: Some(reason.to_string()),
            });
        }
        self.stage = Stage::Idle;
        self.pending_query = None;
        self.pending_candidates.clear();
        self.selected_candidate = None;
        self.pending_domain = None;
        self.software_choices.clear();
    }

    /// Whether `stage` was visited at any point in this session.
    pub fn visited(&self, stage: Stage) -> bool {
        self.transitions.iter().any(|t| t.to == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str) -> CandidateMatch {
        CandidateMatch {
            id: id.into(),
            display_name: format!("Fix {id}"),
            secondary_id: None,
            score: 0.8,
        }
    }

    #[test]
    fn test_new_session_is_idle() {
        let s = Session::new("s1", Some("a@corp.com".into()));
        assert_eq!(s.stage(), Stage::Idle);
        assert!(s.transitions().is_empty());
    }

    #[test]
    fn test_leaving_stage_clears_candidates() {
        let mut s = Session::new("s1", None);
        s.pending_query = Some("vpn drops".into());
        s.pending_candidates = vec![candidate("a"), candidate("b")];
        s.advance(Stage::AwaitingTroubleshooterSelection, None).unwrap();
        assert_eq!(s.pending_candidates.len(), 2);

        s.advance(Stage::AwaitingListFeedback, Some("selected a")).unwrap();
        assert!(s.pending_candidates.is_empty());
        assert_eq!(s.pending_query.as_deref(), Some("vpn drops"));
    }

    #[test]
    fn test_illegal_transition_leaves_state_untouched() {
        let mut s = Session::new("s1", None);
        s.pending_candidates = vec![candidate("a")];
        let err = s.advance(Stage::Resolved, None).unwrap_err();
        assert_eq!(err.from, Stage::Idle);
        assert_eq!(s.stage(), Stage::Idle);
        assert_eq!(s.pending_candidates.len(), 1);
        assert!(s.transitions().is_empty());
    }

    #[test]
    fn test_finish_collapses_to_idle() {
        let mut s = Session::new("s1", None);
        s.pending_query = Some("printer".into());
        s.advance(Stage::NoMatchFound, None).unwrap();
        s.finish(Stage::Escalated, "ticket requested").unwrap();
        assert_eq!(s.stage(), Stage::Idle);
        assert!(s.pending_query.is_none());
        assert!(s.visited(Stage::Escalated));
        let path: Vec<Stage> = s.transitions().iter().map(|t| t.to).collect();
        assert_eq!(path, vec![Stage::NoMatchFound, Stage::Escalated, Stage::Idle]);
    }

    #[test]
    fn test_finish_rejects_non_terminal_stage() {
        let mut s = Session::new("s1", None);
        s.advance(Stage::NoMatchFound, None).unwrap();
        let err = s.finish(Stage::Idle, "declined").unwrap_err();
        assert_eq!(err.to, Stage::Idle);
        assert_eq!(s.stage(), Stage::NoMatchFound);
        assert_eq!(s.transitions().len(), 1);
    }

    #[test]
    fn test_answer_feedback_clears_domain_on_collapse() {
        let mut s = Session::new("s1", None);
        s.pending_query = Some("leave policy".into());
        s.pending_domain = Some(KnowledgeDomain::Hr);
        s.advance(Stage::AwaitingAnswerFeedback, None).unwrap();
        s.finish(Stage::Resolved, "answer accepted").unwrap();
        assert!(s.pending_domain.is_none());
        assert!(s.pending_query.is_none());
    }

    #[test]
    fn test_reset_from_any_stage() {
        let mut s = Session::new("s1", None);
        s.pending_query = Some("q".into());
        s.advance(Stage::AwaitingTroubleshooterSelection, None).unwrap();
        s.software_choices = vec!["chrome".into()];
        s.reset("end of session");
        assert_eq!(s.stage(), Stage::Idle);
        assert!(s.pending_query.is_none());
        assert!(s.software_choices.is_empty());
        assert_eq!(s.transitions().last().unwrap().reason.as_deref(), Some("end of session"));
    }

    #[test]
    fn test_reset_when_idle_records_nothing() {
        let mut s = Session::new("s1", None);
        s.reset("noop");
        assert!(s.transitions().is_empty());
    }
}
