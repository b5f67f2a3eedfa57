//! Escalation state machine.
//!
//! Consumes one [`Event`] per call, mutates the caller's [`Session`] and
//! returns the [`Directive`]s for the rendering layer:
//!
//! ```text
//! Idle ──issue──► matcher ──none──► NoMatchFound ──yes──► ticket ──► Escalated ─┐
//!                    │                   └──no──► Idle                          │
//!                    └──some──► AwaitingTroubleshooterSelection                 │
//!                                 │ pick            │ not listed                │
//!                                 ▼                 ▼                           │
//!                       AwaitingListFeedback ──no──► AwaitingSopFeedback ──no──┤
//!                                 │ yes                 │ yes                   │
//!                                 └──────► Resolved ◄───┘                       │
//!                                              └──────────► Idle ◄──────────────┘
//! ```
//!
//! Knowledge answers take the side branch `Idle → AwaitingAnswerFeedback →
//! Resolved | Escalated`. The software sub-flow, user-requested tickets and
//! the ticket desk run beside this graph and never change the stage.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::CatalogEntry;
use crate::config::TriageConfig;
use crate::desk::{TicketDesk, TicketReference, TicketSummary, TicketUpdate};
use crate::error::{CollaboratorError, TriageError};
use crate::feedback::{FeedbackClassifier, FeedbackSignal};
use crate::matcher::{CandidateMatch, SemanticMatcher};
use crate::prompts::PromptKey;
use crate::remedy::{DeeperRemedySource, KnowledgeBase, KnowledgeDomain};
use crate::resolver::FuzzyCatalogResolver;
use crate::session::Session;
use crate::stage::{IllegalTransition, Stage};
use crate::ticket::{EscalationTicket, TicketReceipt, Ticketing};

/// Selection token of the "my issue isn't listed" option.
pub const NOT_LISTED: &str = "not-listed";

/// Inbound event from the language-understanding layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    IssueDescribed { text: String },
    /// Echo of a [`SelectionOption::token`], or free text naming an option
    Selection { token: String },
    Feedback { text: String },
    SoftwareRequested { name: Option<String> },
    SoftwareConfirmed { token: String },
    TicketStatus { reference: String },
    RecentTickets { limit: usize },
    UpdateTicket { number: String, change: TicketUpdate },
    KnowledgeQuery { domain: KnowledgeDomain, text: String },
    CreateTicket {
        short_description: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        category: Option<String>,
    },
    EndSession,
}

/// One selectable option; the rendering layer echoes `token` back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionOption {
    pub label: String,
    pub token: String,
}

/// Outbound instruction for the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Directive {
    Say { text: String },
    Prompt { key: PromptKey, text: String },
    Choose { prompt: String, options: Vec<SelectionOption> },
    RunRemedy {
        id: String,
        secondary_id: Option<String>,
        display_name: String,
    },
    ShowRemedy { text: String },
    TicketOpened { number: String, ticket: EscalationTicket },
    /// Backend error text, verbatim
    TicketFailed { message: String },
    TriggerInstall { software: String },
    TransientFailure { key: PromptKey, text: String },
    TicketDetails { tickets: Vec<TicketSummary> },
    ShowAnswer { domain: KnowledgeDomain, text: String },
}

type Step = Result<Vec<Directive>, IllegalTransition>;

/// The orchestrator. Holds only shared, read-only collaborators; all
/// per-conversation state lives in the [`Session`] passed to [`handle`].
///
/// [`handle`]: EscalationStateMachine::handle
#[derive(Clone)]
pub struct EscalationStateMachine {
    config: Arc<TriageConfig>,
    classifier: FeedbackClassifier,
    matcher: SemanticMatcher,
    resolver: Option<FuzzyCatalogResolver>,
    ticketing: Arc<dyn Ticketing>,
    remedies: Arc<dyn DeeperRemedySource>,
    knowledge: Option<Arc<dyn KnowledgeBase>>,
    desk: Option<TicketDesk>,
}

impl EscalationStateMachine {
    pub fn new(
        config: TriageConfig,
        matcher: SemanticMatcher,
        ticketing: Arc<dyn Ticketing>,
        remedies: Arc<dyn DeeperRemedySource>,
    ) -> Self {
        Self {
            classifier: FeedbackClassifier::new(&config.feedback),
            config: Arc::new(config),
            matcher,
            resolver: None,
            ticketing,
            remedies,
            knowledge: None,
            desk: None,
        }
    }

    /// Enable the software-installation sub-flow.
    pub fn with_resolver(mut self, resolver: FuzzyCatalogResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Enable ticket status lookups and updates.
    pub fn with_desk(mut self, desk: TicketDesk) -> Self {
        self.desk = Some(desk);
        self
    }

    /// Enable HR / WorkElevate knowledge answers.
    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeBase>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    /// Process one event for `session`.
    ///
    /// Never fails: every collaborator error maps to a fallback directive and
    /// a defined stage.
    pub async fn handle(&self, session: &mut Session, event: Event) -> Vec<Directive> {
        let step = match event {
            Event::IssueDescribed { text } => self.on_issue(session, &text).await,
            Event::Selection { token } => self.on_selection(session, &token).await,
            Event::Feedback { text } => self.on_feedback(session, &text).await,
            Event::SoftwareRequested { name } => {
                Ok(self.on_software_request(session, name.as_deref()).await)
            }
            Event::SoftwareConfirmed { token } => {
                Ok(self.on_software_confirmed(session, &token).await)
            }
            Event::TicketStatus { reference } => Ok(self.on_ticket_status(&reference).await),
            Event::RecentTickets { limit } => Ok(self.on_recent_tickets(session, limit).await),
            Event::UpdateTicket { number, change } => {
                Ok(self.on_update_ticket(&number, &change).await)
            }
            Event::KnowledgeQuery { domain, text } => {
                self.on_knowledge_query(session, domain, &text).await
            }
            Event::CreateTicket {
                short_description,
                description,
                category,
            } => {
                let ticket = EscalationTicket::user_requested(
                    short_description.trim(),
                    description.as_deref(),
                    category.as_deref(),
                    &self.config.ticketing,
                );
                Ok(self.on_create_ticket(session, ticket).await)
            }
            Event::EndSession => {
                session.reset("session ended");
                Ok(vec![self.prompt(PromptKey::Goodbye)])
            }
        };

        match step {
            Ok(directives) => directives,
            Err(e) => {
                tracing::error!(
                    session = %session.id,
                    error = %e,
                    "Transition rejected; resetting session"
                );
                session.reset("illegal transition");
                vec![self.prompt(PromptKey::Fallback)]
            }
        }
    }

    async fn on_issue(&self, session: &mut Session, text: &str) -> Step {
        let text = text.trim();
        if text.is_empty() {
            return Ok(vec![self.prompt(PromptKey::DescribeIssue)]);
        }
        if session.stage() != Stage::Idle {
            session.reset("new issue described");
        }

        let candidates = match self.matcher.find(text).await {
            Ok(c) => c,
            Err(e) => {
                warn_collaborator(session, &e, "Remedy matching failed");
                return Ok(vec![self.transient(PromptKey::TryAgainLater)]);
            }
        };

        session.pending_query = Some(text.to_string());
        if candidates.is_empty() {
            tracing::info!(session = %session.id, "No remedy above floor");
            session.advance(Stage::NoMatchFound, Some("no candidates"))?;
            return Ok(vec![self.prompt(PromptKey::OfferTicket)]);
        }

        tracing::info!(
            session = %session.id,
            candidates = candidates.len(),
            "Offering troubleshooters"
        );
        let choice = self.troubleshooter_choice(&candidates);
        session.pending_candidates = candidates;
        session.advance(Stage::AwaitingTroubleshooterSelection, Some("candidates found"))?;
        Ok(vec![choice])
    }

    async fn on_selection(&self, session: &mut Session, token: &str) -> Step {
        if session.stage() != Stage::AwaitingTroubleshooterSelection {
            return Ok(vec![self.prompt(PromptKey::Fallback)]);
        }
        let token = token.trim();

        if token.eq_ignore_ascii_case(NOT_LISTED)
            || token.eq_ignore_ascii_case(self.text(PromptKey::NotListedOption))
        {
            let ack = vec![self.prompt(PromptKey::NotListedAck)];
            return self.deeper_remedy(session, ack).await;
        }

        let picked = session
            .pending_candidates
            .iter()
            .find(|c| c.id == token || c.display_name.eq_ignore_ascii_case(token))
            .cloned();
        let Some(candidate) = picked else {
            return Ok(vec![self.troubleshooter_choice(&session.pending_candidates)]);
        };

        session.selected_candidate = Some(candidate.id.clone());
        session.advance(Stage::AwaitingListFeedback, Some("troubleshooter selected"))?;
        Ok(vec![
            Directive::RunRemedy {
                id: candidate.id,
                secondary_id: candidate.secondary_id,
                display_name: candidate.display_name.clone(),
            },
            self.prompt_with(PromptKey::RemedyRun, &[("name", &candidate.display_name)]),
            self.prompt(PromptKey::DidItWork),
        ])
    }

    async fn on_feedback(&self, session: &mut Session, text: &str) -> Step {
        let stage = session.stage();
        if stage == Stage::AwaitingTroubleshooterSelection {
            return self.on_selection(session, text).await;
        }
        if !stage.awaits_feedback() {
            return Ok(vec![self.prompt(PromptKey::Fallback)]);
        }

        let signal = self.classifier.classify(text);
        tracing::debug!(
            session = %session.id,
            stage = %stage,
            signal = %signal,
            "Feedback classified"
        );
        if signal == FeedbackSignal::Unclear {
            return Ok(vec![self.prompt(PromptKey::YesOrNo)]);
        }

        match (stage, signal) {
            (Stage::NoMatchFound, FeedbackSignal::Positive) => {
                let query = session.pending_query.clone().unwrap_or_default();
                let ticket = EscalationTicket::no_remedy_found(&query, &self.config.ticketing);
                self.escalate(session, ticket).await
            }
            (Stage::NoMatchFound, _) => {
                session.advance(Stage::Idle, Some("ticket declined"))?;
                Ok(vec![self.prompt(PromptKey::TicketDeclined)])
            }
            (Stage::AwaitingListFeedback, FeedbackSignal::Positive) => {
                session.finish(Stage::Resolved, "troubleshooter worked")?;
                Ok(vec![self.prompt(PromptKey::ResolvedThanks)])
            }
            (Stage::AwaitingListFeedback, _) => self.deeper_remedy(session, Vec::new()).await,
            (Stage::AwaitingSopFeedback, FeedbackSignal::Positive) => {
                session.finish(Stage::Resolved, "deeper remedy worked")?;
                Ok(vec![self.prompt(PromptKey::SopResolved)])
            }
            (Stage::AwaitingSopFeedback, _) => {
                let query = session.pending_query.clone().unwrap_or_default();
                let ticket = EscalationTicket::remedies_exhausted(&query, &self.config.ticketing);
                self.escalate(session, ticket).await
            }
            (Stage::AwaitingAnswerFeedback, FeedbackSignal::Positive) => {
                session.finish(Stage::Resolved, "answer accepted")?;
                Ok(vec![self.prompt(PromptKey::AnswerAccepted)])
            }
            (Stage::AwaitingAnswerFeedback, _) => {
                let query = session.pending_query.clone().unwrap_or_default();
                let ticket = EscalationTicket::answer_rejected(&query, &self.config.ticketing);
                self.escalate(session, ticket).await
            }
            _ => Ok(vec![self.prompt(PromptKey::Fallback)]),
        }
    }

    /// Fetch and show the deeper remedy. On failure the stage is left alone
    /// so the user can answer again.
    async fn deeper_remedy(&self, session: &mut Session, mut directives: Vec<Directive>) -> Step {
        let query = session.pending_query.clone().unwrap_or_default();
        match bounded(self.ticket_budget(), self.remedies.fetch(&query)).await {
            Ok(text) => {
                session.advance(Stage::AwaitingSopFeedback, Some("deeper remedy shown"))?;
                directives.push(Directive::ShowRemedy { text });
                directives.push(self.prompt(PromptKey::DidItWork));
            }
            Err(e) => {
                let err = TriageError::RemedyUnavailable(e);
                warn_collaborator(session, &err, "Deeper remedy fetch failed");
                directives.push(self.transient(PromptKey::RemedyUnavailable));
            }
        }
        Ok(directives)
    }

    // --- knowledge answers ---

    async fn on_knowledge_query(
        &self,
        session: &mut Session,
        domain: KnowledgeDomain,
        text: &str,
    ) -> Step {
        let text = text.trim();
        if text.is_empty() {
            return Ok(vec![self.prompt(PromptKey::DescribeIssue)]);
        }
        if session.stage() != Stage::Idle {
            session.reset("new knowledge query");
        }
        let Some(knowledge) = &self.knowledge else {
            tracing::warn!(session = %session.id, %domain, "No knowledge base configured");
            return Ok(vec![self.transient(PromptKey::KnowledgeUnavailable)]);
        };

        let answer = match bounded(self.ticket_budget(), knowledge.answer(domain, text)).await {
            Ok(answer) => answer,
            Err(e) => {
                let err = TriageError::KnowledgeUnavailable(e);
                warn_collaborator(session, &err, "Knowledge answer failed");
                return Ok(vec![self.transient(PromptKey::KnowledgeUnavailable)]);
            }
        };

        tracing::info!(session = %session.id, %domain, "Knowledge answer shown");
        session.pending_query = Some(text.to_string());
        session.pending_domain = Some(domain);
        session.advance(Stage::AwaitingAnswerFeedback, Some("knowledge answer shown"))?;
        Ok(vec![
            Directive::ShowAnswer {
                domain,
                text: answer,
            },
            self.prompt(PromptKey::AnswerSatisfied),
        ])
    }

    /// Submit a ticket the user asked for by name. Never changes the stage.
    async fn on_create_ticket(
        &self,
        session: &Session,
        ticket: EscalationTicket,
    ) -> Vec<Directive> {
        if ticket.short_description.is_empty() {
            return vec![self.prompt(PromptKey::TicketDetailsMissing)];
        }
        match self.submit(session, &ticket).await {
            Ok(receipt) => self.ticket_opened(receipt, ticket).into(),
            Err(e) => self.ticket_failed(e).into(),
        }
    }

    /// Submit a troubleshooting ticket: `Escalated` on success, reset on failure.
    async fn escalate(&self, session: &mut Session, ticket: EscalationTicket) -> Step {
        let mut directives = vec![self.prompt(PromptKey::RaisingTicket)];
        match self.submit(session, &ticket).await {
            Ok(receipt) => {
                session.finish(Stage::Escalated, &ticket.reason.to_string())?;
                directives.extend(self.ticket_opened(receipt, ticket));
            }
            Err(e) => {
                session.reset("ticket submission failed");
                directives.extend(self.ticket_failed(e));
            }
        }
        Ok(directives)
    }

    async fn submit(
        &self,
        session: &Session,
        ticket: &EscalationTicket,
    ) -> Result<TicketReceipt, CollaboratorError> {
        let result = bounded(
            self.ticket_budget(),
            self.ticketing.create_incident(session.caller.as_deref(), ticket),
        )
        .await;
        match &result {
            Ok(receipt) => tracing::info!(
                session = %session.id,
                number = %receipt.number,
                reason = %ticket.reason,
                "Escalation ticket created"
            ),
            Err(e) => tracing::warn!(
                session = %session.id,
                kind = e.kind(),
                error = %e,
                reason = %ticket.reason,
                "Ticket submission failed"
            ),
        }
        result
    }

    // --- software sub-flow ---

    async fn on_software_request(
        &self,
        session: &mut Session,
        name: Option<&str>,
    ) -> Vec<Directive> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        let Some(name) = name else {
            session.software_choices.clear();
            let ticket = EscalationTicket::software_unspecified(&self.config.ticketing);
            return self
                .software_ticket(session, self.prompt(PromptKey::SoftwareUnspecified), ticket)
                .await;
        };
        let Some(resolver) = &self.resolver else {
            let err =
                TriageError::ResolverUnavailable("no software catalog configured".to_string());
            tracing::warn!(session = %session.id, error = %err, "Software lookup unavailable");
            return vec![self.transient(PromptKey::TryAgainLater)];
        };

        let mut hits = resolver.resolve(name);
        tracing::debug!(session = %session.id, hits = hits.len(), "Software name resolved");
        match hits.len() {
            0 => {
                session.software_choices.clear();
                let ticket = EscalationTicket::software_not_found(name, &self.config.ticketing);
                self.software_ticket(session, self.prompt(PromptKey::SoftwareNotFound), ticket)
                    .await
            }
            1 => {
                let entry = hits.remove(0).entry;
                self.apply_software(session, &entry).await
            }
            _ => {
                session.software_choices = hits.iter().map(|h| h.entry.key.clone()).collect();
                let entries: Vec<&CatalogEntry> = hits.iter().map(|h| &h.entry).collect();
                vec![self.software_choice(&entries)]
            }
        }
    }

    async fn on_software_confirmed(
        &self,
        session: &mut Session,
        token: &str,
    ) -> Vec<Directive> {
        if session.software_choices.is_empty() {
            return self.on_software_request(session, Some(token)).await;
        }
        let Some(resolver) = &self.resolver else {
            return vec![self.transient(PromptKey::TryAgainLater)];
        };

        let token = token.trim();
        let entry = match resolver.catalog().get(token) {
            Some(entry) => Some(entry.clone()),
            None => {
                let mut strict = resolver.resolve_strict(token);
                (strict.len() == 1).then(|| strict.remove(0).entry)
            }
        };

        match entry {
            Some(entry) => self.apply_software(session, &entry).await,
            None => {
                let pending: Vec<&CatalogEntry> = session
                    .software_choices
                    .iter()
                    .filter_map(|key| resolver.catalog().get(key))
                    .collect();
                vec![self.software_choice(&pending)]
            }
        }
    }

    /// Blacklist, then approval, then direct install.
    async fn apply_software(
        &self,
        session: &mut Session,
        entry: &CatalogEntry,
    ) -> Vec<Directive> {
        session.software_choices.clear();
        let name = entry.display_name();

        if entry.is_blacklisted {
            let notice = self.prompt_with(PromptKey::SoftwareBlacklisted, &[("name", &name)]);
            let ticket = EscalationTicket::software_blacklisted(entry, &self.config.ticketing);
            return self.software_ticket(session, notice, ticket).await;
        }
        if entry.requires_approval() {
            let notice = self.prompt_with(PromptKey::SoftwareApproval, &[("name", &name)]);
            let ticket = EscalationTicket::approval_required(entry, &self.config.ticketing);
            return self.software_ticket(session, notice, ticket).await;
        }

        tracing::info!(session = %session.id, software = %entry.key, "Installation triggered");
        vec![
            Directive::TriggerInstall {
                software: entry.key.clone(),
            },
            self.prompt_with(PromptKey::SoftwareInstalled, &[("name", &name)]),
        ]
    }

    async fn software_ticket(
        &self,
        session: &mut Session,
        notice: Directive,
        ticket: EscalationTicket,
    ) -> Vec<Directive> {
        let mut directives = vec![notice];
        match self.submit(session, &ticket).await {
            Ok(receipt) => directives.extend(self.ticket_opened(receipt, ticket)),
            Err(e) => {
                session.software_choices.clear();
                directives.extend(self.ticket_failed(e));
            }
        }
        directives
    }

    // --- ticket desk ---

    async fn on_ticket_status(&self, reference: &str) -> Vec<Directive> {
        let Some(desk) = &self.desk else {
            return vec![self.transient(PromptKey::LookupUnavailable)];
        };
        let Some(reference) = TicketReference::extract(reference) else {
            return vec![self.prompt(PromptKey::TicketReferenceMissing)];
        };
        self.desk_result(&reference.to_string(), desk.status(&reference).await)
    }

    async fn on_recent_tickets(&self, session: &Session, limit: usize) -> Vec<Directive> {
        let Some(desk) = &self.desk else {
            return vec![self.transient(PromptKey::LookupUnavailable)];
        };
        let Some(caller) = session.caller.as_deref() else {
            return vec![self.prompt(PromptKey::TicketReferenceMissing)];
        };
        self.desk_result(caller, desk.recent(caller, limit).await)
    }

    async fn on_update_ticket(&self, number: &str, change: &TicketUpdate) -> Vec<Directive> {
        let Some(desk) = &self.desk else {
            return vec![self.transient(PromptKey::LookupUnavailable)];
        };
        match desk.update(number, change).await {
            Ok(ticket) => {
                let updated =
                    self.prompt_with(PromptKey::TicketUpdated, &[("number", &ticket.number)]);
                vec![
                    Directive::TicketDetails {
                        tickets: vec![ticket],
                    },
                    updated,
                ]
            }
            Err(e) => self.desk_failure(e),
        }
    }

    fn desk_result(
        &self,
        reference: &str,
        result: Result<Vec<TicketSummary>, TriageError>,
    ) -> Vec<Directive> {
        match result {
            Ok(tickets) if tickets.is_empty() => {
                vec![self.prompt_with(PromptKey::NoTicketFound, &[("reference", reference)])]
            }
            Ok(tickets) => vec![Directive::TicketDetails { tickets }],
            Err(e) => self.desk_failure(e),
        }
    }

    fn desk_failure(&self, err: TriageError) -> Vec<Directive> {
        match err {
            TriageError::LookupFailure(message) => vec![Directive::Say { text: message }],
            TriageError::TicketingFailure(CollaboratorError::Rejected(message)) => {
                vec![Directive::Say { text: message }]
            }
            other => {
                tracing::warn!(error = %other, "Ticket desk call failed");
                vec![self.transient(PromptKey::LookupUnavailable)]
            }
        }
    }

    // --- directive helpers ---

    fn text(&self, key: PromptKey) -> &str {
        self.config.prompts.template(key)
    }

    fn prompt(&self, key: PromptKey) -> Directive {
        self.prompt_with(key, &[])
    }

    fn prompt_with(&self, key: PromptKey, vars: &[(&str, &str)]) -> Directive {
        Directive::Prompt {
            key,
            text: self.config.prompts.render(key, vars),
        }
    }

    fn transient(&self, key: PromptKey) -> Directive {
        Directive::TransientFailure {
            key,
            text: self.config.prompts.render(key, &[]),
        }
    }

    fn troubleshooter_choice(&self, candidates: &[CandidateMatch]) -> Directive {
        let mut options: Vec<SelectionOption> = candidates
            .iter()
            .map(|c| SelectionOption {
                label: c.display_name.clone(),
                token: c.id.clone(),
            })
            .collect();
        options.push(SelectionOption {
            label: self.text(PromptKey::NotListedOption).to_string(),
            token: NOT_LISTED.to_string(),
        });
        Directive::Choose {
            prompt: self.text(PromptKey::SelectTroubleshooter).to_string(),
            options,
        }
    }

    fn software_choice(&self, entries: &[&CatalogEntry]) -> Directive {
        Directive::Choose {
            prompt: self.text(PromptKey::SoftwareChoose).to_string(),
            options: entries
                .iter()
                .map(|e| SelectionOption {
                    label: e.display_name(),
                    token: e.key.clone(),
                })
                .collect(),
        }
    }

    fn ticket_opened(&self, receipt: TicketReceipt, ticket: EscalationTicket) -> [Directive; 2] {
        let created = self.prompt_with(PromptKey::TicketCreated, &[("number", &receipt.number)]);
        [
            Directive::TicketOpened {
                number: receipt.number,
                ticket,
            },
            created,
        ]
    }

    fn ticket_failed(&self, err: CollaboratorError) -> [Directive; 2] {
        let message = err.to_string();
        let rendered = self.prompt_with(PromptKey::TicketFailed, &[("error", &message)]);
        [Directive::TicketFailed { message }, rendered]
    }

    fn ticket_budget(&self) -> Duration {
        self.config.ticketing.timeout()
    }
}

async fn bounded<T>(
    budget: Duration,
    call: impl Future<Output = Result<T, CollaboratorError>>,
) -> Result<T, CollaboratorError> {
    tokio::time::timeout(budget, call)
        .await
        .unwrap_or(Err(CollaboratorError::Timeout(budget)))
}

fn warn_collaborator(session: &Session, err: &TriageError, message: &str) {
    let kind = match err {
        TriageError::MatchUnavailable(e)
        | TriageError::TicketingFailure(e)
        | TriageError::RemedyUnavailable(e)
        | TriageError::KnowledgeUnavailable(e) => e.kind(),
        _ => "internal",
    };
    tracing::warn!(session = %session.id, kind, error = %err, "{message}");
}
