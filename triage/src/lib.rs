//! Helpdesk Triage Library
//!
//! Resolution-escalation decision core for a conversational IT/HR support
//! assistant. A user describes a problem; the core tries progressively deeper
//! automated remedies and opens a ticket when they fail.
//!
//! # Components
//!
//! - [`FeedbackClassifier`]: terse reply → Positive / Negative / Unclear
//!   (negative phrases win)
//! - [`FuzzyCatalogResolver`]: free-text software name → catalog entries
//! - [`SemanticMatcher`]: issue text → thresholded top-K remedies
//! - [`EscalationStateMachine`]: event + session → directives
//! - [`ConversationHub`]: per-conversation session arena
//!
//! Every external system (embedding, vector index, ticketing, deeper-remedy
//! source, knowledge base, ticket lookup) is an `async_trait` trait; HTTP
//! implementations live in the `helpdesk-agent` crate.
//!
//! # Usage
//!
//! ```ignore
//! let hub = ConversationHub::new(machine);
//! hub.open("conv-1", Some("jo@corp.com".into())).await;
//! let directives = hub
//!     .handle("conv-1", Event::IssueDescribed { text: "printer not working".into() })
//!     .await;
//! ```

pub mod catalog;
pub mod config;
pub mod desk;
pub mod error;
pub mod feedback;
pub mod hub;
pub mod machine;
pub mod matcher;
pub mod prompts;
pub mod remedy;
pub mod resolver;
pub mod session;
pub mod stage;
pub mod ticket;

pub use catalog::{CatalogEntry, LicenseType, SoftwareCatalog};
pub use config::{
    FeedbackPhrases, MatcherConfig, ResolverConfig, SessionConfig, TicketingConfig, TriageConfig,
};
pub use desk::{
    IncidentState, TicketDesk, TicketLookup, TicketReference, TicketStatusChange, TicketSummary,
    TicketUpdate,
};
pub use error::{CatalogError, CollaboratorError, ConfigError, TriageError, TriageResult};
pub use feedback::{FeedbackClassifier, FeedbackSignal};
pub use hub::ConversationHub;
pub use machine::{Directive, EscalationStateMachine, Event, SelectionOption, NOT_LISTED};
pub use matcher::{
    CandidateMatch, Embedder, Neighbor, RemedyPayload, SearchParams, SemanticMatcher, VectorIndex,
};
pub use prompts::{PromptBook, PromptKey};
pub use remedy::{DeeperRemedySource, KnowledgeBase, KnowledgeDomain};
pub use resolver::{FuzzyCatalogResolver, ResolvedEntry};
pub use session::Session;
pub use stage::{is_legal_transition, IllegalTransition, Stage, TransitionRecord};
pub use ticket::{EscalationReason, EscalationTicket, TicketReceipt, Ticketing};
