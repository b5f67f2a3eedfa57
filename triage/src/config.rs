//! Decision-core configuration.
//!
//! Loaded from TOML and then overridden from `TRIAGE_*` environment
//! variables. Every field has a default so an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::prompts::PromptBook;

/// Top-level configuration for the decision core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub matcher: MatcherConfig,
    pub resolver: ResolverConfig,
    pub feedback: FeedbackPhrases,
    pub ticketing: TicketingConfig,
    pub sessions: SessionConfig,
    pub prompts: PromptBook,
}

/// Nearest-neighbour search parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Neighbours scoring below this are discarded
    pub similarity_floor: f32,
    /// Maximum candidates per query (K)
    pub top_k: usize,
    /// Index search effort (HNSW `ef`)
    pub search_effort: u32,
    /// Budget for embedding + index lookup together
    pub timeout_ms: u64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            similarity_floor: 0.45,
            top_k: 3,
            search_effort: 64,
            timeout_ms: 3_000,
        }
    }
}

impl MatcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Fuzzy catalog resolution parameters. Scores are on a 0–100 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub limit: usize,
    /// Used for the initial free-text software lookup
    pub coarse_threshold: f64,
    /// Used when confirming a choice typed as free text
    pub strict_threshold: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            coarse_threshold: 75.0,
            strict_threshold: 85.0,
        }
    }
}

/// Curated phrase sets for feedback classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackPhrases {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    /// Words that flip a positive phrase they directly precede ("isn't fixed")
    pub negators: Vec<String>,
    /// Expressions of uncertainty, removed before matching ("don't know")
    pub hedges: Vec<String>,
}

impl Default for FeedbackPhrases {
    fn default() -> Self {
        let positive = [
            "yes", "y", "yeah", "yep", "yup", "sure", "ok", "okay", "correct", "it worked",
            "that worked", "worked", "works", "fixed", "solved", "resolved", "great", "perfect",
            "thanks", "thank you", "please do", "go ahead", "absolutely",
        ];
        let negative = [
            "no", "n", "nope", "nah", "not really", "not working", "still not working",
            "didn't work", "did not work", "didn't help", "did not help", "doesn't work",
            "does not work", "not fixed", "not resolved", "not solved", "still broken",
            "no thanks", "never mind", "don't want", "do not want", "don't need",
        ];
        let negators = [
            "not", "never", "isn't", "wasn't", "hasn't", "haven't", "didn't", "doesn't",
            "don't", "aren't", "won't", "can't", "cannot", "hardly",
        ];
        let hedges = [
            "don't know", "do not know", "not sure", "unsure", "no idea", "dunno",
        ];
        Self {
            positive: owned(&positive),
            negative: owned(&negative),
            negators: owned(&negators),
            hedges: owned(&hedges),
        }
    }
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Ticketing collaborator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketingConfig {
    pub timeout_ms: u64,
    pub technical_category: String,
    pub software_category: String,
    pub inquiry_category: String,
}

impl Default for TicketingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            technical_category: "Technical".to_string(),
            software_category: "Software".to_string(),
            inquiry_category: "Inquiry / Help".to_string(),
        }
    }
}

impl TicketingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Conversation arena parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions untouched for this long are dropped
    pub idle_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 1_800,
        }
    }
}

impl SessionConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

impl TriageConfig {
    /// Parse from a TOML string and validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: TriageConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, apply environment overrides, validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: TriageConfig = toml::from_str(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for deployments without a file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = TriageConfig::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TRIAGE_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("TRIAGE_SIMILARITY_FLOOR") {
            self.matcher.similarity_floor = parse("TRIAGE_SIMILARITY_FLOOR", &v)?;
        }
        if let Some(v) = lookup("TRIAGE_TOP_K") {
            self.matcher.top_k = parse("TRIAGE_TOP_K", &v)?;
        }
        if let Some(v) = lookup("TRIAGE_SEARCH_EFFORT") {
            self.matcher.search_effort = parse("TRIAGE_SEARCH_EFFORT", &v)?;
        }
        if let Some(v) = lookup("TRIAGE_MATCH_TIMEOUT_MS") {
            self.matcher.timeout_ms = parse("TRIAGE_MATCH_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("TRIAGE_FUZZY_COARSE") {
            self.resolver.coarse_threshold = parse("TRIAGE_FUZZY_COARSE", &v)?;
        }
        if let Some(v) = lookup("TRIAGE_FUZZY_STRICT") {
            self.resolver.strict_threshold = parse("TRIAGE_FUZZY_STRICT", &v)?;
        }
        if let Some(v) = lookup("TRIAGE_TICKET_TIMEOUT_MS") {
            self.ticketing.timeout_ms = parse("TRIAGE_TICKET_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("TRIAGE_SESSION_IDLE_TTL_SECS") {
            self.sessions.idle_ttl_secs = parse("TRIAGE_SESSION_IDLE_TTL_SECS", &v)?;
        }
        Ok(())
    }

    /// Reject values the core cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let floor = self.matcher.similarity_floor;
        if !(0.0..=1.0).contains(&floor) {
            return Err(ConfigError::invalid(
                "matcher.similarity_floor",
                format!("{floor} is outside [0, 1]"),
            ));
        }
        if self.matcher.top_k == 0 {
            return Err(ConfigError::invalid("matcher.top_k", "must be at least 1"));
        }
        for (key, value) in [
            ("resolver.coarse_threshold", self.resolver.coarse_threshold),
            ("resolver.strict_threshold", self.resolver.strict_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::invalid(key, format!("{value} is outside [0, 100]")));
            }
        }
        if self.resolver.strict_threshold < self.resolver.coarse_threshold {
            return Err(ConfigError::invalid(
                "resolver.strict_threshold",
                "must not be lower than coarse_threshold",
            ));
        }
        if self.resolver.limit == 0 {
            return Err(ConfigError::invalid("resolver.limit", "must be at least 1"));
        }
        if self.sessions.idle_ttl_secs == 0 {
            return Err(ConfigError::invalid("sessions.idle_ttl_secs", "must be at least 1"));
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("cannot parse {value:?}")))
}
