//! Fuzzy catalog resolution.
//!
//! Scores free text against every catalog name with a partial-ratio edit
//! distance: the shorter string is slid across the longer one and the best
//! window's normalised Levenshtein similarity (0–100) wins. This tolerates
//! typos ("photoshp") and substrings ("chrome" in "chrome remote desktop").
//!
//! The resolver never picks between several hits; callers disambiguate.

use serde::Serialize;
use std::sync::Arc;

use crate::catalog::{CatalogEntry, SoftwareCatalog};
use crate::config::ResolverConfig;

/// A catalog entry together with its match score (0–100).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEntry {
    pub entry: CatalogEntry,
    pub score: f64,
}

/// Partial-ratio similarity on a 0–100 scale. Inputs are compared as given;
/// callers lowercase beforehand.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0.0;
    }

    let short: String = short.into_iter().collect();
    let mut best = 0.0_f64;
    for window in long.windows(short.chars().count()) {
        let window: String = window.iter().collect();
        let score = strsim::normalized_levenshtein(&short, &window) * 100.0;
        if score > best {
            best = score;
            if best >= 100.0 {
                break;
            }
        }
    }
    best
}

/// Resolves software names against the shared catalog.
#[derive(Debug, Clone)]
pub struct FuzzyCatalogResolver {
    catalog: Arc<SoftwareCatalog>,
    config: ResolverConfig,
}

impl FuzzyCatalogResolver {
    pub fn new(catalog: Arc<SoftwareCatalog>, config: ResolverConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &SoftwareCatalog {
        &self.catalog
    }

    /// Resolve with the configured coarse threshold.
    pub fn resolve(&self, text: &str) -> Vec<ResolvedEntry> {
        self.resolve_with(text, self.config.coarse_threshold)
    }

    /// Resolve with the configured strict threshold.
    pub fn resolve_strict(&self, text: &str) -> Vec<ResolvedEntry> {
        self.resolve_with(text, self.config.strict_threshold)
    }

    /// Top `limit` entries by score, then filtered to `score >= threshold`.
    ///
    /// The cut to `limit` happens before the threshold filter, so for a fixed
    /// input a higher threshold always yields a subset of a lower one.
    pub fn resolve_with(&self, text: &str, threshold: f64) -> Vec<ResolvedEntry> {
        let query = text.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = self
            .catalog
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let best = entry
                    .searchable_names()
                    .map(|name| partial_ratio(&query, &name))
                    .fold(0.0_f64, f64::max);
                (i, best)
            })
            .collect();

        // Entries are key-ordered, so a stable sort breaks ties by key.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(self.config.limit);

        let entries = self.catalog.entries();
        scored
            .into_iter()
            .filter(|(_, score)| *score >= threshold)
            .map(|(i, score)| ResolvedEntry {
                entry: entries[i].clone(),
                score,
            })
            .collect()
    }
}
