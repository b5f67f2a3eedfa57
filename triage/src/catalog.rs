//! Approved-software catalog.
//!
//! Loaded once at startup from a JSON object keyed by canonical software
//! name and shared read-only (`Arc<SoftwareCatalog>`) across all sessions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::CatalogError;

/// License model of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseType {
    Free,
    Licensed,
}

impl std::fmt::Display for LicenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Licensed => write!(f, "licensed"),
        }
    }
}

/// One approved-software record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Canonical lowercase name
    pub key: String,
    /// Extra names the entry can be found by
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub is_blacklisted: bool,
    #[serde(default)]
    pub is_restricted: bool,
    pub license_type: LicenseType,
    #[serde(default)]
    pub source: String,
}

impl CatalogEntry {
    /// Restricted or licensed software needs an approval ticket.
    pub fn requires_approval(&self) -> bool {
        self.is_restricted || self.license_type == LicenseType::Licensed
    }

    /// Key in title case for user-facing text ("chrome remote desktop" → "Chrome Remote Desktop").
    pub fn display_name(&self) -> String {
        self.key
            .split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Key followed by aliases, all lowercase.
    pub fn searchable_names(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.key.clone()).chain(self.aliases.iter().map(|a| a.to_lowercase()))
    }
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    is_blacklisted: bool,
    #[serde(default)]
    is_restricted: bool,
    license_type: LicenseType,
    #[serde(default)]
    source: String,
}

/// Read-only catalog, ordered by key.
#[derive(Debug, Clone, Default)]
pub struct SoftwareCatalog {
    entries: Vec<CatalogEntry>,
}

impl SoftwareCatalog {
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut by_key: BTreeMap<String, CatalogEntry> = BTreeMap::new();
        for mut entry in entries {
            entry.key = entry.key.trim().to_lowercase();
            by_key.insert(entry.key.clone(), entry);
        }
        Self {
            entries: by_key.into_values().collect(),
        }
    }

    /// Parse `{"<name>": {"is_blacklisted": .., "license_type": ..}, ..}`.
    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        let raw: BTreeMap<String, RawEntry> = serde_json::from_str(content)?;
        let mut entries = Vec::with_capacity(raw.len());
        for (key, r) in raw {
            if key.trim().is_empty() {
                return Err(CatalogError::EmptyKey);
            }
            entries.push(CatalogEntry {
                key,
                aliases: r.aliases,
                is_blacklisted: r.is_blacklisted,
                is_restricted: r.is_restricted,
                license_type: r.license_type,
                source: r.source,
            });
        }
        Ok(Self::from_entries(entries))
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        let key = key.trim().to_lowercase();
        self.entries
            .binary_search_by(|e| e.key.as_str().cmp(key.as_str()))
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
