//! Region name → code registry
//!
//! A JSON file keyed by a single top-level region name whose value carries a
//! `kecamatan` object mapping sub-region display names to opaque codes.
//! Loaded once per invocation; read-only afterwards.

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

use crate::ScrapeError;

#[derive(Debug, Deserialize)]
struct RegionEntry {
    kecamatan: IndexMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct RegionRegistry {
    region_name: String,
    codes: IndexMap<String, String>,
}

impl RegionRegistry {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScrapeError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ScrapeError::RegistryError(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ScrapeError> {
        let mut parsed: IndexMap<String, RegionEntry> = serde_json::from_str(content)
            .map_err(|e| ScrapeError::RegistryError(e.to_string()))?;

        let (region_name, entry) = parsed
            .shift_remove_index(0)
            .ok_or_else(|| ScrapeError::RegistryError("registry file is empty".to_string()))?;

        Ok(Self {
            region_name,
            codes: entry.kecamatan,
        })
    }

    pub fn region_name(&self) -> &str {
        &self.region_name
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.codes.get(name.trim()).map(String::as_str)
    }

    /// Sub-region display names in file order, for the autocomplete route.
    pub fn names(&self) -> Vec<String> {
        self.codes.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
