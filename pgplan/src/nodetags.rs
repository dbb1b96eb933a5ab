//! PostgreSQL node tag names from a `nodetags.h` header.
//!
//! PostgreSQL 16+ generates `src/include/nodes/nodetags.h` with one line per
//! tag (`T_SeqScan = 335,`). The numbers change between major versions, so
//! they must come from the header of the traced build.

use std::collections::HashMap;
use std::path::Path;

use crate::domain::ConfigError;

/// Bidirectional tag table
#[derive(Debug, Default, Clone)]
pub struct NodeTags {
    by_value: HashMap<u32, String>,
    by_name: HashMap<String, u32>,
}

impl NodeTags {
    /// Empty table: every value prints as `Unknown(N)`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and parse a `nodetags.h` file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or defines no tags
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let tags = Self::parse(&content);
        if tags.is_empty() {
            return Err(ConfigError::EmptyNodeTags(path.to_path_buf()));
        }
        Ok(tags)
    }

    /// Parse header text, skipping anything that is not a `T_Name = N` entry.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut tags = Self::new();
        for line in content.lines() {
            if let Some((name, value)) = parse_entry(line) {
                tags.insert(name, value);
            }
        }
        tags
    }

    fn insert(&mut self, name: &str, value: u32) {
        self.by_value.insert(value, name.to_string());
        self.by_name.insert(name.to_string(), value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Tag name for a numeric value, `Unknown(N)` when absent
    #[must_use]
    pub fn name_from_value(&self, value: u32) -> String {
        match self.by_value.get(&value) {
            Some(name) => name.clone(),
            None => format!("Unknown({value})"),
        }
    }

    /// Numeric value of a tag name
    ///
    /// # Errors
    /// Returns `UnknownNodeTag` if the header does not define `name`
    pub fn value_from_name(&self, name: &str) -> Result<u32, ConfigError> {
        self.by_name.get(name).copied().ok_or_else(|| ConfigError::UnknownNodeTag(name.to_string()))
    }

    /// Resolve a command-line tag: a decimal number or a tag name
    ///
    /// # Errors
    /// Returns `UnknownNodeTag` for names the header does not define
    pub fn resolve(&self, tag: &str) -> Result<u32, ConfigError> {
        match tag.parse::<u32>() {
            Ok(value) => Ok(value),
            Err(_) => self.value_from_name(tag),
        }
    }
}

fn parse_entry(line: &str) -> Option<(&str, u32)> {
    let (name, rest) = line.trim().split_once('=')?;
    let name = name.trim();
    if !name.starts_with("T_") || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let value = rest.trim().trim_end_matches(',').trim();
    Some((name, value.parse().ok()?))
}
