//! Probe configuration
//!
//! Combines the per-build offset table with the tuning flags into the
//! `ProbeConfig` written to the `PROBE_CONFIG` map.

pub mod offsets;

pub use offsets::OffsetsFile;

use pgplan_common::{PlanOffsets, ProbeConfig, DEFAULT_MAX_JOIN_TYPE, MAX_CHILD_TAGS};

use crate::domain::ConfigError;

/// Tunables of the probes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuning {
    /// Highest accepted `JoinType` value
    pub max_join_type: u32,
    /// Path tags of `add_path` children to emit (empty = all)
    pub child_tags: Vec<u32>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self { max_join_type: DEFAULT_MAX_JOIN_TYPE, child_tags: Vec::new() }
    }
}

/// Build the map value for `PROBE_CONFIG`.
///
/// # Errors
/// Returns `TooManyChildTags` when more tags are given than the map value holds
pub fn build_probe_config(offsets: PlanOffsets, tuning: &Tuning) -> Result<ProbeConfig, ConfigError> {
    if tuning.child_tags.len() > MAX_CHILD_TAGS {
        return Err(ConfigError::TooManyChildTags {
            max: MAX_CHILD_TAGS,
            given: tuning.child_tags.len(),
        });
    }

    let mut config = ProbeConfig::new(offsets);
    config.max_join_type = tuning.max_join_type;
    config.set_child_tags(&tuning.child_tags);
    Ok(config)
}
