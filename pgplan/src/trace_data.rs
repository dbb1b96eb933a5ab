//! Decoded plan records
//!
//! A [`PlanRecord`] is a `PlanEvent` with the raw bit patterns turned back into
//! floating-point values and the tags named. Its serde form is the JSON line
//! format consumed by plan graph tools.

use pgplan_common::PlanEvent;
use serde::Serialize;

use crate::domain::{EventKind, JoinType};
use crate::nodetags::NodeTags;

/// One decoded `ADD_PATH` or `CREATE_PLAN` record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanRecord {
    /// `bpf_ktime_get_ns()` at emission (CLOCK_MONOTONIC)
    pub timestamp: u64,
    pub pid: u32,
    pub event_type: EventKind,
    pub path_type: String,
    pub startup_cost: f64,
    pub total_cost: f64,
    pub rows: u64,
    pub parent_rti: u32,
    pub parent_rel_oid: u32,
    pub join_type: u32,
    pub join_type_name: String,
    pub inner_rti: u32,
    pub outer_rti: u32,
    pub inner_rel_oid: u32,
    pub outer_rel_oid: u32,
    // Backend addresses, only meaningful for stitching records of one pid
    pub path_ptr: u64,
    pub parent_rel_ptr: u64,
    pub outer_path_ptr: u64,
    pub inner_path_ptr: u64,
}

impl PlanRecord {
    /// Decode a raw event. Returns `None` for unknown record kinds.
    #[must_use]
    pub fn from_event(event: &PlanEvent, tags: &NodeTags) -> Option<Self> {
        let event_type = EventKind::from_raw(event.event_type)?;
        Some(Self {
            timestamp: event.timestamp_ns,
            pid: event.pid,
            event_type,
            path_type: tags.name_from_value(event.path_type),
            startup_cost: f64::from_bits(event.startup_cost),
            total_cost: f64::from_bits(event.total_cost),
            rows: rows_estimate(event.rows),
            parent_rti: event.parent_relid,
            parent_rel_oid: event.relid,
            join_type: event.join_type,
            join_type_name: JoinType::name_of(event.join_type),
            inner_rti: event.inner_relid,
            outer_rti: event.outer_relid,
            inner_rel_oid: event.inner_rel_oid,
            outer_rel_oid: event.outer_rel_oid,
            path_ptr: event.path_ptr,
            parent_rel_ptr: event.parent_rel_ptr,
            outer_path_ptr: event.outer_path_ptr,
            inner_path_ptr: event.inner_path_ptr,
        })
    }

    /// Whether the record carries join information worth printing
    #[must_use]
    pub fn has_join(&self) -> bool {
        self.join_type != 0 || self.inner_rti != 0 || self.outer_rti != 0
    }
}

/// `Path.rows` is a double estimate; shown as a whole number of rows.
// Negative and NaN estimates saturate to 0
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rows_estimate(bits: u64) -> u64 {
    f64::from_bits(bits) as u64
}
