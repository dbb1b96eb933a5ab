//! # Shared Data Structures and Probe Logic (eBPF ↔ Userspace)
//!
//! Defines the wire record, offset table and relation identity types shared
//! between the eBPF uprobes and userspace, plus the probe handlers themselves.
//! All shared types use `#[repr(C)]` for a consistent layout across the
//! kernel/userspace boundary.
//!
//! The handlers in [`probe`] are written against the [`host`] traits instead of
//! calling eBPF helpers directly. `pgplan-ebpf` implements those traits over
//! `bpf_probe_read_user`, the relation hash map and the ring buffer; the unit
//! tests implement them over an in-memory fake target.
//!
//! ## Instrumented Functions
//!
//! - `set_rel_pathlist(root, rel, rti, rte)` - binds a `RelOptInfo*` to a
//!   relation OID ([`probe::on_set_rel_pathlist`])
//! - `add_path(parent_rel, new_path)` - every candidate path the planner
//!   considers ([`probe::on_add_path`])
//! - `create_plan(root, best_path)` - the chosen path tree
//!   ([`probe::on_create_plan`])
//!
//! ## Verifier Constraints
//!
//! Everything reachable from a handler must pass the eBPF verifier: no
//! recursion, bounded loops, no floating point, under 512 bytes of stack. Large
//! structures ([`PlanEvent`], [`TraversalStack`]) live in per-CPU map slots
//! handed to the handlers by reference.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod event;
pub mod extract;
pub mod host;
pub mod probe;
pub mod relation;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{PlanOffsets, ProbeConfig, DEFAULT_MAX_JOIN_TYPE, MAX_CHILD_TAGS, RTE_RELATION};
pub use event::{PlanEvent, EVENT_ADD_PATH, EVENT_CREATE_PLAN};
pub use host::{EventSink, ForeignMemory, ProbeHost, ProbeStat, RelationStore, PROBE_STAT_COUNT};
pub use probe::{
    on_add_path, on_create_plan, on_set_rel_pathlist, TraversalStack, MAX_CREATE_PLAN_NODES,
};
pub use relation::{RelMeta, RelMetaKey, RELATION_TABLE_CAPACITY};

#[cfg(feature = "user")]
use aya::Pod;

// These unsafe impls are required for eBPF <-> userspace communication
// Pod trait ensures types can be safely transmitted as plain bytes
#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for PlanEvent {}

#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for ProbeConfig {}

#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for RelMeta {}

#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for RelMetaKey {}
