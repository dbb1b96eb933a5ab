//! Seams between the probe logic and the environment it runs in.
//!
//! Inside the kernel these are backed by eBPF helpers and maps; in tests by an
//! in-memory fake of the monitored backend.

use crate::event::PlanEvent;
use crate::relation::{RelMeta, RelMetaKey};

/// Read access to the monitored process's address space
///
/// Every read is fallible and must never fault: an unmapped or racing address
/// yields `None`.
pub trait ForeignMemory {
    fn read_u32(&self, addr: u64) -> Option<u32>;
    fn read_u64(&self, addr: u64) -> Option<u64>;
}

/// The shared relation identity table
///
/// Writes are last-writer-wins with no locking. `record` returns `false` when
/// the table rejected the entry (capacity exhausted).
pub trait RelationStore {
    fn lookup(&self, key: &RelMetaKey) -> Option<RelMeta>;
    fn record(&self, key: &RelMetaKey, meta: &RelMeta) -> bool;
}

/// Output channel for finished records
///
/// Best-effort: returns `false` when the record was dropped (buffer full).
pub trait EventSink {
    fn submit(&self, event: &PlanEvent) -> bool;
}

/// Silent-failure counters kept by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ProbeStat {
    EventsSubmitted = 0,
    EventsDropped = 1,
    RelationsRecorded = 2,
    RelationsRejected = 3,
    TraversalTruncated = 4,
}

/// Number of [`ProbeStat`] slots in the `PROBE_STATS` map
pub const PROBE_STAT_COUNT: u32 = 5;

impl ProbeStat {
    pub const ALL: [ProbeStat; PROBE_STAT_COUNT as usize] = [
        ProbeStat::EventsSubmitted,
        ProbeStat::EventsDropped,
        ProbeStat::RelationsRecorded,
        ProbeStat::RelationsRejected,
        ProbeStat::TraversalTruncated,
    ];

    #[must_use]
    pub const fn index(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ProbeStat::EventsSubmitted => "events_submitted",
            ProbeStat::EventsDropped => "events_dropped",
            ProbeStat::RelationsRecorded => "relations_recorded",
            ProbeStat::RelationsRejected => "relations_rejected",
            ProbeStat::TraversalTruncated => "traversal_truncated",
        }
    }
}

/// Everything a handler needs from the current execution context
pub trait ProbeHost: ForeignMemory + RelationStore + EventSink {
    /// TGID of the process that hit the probe
    fn pid(&self) -> u32;

    /// Monotonic nanoseconds
    fn now_ns(&self) -> u64;

    /// Bump a diagnostic counter. Hosts without counters ignore it.
    fn count(&self, _stat: ProbeStat) {}
}
