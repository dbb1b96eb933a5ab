//! Wire event record pushed through the `EVENTS` ring buffer.

// ============================================================================
// Event Type Constants
// ============================================================================

/// **Considered Path**: the planner offered a candidate path to a relation
///
/// Emitted by: `add_path` uprobe, once for the candidate and once for each of
/// its immediate children (wrapper nodes such as `MaterialPath` never go
/// through `add_path` themselves).
pub const EVENT_ADD_PATH: u32 = 1;

/// **Chosen Path**: a node of the path tree handed to `create_plan`
///
/// Emitted by: `create_plan` uprobe, once per node reached by the bounded
/// traversal.
pub const EVENT_CREATE_PLAN: u32 = 2;

// ============================================================================
// Shared Data Structures
// ============================================================================

/// One observation of a single path node at one probe firing
///
/// All pointer fields are addresses inside the monitored backend. Userspace
/// only compares them for equality to stitch parents to children; they are
/// never dereferenced outside the probe.
///
/// **Memory Layout**: `#[repr(C)]`, 8-byte fields first, no implicit padding
/// **Size**: 112 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlanEvent {
    // ========================================================================
    // Core Identification
    // ========================================================================
    /// Process ID (TGID) of the PostgreSQL backend
    pub pid: u32,

    /// [`EVENT_ADD_PATH`] or [`EVENT_CREATE_PLAN`]
    pub event_type: u32,

    /// Timestamp in nanoseconds (from `bpf_ktime_get_ns()`, monotonic since boot)
    pub timestamp_ns: u64,

    // ========================================================================
    // Pointer Identities (lineage reconstruction in userspace)
    // ========================================================================
    /// Address of the `Path` node. Never zero in an emitted record.
    pub path_ptr: u64,

    /// Address of the parent `RelOptInfo`
    pub parent_rel_ptr: u64,

    /// `JoinPath.outerjoinpath` (join-shaped paths only)
    pub outer_path_ptr: u64,

    /// `JoinPath.innerjoinpath` (join-shaped paths only)
    pub inner_path_ptr: u64,

    // ========================================================================
    // Estimates (raw IEEE-754 bits, decoded in userspace)
    // ========================================================================
    /// `Path.startup_cost` bit pattern
    pub startup_cost: u64,

    /// `Path.total_cost` bit pattern
    pub total_cost: u64,

    /// `Path.rows` bit pattern
    pub rows: u64,

    // ========================================================================
    // Node Tags
    // ========================================================================
    /// `Path.pathtype` (a `NodeTag` such as `T_SeqScan`)
    pub path_type: u32,

    /// Path type of the outer child
    pub outer_path_type: u32,

    /// Path type of the inner child
    pub inner_path_type: u32,

    // ========================================================================
    // Relation Identity
    // ========================================================================
    /// `RelOptInfo.relid` of the parent relation (range-table index, 0 for
    /// join and upper relations)
    pub parent_relid: u32,

    /// Resolved relation OID of the parent (0 = unknown)
    pub relid: u32,

    // ========================================================================
    // Join Information
    // ========================================================================
    /// `JoinPath.jointype` (a `JoinType` value)
    pub join_type: u32,

    /// Range-table index of the inner child's relation
    pub inner_relid: u32,

    /// Range-table index of the outer child's relation
    pub outer_relid: u32,

    /// Resolved OID of the inner child's relation
    pub inner_rel_oid: u32,

    /// Resolved OID of the outer child's relation
    pub outer_rel_oid: u32,
}

impl PlanEvent {
    /// All-zero record used to reset a scratch slot.
    pub const EMPTY: Self = Self {
        pid: 0,
        event_type: 0,
        timestamp_ns: 0,
        path_ptr: 0,
        parent_rel_ptr: 0,
        outer_path_ptr: 0,
        inner_path_ptr: 0,
        startup_cost: 0,
        total_cost: 0,
        rows: 0,
        path_type: 0,
        outer_path_type: 0,
        inner_path_type: 0,
        parent_relid: 0,
        relid: 0,
        join_type: 0,
        inner_relid: 0,
        outer_relid: 0,
        inner_rel_oid: 0,
        outer_rel_oid: 0,
    };

    /// Whether the join-specific fields carry any data.
    #[must_use]
    pub fn has_join_fields(&self) -> bool {
        self.join_type != 0
            || self.outer_path_ptr != 0
            || self.inner_path_ptr != 0
            || self.outer_path_type != 0
            || self.inner_path_type != 0
            || self.outer_relid != 0
            || self.inner_relid != 0
            || self.outer_rel_oid != 0
            || self.inner_rel_oid != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_layout_has_no_padding() {
        assert_eq!(core::mem::size_of::<PlanEvent>(), 112);
        assert_eq!(core::mem::align_of::<PlanEvent>(), 8);
    }

    #[test]
    fn test_event_kinds_are_stable() {
        assert_eq!(EVENT_ADD_PATH, 1);
        assert_eq!(EVENT_CREATE_PLAN, 2);
    }

    #[test]
    fn test_empty_has_no_join_fields() {
        assert!(!PlanEvent::EMPTY.has_join_fields());
        let event = PlanEvent { inner_path_ptr: 0x10, ..PlanEvent::EMPTY };
        assert!(event.has_join_fields());
    }
}
