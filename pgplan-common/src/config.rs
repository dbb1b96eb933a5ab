//! Offset table and tuning constants handed to the probes through the
//! `PROBE_CONFIG` array map.

/// `RTEKind::RTE_RELATION`: an ordinary table in the range table
pub const RTE_RELATION: u32 = 0;

/// Highest `JoinType` value accepted before a record is treated as a layout
/// mismatch (`JOIN_UNIQUE_INNER`)
pub const DEFAULT_MAX_JOIN_TYPE: u32 = 8;

/// Maximum number of path tags in [`ProbeConfig::child_tags`]
pub const MAX_CHILD_TAGS: usize = 8;

/// Byte offsets of the planner structure fields read by the probes
///
/// Resolved from the DWARF info of the exact PostgreSQL build being traced.
/// A wrong table yields garbage field values, never an unsafe access, because
/// every read goes through `bpf_probe_read_user`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlanOffsets {
    /// `Path.pathtype`
    pub path_pathtype: u64,
    /// `Path.parent`
    pub path_parent: u64,
    /// `Path.rows`
    pub path_rows: u64,
    /// `Path.startup_cost`
    pub path_startup_cost: u64,
    /// `Path.total_cost`
    pub path_total_cost: u64,
    /// `JoinPath.jointype`
    pub joinpath_jointype: u64,
    /// `JoinPath.outerjoinpath`
    pub joinpath_outerjoinpath: u64,
    /// `JoinPath.innerjoinpath`
    pub joinpath_innerjoinpath: u64,
    /// `RelOptInfo.relid`
    pub reloptinfo_relid: u64,
    /// `RangeTblEntry.rtekind`
    pub rangetblentry_rtekind: u64,
    /// `RangeTblEntry.relid`
    pub rangetblentry_relid: u64,
}

/// Runtime configuration of the probes
///
/// Stored in entry 0 of the `PROBE_CONFIG` array. An entry that was never
/// written is all zeroes; [`ProbeConfig::is_loaded`] lets the handlers skip
/// work until userspace has populated it.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeConfig {
    pub offsets: PlanOffsets,

    /// Join kinds above this value discard the record's join fields
    pub max_join_type: u32,

    /// `rtekind` value of an ordinary base relation
    pub rte_relation_kind: u32,

    /// Number of valid entries in `child_tags` (0 = emit every child)
    pub child_tag_count: u32,

    /// Path tags of immediate children that `add_path` also emits
    pub child_tags: [u32; MAX_CHILD_TAGS],

    /// Padding for 8-byte alignment
    #[allow(clippy::pub_underscore_fields)]
    pub _padding: u32,
}

impl ProbeConfig {
    #[must_use]
    pub const fn new(offsets: PlanOffsets) -> Self {
        Self {
            offsets,
            max_join_type: DEFAULT_MAX_JOIN_TYPE,
            rte_relation_kind: RTE_RELATION,
            child_tag_count: 0,
            child_tags: [0; MAX_CHILD_TAGS],
            _padding: 0,
        }
    }

    /// Whether userspace has written an offset table.
    ///
    /// `Path.pathtype` and `Path.parent` can never both live at offset 0.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.offsets.path_pathtype != 0 || self.offsets.path_parent != 0
    }

    /// Restrict the children emitted by `add_path` to the given path tags.
    ///
    /// Tags beyond [`MAX_CHILD_TAGS`] are ignored; returns how many were kept.
    pub fn set_child_tags(&mut self, tags: &[u32]) -> usize {
        let kept = tags.len().min(MAX_CHILD_TAGS);
        self.child_tags = [0; MAX_CHILD_TAGS];
        self.child_tags[..kept].copy_from_slice(&tags[..kept]);
        #[allow(clippy::cast_possible_truncation)]
        {
            self.child_tag_count = kept as u32;
        }
        kept
    }

    /// Whether a child with this path tag should be emitted by `add_path`.
    #[inline(always)]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn emits_child(&self, path_type: u32) -> bool {
        if self.child_tag_count == 0 {
            return true;
        }
        for i in 0..MAX_CHILD_TAGS {
            if i as u32 >= self.child_tag_count {
                break;
            }
            if self.child_tags[i] == path_type {
                return true;
            }
        }
        false
    }
}
