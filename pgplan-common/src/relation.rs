//! Relation identity table: `RelOptInfo*` → (range-table index, relation OID)
//!
//! Populated by the `set_rel_pathlist` probe and consulted whenever a path's
//! parent relation needs a stable identifier. The backend may free a
//! `RelOptInfo` and reuse its address for an unrelated relation, so every
//! lookup re-reads `RelOptInfo.relid` from live memory and only trusts the
//! stored OID when the range-table indexes agree.

use crate::config::PlanOffsets;
use crate::host::{ForeignMemory, RelationStore};

/// Maximum entries in the `RELMETA_BY_RELPTR` hash map
pub const RELATION_TABLE_CAPACITY: u32 = 8192;

/// Value of the relation identity table
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelMeta {
    /// Range-table index observed at binding time
    pub rti: u32,
    /// `RangeTblEntry.relid`
    pub rel_oid: u32,
}

/// Key of the relation identity table
///
/// Hash map keys are compared bytewise, so the padding is explicit and always
/// zero.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RelMetaKey {
    pub pid: u32,
    #[allow(clippy::pub_underscore_fields)]
    pub _padding: u32,
    pub rel_ptr: u64,
}

impl RelMetaKey {
    #[must_use]
    pub const fn new(pid: u32, rel_ptr: u64) -> Self {
        Self { pid, _padding: 0, rel_ptr }
    }
}

/// Parent relation identity as encoded in a record
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelIdentity {
    /// Live `RelOptInfo.relid` (0 when unreadable or for join/upper rels)
    pub rti: u32,
    /// Resolved OID (0 = unknown)
    pub rel_oid: u32,
}

/// Store a binding observed at `set_rel_pathlist`, overwriting any previous
/// entry for the key.
#[inline(always)]
pub fn record<S: RelationStore>(store: &S, pid: u32, rel_ptr: u64, rti: u32, rel_oid: u32) -> bool {
    store.record(&RelMetaKey::new(pid, rel_ptr), &RelMeta { rti, rel_oid })
}

/// Resolve the identity of the relation at `rel_ptr`.
///
/// The range-table index is always the live value. The OID is only filled in
/// when a stored entry exists and its range-table index matches the live one;
/// a stale entry resolves to OID 0 rather than a wrong relation.
#[inline(always)]
pub fn resolve<H>(host: &H, offsets: &PlanOffsets, pid: u32, rel_ptr: u64) -> RelIdentity
where
    H: ForeignMemory + RelationStore,
{
    let mut identity = RelIdentity::default();
    if rel_ptr == 0 {
        return identity;
    }

    identity.rti = host.read_u32(rel_ptr.wrapping_add(offsets.reloptinfo_relid)).unwrap_or(0);
    if identity.rti == 0 {
        return identity;
    }

    if let Some(meta) = host.lookup(&RelMetaKey::new(pid, rel_ptr)) {
        if meta.rti == identity.rti {
            identity.rel_oid = meta.rel_oid;
        }
    }
    identity
}
