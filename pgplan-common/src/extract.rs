//! Field extraction from `Path`, `JoinPath` and `RelOptInfo` memory.
//!
//! Reads go through [`ForeignMemory`] at addresses computed from the offset
//! table. A failed read leaves the destination at zero and extraction
//! continues; only an unreadable path tag makes the whole node unusable.
//! `Cost` and `Cardinality` are C doubles and are copied as raw bits: the BPF
//! backend cannot lower floating-point instructions.

use crate::config::ProbeConfig;
use crate::event::PlanEvent;
use crate::host::{ForeignMemory, RelationStore};
use crate::relation::{self, RelIdentity};

/// Immediate children of a join-shaped path (0 = none)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathLinks {
    pub outer: u64,
    pub inner: u64,
}

/// Path tag and relation identity of a join child
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ChildSummary {
    path_type: u32,
    identity: RelIdentity,
}

#[inline(always)]
fn read_bits<M: ForeignMemory>(mem: &M, addr: u64) -> u64 {
    mem.read_u64(addr).unwrap_or(0)
}

/// Identity of the relation a path belongs to, via `Path.parent`.
#[inline(always)]
pub fn path_rel_identity<H>(host: &H, config: &ProbeConfig, pid: u32, path: u64) -> RelIdentity
where
    H: ForeignMemory + RelationStore,
{
    if path == 0 {
        return RelIdentity::default();
    }
    let rel = host.read_u64(path.wrapping_add(config.offsets.path_parent)).unwrap_or(0);
    relation::resolve(host, &config.offsets, pid, rel)
}

#[inline(always)]
fn summarize_child<H>(host: &H, config: &ProbeConfig, pid: u32, child: u64) -> ChildSummary
where
    H: ForeignMemory + RelationStore,
{
    if child == 0 {
        return ChildSummary::default();
    }
    ChildSummary {
        path_type: host.read_u32(child.wrapping_add(config.offsets.path_pathtype)).unwrap_or(0),
        identity: path_rel_identity(host, config, pid, child),
    }
}

/// Fill `event` with the node at `path`.
///
/// Returns the node's join children, or `None` when the node itself could not
/// be read (null address or unreadable path tag). The caller owns the
/// scratch slot and must have reset it; `pid` is taken from the event.
///
/// `parent_rel` replaces `Path.parent` when the caller already holds a live
/// `RelOptInfo*` (the `add_path` argument).
///
/// Join fields are only read for nodes whose parent range-table index is 0
/// (join and upper relations). On base scan paths those offsets overlap
/// unrelated fields and would produce fabricated children. A join kind above
/// `config.max_join_type` is a layout mismatch: all join fields and links of
/// the record are dropped.
#[inline(always)]
pub fn fill_from_path<H>(
    host: &H,
    config: &ProbeConfig,
    path: u64,
    parent_rel: Option<u64>,
    event: &mut PlanEvent,
) -> Option<PathLinks>
where
    H: ForeignMemory + RelationStore,
{
    if path == 0 {
        return None;
    }
    let offsets = &config.offsets;

    event.path_type = host.read_u32(path.wrapping_add(offsets.path_pathtype))?;
    event.path_ptr = path;
    event.parent_rel_ptr = match parent_rel {
        Some(rel) => rel,
        None => host.read_u64(path.wrapping_add(offsets.path_parent)).unwrap_or(0),
    };

    event.rows = read_bits(host, path.wrapping_add(offsets.path_rows));
    event.startup_cost = read_bits(host, path.wrapping_add(offsets.path_startup_cost));
    event.total_cost = read_bits(host, path.wrapping_add(offsets.path_total_cost));

    let identity = relation::resolve(host, offsets, event.pid, event.parent_rel_ptr);
    event.parent_relid = identity.rti;
    event.relid = identity.rel_oid;

    let mut links = PathLinks::default();
    if event.parent_relid != 0 {
        return Some(links);
    }

    let join_type = host.read_u32(path.wrapping_add(offsets.joinpath_jointype)).unwrap_or(0);
    if join_type > config.max_join_type {
        return Some(links);
    }
    links.outer = host.read_u64(path.wrapping_add(offsets.joinpath_outerjoinpath)).unwrap_or(0);
    links.inner = host.read_u64(path.wrapping_add(offsets.joinpath_innerjoinpath)).unwrap_or(0);

    event.join_type = join_type;
    event.outer_path_ptr = links.outer;
    event.inner_path_ptr = links.inner;

    let outer = summarize_child(host, config, event.pid, links.outer);
    event.outer_path_type = outer.path_type;
    event.outer_relid = outer.identity.rti;
    event.outer_rel_oid = outer.identity.rel_oid;

    let inner = summarize_child(host, config, event.pid, links.inner);
    event.inner_path_type = inner.path_type;
    event.inner_relid = inner.identity.rti;
    event.inner_rel_oid = inner.identity.rel_oid;

    Some(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation;
    use crate::testing::{config, FakeTarget, PathSpec, T_HASHJOIN, T_MATERIAL, T_SEQSCAN};

    fn event_for(pid: u32) -> PlanEvent {
        PlanEvent { pid, ..PlanEvent::EMPTY }
    }

    #[test]
    fn test_null_path_is_an_extraction_failure() {
        let target = FakeTarget::new();
        let mut event = event_for(7);
        assert!(fill_from_path(&target, &config(), 0, None, &mut event).is_none());
        assert_eq!(event, event_for(7));
    }

    #[test]
    fn test_unreadable_path_tag_is_an_extraction_failure() {
        let target = FakeTarget::new();
        let mut event = event_for(7);
        assert!(fill_from_path(&target, &config(), 0xdead_0000, None, &mut event).is_none());
        assert_eq!(event.path_ptr, 0);
    }

    #[test]
    fn test_cost_bits_are_copied_verbatim() {
        let target = FakeTarget::new();
        let config = config();
        target.write_rel(0x1000, 1);
        target.write_path(
            0x5000,
            &PathSpec::scan(T_SEQSCAN, 0x1000).with_costs(0x3ff0_0000_0000_0000, 0x4024_0000_0000_0000),
        );

        let mut event = event_for(7);
        fill_from_path(&target, &config, 0x5000, None, &mut event).unwrap();
        assert_eq!(event.startup_cost, 0x3ff0_0000_0000_0000);
        assert_eq!(event.total_cost, 0x4024_0000_0000_0000);
    }

    #[test]
    fn test_missing_fields_stay_zero() {
        let target = FakeTarget::new();
        let config = config();
        // Only the tag is mapped: parent, costs and rows are unreadable
        target.write_u32(0x5000 + config.offsets.path_pathtype, T_SEQSCAN);

        let mut event = event_for(7);
        let links = fill_from_path(&target, &config, 0x5000, None, &mut event).unwrap();
        assert_eq!(event.path_type, T_SEQSCAN);
        assert_eq!(event.path_ptr, 0x5000);
        assert_eq!(event.parent_rel_ptr, 0);
        assert_eq!(event.total_cost, 0);
        assert_eq!(event.rows, 0);
        assert_eq!(links, PathLinks::default());
    }

    #[test]
    fn test_base_relation_path_never_reads_join_fields() {
        let target = FakeTarget::new();
        let config = config();
        target.write_rel(0x1000, 2);
        target.write_path(0x5000, &PathSpec::scan(T_SEQSCAN, 0x1000));
        // Garbage where JoinPath fields would live
        target.write_u32(0x5000 + config.offsets.joinpath_jointype, 1);
        target.write_u64(0x5000 + config.offsets.joinpath_outerjoinpath, 0x7777_0000);
        target.write_u64(0x5000 + config.offsets.joinpath_innerjoinpath, 0x8888_0000);

        let mut event = event_for(7);
        let links = fill_from_path(&target, &config, 0x5000, None, &mut event).unwrap();
        assert_eq!(event.parent_relid, 2);
        assert!(!event.has_join_fields());
        assert_eq!(links, PathLinks::default());
    }

    #[test]
    fn test_join_path_reports_children() {
        let target = FakeTarget::new();
        let config = config();
        target.write_rel(0x1000, 1);
        target.write_rel(0x1100, 2);
        target.write_rel(0x1200, 0);
        relation::record(&target, 7, 0x1000, 1, 16384);
        relation::record(&target, 7, 0x1100, 2, 16390);
        target.write_path(0x5000, &PathSpec::scan(T_SEQSCAN, 0x1000));
        target.write_path(0x5100, &PathSpec::scan(T_MATERIAL, 0x1100));
        target.write_path(0x6000, &PathSpec::join(T_HASHJOIN, 0x1200, 1, 0x5000, 0x5100));

        let mut event = event_for(7);
        let links = fill_from_path(&target, &config, 0x6000, None, &mut event).unwrap();
        assert_eq!(links, PathLinks { outer: 0x5000, inner: 0x5100 });
        assert_eq!(event.parent_relid, 0);
        assert_eq!(event.join_type, 1);
        assert_eq!(event.outer_path_ptr, 0x5000);
        assert_eq!(event.inner_path_ptr, 0x5100);
        assert_eq!(event.outer_path_type, T_SEQSCAN);
        assert_eq!(event.inner_path_type, T_MATERIAL);
        assert_eq!((event.outer_relid, event.outer_rel_oid), (1, 16384));
        assert_eq!((event.inner_relid, event.inner_rel_oid), (2, 16390));
    }

    #[test]
    fn test_implausible_join_type_drops_join_fields() {
        let target = FakeTarget::new();
        let config = config();
        target.write_rel(0x1200, 0);
        target.write_path(0x5000, &PathSpec::scan(T_SEQSCAN, 0x1000));
        target.write_path(0x6000, &PathSpec::join(T_HASHJOIN, 0x1200, 42, 0x5000, 0x5000));

        let mut event = event_for(7);
        let links = fill_from_path(&target, &config, 0x6000, None, &mut event).unwrap();
        assert_eq!(event.path_type, T_HASHJOIN);
        assert!(!event.has_join_fields());
        assert_eq!(links, PathLinks::default());
    }

    #[test]
    fn test_parent_override_drives_join_gating() {
        let target = FakeTarget::new();
        let config = config();
        target.write_rel(0x1000, 3);
        target.write_rel(0x1200, 0);
        // Path.parent points at a join rel, the caller knows better
        target.write_path(0x6000, &PathSpec::join(T_HASHJOIN, 0x1200, 1, 0x5000, 0x5100));

        let mut event = event_for(7);
        let links = fill_from_path(&target, &config, 0x6000, Some(0x1000), &mut event).unwrap();
        assert_eq!(event.parent_rel_ptr, 0x1000);
        assert_eq!(event.parent_relid, 3);
        assert!(!event.has_join_fields());
        assert_eq!(links, PathLinks::default());
    }

    #[test]
    fn test_join_ceiling_is_configurable() {
        let target = FakeTarget::new();
        let mut config = config();
        config.max_join_type = 12;
        target.write_rel(0x1200, 0);
        target.write_path(0x6000, &PathSpec::join(T_HASHJOIN, 0x1200, 10, 0x5000, 0));

        let mut event = event_for(7);
        let links = fill_from_path(&target, &config, 0x6000, None, &mut event).unwrap();
        assert_eq!(event.join_type, 10);
        assert_eq!(links.outer, 0x5000);
    }

    #[test]
    fn test_join_ceiling_is_inclusive() {
        let target = FakeTarget::new();
        let config = config();
        target.write_rel(0x1200, 0);
        target.write_path(0x6000, &PathSpec::join(T_HASHJOIN, 0x1200, 8, 0x5000, 0x5100));
        target.write_path(0x6100, &PathSpec::join(T_HASHJOIN, 0x1200, 9, 0x5000, 0x5100));

        let mut at_ceiling = event_for(7);
        let links = fill_from_path(&target, &config, 0x6000, None, &mut at_ceiling).unwrap();
        assert_eq!(at_ceiling.join_type, 8);
        assert_eq!((links.outer, links.inner), (0x5000, 0x5100));

        let mut above = event_for(7);
        let links = fill_from_path(&target, &config, 0x6100, None, &mut above).unwrap();
        assert!(!above.has_join_fields());
        assert_eq!(links, PathLinks::default());
    }
}
