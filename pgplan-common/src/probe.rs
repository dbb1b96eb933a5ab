//! Probe handlers for `set_rel_pathlist`, `add_path` and `create_plan`.
//!
//! Handlers are pure observers: they never write to the target and never
//! report failures to the caller. Whatever cannot be read is skipped.

use crate::config::ProbeConfig;
use crate::event::{PlanEvent, EVENT_ADD_PATH, EVENT_CREATE_PLAN};
use crate::extract::fill_from_path;
use crate::host::{ProbeHost, ProbeStat};
use crate::relation;

/// Capacity of the `create_plan` traversal stack, and its iteration cap
pub const MAX_CREATE_PLAN_NODES: usize = 16;

/// Explicit DFS stack for the `create_plan` traversal
///
/// Stored in a per-CPU array slot: 128 bytes would eat a quarter of the BPF
/// stack. Only slots below the current stack pointer are ever read, so the
/// slot does not need clearing between invocations.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraversalStack {
    pub slots: [u64; MAX_CREATE_PLAN_NODES],
}

impl TraversalStack {
    #[inline(always)]
    fn set(&mut self, idx: usize, path: u64) -> bool {
        match self.slots.get_mut(idx) {
            Some(slot) => {
                *slot = path;
                true
            }
            None => false,
        }
    }

    #[inline(always)]
    fn get(&self, idx: usize) -> u64 {
        self.slots.get(idx).copied().unwrap_or(0)
    }

    /// Push a non-null path; a full stack drops it.
    #[inline(always)]
    fn push<H: ProbeHost>(&mut self, host: &H, sp: &mut usize, path: u64) {
        if path == 0 {
            return;
        }
        if *sp < MAX_CREATE_PLAN_NODES && self.set(*sp, path) {
            *sp += 1;
        } else {
            host.count(ProbeStat::TraversalTruncated);
        }
    }
}

/// Reset the scratch slot and stamp the per-firing header.
#[inline(always)]
fn begin_event<H: ProbeHost>(host: &H, event: &mut PlanEvent, event_type: u32) {
    *event = PlanEvent::EMPTY;
    event.event_type = event_type;
    event.pid = host.pid();
    event.timestamp_ns = host.now_ns();
}

#[inline(always)]
fn emit<H: ProbeHost>(host: &H, event: &PlanEvent) {
    if host.submit(event) {
        host.count(ProbeStat::EventsSubmitted);
    } else {
        host.count(ProbeStat::EventsDropped);
    }
}

/// `set_rel_pathlist(PlannerInfo *root, RelOptInfo *rel, Index rti, RangeTblEntry *rte)`
///
/// Records `rel → (rti, rte->relid)` for ordinary tables. Subqueries,
/// functions, VALUES lists and other range-table kinds have no relation OID
/// and are ignored. Returns whether an entry was written.
#[inline(always)]
pub fn on_set_rel_pathlist<H: ProbeHost>(
    host: &H,
    config: &ProbeConfig,
    rel: u64,
    rti: u32,
    rte: u64,
) -> bool {
    if !config.is_loaded() || rel == 0 || rte == 0 || rti == 0 {
        return false;
    }

    let offsets = &config.offsets;
    let Some(rtekind) = host.read_u32(rte.wrapping_add(offsets.rangetblentry_rtekind)) else {
        return false;
    };
    if rtekind != config.rte_relation_kind {
        return false;
    }

    let rel_oid = host.read_u32(rte.wrapping_add(offsets.rangetblentry_relid)).unwrap_or(0);
    if rel_oid == 0 {
        return false;
    }

    if relation::record(host, host.pid(), rel, rti, rel_oid) {
        host.count(ProbeStat::RelationsRecorded);
        true
    } else {
        host.count(ProbeStat::RelationsRejected);
        false
    }
}

/// `add_path(RelOptInfo *parent_rel, Path *new_path)`
///
/// Emits the candidate, with the parent identity taken from `parent_rel`, then
/// each immediate child of a join candidate. Children matter because wrapper
/// nodes (`MaterialPath`, `MemoizePath`) are created around join inputs without
/// ever being passed to `add_path`.
#[inline(always)]
pub fn on_add_path<H: ProbeHost>(
    host: &H,
    config: &ProbeConfig,
    scratch: &mut PlanEvent,
    parent_rel: u64,
    new_path: u64,
) {
    if !config.is_loaded() || parent_rel == 0 || new_path == 0 {
        return;
    }

    begin_event(host, scratch, EVENT_ADD_PATH);
    let Some(links) = fill_from_path(host, config, new_path, Some(parent_rel), scratch) else {
        return;
    };
    emit(host, scratch);

    emit_child(host, config, scratch, links.outer);
    emit_child(host, config, scratch, links.inner);
}

#[inline(always)]
fn emit_child<H: ProbeHost>(host: &H, config: &ProbeConfig, scratch: &mut PlanEvent, child: u64) {
    if child == 0 {
        return;
    }
    begin_event(host, scratch, EVENT_ADD_PATH);
    if fill_from_path(host, config, child, None, scratch).is_none() {
        return;
    }
    if config.emits_child(scratch.path_type) {
        emit(host, scratch);
    }
}

/// `create_plan(PlannerInfo *root, Path *best_path)`
///
/// Walks the chosen path tree depth-first with an explicit stack, emitting one
/// `CREATE_PLAN` record per readable node. The outer child is pushed before
/// the inner one, so inner subtrees are visited first. At most
/// [`MAX_CREATE_PLAN_NODES`] iterations run, which bounds the walk even for a
/// corrupted, cyclic tree; children that do not fit on the stack are dropped.
#[inline(always)]
pub fn on_create_plan<H: ProbeHost>(
    host: &H,
    config: &ProbeConfig,
    scratch: &mut PlanEvent,
    stack: &mut TraversalStack,
    best_path: u64,
) {
    if !config.is_loaded() || best_path == 0 {
        return;
    }

    let mut sp: usize = 0;
    stack.push(host, &mut sp, best_path);

    for _ in 0..MAX_CREATE_PLAN_NODES {
        if sp == 0 {
            break;
        }
        sp -= 1;
        let current = stack.get(sp);
        if current == 0 {
            continue;
        }

        begin_event(host, scratch, EVENT_CREATE_PLAN);
        let Some(links) = fill_from_path(host, config, current, None, scratch) else {
            continue;
        };
        emit(host, scratch);

        stack.push(host, &mut sp, links.outer);
        stack.push(host, &mut sp, links.inner);
    }
}
