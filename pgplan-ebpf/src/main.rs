//! # eBPF Uprobes on the PostgreSQL Planner
//!
//! Uprobes attached to the planner functions of a running `postgres` binary.
//! The probe logic lives in `pgplan_common::probe`; this crate supplies the
//! maps and implements the host traits over eBPF helpers.
//!
//! ## Programs
//!
//! - **Uprobe**: `set_rel_pathlist_hook` - records `RelOptInfo*` → relation OID
//! - **Uprobe**: `add_path_hook` - every candidate path (`ADD_PATH`)
//! - **Uprobe**: `create_plan_hook` - the chosen path tree (`CREATE_PLAN`)
//!
//! ## Maps (Shared with Userspace)
//!
//! - `EVENTS` - Ring buffer (8MB) for `PlanEvent` records
//! - `PROBE_CONFIG` - Offset table and tuning, written once by userspace
//! - `RELMETA_BY_RELPTR` - Relation identity table
//! - `PROBE_STATS` - Per-CPU diagnostic counters
//!
//! ## Build
//!
//! Always compiled in release mode:
//! ```bash
//! cargo xtask build-ebpf --release
//! ```

#![no_std]
#![no_main]
#![allow(unused_unsafe)]

use aya_ebpf::{
    helpers::{bpf_get_current_pid_tgid, bpf_ktime_get_ns, bpf_probe_read_user},
    macros::{map, uprobe},
    maps::{Array, HashMap, PerCpuArray, RingBuf},
    programs::ProbeContext,
};
use aya_log_ebpf::debug;
use pgplan_common::{
    on_add_path, on_create_plan, on_set_rel_pathlist, EventSink, ForeignMemory, PlanEvent,
    ProbeConfig, ProbeHost, ProbeStat, RelMeta, RelMetaKey, RelationStore, TraversalStack,
    PROBE_STAT_COUNT, RELATION_TABLE_CAPACITY,
};

// ============================================================================
// eBPF Maps - Shared data structures between kernel and userspace
// ============================================================================

/// Ring buffer for sending plan records to userspace
///
/// - **Size**: 8MB
/// - **Overflow**: `output()` fails and the record is dropped (counted in
///   `PROBE_STATS`)
#[map]
static EVENTS: RingBuf = RingBuf::with_byte_size(8 * 1024 * 1024, 0);

/// Offset table and tuning constants (entry 0, written by userspace before
/// the uprobes are attached)
#[map]
static PROBE_CONFIG: Array<ProbeConfig> = Array::with_max_entries(1, 0);

/// Map: (PID, `RelOptInfo*`) → (range-table index, relation OID)
///
/// Populated by `set_rel_pathlist_hook`. Entries are never removed; when the
/// map is full new bindings are rejected and the old ones stay.
#[map]
static RELMETA_BY_RELPTR: HashMap<RelMetaKey, RelMeta> =
    HashMap::with_max_entries(RELATION_TABLE_CAPACITY, 0);

/// Per-CPU record under construction (`PlanEvent` does not fit the 512-byte
/// BPF stack next to the handler locals)
#[map]
static PLAN_EVENT_SCRATCH: PerCpuArray<PlanEvent> = PerCpuArray::with_max_entries(1, 0);

/// Per-CPU DFS stack for `create_plan_hook`
#[map]
static CREATE_PLAN_STACK: PerCpuArray<TraversalStack> = PerCpuArray::with_max_entries(1, 0);

/// Per-CPU counters indexed by `ProbeStat`
#[map]
static PROBE_STATS: PerCpuArray<u64> = PerCpuArray::with_max_entries(PROBE_STAT_COUNT, 0);

// ============================================================================
// Host implementation
// ============================================================================

/// Execution context of the current uprobe firing
struct UprobeHost {
    pid: u32,
}

impl UprobeHost {
    #[inline(always)]
    fn current() -> Self {
        let pid_tgid = unsafe { bpf_get_current_pid_tgid() };
        Self { pid: (pid_tgid >> 32) as u32 }
    }
}

impl ForeignMemory for UprobeHost {
    #[inline(always)]
    fn read_u32(&self, addr: u64) -> Option<u32> {
        unsafe { bpf_probe_read_user(addr as *const u32) }.ok()
    }

    #[inline(always)]
    fn read_u64(&self, addr: u64) -> Option<u64> {
        unsafe { bpf_probe_read_user(addr as *const u64) }.ok()
    }
}

impl RelationStore for UprobeHost {
    #[inline(always)]
    fn lookup(&self, key: &RelMetaKey) -> Option<RelMeta> {
        unsafe { RELMETA_BY_RELPTR.get(key).copied() }
    }

    #[inline(always)]
    fn record(&self, key: &RelMetaKey, meta: &RelMeta) -> bool {
        unsafe { RELMETA_BY_RELPTR.insert(key, meta, 0).is_ok() }
    }
}

impl EventSink for UprobeHost {
    #[inline(always)]
    fn submit(&self, event: &PlanEvent) -> bool {
        EVENTS.output(event, 0).is_ok()
    }
}

impl ProbeHost for UprobeHost {
    #[inline(always)]
    fn pid(&self) -> u32 {
        self.pid
    }

    #[inline(always)]
    fn now_ns(&self) -> u64 {
        unsafe { bpf_ktime_get_ns() }
    }

    #[inline(always)]
    fn count(&self, stat: ProbeStat) {
        if let Some(counter) = PROBE_STATS.get_ptr_mut(stat.index()) {
            unsafe { *counter += 1 };
        }
    }
}

#[inline(always)]
fn probe_config() -> Result<&'static ProbeConfig, i64> {
    unsafe { PROBE_CONFIG.get(0) }.ok_or(1i64)
}

#[inline(always)]
fn scratch_event() -> Result<&'static mut PlanEvent, i64> {
    let slot = PLAN_EVENT_SCRATCH.get_ptr_mut(0).ok_or(1i64)?;
    Ok(unsafe { &mut *slot })
}

#[inline(always)]
fn traversal_stack() -> Result<&'static mut TraversalStack, i64> {
    let slot = CREATE_PLAN_STACK.get_ptr_mut(0).ok_or(1i64)?;
    Ok(unsafe { &mut *slot })
}

// ============================================================================
// eBPF Program Hooks
// ============================================================================

/// Hook: `set_rel_pathlist(PlannerInfo *root, RelOptInfo *rel, Index rti, RangeTblEntry *rte)`
#[uprobe]
pub fn set_rel_pathlist_hook(ctx: ProbeContext) -> u32 {
    match try_set_rel_pathlist(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_set_rel_pathlist(ctx: &ProbeContext) -> Result<(), i64> {
    let config = probe_config()?;
    let rel: u64 = unsafe { ctx.arg(1).ok_or(1i64)? };
    let rti: u64 = unsafe { ctx.arg(2).ok_or(1i64)? };
    let rte: u64 = unsafe { ctx.arg(3).ok_or(1i64)? };

    let host = UprobeHost::current();
    // Index is a 32-bit unsigned int in the register's low half
    if on_set_rel_pathlist(&host, config, rel, rti as u32, rte) {
        debug!(ctx, "bound relation rti={} pid={}", rti as u32, host.pid);
    }

    Ok(())
}

/// Hook: `add_path(RelOptInfo *parent_rel, Path *new_path)`
#[uprobe]
pub fn add_path_hook(ctx: ProbeContext) -> u32 {
    match try_add_path(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_add_path(ctx: &ProbeContext) -> Result<(), i64> {
    let config = probe_config()?;
    let parent_rel: u64 = unsafe { ctx.arg(0).ok_or(1i64)? };
    let new_path: u64 = unsafe { ctx.arg(1).ok_or(1i64)? };

    let scratch = scratch_event()?;
    on_add_path(&UprobeHost::current(), config, scratch, parent_rel, new_path);

    Ok(())
}

/// Hook: `create_plan(PlannerInfo *root, Path *best_path)`
#[uprobe]
pub fn create_plan_hook(ctx: ProbeContext) -> u32 {
    match try_create_plan(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_create_plan(ctx: &ProbeContext) -> Result<(), i64> {
    let config = probe_config()?;
    let best_path: u64 = unsafe { ctx.arg(1).ok_or(1i64)? };

    let scratch = scratch_event()?;
    let stack = traversal_stack()?;
    on_create_plan(&UprobeHost::current(), config, scratch, stack, best_path);

    Ok(())
}

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}
