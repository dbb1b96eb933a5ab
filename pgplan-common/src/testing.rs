//! In-memory stand-in for a PostgreSQL backend and the eBPF maps.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::config::{PlanOffsets, ProbeConfig};
use crate::event::PlanEvent;
use crate::host::{EventSink, ForeignMemory, ProbeHost, ProbeStat, RelationStore, PROBE_STAT_COUNT};
use crate::relation::{RelMeta, RelMetaKey};

pub(crate) const T_SEQSCAN: u32 = 335;
pub(crate) const T_INDEXSCAN: u32 = 336;
pub(crate) const T_NESTLOOP: u32 = 350;
pub(crate) const T_HASHJOIN: u32 = 352;
pub(crate) const T_MATERIAL: u32 = 353;

/// PG16-like layout, small enough that structures 0x100 apart never overlap.
pub(crate) fn offsets() -> PlanOffsets {
    PlanOffsets {
        path_pathtype: 4,
        path_parent: 8,
        path_rows: 40,
        path_startup_cost: 48,
        path_total_cost: 56,
        joinpath_jointype: 72,
        joinpath_outerjoinpath: 80,
        joinpath_innerjoinpath: 88,
        reloptinfo_relid: 64,
        rangetblentry_rtekind: 4,
        rangetblentry_relid: 12,
    }
}

pub(crate) fn config() -> ProbeConfig {
    ProbeConfig::new(offsets())
}

/// Contents of one `Path` (or `JoinPath`) to lay out in fake memory
pub(crate) struct PathSpec {
    path_type: u32,
    parent: u64,
    rows: u64,
    startup_cost: u64,
    total_cost: u64,
    join: Option<(u32, u64, u64)>,
}

impl PathSpec {
    pub(crate) fn scan(path_type: u32, parent: u64) -> Self {
        Self {
            path_type,
            parent,
            rows: 100f64.to_bits(),
            startup_cost: 0,
            total_cost: 10f64.to_bits(),
            join: None,
        }
    }

    pub(crate) fn join(path_type: u32, parent: u64, join_type: u32, outer: u64, inner: u64) -> Self {
        Self { join: Some((join_type, outer, inner)), ..Self::scan(path_type, parent) }
    }

    pub(crate) fn with_costs(mut self, startup_cost: u64, total_cost: u64) -> Self {
        self.startup_cost = startup_cost;
        self.total_cost = total_cost;
        self
    }
}

/// Fake target: byte-addressed memory, a bounded relation table and a bounded
/// event sink
pub(crate) struct FakeTarget {
    pid: u32,
    memory: Mutex<HashMap<u64, u8>>,
    relations: Mutex<HashMap<RelMetaKey, RelMeta>>,
    relation_limit: usize,
    events: Mutex<Vec<PlanEvent>>,
    event_limit: usize,
    stats: Mutex<[u64; PROBE_STAT_COUNT as usize]>,
    clock: AtomicU64,
}

impl FakeTarget {
    pub(crate) fn new() -> Self {
        Self::with_limits(8192, usize::MAX)
    }

    pub(crate) fn with_limits(relation_limit: usize, event_limit: usize) -> Self {
        Self {
            pid: 7,
            memory: Mutex::new(HashMap::new()),
            relations: Mutex::new(HashMap::new()),
            relation_limit,
            events: Mutex::new(Vec::new()),
            event_limit,
            stats: Mutex::new([0; PROBE_STAT_COUNT as usize]),
            clock: AtomicU64::new(1_000),
        }
    }

    pub(crate) fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    fn write_bytes(&self, addr: u64, bytes: &[u8]) {
        let mut memory = self.memory.lock().unwrap();
        for (i, byte) in bytes.iter().enumerate() {
            memory.insert(addr + i as u64, *byte);
        }
    }

    fn read_bytes<const N: usize>(&self, addr: u64) -> Option<[u8; N]> {
        let memory = self.memory.lock().unwrap();
        let mut out = [0u8; N];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = *memory.get(&addr.checked_add(i as u64)?)?;
        }
        Some(out)
    }

    pub(crate) fn write_u32(&self, addr: u64, value: u32) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    pub(crate) fn write_u64(&self, addr: u64, value: u64) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    pub(crate) fn write_path(&self, addr: u64, spec: &PathSpec) {
        let o = offsets();
        self.write_u32(addr + o.path_pathtype, spec.path_type);
        self.write_u64(addr + o.path_parent, spec.parent);
        self.write_u64(addr + o.path_rows, spec.rows);
        self.write_u64(addr + o.path_startup_cost, spec.startup_cost);
        self.write_u64(addr + o.path_total_cost, spec.total_cost);
        if let Some((join_type, outer, inner)) = spec.join {
            self.write_u32(addr + o.joinpath_jointype, join_type);
            self.write_u64(addr + o.joinpath_outerjoinpath, outer);
            self.write_u64(addr + o.joinpath_innerjoinpath, inner);
        }
    }

    /// Lay out a `RelOptInfo` with the given `relid`.
    pub(crate) fn write_rel(&self, addr: u64, rti: u32) {
        self.write_u32(addr + offsets().reloptinfo_relid, rti);
    }

    /// Lay out a `RangeTblEntry`.
    pub(crate) fn write_rte(&self, addr: u64, rtekind: u32, relid: u32) {
        let o = offsets();
        self.write_u32(addr + o.rangetblentry_rtekind, rtekind);
        self.write_u32(addr + o.rangetblentry_relid, relid);
    }

    pub(crate) fn events(&self) -> Vec<PlanEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn relation_count(&self) -> usize {
        self.relations.lock().unwrap().len()
    }

    pub(crate) fn relations(&self) -> HashMap<RelMetaKey, RelMeta> {
        self.relations.lock().unwrap().clone()
    }

    pub(crate) fn stat(&self, stat: ProbeStat) -> u64 {
        self.stats.lock().unwrap()[stat.index() as usize]
    }
}

impl ForeignMemory for FakeTarget {
    fn read_u32(&self, addr: u64) -> Option<u32> {
        self.read_bytes::<4>(addr).map(u32::from_le_bytes)
    }

    fn read_u64(&self, addr: u64) -> Option<u64> {
        self.read_bytes::<8>(addr).map(u64::from_le_bytes)
    }
}

impl RelationStore for FakeTarget {
    fn lookup(&self, key: &RelMetaKey) -> Option<RelMeta> {
        self.relations.lock().unwrap().get(key).copied()
    }

    fn record(&self, key: &RelMetaKey, meta: &RelMeta) -> bool {
        let mut relations = self.relations.lock().unwrap();
        if !relations.contains_key(key) && relations.len() >= self.relation_limit {
            return false;
        }
        relations.insert(*key, *meta);
        true
    }
}

impl EventSink for FakeTarget {
    fn submit(&self, event: &PlanEvent) -> bool {
        let mut events = self.events.lock().unwrap();
        if events.len() >= self.event_limit {
            return false;
        }
        events.push(*event);
        true
    }
}

impl ProbeHost for FakeTarget {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn now_ns(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn count(&self, stat: ProbeStat) {
        self.stats.lock().unwrap()[stat.index() as usize] += 1;
    }
}
