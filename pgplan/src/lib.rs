//! # pgplan - eBPF-based PostgreSQL Plan Alternatives Tracer
//!
//! pgplan shows every path the PostgreSQL planner considers while planning a
//! query, not just the plan it finally chooses. It attaches uprobes to an
//! unmodified `postgres` binary and reports each candidate path with its
//! costs, row estimate, relation identity and join structure.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    PostgreSQL backend                           │
//! │     set_rel_pathlist() → add_path() ... → create_plan()         │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ uprobes
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     eBPF Programs (Kernel)                      │
//! │  • set_rel_pathlist_hook: RelOptInfo* → (rti, relation OID)     │
//! │  • add_path_hook: candidate path + immediate children           │
//! │  • create_plan_hook: bounded DFS over the chosen path tree      │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ ring buffer (PlanEvent)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    pgplan (This Crate)                          │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  Profiling   │──▶│    Event     │──▶│  Text/JSON   │         │
//! │  │   (eBPF)     │   │  Processor   │   │   output     │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! │         ▲                   │                                   │
//! │  ┌──────────────┐   ┌──────────────┐                            │
//! │  │   Offsets    │   │  nodetags.h  │                            │
//! │  │   (JSON)     │   │  tag names   │                            │
//! │  └──────────────┘   └──────────────┘                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`profiling`]: eBPF program management and event collection
//!   - `ebpf_setup`: Load programs, write `PROBE_CONFIG`, attach uprobes
//!   - `event_processor`: Decode ring buffer records, filter, write output
//!   - `event_display`: Text line format
//!   - `diagnostics`: Per-CPU probe counters
//!
//! - [`config`]: Offset table (JSON) and probe tuning
//! - [`nodetags`]: Node tag names from PostgreSQL's `nodetags.h`
//! - [`trace_data`]: Decoded record model, also the JSON line format
//! - [`preflight`]: Privilege, kernel, binary and symbol checks
//! - [`cli`]: Command-line argument parsing
//! - [`domain`]: Core domain types and errors
//!
//! ## Struct Offsets
//!
//! The probes read planner structures (`Path`, `JoinPath`, `RelOptInfo`,
//! `RangeTblEntry`) from the backend's memory. Their layout differs between
//! PostgreSQL versions and build options, so byte offsets are supplied per
//! build via `--offsets` rather than compiled in.
//!
//! ## Typical Usage
//!
//! ```bash
//! # Trace one backend, naming path tags
//! sudo pgplan -x /usr/lib/postgresql/16/bin/postgres --offsets pg16.json \
//!     -n nodetags.h -p <PID>
//!
//! # JSON lines for offline plan graph tools
//! sudo pgplan -x /usr/lib/postgresql/16/bin/postgres --offsets pg16.json -j -o plans.json
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod nodetags;
pub mod preflight;
pub mod profiling;
pub mod trace_data;
