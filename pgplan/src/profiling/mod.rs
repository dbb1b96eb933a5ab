//! Tracing core modules
//!
//! - eBPF program loading, configuration and uprobe attachment
//! - Probe counter diagnostics
//! - Record formatting
//! - Event processing logic

pub mod diagnostics;
pub mod ebpf_setup;
pub mod event_display;
pub mod event_processor;

// Re-export common types
pub use diagnostics::{print_probe_diagnostics, read_probe_stats};
pub use ebpf_setup::{
    attach_planner_probes, init_ebpf_logger, load_ebpf_program, write_probe_config, PlannerProbe,
    PLANNER_PROBES,
};
pub use event_display::{display_statistics, format_header, format_record, TraceStats, WallClock};
pub use event_processor::{decode_event, EventProcessor, OutputFormat};
