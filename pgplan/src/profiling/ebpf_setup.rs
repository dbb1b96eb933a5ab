//! # eBPF Program Loading and Attachment
//!
//! Loads compiled eBPF bytecode, hands it the probe configuration and attaches
//! the planner uprobes.
//!
//! ## Functions
//!
//! - [`load_ebpf_program()`] - Load eBPF bytecode from embedded binary
//! - [`write_probe_config()`] - Populate the `PROBE_CONFIG` map
//! - [`attach_planner_probes()`] - Attach the three uprobes to `postgres`
//!
//! The configuration must be written before attaching: a probe that fires
//! against an empty `PROBE_CONFIG` entry does nothing.

use anyhow::{Context, Result};
use aya::{include_bytes_aligned, maps::Array, programs::UProbe, Ebpf};
use aya_log::EbpfLogger;
use log::{info, warn};
use pgplan_common::ProbeConfig;

use crate::domain::TracerError;

/// A uprobe program and the planner function it instruments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerProbe {
    pub program: &'static str,
    pub symbol: &'static str,
}

/// `set_rel_pathlist` comes first so relation bindings exist before paths
/// referencing them are seen.
pub const PLANNER_PROBES: [PlannerProbe; 3] = [
    PlannerProbe { program: "set_rel_pathlist_hook", symbol: "set_rel_pathlist" },
    PlannerProbe { program: "add_path_hook", symbol: "add_path" },
    PlannerProbe { program: "create_plan_hook", symbol: "create_plan" },
];

/// Load the eBPF program binary
///
/// Always uses the release build because debug builds pull in formatting code
/// that's incompatible with BPF.
///
/// # Errors
/// Returns an error if the eBPF program binary cannot be loaded
pub fn load_ebpf_program() -> Result<Ebpf> {
    let bpf =
        Ebpf::load(include_bytes_aligned!("../../../target/bpfel-unknown-none/release/pgplan"))
            .map_err(|e| TracerError::EbpfLoadFailed(e.to_string()))?;
    Ok(bpf)
}

/// Initialize eBPF logger
pub fn init_ebpf_logger(bpf: &mut Ebpf) {
    if let Err(e) = EbpfLogger::init(bpf) {
        warn!("Failed to initialize eBPF logger: {e}");
    }
}

/// Write the offset table and tuning into `PROBE_CONFIG[0]`
///
/// # Errors
/// Returns an error if the map is missing or the update fails
pub fn write_probe_config(bpf: &mut Ebpf, config: &ProbeConfig) -> Result<()> {
    let mut map: Array<_, ProbeConfig> = Array::try_from(
        bpf.map_mut("PROBE_CONFIG").ok_or(TracerError::MapNotFound("PROBE_CONFIG"))?,
    )
    .map_err(TracerError::from)?;
    map.set(0, config, 0).map_err(TracerError::from)?;
    info!(
        "✓ Probe config written (max_join_type={}, child_tags={})",
        config.max_join_type, config.child_tag_count
    );
    Ok(())
}

/// Attach all planner uprobes to `binary`
///
/// With no pids the probes fire in every process running `binary`; otherwise
/// each probe is attached once per pid.
///
/// # Errors
/// Returns `ProbeAttachFailed` if any program cannot be loaded or attached
pub fn attach_planner_probes(bpf: &mut Ebpf, binary: &str, pids: &[u32]) -> Result<()> {
    for probe in PLANNER_PROBES {
        let attach_failed = |error: String| TracerError::ProbeAttachFailed {
            probe: probe.symbol.to_string(),
            binary: binary.to_string(),
            error,
        };

        let program: &mut UProbe = bpf
            .program_mut(probe.program)
            .with_context(|| format!("{} program not found", probe.program))?
            .try_into()
            .map_err(|e: aya::programs::ProgramError| attach_failed(e.to_string()))?;
        program.load().map_err(|e| attach_failed(e.to_string()))?;

        if pids.is_empty() {
            program
                .attach(Some(probe.symbol), 0, binary, None)
                .map_err(|e| attach_failed(e.to_string()))?;
        } else {
            for &pid in pids {
                #[allow(clippy::cast_possible_wrap)]
                program
                    .attach(Some(probe.symbol), 0, binary, Some(pid as i32))
                    .map_err(|e| attach_failed(e.to_string()))?;
            }
        }
        info!("✓ Attached uprobe: {}", probe.symbol);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_probe_attaches_first() {
        assert_eq!(PLANNER_PROBES[0].symbol, "set_rel_pathlist");
        let symbols: Vec<&str> = PLANNER_PROBES.iter().map(|p| p.symbol).collect();
        assert_eq!(symbols, ["set_rel_pathlist", "add_path", "create_plan"]);
    }
}
