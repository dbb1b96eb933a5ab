use anyhow::{Context, Result};
use aya::maps::PerCpuArray;
use aya::Ebpf;
use pgplan_common::ProbeStat;

/// Read the per-CPU `PROBE_STATS` counters, summed over all CPUs
///
/// # Errors
/// Returns an error if the `PROBE_STATS` map cannot be accessed
pub fn read_probe_stats(bpf: &Ebpf) -> Result<Vec<(ProbeStat, u64)>> {
    let stats: PerCpuArray<_, u64> =
        PerCpuArray::try_from(bpf.map("PROBE_STATS").context("PROBE_STATS map not found")?)?;

    let mut totals: Vec<(ProbeStat, u64)> = Vec::with_capacity(ProbeStat::ALL.len());
    for stat in ProbeStat::ALL {
        let per_cpu = stats.get(&stat.index(), 0)?;
        totals.push((stat, per_cpu.iter().sum::<u64>()));
    }
    Ok(totals)
}

/// Print the probe counters
///
/// Dropped records and truncated traversals are the silent losses of the
/// probes; they are called out when non-zero.
///
/// # Errors
/// Returns an error if the `PROBE_STATS` map cannot be accessed
pub fn print_probe_diagnostics(bpf: &Ebpf) -> Result<()> {
    let totals = read_probe_stats(bpf)?;
    let line: Vec<String> = totals.iter().map(|(stat, n)| format!("{}={n}", stat.name())).collect();
    eprintln!("probes: {}", line.join(" "));

    for (stat, n) in totals {
        match stat {
            ProbeStat::EventsDropped if n > 0 => {
                eprintln!("warning: {n} records lost (ring buffer full)");
            }
            ProbeStat::RelationsRejected if n > 0 => {
                eprintln!("warning: relation table full, {n} relations resolve without OID");
            }
            ProbeStat::TraversalTruncated if n > 0 => {
                eprintln!("warning: {n} CREATE_PLAN subtrees cut off (tree deeper than traversal stack)");
            }
            _ => {}
        }
    }
    Ok(())
}
