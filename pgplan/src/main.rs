//! # pgplan - Main Entry Point
//!
//! - **Trace** (default): load the probes, stream records until Ctrl-C,
//!   `--duration`, or every `--pid` has exited
//! - **Dry run** (`--dry-run`): validate inputs and print what would be
//!   attached, without loading eBPF

// Main function is intentionally long for clarity
#![allow(clippy::too_many_lines)]

use anyhow::{Context, Result};
use aya::maps::RingBuf;
use clap::Parser;
use log::{info, warn};
use pgplan_common::{PlanOffsets, ProbeConfig};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::{Duration, Instant};

use pgplan::cli::Args;
use pgplan::config::{build_probe_config, OffsetsFile, Tuning};
use pgplan::domain::ConfigError;
use pgplan::nodetags::NodeTags;
use pgplan::preflight::{check_process_exists, process_alive, run_preflight_checks};
use pgplan::profiling::{
    attach_planner_probes, display_statistics, init_ebpf_logger, load_ebpf_program,
    print_probe_diagnostics, write_probe_config, EventProcessor, OutputFormat, WallClock,
    PLANNER_PROBES,
};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);
    std::process::exit(match run(args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

/// `RUST_LOG` wins; otherwise warnings, or debug with `--verbose`
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(ConfigError::UnknownNodeTag(_) | ConfigError::TooManyChildTags { .. }) =
        err.downcast_ref::<ConfigError>()
    {
        return EXIT_USAGE;
    }
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission denied") || msg.contains("requires root") {
        EXIT_NOPERM
    } else {
        EXIT_ERROR
    }
}

/// Build the `PROBE_CONFIG` value from the offsets file and tuning flags.
fn load_probe_config(args: &Args, tags: &NodeTags) -> Result<ProbeConfig> {
    let offsets: PlanOffsets = OffsetsFile::load(&args.offsets)?.into();
    let child_tags =
        args.child_tags.iter().map(|tag| tags.resolve(tag)).collect::<Result<Vec<_>, _>>()?;
    let tuning = Tuning { max_join_type: args.max_join_type, child_tags };
    Ok(build_probe_config(offsets, &tuning)?)
}

fn print_dry_run(args: &Args, config: &ProbeConfig, tags: &NodeTags) {
    println!("binary: {}", args.exec);
    for probe in PLANNER_PROBES {
        println!("uprobe: {} ({})", probe.symbol, probe.program);
    }
    if args.pids.is_empty() {
        println!("pids: all");
    } else {
        let pids: Vec<String> = args.pids.iter().map(ToString::to_string).collect();
        println!("pids: {}", pids.join(", "));
    }
    println!("offsets: {}", args.offsets.display());
    println!("  {:?}", config.offsets);
    println!("max_join_type: {}", config.max_join_type);
    if config.child_tag_count == 0 {
        println!("child tags: all");
    } else {
        let names: Vec<String> = config.child_tags[..config.child_tag_count as usize]
            .iter()
            .map(|tag| tags.name_from_value(*tag))
            .collect();
        println!("child tags: {}", names.join(", "));
    }
    println!("format: {}", if args.json { "json" } else { "text" });
    match &args.output {
        Some(path) => println!("output: {}", path.display()),
        None => println!("output: stdout"),
    }
}

#[tokio::main]
async fn run(args: Args) -> Result<()> {
    let quiet = args.quiet;

    let tags = match &args.nodetags {
        Some(path) => {
            let tags = NodeTags::load(path)?;
            info!("Loaded {} node tags from {}", tags.len(), path.display());
            tags
        }
        None => NodeTags::new(),
    };
    let config = load_probe_config(&args, &tags)?;

    // Run pre-flight checks before anything else
    run_preflight_checks(&args.exec, args.dry_run)?;
    for &pid in &args.pids {
        check_process_exists(pid)?;
    }

    if args.dry_run {
        print_dry_run(&args, &config, &tags);
        return Ok(());
    }

    if !quiet {
        eprintln!("pgplan v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("binary: {}", args.exec);
    }

    // Open the sink before attaching so a bad path costs nothing
    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?,
        )),
        None => Box::new(io::stdout()),
    };

    // ── Load eBPF, configure, attach ────────────────────────────────────
    let mut bpf = load_ebpf_program()?;
    init_ebpf_logger(&mut bpf);
    write_probe_config(&mut bpf, &config)?;
    attach_planner_probes(&mut bpf, &args.exec, &args.pids)?;

    let mut ring_buf = RingBuf::try_from(bpf.take_map("EVENTS").context("EVENTS map not found")?)?;

    let format = if args.json { OutputFormat::Json } else { OutputFormat::Text };
    let mut processor = EventProcessor::new(format, tags, &args.pids, WallClock::calibrate(), out);
    processor.write_header(&args.exec, &args.pids)?;

    info!("Tracing plan alternatives... Hit Ctrl-C to end.");

    // Status tracking
    let mut last_status_time = Instant::now();

    // Setup Ctrl+C handler
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    // Track start time for duration limit
    let tracing_start = Instant::now();
    let duration_limit =
        if args.duration > 0 { Some(Duration::from_secs(args.duration)) } else { None };

    // Track why we exited the loop
    let mut exit_reason = "interrupted";

    // Main event processing loop
    loop {
        // Check for duration timeout
        if let Some(limit) = duration_limit {
            if tracing_start.elapsed() >= limit {
                exit_reason = "duration limit reached";
                break;
            }
        }

        // Stop once every traced backend is gone
        if !args.pids.is_empty() && !args.pids.iter().any(|&pid| process_alive(pid)) {
            exit_reason = "traced processes exited";
            break;
        }

        if processor.stats.total() == 0 && last_status_time.elapsed() > Duration::from_secs(10) {
            info!("Still waiting for events... (no queries planned yet)");
            last_status_time = Instant::now();
        }

        // Process all available events
        while let Some(item) = ring_buf.next() {
            let bytes: &[u8] = &item;
            processor.process_bytes(bytes).context("Failed to write record")?;
        }

        // Use select to handle both sleep and Ctrl+C
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(100)) => {
                // Continue loop
            }
            _ = &mut ctrl_c => {
                break;
            }
        }
    }

    // Records submitted just before the stop condition
    while let Some(item) = ring_buf.next() {
        let bytes: &[u8] = &item;
        processor.process_bytes(bytes).context("Failed to write record")?;
    }

    if !quiet {
        let elapsed = tracing_start.elapsed();
        eprintln!(
            "\n{}: {:.1}s, {} records",
            exit_reason,
            elapsed.as_secs_f64(),
            processor.stats.total()
        );
        display_statistics(&processor.stats);
        if let Err(e) = print_probe_diagnostics(&bpf) {
            warn!("Could not read probe counters: {e}");
        }
    }

    processor.into_inner().flush()?;
    Ok(())
}
