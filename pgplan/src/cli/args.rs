//! CLI argument definitions

use clap::{ArgAction, Parser};
use pgplan_common::DEFAULT_MAX_JOIN_TYPE;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pgplan",
    version,
    about = "Trace every query plan PostgreSQL considers, not just the chosen one",
    after_help = "\
EXAMPLES:
    sudo pgplan -x /usr/lib/postgresql/16/bin/postgres --offsets pg16.json
    sudo pgplan -x /usr/lib/postgresql/16/bin/postgres --offsets pg16.json -n nodetags.h -p 1234
    sudo pgplan -x /usr/lib/postgresql/16/bin/postgres --offsets pg16.json -p 1234 -p 5678 -j -o plans.json
    pgplan -x /usr/lib/postgresql/16/bin/postgres --offsets pg16.json --dry-run"
)]
pub struct Args {
    /// Path to the PostgreSQL binary
    #[arg(short = 'x', long = "exec", value_name = "PATH")]
    pub exec: String,

    /// JSON file with the `Struct.field` byte offsets of this PostgreSQL build
    #[arg(long, value_name = "FILE")]
    pub offsets: PathBuf,

    /// PostgreSQL `nodetags.h` used to name path tags
    #[arg(short, long, value_name = "FILE")]
    pub nodetags: Option<PathBuf>,

    /// Backend pid(s) to trace (default: all processes running the binary)
    #[arg(short, long = "pid", value_name = "PID", num_args = 1.., action = ArgAction::Append)]
    pub pids: Vec<u32>,

    /// Emit one JSON object per record
    #[arg(short, long)]
    pub json: bool,

    /// Write records to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,

    /// Show attach targets and configuration, then exit without tracing
    #[arg(long)]
    pub dry_run: bool,

    /// Stop after N seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Highest `JoinType` value accepted as a real join
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_JOIN_TYPE)]
    pub max_join_type: u32,

    /// Only emit `add_path` children with this tag (name or number, repeatable)
    #[arg(long = "child-tag", value_name = "TAG")]
    pub child_tags: Vec<String>,
}
