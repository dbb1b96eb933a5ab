//! Human-readable output
//!
//! One line per record, prefixed with the local time of day and the backend
//! pid:
//!
//! ```text
//! [14:03:11.482] [PID 4242] ADD_PATH: T_HashPath (startup=1.02, total=40.25, rows=310, join=JOIN_INNER, outer_rti=1, outer_oid=16384, inner_rti=2, inner_oid=16390)
//! [14:03:11.483] [PID 4242] CREATE_PLAN: T_HashPath (startup=1.02, total=40.25) [CHOSEN]
//! ```

use chrono::{DateTime, FixedOffset, Local, Utc};
use std::fmt::Write as _;

use crate::domain::EventKind;
use crate::trace_data::PlanRecord;

const TIME_OF_DAY: &str = "%H:%M:%S%.3f";

/// Maps `bpf_ktime_get_ns()` (CLOCK_MONOTONIC) to wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    /// Realtime minus monotonic at calibration
    offset_ns: i64,
    /// `None` renders in the local time zone
    zone: Option<FixedOffset>,
}

impl WallClock {
    /// Sample both clocks once.
    #[must_use]
    pub fn calibrate() -> Self {
        let realtime = Utc::now().timestamp_nanos_opt().unwrap_or(0);
        Self::with_offset(realtime - monotonic_now_ns())
    }

    /// Clock with a fixed offset, rendered in the local time zone
    #[must_use]
    pub const fn with_offset(offset_ns: i64) -> Self {
        Self { offset_ns, zone: None }
    }

    /// Render in `zone` instead of the local time zone
    #[must_use]
    pub const fn in_zone(self, zone: FixedOffset) -> Self {
        Self { zone: Some(zone), ..self }
    }

    /// Wall-clock time of a monotonic timestamp
    #[must_use]
    pub fn wall_time(&self, monotonic_ns: u64) -> DateTime<Utc> {
        let monotonic = i64::try_from(monotonic_ns).unwrap_or(i64::MAX);
        DateTime::from_timestamp_nanos(monotonic.saturating_add(self.offset_ns))
    }

    /// `HH:MM:SS.mmm`
    #[must_use]
    pub fn time_of_day(&self, monotonic_ns: u64) -> String {
        let wall = self.wall_time(monotonic_ns);
        match self.zone {
            Some(zone) => wall.with_timezone(&zone).format(TIME_OF_DAY).to_string(),
            None => wall.with_timezone(&Local).format(TIME_OF_DAY).to_string(),
        }
    }
}

#[allow(unsafe_code)] // clock_gettime() requires unsafe
fn monotonic_now_ns() -> i64 {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: `ts` is a valid, writable timespec
    if unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) } == 0 {
        i64::from(ts.tv_sec) * 1_000_000_000 + i64::from(ts.tv_nsec)
    } else {
        0
    }
}

/// Format one record as a text line (no trailing newline)
#[must_use]
pub fn format_record(record: &PlanRecord, clock: &WallClock) -> String {
    let mut line = format!(
        "[{}] [PID {}] {}: {} (startup={:.2}, total={:.2}",
        clock.time_of_day(record.timestamp),
        record.pid,
        record.event_type,
        record.path_type,
        record.startup_cost,
        record.total_cost,
    );

    match record.event_type {
        EventKind::AddPath => {
            let _ = write!(line, ", rows={}", record.rows);
            push_field(&mut line, "parent_rti", record.parent_rti);
            push_field(&mut line, "parent_oid", record.parent_rel_oid);
            if record.has_join() {
                let _ = write!(line, ", join={}", record.join_type_name);
            }
            push_field(&mut line, "outer_rti", record.outer_rti);
            push_field(&mut line, "outer_oid", record.outer_rel_oid);
            push_field(&mut line, "inner_rti", record.inner_rti);
            push_field(&mut line, "inner_oid", record.inner_rel_oid);
            line.push(')');
        }
        EventKind::CreatePlan => line.push_str(") [CHOSEN]"),
    }
    line
}

fn push_field(line: &mut String, name: &str, value: u32) {
    if value != 0 {
        let _ = write!(line, ", {name}={value}");
    }
}

/// Banner printed before text output
#[must_use]
pub fn format_header(binary: &str, pids: &[u32]) -> String {
    let rule = "=".repeat(80);
    let scope = if pids.is_empty() {
        "Tracing all PostgreSQL processes".to_string()
    } else {
        let list: Vec<String> = pids.iter().map(ToString::to_string).collect();
        format!("PIDs: {}", list.join(", "))
    };
    format!("{rule}\nPostgreSQL Plan Alternatives Tracer\nBinary: {binary}\n{scope}\n{rule}")
}

/// Counts of decoded records
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TraceStats {
    pub add_path: u64,
    pub create_plan: u64,
    /// Records of pids outside the `--pid` filter
    pub filtered: u64,
    /// Short reads or unknown record kinds
    pub malformed: u64,
}

impl TraceStats {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.add_path + self.create_plan
    }
}

/// Display record statistics
pub fn display_statistics(stats: &TraceStats) {
    eprintln!(
        "stats: add_path={} create_plan={} filtered={} malformed={}",
        stats.add_path, stats.create_plan, stats.filtered, stats.malformed
    );
}
