//! # Event Processing
//!
//! Consumes `PlanEvent` records from the eBPF ring buffer, applies the pid
//! filter, decodes them and writes one line per record.
//!
//! ## Output Modes
//!
//! - **Text**: [`format_record`] lines after a banner
//! - **JSON**: one [`PlanRecord`] object per line
//!
//! The writer is flushed after every record so a consumer tailing the output
//! file sees plans as they are considered.

use log::{debug, warn};
use pgplan_common::PlanEvent;
use std::collections::HashSet;
use std::io::{self, Write};

use super::event_display::{format_header, format_record, TraceStats, WallClock};
use crate::domain::EventKind;
use crate::nodetags::NodeTags;
use crate::trace_data::PlanRecord;

/// Output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Reinterpret a ring buffer item as a `PlanEvent`.
///
/// Returns `None` for items shorter than the record layout.
#[must_use]
pub fn decode_event(bytes: &[u8]) -> Option<PlanEvent> {
    if bytes.len() < std::mem::size_of::<PlanEvent>() {
        return None;
    }
    // SAFETY: length checked above; PlanEvent is repr(C) plain integers, so
    // every bit pattern is valid
    #[allow(unsafe_code)]
    let event = unsafe { std::ptr::read_unaligned(bytes.as_ptr().cast::<PlanEvent>()) };
    Some(event)
}

/// Encapsulates event processing logic and state
pub struct EventProcessor<W: Write> {
    format: OutputFormat,
    tags: NodeTags,
    pids: HashSet<u32>,
    clock: WallClock,
    out: W,

    pub stats: TraceStats,
}

impl<W: Write> EventProcessor<W> {
    /// Create a new event processor
    ///
    /// An empty `pids` list accepts records from every backend.
    #[must_use]
    pub fn new(format: OutputFormat, tags: NodeTags, pids: &[u32], clock: WallClock, out: W) -> Self {
        Self {
            format,
            tags,
            pids: pids.iter().copied().collect(),
            clock,
            out,
            stats: TraceStats::default(),
        }
    }

    /// Write the text banner (no-op in JSON mode).
    ///
    /// # Errors
    /// Returns an error if the output cannot be written
    pub fn write_header(&mut self, binary: &str, pids: &[u32]) -> io::Result<()> {
        if self.format == OutputFormat::Text {
            writeln!(self.out, "{}", format_header(binary, pids))?;
            self.out.flush()?;
        }
        Ok(())
    }

    /// Process one raw ring buffer item
    ///
    /// # Errors
    /// Returns an error if the output cannot be written
    pub fn process_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        match decode_event(bytes) {
            Some(event) => self.process_event(&event),
            None => {
                warn!("Received incomplete event ({} bytes)", bytes.len());
                self.stats.malformed += 1;
                Ok(())
            }
        }
    }

    /// Process a single event
    ///
    /// # Errors
    /// Returns an error if the output cannot be written
    pub fn process_event(&mut self, event: &PlanEvent) -> io::Result<()> {
        if !self.pids.is_empty() && !self.pids.contains(&event.pid) {
            self.stats.filtered += 1;
            return Ok(());
        }

        let Some(record) = PlanRecord::from_event(event, &self.tags) else {
            warn!("Unknown event type: {}", event.event_type);
            self.stats.malformed += 1;
            return Ok(());
        };

        match record.event_type {
            EventKind::AddPath => self.stats.add_path += 1,
            EventKind::CreatePlan => self.stats.create_plan += 1,
        }
        debug!("{} {} from pid {}", record.event_type, record.path_type, record.pid);

        match self.format {
            OutputFormat::Text => writeln!(self.out, "{}", format_record(&record, &self.clock))?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, &record)?;
                self.out.write_all(b"\n")?;
            }
        }
        self.out.flush()
    }

    /// Consume the processor, returning the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}
