//! Structured error types for pgplan
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::Pid;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid offsets file {path}: {source}")]
    OffsetsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Offsets file {0} does not describe Path (Path.pathtype and Path.parent are both 0)")]
    OffsetsIncomplete(PathBuf),

    #[error("No node tags found in {0}")]
    EmptyNodeTags(PathBuf),

    #[error("Unknown node tag {0}")]
    UnknownNodeTag(String),

    #[error("At most {max} child tags may be given, got {given}")]
    TooManyChildTags { max: usize, given: usize },
}

#[derive(Error, Debug)]
pub enum TracerError {
    #[error("Failed to load eBPF program: {0}")]
    EbpfLoadFailed(String),

    #[error("Process {0} not found")]
    ProcessNotFound(Pid),

    #[error("Failed to attach {probe} to {binary}: {error}")]
    ProbeAttachFailed { probe: String, binary: String, error: String },

    #[error("Binary {binary} does not export {symbol}")]
    SymbolMissing { binary: String, symbol: String },

    #[error("Map {0} not found in eBPF object")]
    MapNotFound(&'static str),

    #[error(transparent)]
    Map(#[from] aya::maps::MapError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracer_error_display() {
        let err = TracerError::ProcessNotFound(Pid(1234));
        assert_eq!(err.to_string(), "Process PID:1234 not found");
    }

    #[test]
    fn test_probe_attach_error() {
        let err = TracerError::ProbeAttachFailed {
            probe: "add_path".to_string(),
            binary: "/usr/lib/postgresql/16/bin/postgres".to_string(),
            error: "symbol not found".to_string(),
        };
        assert!(err.to_string().contains("add_path"));
        assert!(err.to_string().contains("/usr/lib/postgresql/16/bin/postgres"));
    }

    #[test]
    fn test_config_error_names_the_file() {
        let err = ConfigError::OffsetsIncomplete(PathBuf::from("pg16.json"));
        assert!(err.to_string().contains("pg16.json"));
    }
}
