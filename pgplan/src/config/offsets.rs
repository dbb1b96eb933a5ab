//! JSON offset table for one PostgreSQL build
//!
//! Keys are `Struct.field`, values are byte offsets, e.g. as printed by
//! `pahole -C Path postgres`:
//!
//! ```json
//! {
//!   "Path.pathtype": 4,
//!   "Path.parent": 8,
//!   "Path.rows": 40,
//!   "Path.startup_cost": 48,
//!   "Path.total_cost": 56,
//!   "JoinPath.jointype": 72,
//!   "JoinPath.outerjoinpath": 80,
//!   "JoinPath.innerjoinpath": 88,
//!   "RelOptInfo.relid": 96,
//!   "RangeTblEntry.rtekind": 4,
//!   "RangeTblEntry.relid": 12
//! }
//! ```

use pgplan_common::PlanOffsets;
use serde::Deserialize;
use std::path::Path;

use crate::domain::ConfigError;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OffsetsFile {
    #[serde(rename = "Path.pathtype")]
    pub path_pathtype: u64,
    #[serde(rename = "Path.parent")]
    pub path_parent: u64,
    #[serde(rename = "Path.rows")]
    pub path_rows: u64,
    #[serde(rename = "Path.startup_cost")]
    pub path_startup_cost: u64,
    #[serde(rename = "Path.total_cost")]
    pub path_total_cost: u64,
    #[serde(rename = "JoinPath.jointype")]
    pub joinpath_jointype: u64,
    #[serde(rename = "JoinPath.outerjoinpath")]
    pub joinpath_outerjoinpath: u64,
    #[serde(rename = "JoinPath.innerjoinpath")]
    pub joinpath_innerjoinpath: u64,
    #[serde(rename = "RelOptInfo.relid")]
    pub reloptinfo_relid: u64,
    #[serde(rename = "RangeTblEntry.rtekind")]
    pub rangetblentry_rtekind: u64,
    #[serde(rename = "RangeTblEntry.relid")]
    pub rangetblentry_relid: u64,
}

impl OffsetsFile {
    /// Read and validate an offsets file
    ///
    /// # Errors
    /// Returns an error if the file is unreadable, is not a complete offset
    /// table, or leaves both `Path.pathtype` and `Path.parent` at zero (the
    /// probes would treat it as "not configured")
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let offsets: Self = serde_json::from_str(&content)
            .map_err(|source| ConfigError::OffsetsParse { path: path.to_path_buf(), source })?;
        if offsets.path_pathtype == 0 && offsets.path_parent == 0 {
            return Err(ConfigError::OffsetsIncomplete(path.to_path_buf()));
        }
        Ok(offsets)
    }
}

impl From<OffsetsFile> for PlanOffsets {
    fn from(file: OffsetsFile) -> Self {
        PlanOffsets {
            path_pathtype: file.path_pathtype,
            path_parent: file.path_parent,
            path_rows: file.path_rows,
            path_startup_cost: file.path_startup_cost,
            path_total_cost: file.path_total_cost,
            joinpath_jointype: file.joinpath_jointype,
            joinpath_outerjoinpath: file.joinpath_outerjoinpath,
            joinpath_innerjoinpath: file.joinpath_innerjoinpath,
            reloptinfo_relid: file.reloptinfo_relid,
            rangetblentry_rtekind: file.rangetblentry_rtekind,
            rangetblentry_relid: file.rangetblentry_relid,
        }
    }
}
