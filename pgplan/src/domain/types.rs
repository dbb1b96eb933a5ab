//! Domain types for decoded plan records
//!
//! Newtypes and enumerations that turn the raw integers of a `PlanEvent` into
//! something printable.

use pgplan_common::{EVENT_ADD_PATH, EVENT_CREATE_PLAN};
use serde::{Serialize, Serializer};
use std::fmt;

/// Process ID (a PostgreSQL backend)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

/// Kind of a plan record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Candidate path offered to `add_path`
    AddPath,
    /// Node of the path tree handed to `create_plan`
    CreatePlan,
}

impl EventKind {
    /// Decode the wire value, `None` for unknown kinds
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            EVENT_ADD_PATH => Some(Self::AddPath),
            EVENT_CREATE_PLAN => Some(Self::CreatePlan),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddPath => "ADD_PATH",
            Self::CreatePlan => "CREATE_PLAN",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// PostgreSQL `JoinType` (`nodes/nodes.h`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Full,
    Right,
    Semi,
    Anti,
    RightAnti,
    UniqueOuter,
    UniqueInner,
}

impl JoinType {
    pub const ALL: [JoinType; 9] = [
        Self::Inner,
        Self::Left,
        Self::Full,
        Self::Right,
        Self::Semi,
        Self::Anti,
        Self::RightAnti,
        Self::UniqueOuter,
        Self::UniqueInner,
    ];

    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "JOIN_INNER",
            Self::Left => "JOIN_LEFT",
            Self::Full => "JOIN_FULL",
            Self::Right => "JOIN_RIGHT",
            Self::Semi => "JOIN_SEMI",
            Self::Anti => "JOIN_ANTI",
            Self::RightAnti => "JOIN_RIGHT_ANTI",
            Self::UniqueOuter => "JOIN_UNIQUE_OUTER",
            Self::UniqueInner => "JOIN_UNIQUE_INNER",
        }
    }

    /// Name of a raw join kind, `Unknown(N)` outside the enumeration
    #[must_use]
    pub fn name_of(raw: u32) -> String {
        match Self::from_raw(raw) {
            Some(join_type) => join_type.as_str().to_string(),
            None => format!("Unknown({raw})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_from_raw() {
        assert_eq!(EventKind::from_raw(1), Some(EventKind::AddPath));
        assert_eq!(EventKind::from_raw(2), Some(EventKind::CreatePlan));
        assert_eq!(EventKind::from_raw(0), None);
        assert_eq!(EventKind::CreatePlan.to_string(), "CREATE_PLAN");
    }

    #[test]
    fn test_join_type_names() {
        assert_eq!(JoinType::name_of(0), "JOIN_INNER");
        assert_eq!(JoinType::name_of(6), "JOIN_RIGHT_ANTI");
        assert_eq!(JoinType::name_of(8), "JOIN_UNIQUE_INNER");
        assert_eq!(JoinType::name_of(9), "Unknown(9)");
    }

    #[test]
    fn test_pid_display() {
        assert_eq!(Pid(4242).to_string(), "PID:4242");
    }
}
