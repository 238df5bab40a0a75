// src/domain/version.rs

use crate::domain::listing::Listing;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// What produced a version row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(Operation::Insert),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            other => Err(format!("unknown operation '{other}'")),
        }
    }
}

/// One entry of the append-only offer history.
///
/// Versions per `source_id` start at 1 and are contiguous. The highest version is current; a
/// `Delete` there means the offer is inactive, but every earlier row stays readable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedRecord {
    pub source_id: String,
    pub version: i64,
    pub operation: Operation,
    pub batch_id: i64,
    pub recorded_at: NaiveDateTime,
    pub listing: Listing,
}

impl VersionedRecord {
    pub fn is_delete(&self) -> bool {
        self.operation == Operation::Delete
    }
}
