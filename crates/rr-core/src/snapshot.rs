//! Serialized index artifact.
//!
//! A snapshot is the JSON form of a [`RedirectIndex`] plus a format version.
//! It can also be wrapped as a TypeScript module exporting a `redirects`
//! constant, which [`Snapshot::load`] accepts as well.

use serde::{Deserialize, Serialize};

use crate::index::RedirectIndex;

/// Current format version
pub const SNAPSHOT_VERSION: u32 = 1;

const TS_PREFIX: &str = "export const redirects = ";
const TS_SUFFIX: &str = " as const";

/// Error type for snapshot loading.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Malformed snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),
    #[error("Invalid pattern forest: {0}")]
    InvalidForest(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub index: RedirectIndex,
}

impl Snapshot {
    pub fn new(index: RedirectIndex) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            index,
        }
    }

    /// Load a snapshot from JSON or from a generated TypeScript module.
    pub fn load(data: &str) -> Result<Self, SnapshotError> {
        let json = unwrap_typescript_module(data).unwrap_or(data);
        let snapshot: Snapshot = serde_json::from_str(json)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }

        snapshot
            .index
            .forest
            .check_structure()
            .map_err(SnapshotError::InvalidForest)?;

        Ok(snapshot)
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, SnapshotError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Render as `export const redirects = {...} as const`.
    pub fn to_typescript_module(&self) -> Result<String, SnapshotError> {
        Ok(format!("{}{}{}\n", TS_PREFIX, self.to_json(false)?, TS_SUFFIX))
    }

    pub fn into_index(self) -> RedirectIndex {
        self.index
    }
}

fn unwrap_typescript_module(data: &str) -> Option<&str> {
    data.trim()
        .strip_prefix(TS_PREFIX)?
        .strip_suffix(TS_SUFFIX)
}
