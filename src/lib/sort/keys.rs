//! Sort key extraction for GAM-style records.
//!
//! A record sorts by the smallest position its path touches. Scanning the
//! path is O(path length), so the sort and merge code extracts the key once
//! per record and carries `(key, record)` pairs instead of recomputing the
//! scan inside every comparison.

use crate::model::{Position, Record};

/// Returns the smallest position in the record's path under the position
/// total order, or the default position if the path is empty.
///
/// Unmapped records therefore key to node 0 and collate before any record
/// mapped to a real node.
#[must_use]
pub fn min_position(record: &Record) -> Position {
    record.path.iter().map(|mapping| mapping.position).min().unwrap_or_default()
}

/// Precomputed sort key for one record: its minimum path position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MinPositionKey(pub Position);

impl MinPositionKey {
    /// Extracts the key from a record.
    #[must_use]
    pub fn from_record(record: &Record) -> Self {
        Self(min_position(record))
    }
}
