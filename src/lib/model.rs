//! Data model for GAM-style graph alignment records.
//!
//! A [`Record`] is an alignment of a read against a sequence graph: a
//! [`Path`] of [`Mapping`]s, each anchored at a [`Position`] (node id,
//! orientation, offset into the node). The sort engine orders records by the
//! minimum position touched by their path; everything else on the record is
//! opaque payload that is carried through unchanged.
//!
//! An unmapped record has an empty path and takes the default position
//! (node 0, forward, offset 0) as its key, so unmapped records collate at
//! the front of sorted output.

use bstr::BString;
use std::cmp::Ordering;

/// A single base position in a bidirected sequence graph.
///
/// Positions order lexicographically by node id, then orientation
/// (forward before reverse), then offset within the node. This is the total
/// order the whole sort is defined over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Position {
    /// Id of the graph node this position lies on.
    pub node_id: u64,
    /// True if the position is on the reverse strand of the node.
    pub is_reverse: bool,
    /// Base offset from the start of the node (in the given orientation).
    pub offset: u64,
}

impl Position {
    /// Creates a position from its three components.
    #[must_use]
    pub fn new(node_id: u64, is_reverse: bool, offset: u64) -> Self {
        Self { node_id, is_reverse, offset }
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.node_id
            .cmp(&other.node_id)
            .then_with(|| self.is_reverse.cmp(&other.is_reverse))
            .then_with(|| self.offset.cmp(&other.offset))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One step of an alignment path: a node visit anchored at a [`Position`].
///
/// The rank is payload the sort never inspects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mapping {
    /// Where on the graph this step starts.
    pub position: Position,
    /// One-based rank of this step within the path (opaque to the sort).
    pub rank: u64,
}

impl Mapping {
    /// Creates a mapping at the given position with the given rank.
    #[must_use]
    pub fn new(position: Position, rank: u64) -> Self {
        Self { position, rank }
    }
}

/// The ordered sequence of mappings an alignment takes through the graph.
/// Empty for unmapped records.
pub type Path = Vec<Mapping>;

/// A graph alignment record.
///
/// Name and sequence are opaque payload; only `path` feeds the sort key.
/// Records are plain owned values and may be moved or copied freely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Read name.
    pub name: BString,
    /// Read sequence bases.
    pub sequence: BString,
    /// Alignment path through the graph (empty if unmapped).
    pub path: Path,
}

impl Record {
    /// Creates a record from its parts.
    #[must_use]
    pub fn new(name: impl Into<BString>, sequence: impl Into<BString>, path: Path) -> Self {
        Self { name: name.into(), sequence: sequence.into(), path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(node_id: u64, is_reverse: bool, offset: u64) -> Position {
        Position::new(node_id, is_reverse, offset)
    }

    #[test]
    fn test_position_orders_by_node_first() {
        assert!(pos(1, true, 100) < pos(2, false, 0));
        assert!(pos(3, false, 0) > pos(2, true, 500));
    }

    #[test]
    fn test_position_forward_before_reverse() {
        assert!(pos(5, false, 100) < pos(5, true, 0));
    }

    #[test]
    fn test_position_orders_by_offset_last() {
        assert!(pos(5, false, 10) < pos(5, false, 11));
        assert!(pos(5, true, 10) < pos(5, true, 11));
    }

    #[test]
    fn test_position_equality() {
        assert_eq!(pos(5, true, 10), pos(5, true, 10));
        assert_ne!(pos(5, true, 10), pos(5, false, 10));
    }

    #[test]
    fn test_position_default_is_minimal() {
        let default = Position::default();
        assert_eq!(default, pos(0, false, 0));
        for p in [pos(0, false, 1), pos(0, true, 0), pos(1, false, 0)] {
            assert!(default < p);
        }
    }

    #[test]
    fn test_position_total_order_laws() {
        let samples = [
            pos(0, false, 0),
            pos(0, false, 1),
            pos(0, true, 0),
            pos(1, false, 0),
            pos(1, true, 7),
            pos(2, false, 100),
            pos(2, true, 0),
        ];

        for a in &samples {
            // Irreflexive
            assert!(!(a < a));
            for b in &samples {
                // Exactly one of <, ==, > holds
                let relations =
                    [usize::from(a < b), usize::from(a == b), usize::from(a > b)];
                assert_eq!(relations.iter().sum::<usize>(), 1, "{a:?} vs {b:?}");
                // Antisymmetric
                if a < b {
                    assert!(b > a);
                }
                for c in &samples {
                    // Transitive
                    if a < b && b < c {
                        assert!(a < c);
                    }
                }
            }
        }
    }
}
