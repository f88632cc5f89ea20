//! Position-order sorting of GAM-style records.
//!
//! The sort key for a record is the minimum [`Position`] touched by its
//! alignment path (the default position for unmapped records), compared with
//! the graph position total order. Inputs that fit in memory are sorted in
//! place; larger inputs go through an external merge sort:
//!
//! 1. **Batch phase**: read records into memory up to a record cap
//! 2. **Sort phase**: sort the batch by precomputed min-position keys
//! 3. **Spill phase**: write the sorted batch to a temp file
//! 4. **Merge phase**: k-way merge of spill files using a min-heap
//!
//! [`Position`]: crate::model::Position

pub mod external;
pub mod keys;

pub use external::{ExternalSorter, SortStats, sort_in_memory};
pub use keys::{MinPositionKey, min_position};
