//! External merge-sort implementation for GAM-style record streams.
//!
//! Handles inputs larger than available RAM by spilling sorted batches to
//! temporary files and k-way merging them with a binary heap.
//!
//! # Algorithm
//!
//! 1. **Batch phase**: Read records into memory until the record cap is reached
//! 2. **Sort phase**: Sort the batch by precomputed min-position keys
//! 3. **Spill phase**: Write the sorted batch to a temp file
//! 4. **Merge phase**: K-way merge of spill files using a binary heap
//!
//! Every spill file lives inside one [`tempfile::TempDir`] owned by the sort
//! call, so the backing storage is released on every exit path, success or
//! failure. If the whole input fits in a single batch, no spill is written
//! and the batch is sorted and emitted directly.

use crate::errors::{GamsortError, Result};
use crate::gam_io::{DEFAULT_GROUP_SIZE, GamReader, GamWriter};
use crate::model::Record;
use crate::progress::ProgressTracker;
use crate::sort::keys::MinPositionKey;
use log::info;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Default maximum number of records held in memory before spilling.
pub const DEFAULT_MAX_RECORDS: usize = 1_000_000;

/// Buffer size for reading spill files during merge.
const MERGE_BUFFER_SIZE: usize = 64 * 1024;

/// Cap on the batch preallocation, so a huge `--max-records` does not
/// reserve memory before any records arrive.
const BATCH_PREALLOC_LIMIT: usize = 1 << 20;

/// Sorts a batch of records in place by minimum path position.
///
/// Comparison sort with no stability guarantee; records with equal keys may
/// be reordered. Used directly for whole-in-memory sorts and per batch by
/// the external sorter.
pub fn sort_in_memory(records: &mut Vec<Record>) {
    let mut keyed: Vec<(MinPositionKey, Record)> =
        records.drain(..).map(|record| (MinPositionKey::from_record(&record), record)).collect();
    sort_batch(&mut keyed);
    records.extend(keyed.into_iter().map(|(_, record)| record));
}

/// Sorts keyed records in place; keys were precomputed so each comparison is O(1).
fn sort_batch(batch: &mut [(MinPositionKey, Record)]) {
    batch.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
}

/// External sorter for GAM-style record streams.
///
/// Reads batches of up to `max_records` records, sorts and spills each one,
/// then merges all spills into the output stream. Peak memory is one batch
/// of records plus per-spill cursor bookkeeping, independent of input size.
pub struct ExternalSorter {
    /// Maximum records per in-memory batch.
    max_records: usize,
    /// Base directory for the spill temp dir (system default if unset).
    temp_dir: Option<PathBuf>,
    /// Records written to the output between flushes.
    output_group_size: usize,
}

impl ExternalSorter {
    /// Creates a sorter with default batch size and temp directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            temp_dir: None,
            output_group_size: DEFAULT_GROUP_SIZE,
        }
    }

    /// Sets the maximum number of records held in memory at once.
    ///
    /// Larger values mean fewer spill files and lower merge fan-in at the
    /// cost of higher peak memory; smaller values bound memory tightly at
    /// the cost of more spills. A value of zero is treated as one.
    #[must_use]
    pub fn max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records.max(1);
        self
    }

    /// Sets the base directory under which spill files are created.
    #[must_use]
    pub fn temp_dir(mut self, path: PathBuf) -> Self {
        self.temp_dir = Some(path);
        self
    }

    /// Sets how many output records are written between flushes.
    #[must_use]
    pub fn output_group_size(mut self, group_size: usize) -> Self {
        self.output_group_size = group_size;
        self
    }

    /// Sorts `input` into `output` with bounded memory.
    ///
    /// Returns only after the output has been flushed and all spill storage
    /// released; on any failure the spill storage is released before the
    /// error propagates.
    pub fn sort<R: Read, W: Write>(&self, mut input: GamReader<R>, output: W) -> Result<SortStats> {
        let mut stats = SortStats::default();
        let mut spills = SpillManager::new(self.temp_dir.as_deref())?;
        let mut batch: Vec<(MinPositionKey, Record)> =
            Vec::with_capacity(self.max_records.min(BATCH_PREALLOC_LIMIT));

        info!("Phase 1: reading and sorting batches of up to {} records", self.max_records);
        let progress = ProgressTracker::new("Read records").with_interval(1_000_000);

        loop {
            let record = match input.read_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(source) => return Err(GamsortError::InputRead { source }),
            };
            stats.total_records += 1;
            progress.log_if_needed(1);
            batch.push((MinPositionKey::from_record(&record), record));

            if batch.len() >= self.max_records {
                sort_batch(&mut batch);
                spills.spill(batch.iter().map(|(_, record)| record))?;
                stats.chunks_written += 1;
                batch.clear();
            }
        }
        progress.log_final();

        let mut writer = GamWriter::with_group_size(output, self.output_group_size);

        if spills.is_empty() {
            // Everything fit in one batch: sort and emit directly, no spill.
            info!("All {} records fit in memory, sorting in place", batch.len());
            sort_batch(&mut batch);
            for (_, record) in &batch {
                writer
                    .write_record(record)
                    .map_err(|source| GamsortError::OutputWrite { source })?;
            }
        } else {
            if !batch.is_empty() {
                sort_batch(&mut batch);
                spills.spill(batch.iter().map(|(_, record)| record))?;
                stats.chunks_written += 1;
            }
            drop(batch);

            info!("Phase 2: merging {} spill files", spills.len());
            let engine = MergeEngine::open(spills.paths())?;
            engine.merge_into(&mut writer)?;
        }

        stats.output_records = writer.records_written();
        writer.finish().map_err(|source| GamsortError::OutputWrite { source })?;
        spills.cleanup()?;

        info!("Sort complete: {} records written", stats.output_records);
        Ok(stats)
    }
}

impl Default for ExternalSorter {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics from a sort operation.
#[derive(Default, Debug)]
pub struct SortStats {
    /// Total records read from input.
    pub total_records: u64,
    /// Records written to output.
    pub output_records: u64,
    /// Number of temporary spill files written.
    pub chunks_written: usize,
}

/// Owns the spill storage for one sort call.
///
/// All spill files live inside a single [`TempDir`], so dropping the manager
/// (on any exit path) deletes every spill it ever created, including spills
/// that were never read back.
struct SpillManager {
    temp_dir: TempDir,
    paths: Vec<PathBuf>,
}

impl SpillManager {
    fn new(base: Option<&Path>) -> Result<Self> {
        let temp_dir = match base {
            Some(base) => {
                std::fs::create_dir_all(base).map_err(|source| GamsortError::SpillWrite {
                    path: base.to_path_buf(),
                    source,
                })?;
                TempDir::new_in(base)
            }
            None => TempDir::new(),
        }
        .map_err(|source| GamsortError::SpillWrite {
            path: base.map_or_else(std::env::temp_dir, Path::to_path_buf),
            source,
        })?;
        Ok(Self { temp_dir, paths: Vec::new() })
    }

    /// Writes one already-sorted batch to a new uniquely named spill file.
    fn spill<'a>(&mut self, records: impl Iterator<Item = &'a Record>) -> Result<()> {
        let path = self.temp_dir.path().join(format!("chunk_{:04}.gam", self.paths.len()));
        write_spill(&path, records)
            .map_err(|source| GamsortError::SpillWrite { path: path.clone(), source })?;
        self.paths.push(path);
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn len(&self) -> usize {
        self.paths.len()
    }

    fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Deletes all spill storage, surfacing deletion errors.
    ///
    /// Only called on the success path; failure paths rely on the `TempDir`
    /// drop, which performs the same deletion best-effort.
    fn cleanup(self) -> Result<()> {
        let base = self.temp_dir.path().to_path_buf();
        self.temp_dir
            .close()
            .map_err(|source| GamsortError::SpillWrite { path: base, source })
    }
}

fn write_spill<'a>(
    path: &Path,
    records: impl Iterator<Item = &'a Record>,
) -> std::io::Result<()> {
    let file = File::create(path)?;
    // One flush at the end is fine: nothing reads a spill until the merge.
    let mut writer = GamWriter::with_group_size(file, 0);
    for record in records {
        writer.write_record(record)?;
    }
    writer.finish()?;
    Ok(())
}

/// Read cursor over one spill file, yielding keyed records in written order.
struct SpillCursor {
    path: PathBuf,
    reader: GamReader<File>,
}

impl SpillCursor {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|source| GamsortError::SpillRead { path: path.to_path_buf(), source })?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: GamReader::with_capacity(MERGE_BUFFER_SIZE, file),
        })
    }

    fn next_keyed(&mut self) -> Result<Option<(MinPositionKey, Record)>> {
        match self.reader.read_record() {
            Ok(Some(record)) => Ok(Some((MinPositionKey::from_record(&record), record))),
            Ok(None) => Ok(None),
            Err(source) => {
                Err(GamsortError::SpillRead { path: self.path.clone(), source })
            }
        }
    }
}

/// Entry in the merge heap: one cursor's current head record.
///
/// Ordered by key alone, never by cursor index, so ties between spills break
/// in arbitrary heap order.
struct HeapEntry {
    key: MinPositionKey,
    record: Record,
    cursor_idx: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// K-way merge over sorted spill files.
///
/// Cursors live in an arena indexed by `cursor_idx`; the heap holds indexes
/// with each cursor's head record, never references into the arena. A cursor
/// enters the heap only when it has actually yielded a record, so an
/// exhausted (or entirely empty) spill never competes for the minimum.
struct MergeEngine {
    cursors: Vec<SpillCursor>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
}

impl MergeEngine {
    fn open(paths: &[PathBuf]) -> Result<Self> {
        let mut cursors =
            paths.iter().map(|path| SpillCursor::open(path)).collect::<Result<Vec<_>>>()?;

        let mut heap = BinaryHeap::with_capacity(cursors.len());
        for (cursor_idx, cursor) in cursors.iter_mut().enumerate() {
            // Empty spills are skipped here and never enter the heap.
            if let Some((key, record)) = cursor.next_keyed()? {
                heap.push(Reverse(HeapEntry { key, record, cursor_idx }));
            }
        }
        Ok(Self { cursors, heap })
    }

    /// Pops the global minimum, emits it, and advances its cursor until all
    /// cursors are exhausted. The winner is always reinserted while it has
    /// records; equal keys resolve in arbitrary heap order.
    fn merge_into<W: Write>(mut self, output: &mut GamWriter<W>) -> Result<u64> {
        let mut merged = 0u64;
        while let Some(Reverse(entry)) = self.heap.pop() {
            output
                .write_record(&entry.record)
                .map_err(|source| GamsortError::OutputWrite { source })?;
            merged += 1;

            let cursor = &mut self.cursors[entry.cursor_idx];
            if let Some((key, record)) = cursor.next_keyed()? {
                self.heap.push(Reverse(HeapEntry { key, record, cursor_idx: entry.cursor_idx }));
            }
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mapping, Position};
    use std::io::Cursor;

    fn record_at(name: &str, positions: &[(u64, bool, u64)]) -> Record {
        let path = positions
            .iter()
            .enumerate()
            .map(|(i, &(node_id, is_reverse, offset))| {
                Mapping::new(Position::new(node_id, is_reverse, offset), i as u64 + 1)
            })
            .collect();
        Record::new(name, "ACGT", path)
    }

    fn min_positions(records: &[Record]) -> Vec<Position> {
        records.iter().map(crate::sort::keys::min_position).collect()
    }

    #[test]
    fn test_sorter_builder() {
        let sorter = ExternalSorter::new()
            .max_records(1234)
            .temp_dir(PathBuf::from("/tmp/gamsort"))
            .output_group_size(50);
        assert_eq!(sorter.max_records, 1234);
        assert_eq!(sorter.temp_dir, Some(PathBuf::from("/tmp/gamsort")));
        assert_eq!(sorter.output_group_size, 50);
    }

    #[test]
    fn test_max_records_of_zero_is_clamped() {
        let sorter = ExternalSorter::new().max_records(0);
        assert_eq!(sorter.max_records, 1);
    }

    #[test]
    fn test_sort_in_memory_orders_by_min_position() {
        let mut records = vec![
            record_at("c", &[(5, false, 10)]),
            record_at("b", &[(2, true, 0)]),
            record_at("a", &[(9, false, 3), (1, false, 7)]),
        ];
        sort_in_memory(&mut records);
        assert_eq!(
            min_positions(&records),
            vec![
                Position::new(1, false, 7),
                Position::new(2, true, 0),
                Position::new(5, false, 10),
            ]
        );
    }

    #[test]
    fn test_sort_in_memory_puts_unmapped_first() {
        let mut records = vec![
            record_at("mapped", &[(3, false, 0)]),
            record_at("unmapped", &[]),
        ];
        sort_in_memory(&mut records);
        assert_eq!(records[0].name, "unmapped");
    }

    #[test]
    fn test_merge_skips_empty_spills() {
        let mut spills = SpillManager::new(None).unwrap();
        spills.spill(std::iter::empty()).unwrap();
        spills.spill([record_at("a", &[(1, false, 0)]), record_at("b", &[(4, false, 2)])].iter())
            .unwrap();
        spills.spill(std::iter::empty()).unwrap();
        spills.spill([record_at("c", &[(2, true, 5)])].iter()).unwrap();

        let mut bytes = Vec::new();
        let mut writer = GamWriter::new(&mut bytes);
        let merged =
            MergeEngine::open(spills.paths()).unwrap().merge_into(&mut writer).unwrap();
        writer.finish().unwrap();
        assert_eq!(merged, 3);

        let records: Vec<Record> =
            GamReader::new(Cursor::new(bytes)).collect::<std::io::Result<_>>().unwrap();
        let names: Vec<_> = records.iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["a", "c", "b"]);

        spills.cleanup().unwrap();
    }

    #[test]
    fn test_merge_with_no_spills_emits_nothing() {
        let mut bytes = Vec::new();
        let mut writer = GamWriter::new(&mut bytes);
        let merged = MergeEngine::open(&[]).unwrap().merge_into(&mut writer).unwrap();
        writer.finish().unwrap();
        assert_eq!(merged, 0);
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_spill_manager_cleanup_removes_storage() {
        let base = tempfile::tempdir().unwrap();
        let mut spills = SpillManager::new(Some(base.path())).unwrap();
        spills.spill([record_at("a", &[(1, false, 0)])].iter()).unwrap();
        let spill_dir = spills.temp_dir.path().to_path_buf();
        assert!(spill_dir.exists());

        spills.cleanup().unwrap();
        assert!(!spill_dir.exists());
    }
}
