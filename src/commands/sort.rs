//! Sort GAM record streams by minimum aligned position.
//!
//! Uses bounded-memory external merge-sort: batches of records are sorted in
//! memory, spilled to temporary files, and k-way merged into the output.
//! Unmapped records (empty path) key to node 0 and collate at the front of
//! the output.
//!
//! # Verification
//!
//! Use `--verify` to check that a GAM file is already in non-decreasing
//! min-position order without writing output.

use anyhow::{Context, Result, bail};
use clap::Parser;
use gamsort_lib::gam_io::{GamReader, GamWriter};
use gamsort_lib::logging::OperationTimer;
use gamsort_lib::sort::{ExternalSorter, MinPositionKey, sort_in_memory};
use gamsort_lib::validation::validate_file_exists;
use log::info;
use std::fs::File;
use std::path::PathBuf;

use crate::commands::command::Command;

/// Sort a GAM record stream.
///
/// Sorts records by the minimum position their alignment path touches,
/// using bounded-memory external merge-sort.
#[derive(Debug, Parser)]
#[command(
    name = "sort",
    about = "Sort a GAM file by minimum aligned position",
    long_about = r#"
Sort a GAM file by minimum aligned position using external merge-sort.

Records are ordered by the smallest (node id, orientation, offset) position
their alignment path touches. Unmapped records (empty path) sort to the
front of the output.

MEMORY:

  Peak memory is bounded by --max-records: once that many records are
  buffered, the batch is sorted and spilled to a temporary file, and the
  spill files are merged at the end. Larger values mean fewer spills and a
  cheaper merge; smaller values bound memory more tightly.

EXAMPLES:

  # Sort with default batch size
  gamsort sort -i aligned.gam -o sorted.gam

  # Bound memory to 100K records per batch, spill under /scratch
  gamsort sort -i aligned.gam -o sorted.gam --max-records 100K -T /scratch

  # Small input, skip spilling entirely
  gamsort sort -i aligned.gam -o sorted.gam --in-memory

  # Verify a GAM file is correctly sorted
  gamsort sort -i sorted.gam --verify
"#
)]
pub struct Sort {
    /// Input GAM file.
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output GAM file (required unless --verify is used).
    #[arg(short = 'o', long = "output", conflicts_with = "verify")]
    pub output: Option<PathBuf>,

    /// Verify the input file is correctly sorted (no output written).
    ///
    /// Reads records sequentially and checks that each record's min-position
    /// key is >= the previous record's key. Exits 0 if sorted correctly,
    /// non-zero if any records are out of order.
    #[arg(long = "verify", conflicts_with = "output")]
    pub verify: bool,

    /// Maximum records held in memory before spilling a sorted batch.
    ///
    /// Accepts values like "500000", "500K", "2M". Larger values reduce the
    /// number of spill files and merge fan-in at the cost of higher peak
    /// memory.
    #[arg(short = 'm', long = "max-records", default_value = "1M", value_parser = parse_record_count)]
    pub max_records: usize,

    /// Sort entirely in memory, never spilling to disk.
    ///
    /// Only safe when the whole input fits in memory; --max-records is
    /// ignored.
    #[arg(long = "in-memory")]
    pub in_memory: bool,

    /// Temporary directory for spill files.
    ///
    /// If not specified, uses the system default temp directory.
    #[arg(short = 'T', long = "tmp-dir")]
    pub tmp_dir: Option<PathBuf>,
}

/// Parse a record count string (e.g., "500000", "500K", "2M").
fn parse_record_count(s: &str) -> Result<usize, String> {
    let s = s.trim().to_uppercase();

    if s.is_empty() {
        return Err("Empty record count".to_string());
    }

    let (num_str, multiplier) = if s.ends_with('G') {
        (&s[..s.len() - 1], 1_000_000_000)
    } else if s.ends_with('M') {
        (&s[..s.len() - 1], 1_000_000)
    } else if s.ends_with('K') {
        (&s[..s.len() - 1], 1_000)
    } else {
        (s.as_str(), 1)
    };

    let num: f64 = num_str.parse().map_err(|_| format!("Invalid number: {num_str}"))?;

    if num <= 0.0 {
        return Err("Record count must be positive".to_string());
    }

    Ok((num * multiplier as f64) as usize)
}

impl Command for Sort {
    fn execute(&self) -> Result<()> {
        validate_file_exists(&self.input, "Input GAM")?;

        // Either --output or --verify must be specified
        if !self.verify && self.output.is_none() {
            bail!("Either --output or --verify must be specified");
        }

        if self.verify {
            return self.execute_verify();
        }

        self.execute_sort()
    }
}

impl Sort {
    /// Execute sort mode: read, sort, and write output.
    fn execute_sort(&self) -> Result<()> {
        let output = self.output.as_ref().expect("output required for sort mode");

        let timer = OperationTimer::new("Sorting GAM");

        info!("Starting Sort");
        info!("Input: {}", self.input.display());
        info!("Output: {}", output.display());
        if self.in_memory {
            info!("Mode: whole-input in-memory sort");
        } else {
            info!("Max records per batch: {}", self.max_records);
            if let Some(ref tmp) = self.tmp_dir {
                info!("Temp directory: {}", tmp.display());
            }
        }

        let input_file = File::open(&self.input)
            .with_context(|| format!("Failed to open input GAM '{}'", self.input.display()))?;
        let reader = GamReader::new(input_file);
        let output_file = File::create(output)
            .with_context(|| format!("Failed to create output GAM '{}'", output.display()))?;

        let (total_records, output_records, chunks_written) = if self.in_memory {
            let mut records = reader
                .collect::<std::io::Result<Vec<_>>>()
                .context("Failed to read input record stream")?;
            let total = records.len() as u64;
            sort_in_memory(&mut records);

            let mut writer = GamWriter::new(output_file);
            for record in &records {
                writer.write_record(record).context("Failed to write sorted output")?;
            }
            let written = writer.finish().context("Failed to write sorted output")?;
            (total, written, 0)
        } else {
            let mut sorter = ExternalSorter::new().max_records(self.max_records);
            if let Some(ref tmp) = self.tmp_dir {
                sorter = sorter.temp_dir(tmp.clone());
            }
            let stats = sorter.sort(reader, output_file)?;
            (stats.total_records, stats.output_records, stats.chunks_written)
        };

        // Summary
        info!("=== Summary ===");
        info!("Records processed: {total_records}");
        info!("Records written: {output_records}");
        if chunks_written > 0 {
            info!("Temporary spills: {chunks_written}");
        }
        info!("Output: {}", output.display());

        timer.log_completion(total_records);
        Ok(())
    }

    /// Execute verify mode: read records and check sort order.
    fn execute_verify(&self) -> Result<()> {
        let timer = OperationTimer::new("Verifying GAM sort order");

        info!("Starting Sort Verification");
        info!("Input: {}", self.input.display());

        let input_file = File::open(&self.input)
            .with_context(|| format!("Failed to open input GAM '{}'", self.input.display()))?;
        let reader = GamReader::new(input_file);

        let mut total_records: u64 = 0;
        let mut violations: u64 = 0;
        let mut first_violation: Option<(u64, String)> = None;
        let mut prev_key: Option<MinPositionKey> = None;

        for result in reader {
            let record = result.context("Failed to read input record stream")?;
            total_records += 1;

            let key = MinPositionKey::from_record(&record);
            if let Some(prev) = prev_key {
                if key < prev {
                    violations += 1;
                    if first_violation.is_none() {
                        first_violation =
                            Some((total_records, String::from_utf8_lossy(&record.name).into_owned()));
                    }
                }
            }
            prev_key = Some(key);
        }

        // Summary
        info!("=== Verification Summary ===");
        info!("Records checked: {total_records}");
        info!("Sort order violations: {violations}");

        if violations > 0 {
            if let Some((record_num, name)) = first_violation {
                info!("First violation at record {record_num}: {name}");
            }
            timer.log_completion(total_records);
            bail!("GAM file is NOT sorted by min position: {violations} violations found");
        }

        info!("Result: PASS - file is sorted by min position");
        timer.log_completion(total_records);
        Ok(())
    }
}
