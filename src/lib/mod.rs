#![deny(unsafe_code)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::uninlined_format_args
)]

//! # gamsort - position sorting for graph alignment records
//!
//! This library sorts streams of GAM-style graph alignment records into a
//! canonical total order over each record's minimum aligned position, with
//! peak memory bounded regardless of input size.
//!
//! ## Overview
//!
//! - **[`model`]** - `Position`, `Mapping`, `Path`, and `Record` types and
//!   the position total order
//! - **[`sort`]** - the core engine: in-memory batch sort, spill-to-disk,
//!   and k-way streaming merge
//! - **[`gam_io`]** - framed binary record streams with grouped flushed output
//! - **[`errors`]** - structured error kinds for input, spill, and output failures
//! - **[`logging`]** / **[`progress`]** - operation timing and interval progress logs
//! - **[`validation`]** - input validation for the CLI
//!
//! ## Quick Start
//!
//! ```no_run
//! use gamsort_lib::gam_io::GamReader;
//! use gamsort_lib::sort::ExternalSorter;
//! use std::fs::File;
//!
//! # fn main() -> anyhow::Result<()> {
//! let input = GamReader::new(File::open("input.gam")?);
//! let output = File::create("sorted.gam")?;
//!
//! let stats = ExternalSorter::new().max_records(500_000).sort(input, output)?;
//! println!("sorted {} records", stats.output_records);
//! # Ok(())
//! # }
//! ```
//!
//! Records comparing equal may be emitted in any relative order; the sort is
//! deliberately unstable. Sorting the same input with any batch size yields
//! the same output modulo tie order.
//!
//! ## See Also
//!
//! - [vg](https://github.com/vgteam/vg) - the variation graph toolkit whose
//!   GAM sorting semantics this crate follows

pub mod errors;
pub mod gam_io;
pub mod logging;
pub mod model;
pub mod progress;
pub mod sort;
pub mod validation;

pub use errors::GamsortError;
pub use model::{Mapping, Path, Position, Record};
pub use sort::{ExternalSorter, SortStats};
