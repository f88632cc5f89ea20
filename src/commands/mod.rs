//! CLI command implementations for gamsort.
//!
//! Each submodule implements one subcommand. Commands are dispatched through
//! the [`command::Command`] trait via `enum_dispatch`.

pub mod command;
pub mod sort;
