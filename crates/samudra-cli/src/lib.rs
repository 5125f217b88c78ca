//! Samudra CLI library.
//!
//! Subcommand handlers and output formatting for the `samudra-cli` binary.

pub mod commands;
pub mod output;
