//! Courier CLI library.
//!
//! Argument definitions and command implementations for the `courier`
//! binary.

pub mod args;
pub mod cli;
pub mod commands;
pub mod error;

pub use error::CliError;
