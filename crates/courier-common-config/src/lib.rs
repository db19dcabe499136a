//! Configuration types for Courier.
//!
//! This crate provides the configuration used by Courier, read from
//! `.courier/config.yaml` files and `COURIER_*` environment variables.

pub mod env;
pub mod loader;
pub mod types;

#[cfg(test)]
mod integration_test;

pub use env::*;
pub use loader::*;
pub use types::*;
