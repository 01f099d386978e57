//! Common utilities and shared functionality
//!
//! Identifiers, clocks and hashing helpers used across the Gridfall crate.

pub mod types;
