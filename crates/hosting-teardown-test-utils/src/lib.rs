//! Shared test utilities for hosting-teardown
//!
//! This crate provides common test helpers that can be used across
//! multiple test modules without circular dependencies.
//!
//! ## Modules
//!
//! - [`db`]: In-memory SQLite pools and temporary ledger files
//! - [`fixtures`]: Site scenarios and snapshot files

pub mod db;
pub mod fixtures;

pub use fixtures::Fixture;
