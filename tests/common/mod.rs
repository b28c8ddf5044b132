//! Common test utilities for pipeline assembly tests
//!
//! Builds throwaway project trees with a driver script, notebooks and data
//! files, and an offline resolver pointing at them.

pub mod project;

pub use project::{notebook_json, FixtureProject, BASE_URL, COMMIT};
