//! Shared utilities for videoforge integration tests.
//!
//! - `TestHarness`: a temp data directory with a file-backed database
//! - `fakes`: deterministic tool implementations

pub mod fakes;
pub mod harness;

pub use harness::TestHarness;
