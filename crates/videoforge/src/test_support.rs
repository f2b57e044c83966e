//! Fake tools shared by unit and integration tests, plus fixtures for the
//! unit tests.

pub mod fakes;
#[cfg(test)]
mod fixtures;

pub use fakes::clip;
#[cfg(test)]
pub use fixtures::*;
