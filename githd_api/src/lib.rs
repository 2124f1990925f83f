//! Shared githd data models consumed by the core library and the listing crates.

pub mod git;
pub mod preferences;

pub use git::*;
pub use preferences::*;
