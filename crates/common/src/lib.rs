//! Athletrack Common Utilities
//!
//! Shared infrastructure for all Athletrack crates:
//! - Error types and result aliases
//! - Logical clock and deadline utilities for frame-driven processing
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
