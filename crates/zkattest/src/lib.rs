//! # zkattest Shared Rust Library
//!
//! Shared infrastructure for zkattest binaries:
//! - **error**: Common error type for configuration and ledger file handling
//! - **tracing**: Logging setup with zkattest segment prefixes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zkattest::error::Error;
//! use zkattest::tracing::{self, prefix};
//! ```

pub mod error;
pub mod tracing;

// Re-export commonly used items at crate root
pub use error::{Error, Result};
