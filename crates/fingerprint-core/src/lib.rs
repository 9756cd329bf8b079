//! Shared vocabulary for the fingerprint reader workspace.
//!
//! Error codes, capture modes, the mode-to-template mapping and the status
//! event shape live here so the hardware boundary and the reader can agree
//! on them without depending on each other.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{ErrorCategory, ErrorKind, ReaderError, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
