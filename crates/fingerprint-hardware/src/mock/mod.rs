//! Mock device implementations for testing and development.
//!
//! This module provides simulated scanners that can be controlled
//! programmatically without requiring physical hardware.

pub mod scanner;

// Re-export commonly used types
pub use scanner::{MockScanner, MockScannerHandle, mock_template};
