//! Fingerprint reader session: capture orchestration over a blocking scanner.
//!
//! This crate turns a blocking vendor scanner ([`FingerprintScanner`]) into a
//! session with single-flight captures, caller timeouts, cooperative
//! cancellation and an ordered status stream.
//!
//! # Architecture
//!
//! ```text
//!              ┌──────────────────────────────────────────────┐
//! caller ────► │ FingerprintReader (method surface, gate)     │
//!              │   └── CaptureOrchestrator (slot, race)       │
//!              │         ├── DeviceHandle ──► worker thread ──┼──► scanner
//!              │         ├── timer tasks                      │
//!              │         └── StatusEmitter ─► notify task ────┼──► subscriber
//!              └──────────────────────────────────────────────┘
//! ```
//!
//! - **Device worker**: one thread owns the scanner and runs open, close and
//!   capture bodies one at a time.
//! - **Timer**: a Tokio task per attempt with a timeout.
//! - **Notification task**: delivers status events and capture results in a
//!   single order, so a terminal status always precedes its result.
//!
//! # Guarantees
//!
//! - At most one capture attempt is active; a new capture supersedes the old.
//! - Each attempt produces exactly one terminal status and one result.
//! - `Capturing` precedes the terminal status of the same attempt.
//! - Cancellation stops delivery, not the physical scan. A late result from a
//!   resolved attempt is discarded.
//!
//! [`FingerprintScanner`]: fingerprint_hardware::FingerprintScanner

pub mod adapter;
pub mod config;
pub mod device;
pub mod emitter;
pub mod method;
pub mod orchestrator;
pub mod reader;

// Re-export commonly used types for convenience
pub use adapter::{Acquisition, CaptureAdapter, CaptureConfig, ScannerPipeline};
pub use config::{CaptureDefaults, ReaderConfig};
pub use device::{DeviceHandle, DeviceState};
pub use emitter::{StatusEmitter, StatusStream};
pub use method::{CaptureResponse, MethodCall, MethodResponse};
pub use orchestrator::{CaptureOrchestrator, CaptureTicket};
pub use reader::{AllowAll, FingerprintReader, PermissionGate, ReaderBuilder};
