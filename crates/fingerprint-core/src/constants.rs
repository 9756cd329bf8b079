//! Constants shared by the reader and the vendor boundary.
//!
//! Status messages are part of the observable event stream, so clients may
//! match on them. The acquisition constants mirror the vendor SDK defaults.
//!
//! # Usage
//!
//! ```
//! use fingerprint_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(MSG_OPENED, "opened");
//! let device_timeout = Duration::from_millis(DEFAULT_DEVICE_TIMEOUT_MS);
//! assert_eq!(device_timeout.as_secs(), 10);
//! ```

// ============================================================================
// Status messages
// ============================================================================

/// Published with `Idle` after the device opens.
pub const MSG_OPENED: &str = "opened";

/// Published with `Idle` after the device closes.
pub const MSG_CLOSED: &str = "closed";

/// Published with `Capturing` when an attempt starts.
pub const MSG_START: &str = "start";

/// Published with `Idle` when an attempt is cancelled.
pub const MSG_CANCELLED: &str = "cancelled";

/// Published with `Idle` when an attempt is replaced by a newer capture.
pub const MSG_SUPERSEDED: &str = "superseded";

/// Published with `Error` when the caller-supplied timeout wins.
pub const MSG_TIMEOUT: &str = "timeout";

// ============================================================================
// Method-call surface
// ============================================================================

/// Capture mode used when the caller omits one.
pub const DEFAULT_MODE: &str = "iso19794_2";

/// Quality reported on the wire when the scanner gave none.
pub const MISSING_QUALITY: i32 = -1;

/// Identifier of the built-in reader entry returned by `listDevices`.
pub const DEFAULT_DEVICE_ID: &str = "Miaxis-USB-0";

/// Display name of the built-in reader entry.
pub const DEFAULT_DEVICE_NAME: &str = "Miaxis FPR";

/// Connection type of the built-in reader entry.
pub const DEFAULT_DEVICE_TYPE: &str = "USB";

// ============================================================================
// Acquisition
// ============================================================================

/// Capacity of the template output buffer handed to the encoder.
pub const MAX_TEMPLATE_LEN: usize = 4096;

/// Minimum minutiae count required by the template encoder.
pub const MIN_MINUTIAE: u32 = 18;

/// NFIQ gate applied by the sensor during acquisition (0 disables it).
pub const DEFAULT_NFIQ_LEVEL: u8 = 0;

/// Live finger detection level (0 disables it).
pub const DEFAULT_LFD_LEVEL: u8 = 0;

/// Minimum finger contact area score.
pub const DEFAULT_AREA_SCORE: u8 = 45;

/// Device-side acquisition timeout when the caller supplies none.
pub const DEFAULT_DEVICE_TIMEOUT_MS: u64 = 10_000;

/// Depth of the device worker job queue.
pub const DEFAULT_WORKER_QUEUE: usize = 16;
