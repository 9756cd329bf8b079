//! Vendor boundary for the fingerprint reader.
//!
//! This crate defines the trait a fingerprint SDK must implement to be driven
//! by the reader, plus a scriptable mock for development and tests.
//!
//! # Design Philosophy
//!
//! - **Blocking**: vendor SDK calls hold the calling thread for the whole
//!   physical scan. The trait says so instead of hiding it behind `async`;
//!   the reader runs these calls on its own serial worker.
//! - **One-to-one with the SDK**: image acquisition, quality scoring, image
//!   conversion and template encoding are separate primitives. Composing them
//!   into a capture, and mapping failures onto stable error codes, is the
//!   reader's job.
//! - **Error-aware**: all operations return [`Result<T>`] with a
//!   [`HardwareError`] describing what the driver reported.
//!
//! # Example
//!
//! ```
//! use fingerprint_core::CaptureMode;
//! use fingerprint_hardware::mock::MockScanner;
//! use fingerprint_hardware::{AcquisitionConfig, FingerprintScanner};
//! use fingerprint_core::constants::{MAX_TEMPLATE_LEN, MIN_MINUTIAE};
//!
//! let (mut scanner, handle) = MockScanner::new();
//! handle.queue_frame(vec![0x55; 64], 8, 8, Some(2)).unwrap();
//!
//! scanner.open().unwrap();
//! let image = scanner.capture_image(&AcquisitionConfig::default()).unwrap().unwrap();
//! let spec = CaptureMode::Ansi378.template_spec().unwrap();
//! let template = scanner
//!     .create_template(&image, spec, MIN_MINUTIAE, MAX_TEMPLATE_LEN)
//!     .unwrap();
//! assert!(!template.is_empty());
//! ```

pub mod codec;
pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::AnyScanner;
pub use error::{HardwareError, Result};
pub use traits::{FingerprintScanner, ScannerFactory};
pub use types::{AcquisitionConfig, DeviceInfo, RawImage};
