//! Enum wrapper for scanner dispatch.
//!
//! The reader is generic over its scanner type. When the scanner kind is
//! chosen at runtime (from configuration or a command line flag), wrap it in
//! [`AnyScanner`] to keep a single concrete type with static dispatch.
//!
//! # Examples
//!
//! ```
//! use fingerprint_hardware::devices::AnyScanner;
//! use fingerprint_hardware::mock::MockScanner;
//! use fingerprint_hardware::FingerprintScanner;
//!
//! let (scanner, _handle) = MockScanner::new();
//! let any_scanner = AnyScanner::Mock(scanner);
//! assert_eq!(any_scanner.device_info().name, "Mock Fingerprint Scanner");
//! ```

use fingerprint_core::TemplateSpec;

use crate::mock::MockScanner;
use crate::traits::FingerprintScanner;
use crate::{AcquisitionConfig, DeviceInfo, RawImage, Result};

/// Enum wrapper for scanner dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyScanner {
    /// Mock scanner for development and testing.
    Mock(MockScanner),
    // TODO: Add a Miaxis(MiaxisScanner) variant behind the `hardware-miaxis`
    // feature once the vendor FFI bindings exist.
}

impl FingerprintScanner for AnyScanner {
    fn open(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.open(),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.close(),
        }
    }

    fn capture_image(&mut self, config: &AcquisitionConfig) -> Result<Option<RawImage>> {
        match self {
            Self::Mock(device) => device.capture_image(config),
        }
    }

    fn nfiq(&mut self, image: &RawImage) -> Result<i32> {
        match self {
            Self::Mock(device) => device.nfiq(image),
        }
    }

    fn encode_image(&mut self, image: &RawImage) -> Result<Vec<u8>> {
        match self {
            Self::Mock(device) => device.encode_image(image),
        }
    }

    fn create_template(
        &mut self,
        image: &RawImage,
        spec: TemplateSpec,
        min_minutiae: u32,
        max_len: usize,
    ) -> Result<Vec<u8>> {
        match self {
            Self::Mock(device) => device.create_template(image, spec, min_minutiae, max_len),
        }
    }

    fn device_info(&self) -> DeviceInfo {
        match self {
            Self::Mock(device) => device.device_info(),
        }
    }
}

impl From<MockScanner> for AnyScanner {
    fn from(scanner: MockScanner) -> Self {
        Self::Mock(scanner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_scanner_mock_dispatch() {
        let (scanner, handle) = MockScanner::with_name("Dispatch".to_string());
        let mut any_scanner = AnyScanner::from(scanner);

        any_scanner.open().unwrap();
        assert!(handle.is_open());

        handle.queue_frame(vec![5; 9], 3, 3, Some(4)).unwrap();
        let image = any_scanner
            .capture_image(&AcquisitionConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(any_scanner.nfiq(&image).unwrap(), 4);

        any_scanner.close().unwrap();
        assert!(!handle.is_open());
        assert_eq!(any_scanner.device_info().name, "Dispatch");
    }
}
