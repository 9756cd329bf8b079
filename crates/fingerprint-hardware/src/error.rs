//! Error types for scanner operations.
//!
//! These errors describe what went wrong at the vendor boundary. The reader
//! maps them onto stable [`ErrorKind`](fingerprint_core::ErrorKind) codes
//! depending on which step of the pipeline produced them.

/// Result type alias for scanner operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors reported by a fingerprint scanner or its driver.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The sensor is unplugged or its handle is no longer valid.
    #[error("{device} is not connected")]
    Disconnected { device: String },

    /// The driver refused to open the device and returned a status code.
    #[error("openDevice() = {code}")]
    OpenRejected { code: i32 },

    /// The driver could not be brought up at all.
    #[error("Driver initialization failed: {message}")]
    InitializationFailed { message: String },

    /// A USB transfer to or from the sensor failed.
    #[error("USB transfer failed: {message}")]
    Transfer { message: String },

    /// The scanner has no implementation of this primitive.
    #[error("{operation} is not supported by this scanner")]
    Unsupported { operation: String },

    /// A frame buffer does not match its declared geometry.
    #[error("Invalid frame: {message}")]
    InvalidFrame { message: String },

    /// Image acquisition reported failure.
    #[error("Image capture failed: {message}")]
    ImageCapture { message: String },

    /// Template encoder returned a non-zero status or empty output.
    #[error("rc={code} len={length}")]
    Template { code: i32, length: usize },

    /// Image conversion failed.
    #[error("Image encoding error: {0}")]
    ImageEncoding(#[from] image::ImageError),
}

impl HardwareError {
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn open_rejected(code: i32) -> Self {
        Self::OpenRejected { code }
    }

    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    pub fn transfer(message: impl Into<String>) -> Self {
        Self::Transfer {
            message: message.into(),
        }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame {
            message: message.into(),
        }
    }

    pub fn image_capture(message: impl Into<String>) -> Self {
        Self::ImageCapture {
            message: message.into(),
        }
    }

    /// Encoder status `code` with `length` bytes of output.
    pub fn template(code: i32, length: usize) -> Self {
        Self::Template { code, length }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(HardwareError::disconnected("FPR-220"), "FPR-220 is not connected")]
    #[case(HardwareError::open_rejected(-3), "openDevice() = -3")]
    #[case(HardwareError::template(-7, 0), "rc=-7 len=0")]
    #[case(HardwareError::transfer("stall"), "USB transfer failed: stall")]
    #[case(HardwareError::unsupported("nfiq"), "nfiq is not supported by this scanner")]
    fn test_error_messages(#[case] error: HardwareError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_constructors_pick_variants() {
        assert!(matches!(
            HardwareError::image_capture("getImage() not success"),
            HardwareError::ImageCapture { .. }
        ));
        assert!(matches!(
            HardwareError::invalid_frame("short"),
            HardwareError::InvalidFrame { .. }
        ));
    }
}
