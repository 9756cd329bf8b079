use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable error identifiers surfaced to the application layer.
///
/// The string form returned by [`ErrorKind::code`] is part of the external
/// contract and must never change for an existing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorKind {
    // Precondition errors
    #[serde(rename = "NOT_OPENED")]
    NotOpened,
    #[serde(rename = "NO_API")]
    NoApi,
    #[serde(rename = "NO_READER")]
    NoReader,

    // Device open errors
    #[serde(rename = "OPEN_FAIL")]
    OpenFailed,
    #[serde(rename = "OPEN_EX")]
    OpenException,

    // Adapter errors
    #[serde(rename = "GET_IMAGE_FAIL")]
    GetImageFailed,
    #[serde(rename = "GET_IMAGE_NULL")]
    GetImageNull,
    #[serde(rename = "MAKE_TEMPLATE_FAIL")]
    MakeTemplateFailed,
    #[serde(rename = "CAPTURE_EX")]
    CaptureException,

    // Terminal outcomes that are not adapter errors
    #[serde(rename = "TIMEOUT")]
    Timeout,
    #[serde(rename = "CANCELLED")]
    Cancelled,

    // Passed through from the permission flow
    #[serde(rename = "USB_NO_PERMISSION")]
    UsbNoPermission,
    #[serde(rename = "NO_USB_DEVICE")]
    NoUsbDevice,

    // Method-call surface
    #[serde(rename = "NOT_IMPLEMENTED")]
    NotImplemented,
    #[serde(rename = "BAD_ARGS")]
    BadArguments,
}

/// Coarse classification of an [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Detected before any work is dispatched. Never retried.
    Precondition,
    /// Reported by the vendor collaborator with a stable code.
    Adapter,
    /// The hardware never answered in time.
    Timeout,
    /// Caller-initiated; reported through an idle status, not an error status.
    Cancellation,
    /// A fault caught at the worker boundary.
    Exception,
    /// Originates in the platform permission flow.
    Permission,
}

impl ErrorKind {
    /// All known kinds, in declaration order.
    pub const ALL: [ErrorKind; 15] = [
        Self::NotOpened,
        Self::NoApi,
        Self::NoReader,
        Self::OpenFailed,
        Self::OpenException,
        Self::GetImageFailed,
        Self::GetImageNull,
        Self::MakeTemplateFailed,
        Self::CaptureException,
        Self::Timeout,
        Self::Cancelled,
        Self::UsbNoPermission,
        Self::NoUsbDevice,
        Self::NotImplemented,
        Self::BadArguments,
    ];

    /// Stable string identifier for this kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotOpened => "NOT_OPENED",
            Self::NoApi => "NO_API",
            Self::NoReader => "NO_READER",
            Self::OpenFailed => "OPEN_FAIL",
            Self::OpenException => "OPEN_EX",
            Self::GetImageFailed => "GET_IMAGE_FAIL",
            Self::GetImageNull => "GET_IMAGE_NULL",
            Self::MakeTemplateFailed => "MAKE_TEMPLATE_FAIL",
            Self::CaptureException => "CAPTURE_EX",
            Self::Timeout => "TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::UsbNoPermission => "USB_NO_PERMISSION",
            Self::NoUsbDevice => "NO_USB_DEVICE",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::BadArguments => "BAD_ARGS",
        }
    }

    /// Classify this kind.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotOpened
            | Self::NoApi
            | Self::NoReader
            | Self::NotImplemented
            | Self::BadArguments => ErrorCategory::Precondition,
            Self::OpenFailed
            | Self::GetImageFailed
            | Self::GetImageNull
            | Self::MakeTemplateFailed => ErrorCategory::Adapter,
            Self::OpenException | Self::CaptureException => ErrorCategory::Exception,
            Self::Timeout => ErrorCategory::Timeout,
            Self::Cancelled => ErrorCategory::Cancellation,
            Self::UsbNoPermission | Self::NoUsbDevice => ErrorCategory::Permission,
        }
    }

    /// Whether this outcome should be announced with an `Error` status.
    ///
    /// Cancellation is terminal but is reported through an `Idle` status.
    #[must_use]
    pub fn is_error_status(&self) -> bool {
        self.category() != ErrorCategory::Cancellation
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for ErrorKind {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.code() == s)
            .ok_or_else(|| ReaderError::new(Self::NotImplemented, format!("Unknown error code: {s}")))
    }
}

/// A failed outcome: a stable kind plus a human-readable detail.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {detail}")]
pub struct ReaderError {
    /// Stable classification.
    pub kind: ErrorKind,

    /// Free-form detail, typically the vendor message.
    pub detail: String,
}

impl ReaderError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Capture requested while the device is closed.
    pub fn not_opened() -> Self {
        Self::new(ErrorKind::NotOpened, "Device is not opened")
    }

    /// The device resource has not been initialized.
    pub fn no_api() -> Self {
        Self::new(ErrorKind::NoApi, "Device API is not initialized")
    }

    /// The reader session is gone.
    pub fn no_reader() -> Self {
        Self::new(ErrorKind::NoReader, "Reader is not available")
    }

    /// The caller-supplied timeout elapsed first.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::new(ErrorKind::Timeout, format!("timeout after {duration_ms}ms"))
    }

    /// The attempt was cancelled.
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, reason)
    }

    /// The platform refused access to the device.
    pub fn usb_no_permission(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::UsbNoPermission, reason)
    }

    /// The platform found no matching device.
    pub fn no_usb_device(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoUsbDevice, reason)
    }

    /// A fault escaped the capture adapter.
    pub fn capture_exception(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CaptureException, message)
    }

    /// Stable string identifier of the kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

pub type Result<T> = std::result::Result<T, ReaderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::NotOpened, "NOT_OPENED")]
    #[case(ErrorKind::OpenFailed, "OPEN_FAIL")]
    #[case(ErrorKind::OpenException, "OPEN_EX")]
    #[case(ErrorKind::NoApi, "NO_API")]
    #[case(ErrorKind::GetImageFailed, "GET_IMAGE_FAIL")]
    #[case(ErrorKind::GetImageNull, "GET_IMAGE_NULL")]
    #[case(ErrorKind::MakeTemplateFailed, "MAKE_TEMPLATE_FAIL")]
    #[case(ErrorKind::CaptureException, "CAPTURE_EX")]
    #[case(ErrorKind::Timeout, "TIMEOUT")]
    #[case(ErrorKind::NoReader, "NO_READER")]
    #[case(ErrorKind::UsbNoPermission, "USB_NO_PERMISSION")]
    #[case(ErrorKind::NoUsbDevice, "NO_USB_DEVICE")]
    fn test_stable_codes(#[case] kind: ErrorKind, #[case] code: &str) {
        assert_eq!(kind.code(), code);
        assert_eq!(kind.to_string(), code);
        assert_eq!(code.parse::<ErrorKind>().unwrap(), kind);
    }

    #[test]
    fn test_serde_uses_stable_codes() {
        for kind in ErrorKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.code()));
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert!("BOGUS".parse::<ErrorKind>().is_err());
    }

    #[test]
    fn test_categories() {
        assert_eq!(ErrorKind::NotOpened.category(), ErrorCategory::Precondition);
        assert_eq!(ErrorKind::GetImageNull.category(), ErrorCategory::Adapter);
        assert_eq!(ErrorKind::Timeout.category(), ErrorCategory::Timeout);
        assert_eq!(ErrorKind::Cancelled.category(), ErrorCategory::Cancellation);
        assert_eq!(ErrorKind::CaptureException.category(), ErrorCategory::Exception);
        assert!(!ErrorKind::Cancelled.is_error_status());
        assert!(ErrorKind::Timeout.is_error_status());
    }

    #[test]
    fn test_reader_error_display() {
        let error = ReaderError::timeout(10);
        assert_eq!(error.code(), "TIMEOUT");
        assert_eq!(error.to_string(), "TIMEOUT: timeout after 10ms");
    }
}
