use crate::{
    ReaderError,
    constants::{DEFAULT_DEVICE_ID, DEFAULT_DEVICE_NAME, DEFAULT_DEVICE_TYPE},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What a capture attempt should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureMode {
    /// Portable image of the raw frame, no template.
    #[serde(rename = "image")]
    Image,

    /// ISO/IEC 19794-2 minutiae template.
    #[serde(rename = "iso19794_2")]
    Iso19794_2,

    /// ANSI INCITS 378 minutiae template.
    #[serde(rename = "ansi378")]
    Ansi378,

    /// Vendor-proprietary template.
    #[serde(rename = "miaxis")]
    Miaxis,
}

impl CaptureMode {
    /// Wire name of the mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Iso19794_2 => "iso19794_2",
            Self::Ansi378 => "ansi378",
            Self::Miaxis => "miaxis",
        }
    }

    /// Strictly recognize a mode name (case-insensitive).
    ///
    /// Returns `None` for names this version does not know.
    #[must_use]
    pub fn recognize(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "image" => Some(Self::Image),
            "iso19794_2" => Some(Self::Iso19794_2),
            "ansi378" => Some(Self::Ansi378),
            "miaxis" => Some(Self::Miaxis),
            _ => None,
        }
    }

    /// Template encoding for this mode, or `None` for raw image passthrough.
    ///
    /// # Examples
    ///
    /// ```
    /// use fingerprint_core::{CaptureMode, TemplateFormat};
    ///
    /// let spec = CaptureMode::Ansi378.template_spec().unwrap();
    /// assert_eq!(spec.format, TemplateFormat::Ansi378);
    /// assert_eq!(spec.format.type_code(), 3);
    /// assert!(spec.extended);
    ///
    /// assert!(CaptureMode::Image.template_spec().is_none());
    /// ```
    #[must_use]
    pub fn template_spec(&self) -> Option<TemplateSpec> {
        match self {
            Self::Image => None,
            Self::Iso19794_2 => Some(TemplateSpec::new(TemplateFormat::Iso19794_2, true)),
            Self::Ansi378 => Some(TemplateSpec::new(TemplateFormat::Ansi378, true)),
            Self::Miaxis => Some(TemplateSpec::new(TemplateFormat::Miaxis, false)),
        }
    }
}

/// Lenient conversion: unknown names fall back to ISO 19794-2.
///
/// Forward-compatible callers may send modes this version does not know;
/// they get the default template path instead of an error.
impl From<&str> for CaptureMode {
    fn from(name: &str) -> Self {
        Self::recognize(name).unwrap_or(Self::Iso19794_2)
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Template formats understood by the vendor encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateFormat {
    Miaxis,
    Iso19794_2,
    Iso19794_2_2011,
    Ansi378,
    Ansi378_2009,
}

impl TemplateFormat {
    /// Numeric feature type expected by the encoder.
    #[must_use]
    pub fn type_code(&self) -> u8 {
        match self {
            Self::Miaxis => 0,
            Self::Iso19794_2 => 1,
            Self::Iso19794_2_2011 => 2,
            Self::Ansi378 => 3,
            Self::Ansi378_2009 => 4,
        }
    }

    /// Inverse of [`type_code`](Self::type_code).
    #[must_use]
    pub fn from_type_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Miaxis),
            1 => Some(Self::Iso19794_2),
            2 => Some(Self::Iso19794_2_2011),
            3 => Some(Self::Ansi378),
            4 => Some(Self::Ansi378_2009),
            _ => None,
        }
    }

    /// Whether the encoder accepts the extended-data flag for this format.
    #[must_use]
    pub fn supports_extended(&self) -> bool {
        matches!(self, Self::Iso19794_2 | Self::Iso19794_2_2011 | Self::Ansi378)
    }
}

/// Encoder parameters derived from a [`CaptureMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub format: TemplateFormat,
    pub extended: bool,
}

impl TemplateSpec {
    pub fn new(format: TemplateFormat, extended: bool) -> Self {
        Self { format, extended }
    }
}

/// One capture call: what to produce and how long the caller will wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub mode: CaptureMode,

    /// Caller timeout; `None` or zero means wait indefinitely.
    pub timeout_ms: Option<u32>,
}

impl CaptureRequest {
    /// Request without a timeout.
    pub fn new(mode: CaptureMode) -> Self {
        Self {
            mode,
            timeout_ms: None,
        }
    }

    /// Attach a caller timeout. Non-positive values disable it.
    ///
    /// ```
    /// use fingerprint_core::{CaptureMode, CaptureRequest};
    ///
    /// let request = CaptureRequest::new(CaptureMode::Miaxis).with_timeout_ms(-5);
    /// assert!(request.timeout().is_none());
    /// ```
    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = if timeout_ms <= 0 {
            None
        } else {
            Some(u32::try_from(timeout_ms).unwrap_or(u32::MAX))
        };
        self
    }

    /// Effective timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|ms| *ms > 0)
            .map(|ms| Duration::from_millis(u64::from(ms)))
    }
}

/// Successful capture payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Captured {
    /// Mode the payload was produced for.
    pub mode: CaptureMode,

    /// Encoded template or image bytes.
    pub payload: Vec<u8>,

    /// NFIQ score, when the scanner produced one.
    pub quality: Option<i32>,
}

/// Exactly one of these is produced per capture request.
pub type CaptureOutcome = std::result::Result<Captured, ReaderError>;

/// Reader state as seen by status subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderState {
    Idle,
    Capturing,
    Done,
    Error,
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

impl ReaderState {
    /// Whether this state ends a capture attempt.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Capturing)
    }
}

/// A single status notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub state: ReaderState,
    pub quality: Option<i32>,
    pub message: Option<String>,
}

impl StatusEvent {
    pub fn new(state: ReaderState, quality: Option<i32>, message: Option<String>) -> Self {
        Self {
            state,
            quality,
            message,
        }
    }

    pub fn idle(message: impl Into<String>) -> Self {
        Self::new(ReaderState::Idle, None, Some(message.into()))
    }

    pub fn capturing(message: impl Into<String>) -> Self {
        Self::new(ReaderState::Capturing, None, Some(message.into()))
    }

    pub fn done(quality: Option<i32>) -> Self {
        Self::new(ReaderState::Done, quality, None)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ReaderState::Error, None, Some(message.into()))
    }

    /// Message text, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Entry returned by `listDevices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
        }
    }
}

impl Default for DeviceDescriptor {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_ID, DEFAULT_DEVICE_NAME, DEFAULT_DEVICE_TYPE)
    }
}
