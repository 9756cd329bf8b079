//! Reader configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all) is a
//! valid configuration.

use fingerprint_core::constants::{
    DEFAULT_AREA_SCORE, DEFAULT_DEVICE_TIMEOUT_MS, DEFAULT_LFD_LEVEL, DEFAULT_MODE,
    DEFAULT_NFIQ_LEVEL, DEFAULT_WORKER_QUEUE, MAX_TEMPLATE_LEN, MIN_MINUTIAE,
};
use fingerprint_core::{CaptureMode, CaptureRequest, DeviceDescriptor};
use fingerprint_hardware::AcquisitionConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::adapter::CaptureConfig;

/// Top-level reader configuration.
///
/// # Examples
///
/// ```
/// use fingerprint_reader::ReaderConfig;
///
/// let config = ReaderConfig::from_json(r#"{ "capture": { "area_score": 60 } }"#).unwrap();
/// assert_eq!(config.capture.area_score, 60);
/// assert_eq!(config.default_mode, "iso19794_2");
/// assert_eq!(config.devices.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Acquisition and encoder parameters.
    pub capture: CaptureDefaults,

    /// Mode used when a capture call names none.
    pub default_mode: String,

    /// Entries reported by `list_devices`.
    pub devices: Vec<DeviceDescriptor>,

    /// Depth of the device worker job queue.
    pub worker_queue: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            capture: CaptureDefaults::default(),
            default_mode: DEFAULT_MODE.to_string(),
            devices: vec![DeviceDescriptor::default()],
            worker_queue: DEFAULT_WORKER_QUEUE,
        }
    }
}

impl ReaderConfig {
    /// Parse a JSON document, filling absent fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Default mode, parsed as leniently as a caller-supplied name.
    pub(crate) fn default_capture_mode(&self) -> CaptureMode {
        CaptureMode::from(self.default_mode.as_str())
    }

    /// Job queue depth, never zero.
    pub(crate) fn queue_depth(&self) -> usize {
        self.worker_queue.max(1)
    }
}

/// Acquisition hints and encoder limits applied to every capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureDefaults {
    pub nfiq_level: u8,
    pub lfd_level: u8,
    pub area_score: u8,

    /// Device-side timeout when the caller supplies none.
    pub device_timeout_ms: u64,

    pub min_minutiae: u32,
    pub max_template_len: usize,
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            nfiq_level: DEFAULT_NFIQ_LEVEL,
            lfd_level: DEFAULT_LFD_LEVEL,
            area_score: DEFAULT_AREA_SCORE,
            device_timeout_ms: DEFAULT_DEVICE_TIMEOUT_MS,
            min_minutiae: MIN_MINUTIAE,
            max_template_len: MAX_TEMPLATE_LEN,
        }
    }
}

impl CaptureDefaults {
    /// Resolve the adapter configuration for one request.
    ///
    /// The caller's timeout doubles as the device-side acquisition timeout.
    pub fn capture_config(&self, request: &CaptureRequest) -> CaptureConfig {
        let device_timeout = request
            .timeout()
            .unwrap_or(Duration::from_millis(self.device_timeout_ms));

        CaptureConfig {
            mode: request.mode,
            template: request.mode.template_spec(),
            acquisition: AcquisitionConfig::default()
                .with_nfiq_level(self.nfiq_level)
                .with_lfd_level(self.lfd_level)
                .with_area_score(self.area_score)
                .with_timeout(device_timeout),
            min_minutiae: self.min_minutiae,
            max_template_len: self.max_template_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fingerprint_core::TemplateFormat;

    #[test]
    fn test_empty_object_is_default() {
        let config = ReaderConfig::from_json("{}").unwrap();
        assert_eq!(config, ReaderConfig::default());
        assert_eq!(config.devices[0].id, "Miaxis-USB-0");
    }

    #[test]
    fn test_partial_override() {
        let config = ReaderConfig::from_json(
            r#"{
                "default_mode": "ansi378",
                "worker_queue": 0,
                "devices": [{ "id": "bench-1", "name": "Bench", "type": "USB" }]
            }"#,
        )
        .unwrap();

        assert_eq!(config.default_capture_mode(), CaptureMode::Ansi378);
        assert_eq!(config.queue_depth(), 1);
        assert_eq!(config.devices[0].kind, "USB");
        assert_eq!(config.capture, CaptureDefaults::default());
    }

    #[test]
    fn test_capture_config_uses_caller_timeout() {
        let defaults = CaptureDefaults::default();
        let request = CaptureRequest::new(CaptureMode::Ansi378).with_timeout_ms(5000);

        let config = defaults.capture_config(&request);
        assert_eq!(config.acquisition.timeout, Duration::from_millis(5000));
        assert_eq!(config.acquisition.area_score, 45);
        let spec = config.template.unwrap();
        assert_eq!(spec.format, TemplateFormat::Ansi378);
        assert!(spec.extended);
    }

    #[test]
    fn test_capture_config_falls_back_to_device_timeout() {
        let defaults = CaptureDefaults::default();
        let config = defaults.capture_config(&CaptureRequest::new(CaptureMode::Image));

        assert_eq!(config.acquisition.timeout, Duration::from_secs(10));
        assert!(config.template.is_none());
        assert_eq!(config.min_minutiae, 18);
        assert_eq!(config.max_template_len, 4096);
    }
}
