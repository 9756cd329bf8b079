//! Common types shared across scanner implementations.
//!
//! This module defines the values that cross the vendor boundary: device
//! metadata, the acquisition hints handed to the sensor and the raw frame
//! it returns.

use chrono::{DateTime, Utc};
use fingerprint_core::constants::{
    DEFAULT_AREA_SCORE, DEFAULT_DEVICE_TIMEOUT_MS, DEFAULT_LFD_LEVEL, DEFAULT_NFIQ_LEVEL,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{HardwareError, Result};

/// What a scanner reports about itself once its driver handle exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Product name as the driver reports it, e.g. `"FPR-220"`.
    pub name: String,

    pub model: String,

    /// Sensor resolution in dots per inch.
    pub resolution_dpi: u32,

    pub serial_number: Option<String>,
    pub firmware_version: Option<String>,
}

impl DeviceInfo {
    /// Info for a 500 dpi sensor with no serial or firmware reported.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            resolution_dpi: 500,
            serial_number: None,
            firmware_version: None,
        }
    }

    pub fn with_resolution_dpi(mut self, resolution_dpi: u32) -> Self {
        self.resolution_dpi = resolution_dpi;
        self
    }

    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    pub fn with_firmware_version(mut self, firmware_version: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware_version.into());
        self
    }
}

/// Hints passed to the sensor for one acquisition.
///
/// The sensor applies these itself; the reader does not enforce them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// NFIQ gate applied by the sensor (0 disables it).
    pub nfiq_level: u8,

    /// Live finger detection level (0 disables it).
    pub lfd_level: u8,

    /// Minimum finger contact area score.
    pub area_score: u8,

    /// How long the sensor itself waits for a finger.
    pub timeout: Duration,
}

impl AcquisitionConfig {
    /// Set the NFIQ gate.
    pub fn with_nfiq_level(mut self, nfiq_level: u8) -> Self {
        self.nfiq_level = nfiq_level;
        self
    }

    /// Set the live finger detection level.
    pub fn with_lfd_level(mut self, lfd_level: u8) -> Self {
        self.lfd_level = lfd_level;
        self
    }

    /// Set the contact area score.
    pub fn with_area_score(mut self, area_score: u8) -> Self {
        self.area_score = area_score;
        self
    }

    /// Set the sensor-side timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            nfiq_level: DEFAULT_NFIQ_LEVEL,
            lfd_level: DEFAULT_LFD_LEVEL,
            area_score: DEFAULT_AREA_SCORE,
            timeout: Duration::from_millis(DEFAULT_DEVICE_TIMEOUT_MS),
        }
    }
}

/// An 8-bit grayscale frame straight from the sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    /// Row-major pixel data, one byte per pixel.
    pub data: Vec<u8>,

    pub width: u32,

    pub height: u32,

    /// When the frame was acquired.
    pub captured_at: DateTime<Utc>,
}

impl RawImage {
    /// Wrap a frame, checking that the buffer matches the dimensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are zero or `data.len()` is not
    /// `width * height`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fingerprint_hardware::RawImage;
    ///
    /// let image = RawImage::new(vec![0; 6], 3, 2).unwrap();
    /// assert_eq!(image.pixel_count(), 6);
    ///
    /// assert!(RawImage::new(vec![0; 5], 3, 2).is_err());
    /// ```
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(HardwareError::invalid_frame(format!(
                "Image dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }

        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(HardwareError::invalid_frame(format!(
                "Image buffer must be {} bytes for {}x{}, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            captured_at: Utc::now(),
        })
    }

    /// Number of pixels in the frame.
    pub fn pixel_count(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info_defaults_to_500_dpi() {
        let info = DeviceInfo::new("FPR-220", "Miaxis USB Fingerprint Reader")
            .with_serial_number("MX2201870")
            .with_firmware_version("v2.0.1");

        assert_eq!(info.resolution_dpi, 500);
        assert_eq!(info.serial_number.as_deref(), Some("MX2201870"));
        assert_eq!(
            info.with_resolution_dpi(1000).resolution_dpi,
            1000
        );
    }

    #[test]
    fn test_acquisition_config_defaults() {
        let config = AcquisitionConfig::default();
        assert_eq!(config.nfiq_level, 0);
        assert_eq!(config.lfd_level, 0);
        assert_eq!(config.area_score, 45);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_acquisition_config_builder() {
        let config = AcquisitionConfig::default()
            .with_area_score(60)
            .with_timeout(Duration::from_millis(500));
        assert_eq!(config.area_score, 60);
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_raw_image_rejects_zero_dimensions() {
        assert!(RawImage::new(vec![], 0, 10).is_err());
    }

    #[test]
    fn test_device_info_json_shape() {
        let info = DeviceInfo::new("FPR-220", "Miaxis");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["resolution_dpi"], 500);
        assert_eq!(json["serial_number"], serde_json::Value::Null);
    }
}
