//! Capture adapter: one blocking acquisition, start to finish.
//!
//! The orchestrator treats acquisition as an opaque blocking call that either
//! yields a payload (plus optional quality) or fails with a stable error kind.
//! [`ScannerPipeline`] is the standard composition of the vendor primitives:
//!
//! 1. acquire a frame (`GET_IMAGE_FAIL` on error, `GET_IMAGE_NULL` on no data)
//! 2. score it (failures only drop the quality)
//! 3. encode it, as a PNG in image mode (`CAPTURE_EX` on failure) or as a
//!    template otherwise (`MAKE_TEMPLATE_FAIL` on failure or empty output)

use fingerprint_core::{CaptureMode, ErrorKind, ReaderError, TemplateSpec};
use fingerprint_hardware::{AcquisitionConfig, FingerprintScanner, HardwareError};
use tracing::debug;

/// Everything the adapter needs for one capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    pub mode: CaptureMode,

    /// Encoder parameters, `None` for raw image passthrough.
    pub template: Option<TemplateSpec>,

    /// Hints forwarded to the sensor.
    pub acquisition: AcquisitionConfig,

    pub min_minutiae: u32,
    pub max_template_len: usize,
}

/// Successful acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquisition {
    pub payload: Vec<u8>,
    pub quality: Option<i32>,
}

/// Performs one blocking acquisition against an open scanner.
///
/// Called only from the device worker. Panics are caught by the caller and
/// reported as `CAPTURE_EX`.
pub trait CaptureAdapter<S: FingerprintScanner>: Send + Sync + 'static {
    /// Acquire and encode one sample.
    ///
    /// # Errors
    ///
    /// Returns a [`ReaderError`] whose kind identifies the failing step.
    fn acquire(&self, scanner: &mut S, config: &CaptureConfig) -> Result<Acquisition, ReaderError>;
}

/// The standard acquire, score, encode sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScannerPipeline;

impl<S: FingerprintScanner> CaptureAdapter<S> for ScannerPipeline {
    fn acquire(&self, scanner: &mut S, config: &CaptureConfig) -> Result<Acquisition, ReaderError> {
        let image = scanner
            .capture_image(&config.acquisition)
            .map_err(image_error)?
            .ok_or_else(|| ReaderError::new(ErrorKind::GetImageNull, "Image data is null"))?;

        let quality = match scanner.nfiq(&image) {
            Ok(quality) => Some(quality),
            Err(e) => {
                debug!(error = %e, "Quality score unavailable");
                None
            }
        };

        let payload = match config.template {
            None => scanner
                .encode_image(&image)
                .map_err(|e| ReaderError::capture_exception(e.to_string()))?,
            Some(spec) => {
                let template = scanner
                    .create_template(&image, spec, config.min_minutiae, config.max_template_len)
                    .map_err(|e| ReaderError::new(ErrorKind::MakeTemplateFailed, e.to_string()))?;
                if template.is_empty() {
                    return Err(ReaderError::new(
                        ErrorKind::MakeTemplateFailed,
                        HardwareError::template(0, 0).to_string(),
                    ));
                }
                template
            }
        };

        debug!(
            mode = %config.mode,
            bytes = payload.len(),
            quality = ?quality,
            "Acquisition complete"
        );

        Ok(Acquisition { payload, quality })
    }
}

/// A lost device means the session is gone, not just this frame.
fn image_error(error: HardwareError) -> ReaderError {
    match error {
        HardwareError::Disconnected { .. } => ReaderError::new(ErrorKind::NoApi, error.to_string()),
        other => ReaderError::new(ErrorKind::GetImageFailed, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptureDefaults;
    use fingerprint_core::{CaptureRequest, TemplateFormat};
    use fingerprint_hardware::RawImage;
    use fingerprint_hardware::mock::{MockScanner, MockScannerHandle, mock_template};
    use rstest::rstest;

    fn open_scanner() -> (MockScanner, MockScannerHandle) {
        let (mut scanner, handle) = MockScanner::new();
        scanner.open().unwrap();
        (scanner, handle)
    }

    fn config(mode: CaptureMode) -> CaptureConfig {
        CaptureDefaults::default().capture_config(&CaptureRequest::new(mode))
    }

    #[rstest]
    #[case(CaptureMode::Iso19794_2, TemplateFormat::Iso19794_2, true)]
    #[case(CaptureMode::Ansi378, TemplateFormat::Ansi378, true)]
    #[case(CaptureMode::Miaxis, TemplateFormat::Miaxis, false)]
    fn test_template_modes(
        #[case] mode: CaptureMode,
        #[case] format: TemplateFormat,
        #[case] extended: bool,
    ) {
        let (mut scanner, handle) = open_scanner();
        handle.queue_frame(vec![0x33; 64], 8, 8, Some(2)).unwrap();

        let acquisition = ScannerPipeline.acquire(&mut scanner, &config(mode)).unwrap();

        let spec = TemplateSpec::new(format, extended);
        assert_eq!(handle.last_template_spec(), Some(spec));
        let image = RawImage::new(vec![0x33; 64], 8, 8).unwrap();
        assert_eq!(acquisition.payload, mock_template(&image, spec, 4096));
        assert_eq!(acquisition.quality, Some(2));
    }

    #[test]
    fn test_image_mode_returns_png() {
        let (mut scanner, handle) = open_scanner();
        handle.queue_frame(vec![0xaa; 16], 4, 4, Some(1)).unwrap();

        let acquisition = ScannerPipeline
            .acquire(&mut scanner, &config(CaptureMode::Image))
            .unwrap();

        assert_eq!(&acquisition.payload[1..4], b"PNG");
        assert_eq!(handle.last_template_spec(), None);
    }

    #[test]
    fn test_missing_quality_is_not_fatal() {
        let (mut scanner, handle) = open_scanner();
        handle.queue_frame(vec![1; 16], 4, 4, None).unwrap();

        let acquisition = ScannerPipeline
            .acquire(&mut scanner, &config(CaptureMode::Miaxis))
            .unwrap();
        assert_eq!(acquisition.quality, None);
    }

    #[test]
    fn test_acquisition_failure_kinds() {
        let (mut scanner, handle) = open_scanner();
        let config = config(CaptureMode::Iso19794_2);

        handle.queue_failure("no finger");
        let error = ScannerPipeline.acquire(&mut scanner, &config).unwrap_err();
        assert_eq!(error.kind, ErrorKind::GetImageFailed);

        handle.queue_empty_frame();
        let error = ScannerPipeline.acquire(&mut scanner, &config).unwrap_err();
        assert_eq!(error.kind, ErrorKind::GetImageNull);
    }

    #[test]
    fn test_template_failure_kinds() {
        let (mut scanner, handle) = open_scanner();
        let config = config(CaptureMode::Ansi378);

        handle.fail_templates(-7);
        handle.queue_frame(vec![1; 16], 4, 4, Some(1)).unwrap();
        let error = ScannerPipeline.acquire(&mut scanner, &config).unwrap_err();
        assert_eq!(error.kind, ErrorKind::MakeTemplateFailed);
        assert!(error.detail.contains("rc=-7"));

        handle.empty_templates();
        handle.queue_frame(vec![1; 16], 4, 4, Some(1)).unwrap();
        let error = ScannerPipeline.acquire(&mut scanner, &config).unwrap_err();
        assert_eq!(error.kind, ErrorKind::MakeTemplateFailed);
        assert!(error.detail.contains("len=0"));
    }

    #[test]
    fn test_disconnected_scanner_reports_no_api() {
        let (mut scanner, handle) = MockScanner::new();
        handle.queue_empty_frame();

        let error = ScannerPipeline
            .acquire(&mut scanner, &config(CaptureMode::Miaxis))
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::NoApi);
    }

    #[test]
    fn test_hints_reach_the_sensor() {
        let (mut scanner, handle) = open_scanner();
        handle.queue_empty_frame();
        let config = config(CaptureMode::Image);

        let _ = ScannerPipeline.acquire(&mut scanner, &config);
        assert_eq!(handle.last_config(), Some(config.acquisition));
    }
}
