//! Reader session facade.
//!
//! [`FingerprintReader`] is the explicitly owned session the application layer
//! talks to. It wires one [`StatusEmitter`], one [`DeviceHandle`] and one
//! [`CaptureOrchestrator`] together and exposes the method surface:
//! open, close, capture, cancel, device listing and the status stream.
//!
//! # Examples
//!
//! ```no_run
//! use fingerprint_hardware::mock::MockScanner;
//! use fingerprint_reader::{FingerprintReader, ReaderConfig};
//!
//! # async fn demo() -> fingerprint_core::Result<()> {
//! let (_scanner, mock) = MockScanner::new();
//! mock.queue_frame(vec![0x40; 256], 16, 16, Some(2)).unwrap();
//!
//! let reader = FingerprintReader::builder(mock.factory())
//!     .config(ReaderConfig::default())
//!     .build()?;
//! let mut status = reader.subscribe();
//!
//! reader.open(None).await?;
//! let captured = reader.capture("ansi378", Some(5000)).await?;
//! println!("{} bytes, quality {:?}", captured.payload.len(), captured.quality);
//! reader.close().await;
//!
//! while let Some(event) = status.try_recv() {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

use fingerprint_core::{
    CaptureMode, CaptureRequest, Captured, DeviceDescriptor, Result, StatusEvent,
};
use fingerprint_hardware::{FingerprintScanner, ScannerFactory};
use std::sync::Arc;
use tracing::warn;

use crate::adapter::{CaptureAdapter, ScannerPipeline};
use crate::config::ReaderConfig;
use crate::device::{DeviceHandle, DeviceState};
use crate::emitter::{StatusEmitter, StatusStream};
use crate::orchestrator::{CaptureOrchestrator, CaptureTicket};

/// Hook for the platform permission flow.
///
/// Consulted before every `open`. Return `USB_NO_PERMISSION` or
/// `NO_USB_DEVICE` to veto; the error reaches the caller unchanged.
pub trait PermissionGate: Send + Sync + 'static {
    /// # Errors
    ///
    /// Returns the reason the device may not be opened.
    fn check(&self, device_id: Option<&str>) -> Result<()>;
}

/// Gate that never vetoes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn check(&self, _device_id: Option<&str>) -> Result<()> {
        Ok(())
    }
}

impl<F> PermissionGate for F
where
    F: Fn(Option<&str>) -> Result<()> + Send + Sync + 'static,
{
    fn check(&self, device_id: Option<&str>) -> Result<()> {
        self(device_id)
    }
}

/// Builder for [`FingerprintReader`].
pub struct ReaderBuilder<F: ScannerFactory> {
    factory: F,
    config: ReaderConfig,
    adapter: Arc<dyn CaptureAdapter<F::Scanner>>,
    gate: Box<dyn PermissionGate>,
}

impl<F: ScannerFactory> ReaderBuilder<F> {
    /// Use `config` instead of the defaults.
    pub fn config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the standard acquisition pipeline.
    pub fn adapter(mut self, adapter: impl CaptureAdapter<F::Scanner>) -> Self {
        self.adapter = Arc::new(adapter);
        self
    }

    /// Install a permission gate consulted before `open`.
    pub fn permission_gate(mut self, gate: impl PermissionGate) -> Self {
        self.gate = Box::new(gate);
        self
    }

    /// Start the notification task and the device worker.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `NO_READER` if the device worker cannot be started.
    pub fn build(self) -> Result<FingerprintReader<F::Scanner>> {
        let emitter = StatusEmitter::spawn();
        let device = DeviceHandle::spawn(self.factory, emitter.clone(), self.config.queue_depth())?;
        let orchestrator = CaptureOrchestrator::new(
            device,
            self.adapter,
            self.config.capture.clone(),
            emitter.clone(),
        );

        Ok(FingerprintReader {
            orchestrator,
            emitter,
            gate: self.gate,
            config: self.config,
        })
    }
}

/// One fingerprint reader session.
pub struct FingerprintReader<S: FingerprintScanner> {
    orchestrator: CaptureOrchestrator<S>,
    emitter: StatusEmitter,
    gate: Box<dyn PermissionGate>,
    config: ReaderConfig,
}

impl<S: FingerprintScanner> FingerprintReader<S> {
    /// Start building a reader around `factory`.
    pub fn builder<F>(factory: F) -> ReaderBuilder<F>
    where
        F: ScannerFactory<Scanner = S>,
    {
        ReaderBuilder {
            factory,
            config: ReaderConfig::default(),
            adapter: Arc::new(ScannerPipeline),
            gate: Box::new(AllowAll),
        }
    }

    /// Open the device.
    ///
    /// Returns `true` once the device is open, including when it already was.
    ///
    /// # Errors
    ///
    /// - Permission errors from the gate, unchanged
    /// - `OPEN_FAIL` / `OPEN_EX` from the device
    pub async fn open(&self, device_id: Option<&str>) -> Result<bool> {
        if let Err(e) = self.gate.check(device_id) {
            warn!(device_id = ?device_id, code = e.code(), "Open vetoed");
            self.emitter.publish(StatusEvent::error(e.detail.clone()));
            return Err(e);
        }

        self.orchestrator
            .device()
            .open(device_id.map(str::to_string))
            .await?;
        Ok(true)
    }

    /// Cancel any capture in flight and release the device. Never fails.
    pub async fn close(&self) {
        self.orchestrator.close().await;
    }

    /// Capture one sample and wait for the outcome.
    ///
    /// `mode` names are matched case-insensitively; unknown names fall back to
    /// ISO 19794-2. A missing or non-positive `timeout_ms` waits indefinitely.
    ///
    /// # Errors
    ///
    /// Returns the attempt's failure: `NOT_OPENED`, an adapter error,
    /// `TIMEOUT` or `CANCELLED`.
    pub async fn capture(&self, mode: &str, timeout_ms: Option<i64>) -> Result<Captured> {
        let mut request = CaptureRequest::new(self.resolve_mode(mode));
        if let Some(timeout_ms) = timeout_ms {
            request = request.with_timeout_ms(timeout_ms);
        }
        self.start_capture(request).await.await
    }

    /// Start a capture and return its ticket without waiting for the outcome.
    pub async fn start_capture(&self, request: CaptureRequest) -> CaptureTicket {
        self.orchestrator.capture(request).await
    }

    /// Cancel the capture in flight, if any. Always announces `Idle("cancelled")`.
    pub fn cancel(&self) {
        self.orchestrator.cancel();
    }

    /// Devices this reader can open.
    pub fn list_devices(&self) -> Vec<DeviceDescriptor> {
        self.config.devices.clone()
    }

    /// Host platform description.
    pub fn platform_version(&self) -> String {
        format!(
            "{} {} (fingerprint-reader {})",
            std::env::consts::OS,
            std::env::consts::ARCH,
            fingerprint_core::VERSION
        )
    }

    /// Subscribe to status events, replacing the previous subscriber.
    pub fn subscribe(&self) -> StatusStream {
        self.emitter.subscribe()
    }

    /// Drop the current subscriber.
    pub fn unsubscribe(&self) {
        self.emitter.unsubscribe();
    }

    /// Current device state.
    pub fn device_state(&self) -> DeviceState {
        self.orchestrator.device_state()
    }

    /// Whether a capture is in flight.
    pub fn is_capturing(&self) -> bool {
        self.orchestrator.is_capturing()
    }

    /// Active configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Mode for a caller-supplied name; empty means the configured default.
    pub(crate) fn resolve_mode(&self, name: &str) -> CaptureMode {
        if name.trim().is_empty() {
            return self.config.default_capture_mode();
        }
        CaptureMode::recognize(name).unwrap_or_else(|| {
            let fallback = CaptureMode::from(name);
            warn!(mode = name, fallback = %fallback, "Unrecognized capture mode");
            fallback
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fingerprint_core::{ErrorKind, ReaderError, ReaderState};
    use fingerprint_hardware::mock::{MockScanner, MockScannerHandle};
    use rstest::rstest;

    fn reader() -> (FingerprintReader<MockScanner>, MockScannerHandle) {
        let (_scanner, mock) = MockScanner::new();
        let reader = FingerprintReader::builder(mock.factory()).build().unwrap();
        (reader, mock)
    }

    #[rstest]
    #[case("image", CaptureMode::Image)]
    #[case("ISO19794_2", CaptureMode::Iso19794_2)]
    #[case("ansi378", CaptureMode::Ansi378)]
    #[case("miaxis", CaptureMode::Miaxis)]
    #[case("wsq", CaptureMode::Iso19794_2)]
    #[case("", CaptureMode::Iso19794_2)]
    #[tokio::test]
    async fn test_resolve_mode(#[case] name: &str, #[case] expected: CaptureMode) {
        let (reader, _mock) = reader();
        assert_eq!(reader.resolve_mode(name), expected);
    }

    #[tokio::test]
    async fn test_empty_mode_uses_configured_default() {
        let (_scanner, mock) = MockScanner::new();
        let config = ReaderConfig {
            default_mode: "miaxis".to_string(),
            ..ReaderConfig::default()
        };
        let reader = FingerprintReader::builder(mock.factory())
            .config(config)
            .build()
            .unwrap();
        assert_eq!(reader.resolve_mode("  "), CaptureMode::Miaxis);
    }

    #[tokio::test]
    async fn test_gate_veto_passes_code_through() {
        let (_scanner, mock) = MockScanner::new();
        let reader = FingerprintReader::builder(mock.factory())
            .permission_gate(|_id: Option<&str>| -> Result<()> {
                Err(ReaderError::usb_no_permission("User denied USB permission"))
            })
            .build()
            .unwrap();
        let mut status = reader.subscribe();

        let error = reader.open(Some("Miaxis-USB-0")).await.unwrap_err();
        assert_eq!(error.code(), "USB_NO_PERMISSION");
        assert_eq!(mock.open_count(), 0);

        let event = status.recv().await.unwrap();
        assert_eq!(event.state, ReaderState::Error);
        assert_eq!(event.message(), Some("User denied USB permission"));
    }

    #[tokio::test]
    async fn test_gate_missing_device() {
        let (_scanner, mock) = MockScanner::new();
        let reader = FingerprintReader::builder(mock.factory())
            .permission_gate(|id: Option<&str>| match id {
                Some("Miaxis-USB-0") | None => Ok(()),
                Some(other) => Err(ReaderError::no_usb_device(format!("No USB device {other}"))),
            })
            .build()
            .unwrap();

        assert_eq!(
            reader.open(Some("other")).await.unwrap_err().kind,
            ErrorKind::NoUsbDevice
        );
        assert!(reader.open(None).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_devices_and_platform() {
        let (reader, _mock) = reader();
        let devices = reader.list_devices();
        assert_eq!(devices, vec![DeviceDescriptor::default()]);
        assert!(reader.platform_version().contains(std::env::consts::OS));
    }

    #[tokio::test]
    async fn test_close_reports_state() {
        let (reader, mock) = reader();
        reader.open(None).await.unwrap();
        assert_eq!(reader.device_state(), DeviceState::Open);

        reader.close().await;
        assert_eq!(reader.device_state(), DeviceState::Closed);
        assert!(!mock.is_open());
    }
}
