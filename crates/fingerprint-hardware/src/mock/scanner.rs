//! Mock fingerprint scanner implementation for testing and development.
//!
//! This module provides a simulated scanner whose behavior is scripted
//! through a [`MockScannerHandle`]. Every call blocks the calling thread the
//! way a vendor SDK would, which lets tests exercise timeouts and
//! cancellation against a scan that is genuinely still running.

use crate::{
    HardwareError, Result, codec,
    traits::FingerprintScanner,
    types::{AcquisitionConfig, DeviceInfo, RawImage},
};
use fingerprint_core::TemplateSpec;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Mock fingerprint scanner for testing and development.
///
/// Frames are returned in the order they were queued on the handle. When the
/// queue is empty, `capture_image` fails as if no finger was presented.
///
/// # Examples
///
/// ```
/// use fingerprint_hardware::mock::MockScanner;
/// use fingerprint_hardware::{AcquisitionConfig, FingerprintScanner};
///
/// let (mut scanner, handle) = MockScanner::new();
/// handle.queue_frame(vec![0x7f; 64], 8, 8, Some(1)).unwrap();
///
/// scanner.open().unwrap();
/// let image = scanner.capture_image(&AcquisitionConfig::default()).unwrap().unwrap();
/// assert_eq!(image.width, 8);
/// assert_eq!(scanner.nfiq(&image).unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct MockScanner {
    /// State shared with the handle.
    state: Arc<Mutex<MockState>>,

    /// Device name
    name: String,
}

impl MockScanner {
    /// Create a new mock scanner with the default name.
    ///
    /// Returns a tuple of (MockScanner, MockScannerHandle) where the handle
    /// scripts what the scanner does next.
    pub fn new() -> (Self, MockScannerHandle) {
        Self::with_name("Mock Fingerprint Scanner".to_string())
    }

    /// Create a new mock scanner with a custom name.
    pub fn with_name(name: String) -> (Self, MockScannerHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));

        let scanner = Self {
            state: Arc::clone(&state),
            name: name.clone(),
        };

        (scanner, MockScannerHandle { state, name })
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }
}

impl Default for MockScanner {
    fn default() -> Self {
        Self::new().0
    }
}

impl FingerprintScanner for MockScanner {
    fn open(&mut self) -> Result<()> {
        let mut state = self.state();
        state.open_count += 1;

        match &state.open_behavior {
            OpenBehavior::Accept => {
                state.opened = true;
                Ok(())
            }
            OpenBehavior::Reject(code) => Err(HardwareError::open_rejected(*code)),
            OpenBehavior::Fault(message) => Err(HardwareError::initialization_failed(message)),
        }
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.state();
        state.close_count += 1;
        state.opened = false;

        if state.fail_close {
            return Err(HardwareError::transfer("stall during close"));
        }
        Ok(())
    }

    fn capture_image(&mut self, config: &AcquisitionConfig) -> Result<Option<RawImage>> {
        // The lock must not be held while "scanning" so the handle stays usable.
        let delay = {
            let mut state = self.state();
            state.capture_count += 1;
            state.last_config = Some(*config);
            state.capture_delay
        };

        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let next = {
            let mut state = self.state();
            if !state.opened {
                return Err(HardwareError::disconnected(self.name.clone()));
            }
            state.frames.pop_front()
        };

        match next {
            Some(ScriptedCapture::Frame { image, quality }) => {
                self.state().last_quality = quality;
                Ok(Some(image))
            }
            Some(ScriptedCapture::Empty) => Ok(None),
            Some(ScriptedCapture::Fail(message)) => Err(HardwareError::image_capture(message)),
            Some(ScriptedCapture::Panic(message)) => panic!("{message}"),
            None => Err(HardwareError::image_capture("getImage() not success")),
        }
    }

    fn nfiq(&mut self, _image: &RawImage) -> Result<i32> {
        self.state()
            .last_quality
            .ok_or_else(|| HardwareError::unsupported("nfiq"))
    }

    fn encode_image(&mut self, image: &RawImage) -> Result<Vec<u8>> {
        codec::raw_to_png(image)
    }

    fn create_template(
        &mut self,
        image: &RawImage,
        spec: TemplateSpec,
        _min_minutiae: u32,
        max_len: usize,
    ) -> Result<Vec<u8>> {
        let mut state = self.state();
        state.last_template_spec = Some(spec);

        match state.template_failure {
            Some(TemplateFailure::Status(code)) => Err(HardwareError::template(code, 0)),
            Some(TemplateFailure::Empty) => Ok(Vec::new()),
            None => Ok(mock_template(image, spec, max_len)),
        }
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo::new(self.name.clone(), "Mock Fingerprint Scanner v1.0")
            .with_firmware_version("1.0.0")
    }
}

/// Deterministic template produced by the mock encoder.
///
/// Layout: `b"FMR"`, feature type code, extended flag, then one folded byte
/// per 8 pixels of the frame, truncated to `max_len`. Tests use it to assert
/// which encoder path produced a payload.
///
/// ```
/// use fingerprint_core::{TemplateFormat, TemplateSpec};
/// use fingerprint_hardware::RawImage;
/// use fingerprint_hardware::mock::mock_template;
///
/// let image = RawImage::new(vec![1; 16], 4, 4).unwrap();
/// let template = mock_template(&image, TemplateSpec::new(TemplateFormat::Ansi378, true), 4096);
/// assert_eq!(&template[..5], &[b'F', b'M', b'R', 3, 1]);
/// ```
pub fn mock_template(image: &RawImage, spec: TemplateSpec, max_len: usize) -> Vec<u8> {
    let mut template = vec![b'F', b'M', b'R', spec.format.type_code(), u8::from(spec.extended)];
    template.extend(
        image
            .data
            .chunks(8)
            .map(|chunk| chunk.iter().fold(0u8, |acc, b| acc.rotate_left(1) ^ b)),
    );
    template.truncate(max_len);
    template
}

/// Scripted result of the next `capture_image` call.
#[derive(Debug, Clone)]
enum ScriptedCapture {
    Frame {
        image: RawImage,
        quality: Option<i32>,
    },
    Empty,
    Fail(String),
    Panic(String),
}

#[derive(Debug, Clone, Default)]
enum OpenBehavior {
    #[default]
    Accept,
    Reject(i32),
    Fault(String),
}

#[derive(Debug, Clone, Copy)]
enum TemplateFailure {
    Status(i32),
    Empty,
}

#[derive(Debug, Default)]
struct MockState {
    frames: VecDeque<ScriptedCapture>,
    capture_delay: Duration,
    open_behavior: OpenBehavior,
    fail_close: bool,
    template_failure: Option<TemplateFailure>,
    opened: bool,
    last_quality: Option<i32>,
    last_template_spec: Option<TemplateSpec>,
    last_config: Option<AcquisitionConfig>,
    open_count: usize,
    close_count: usize,
    capture_count: usize,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    // A scripted panic never fires while the lock is held, but stay usable anyway.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle for controlling a mock scanner.
///
/// Cloneable; every clone scripts the same scanner.
///
/// # Examples
///
/// ```
/// use fingerprint_hardware::mock::MockScanner;
/// use std::time::Duration;
///
/// let (_scanner, handle) = MockScanner::new();
///
/// // Slow sensor, then a finger with NFIQ 2
/// handle.set_capture_delay(Duration::from_millis(50));
/// handle.queue_frame(vec![0; 256 * 360], 256, 360, Some(2)).unwrap();
///
/// assert_eq!(handle.pending_frames(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockScannerHandle {
    state: Arc<Mutex<MockState>>,
    name: String,
}

impl MockScannerHandle {
    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    /// Another scanner value driving the same simulated device.
    ///
    /// Lets a factory hand out a fresh resource after the previous one was
    /// destroyed on close.
    pub fn scanner(&self) -> MockScanner {
        MockScanner {
            state: Arc::clone(&self.state),
            name: self.name.clone(),
        }
    }

    /// A [`ScannerFactory`](crate::ScannerFactory) that always yields
    /// [`scanner`](Self::scanner).
    pub fn factory(&self) -> impl FnMut(Option<&str>) -> Result<MockScanner> + Send + 'static {
        let handle = self.clone();
        move |_device_id| Ok(handle.scanner())
    }

    /// Queue a frame for the next capture.
    ///
    /// `quality` is what `nfiq` reports for this frame; `None` makes the
    /// quality call fail.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer does not match the dimensions.
    pub fn queue_frame(
        &self,
        data: Vec<u8>,
        width: u32,
        height: u32,
        quality: Option<i32>,
    ) -> Result<()> {
        let image = RawImage::new(data, width, height)?;
        self.state()
            .frames
            .push_back(ScriptedCapture::Frame { image, quality });
        Ok(())
    }

    /// Queue a capture that succeeds without image data.
    pub fn queue_empty_frame(&self) {
        self.state().frames.push_back(ScriptedCapture::Empty);
    }

    /// Queue a capture that reports acquisition failure.
    pub fn queue_failure(&self, message: impl Into<String>) {
        self.state()
            .frames
            .push_back(ScriptedCapture::Fail(message.into()));
    }

    /// Queue a capture that panics inside the driver call.
    pub fn queue_panic(&self, message: impl Into<String>) {
        self.state()
            .frames
            .push_back(ScriptedCapture::Panic(message.into()));
    }

    /// Make every capture block for `delay` before returning.
    pub fn set_capture_delay(&self, delay: Duration) {
        self.state().capture_delay = delay;
    }

    /// Make `open` return a negative driver status.
    pub fn reject_open(&self, code: i32) {
        self.state().open_behavior = OpenBehavior::Reject(code);
    }

    /// Make `open` fault.
    pub fn fault_open(&self, message: impl Into<String>) {
        self.state().open_behavior = OpenBehavior::Fault(message.into());
    }

    /// Restore normal `open` behavior.
    pub fn accept_open(&self) {
        self.state().open_behavior = OpenBehavior::Accept;
    }

    /// Make `close` report an error.
    pub fn fail_close(&self, fail: bool) {
        self.state().fail_close = fail;
    }

    /// Make the template encoder return a non-zero status.
    pub fn fail_templates(&self, code: i32) {
        self.state().template_failure = Some(TemplateFailure::Status(code));
    }

    /// Make the template encoder succeed with zero bytes.
    pub fn empty_templates(&self) {
        self.state().template_failure = Some(TemplateFailure::Empty);
    }

    /// Whether the scanner is currently open.
    pub fn is_open(&self) -> bool {
        self.state().opened
    }

    /// Number of frames still queued.
    pub fn pending_frames(&self) -> usize {
        self.state().frames.len()
    }

    /// Number of `open` calls.
    pub fn open_count(&self) -> usize {
        self.state().open_count
    }

    /// Number of `close` calls.
    pub fn close_count(&self) -> usize {
        self.state().close_count
    }

    /// Number of `capture_image` calls.
    pub fn capture_count(&self) -> usize {
        self.state().capture_count
    }

    /// Encoder parameters of the most recent `create_template` call.
    pub fn last_template_spec(&self) -> Option<TemplateSpec> {
        self.state().last_template_spec
    }

    /// Acquisition hints of the most recent `capture_image` call.
    pub fn last_config(&self) -> Option<AcquisitionConfig> {
        self.state().last_config
    }
}
