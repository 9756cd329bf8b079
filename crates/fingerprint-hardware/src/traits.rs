//! Scanner trait definitions.
//!
//! This module defines the contract between the reader and a vendor
//! fingerprint SDK. The methods mirror the SDK primitives one-to-one and are
//! deliberately **blocking**: vendor calls hold the calling thread for the
//! whole physical scan and cannot be interrupted. The reader only ever calls
//! them from its dedicated device worker, never from an async task.

use fingerprint_core::TemplateSpec;

use crate::error::Result;
use crate::types::{AcquisitionConfig, DeviceInfo, RawImage};

/// Fingerprint scanner abstraction.
///
/// One value of this type represents an initialized vendor device resource.
/// Implementations are owned exclusively by the reader's device worker, so
/// they need `Send` but not `Sync`.
///
/// # Object Safety
///
/// All methods are synchronous, so the trait is object-safe. The reader is
/// still generic over the concrete scanner; use
/// [`AnyScanner`](crate::devices::AnyScanner) when the scanner kind is
/// selected at runtime.
///
/// # Examples
///
/// ```
/// use fingerprint_hardware::{AcquisitionConfig, FingerprintScanner, Result};
/// use fingerprint_hardware::mock::MockScanner;
///
/// fn grab_quality<S: FingerprintScanner>(scanner: &mut S) -> Result<Option<i32>> {
///     scanner.open()?;
///     let image = scanner.capture_image(&AcquisitionConfig::default())?;
///     let quality = match image {
///         Some(image) => Some(scanner.nfiq(&image)?),
///         None => None,
///     };
///     scanner.close()?;
///     Ok(quality)
/// }
///
/// let (mut scanner, handle) = MockScanner::new();
/// handle.queue_frame(vec![0x80; 16], 4, 4, Some(2)).unwrap();
/// assert_eq!(grab_quality(&mut scanner).unwrap(), Some(2));
/// ```
pub trait FingerprintScanner: Send + 'static {
    /// Open the physical device.
    ///
    /// # Errors
    ///
    /// - [`HardwareError::OpenRejected`](crate::HardwareError::OpenRejected)
    ///   when the driver returns a negative status code
    /// - Any other error when the driver faults
    fn open(&mut self) -> Result<()>;

    /// Release the physical device.
    ///
    /// Callers treat this as best-effort and ignore the result.
    fn close(&mut self) -> Result<()>;

    /// Wait for a finger and acquire one frame.
    ///
    /// Returns `Ok(None)` when the driver reports success but hands back no
    /// image data.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver reports acquisition failure.
    fn capture_image(&mut self, config: &AcquisitionConfig) -> Result<Option<RawImage>>;

    /// Score the frame's quality (NFIQ).
    fn nfiq(&mut self, image: &RawImage) -> Result<i32>;

    /// Convert the frame to a portable image format.
    fn encode_image(&mut self, image: &RawImage) -> Result<Vec<u8>>;

    /// Extract a minutiae template.
    ///
    /// `max_len` is the capacity of the output buffer and `min_minutiae` the
    /// minimum feature count the encoder must find.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Template`](crate::HardwareError::Template)
    /// with the encoder status and output length on failure.
    fn create_template(
        &mut self,
        image: &RawImage,
        spec: TemplateSpec,
        min_minutiae: u32,
        max_len: usize,
    ) -> Result<Vec<u8>>;

    /// Static metadata about the device.
    fn device_info(&self) -> DeviceInfo;
}

impl<S: FingerprintScanner + ?Sized> FingerprintScanner for Box<S> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn capture_image(&mut self, config: &AcquisitionConfig) -> Result<Option<RawImage>> {
        (**self).capture_image(config)
    }

    fn nfiq(&mut self, image: &RawImage) -> Result<i32> {
        (**self).nfiq(image)
    }

    fn encode_image(&mut self, image: &RawImage) -> Result<Vec<u8>> {
        (**self).encode_image(image)
    }

    fn create_template(
        &mut self,
        image: &RawImage,
        spec: TemplateSpec,
        min_minutiae: u32,
        max_len: usize,
    ) -> Result<Vec<u8>> {
        (**self).create_template(image, spec, min_minutiae, max_len)
    }

    fn device_info(&self) -> DeviceInfo {
        (**self).device_info()
    }
}

/// Lazily constructs the vendor device resource on first `open`.
///
/// Receives the optional device id supplied by the caller. Any closure of the
/// right shape is a factory.
///
/// ```
/// use fingerprint_hardware::ScannerFactory;
/// use fingerprint_hardware::mock::MockScanner;
///
/// let (scanner, _handle) = MockScanner::new();
/// let mut slot = Some(scanner);
/// let mut factory = move |_id: Option<&str>| {
///     slot.take()
///         .ok_or_else(|| fingerprint_hardware::HardwareError::disconnected("mock"))
/// };
/// assert!(factory.create(Some("Miaxis-USB-0")).is_ok());
/// assert!(factory.create(None).is_err());
/// ```
pub trait ScannerFactory: Send + 'static {
    /// The scanner type produced.
    type Scanner: FingerprintScanner;

    /// Construct the device resource.
    fn create(&mut self, device_id: Option<&str>) -> Result<Self::Scanner>;
}

impl<F, S> ScannerFactory for F
where
    F: FnMut(Option<&str>) -> Result<S> + Send + 'static,
    S: FingerprintScanner,
{
    type Scanner = S;

    fn create(&mut self, device_id: Option<&str>) -> Result<S> {
        self(device_id)
    }
}
