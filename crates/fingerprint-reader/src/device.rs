//! Device handle and its serial worker.
//!
//! The vendor device resource lives on one dedicated worker thread and is
//! never touched anywhere else. `open`, `close` and capture bodies are queued
//! to that thread and run strictly one after another, which is the only
//! mutual exclusion the device needs.
//!
//! # State Machine
//!
//! ```text
//! Closed ──open──► Opening ──ok──► Open ──close──► Closing ──► Closed
//!                     │              │
//!                     └──fail──► Closed
//!                                    └──device lost──► Error ──close──► Closed
//! ```
//!
//! The state is mirrored into an atomic so callers can check the capture
//! precondition without a round trip to the worker.

use fingerprint_core::constants::{MSG_CLOSED, MSG_OPENED};
use fingerprint_core::{ErrorKind, ReaderError, Result, StatusEvent};
use fingerprint_hardware::{FingerprintScanner, HardwareError, ScannerFactory};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::emitter::StatusEmitter;

/// Lifecycle state of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeviceState {
    Closed = 0,
    Opening = 1,
    Open = 2,
    Closing = 3,
    /// The device stopped answering while open.
    Error = 4,
}

impl DeviceState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Opening,
            2 => Self::Open,
            3 => Self::Closing,
            4 => Self::Error,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Whether the device survived a capture body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceHealth {
    Healthy,
    /// The device was lost; the session moves to [`DeviceState::Error`].
    Faulted,
}

/// Capture body run on the worker.
///
/// Receives the scanner when the session is open, `None` otherwise.
pub type DeviceTask<S> = Box<dyn FnOnce(Option<&mut S>) -> DeviceHealth + Send>;

enum Job<S> {
    Open {
        device_id: Option<String>,
        reply: oneshot::Sender<Result<()>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
    Capture {
        cancel: CancellationToken,
        task: DeviceTask<S>,
    },
}

/// Owner of the open/closed state of the fingerprint device.
///
/// Dropping the last handle stops the worker, which releases the device.
pub struct DeviceHandle<S: FingerprintScanner> {
    jobs: mpsc::Sender<Job<S>>,
    state: Arc<AtomicU8>,
}

impl<S: FingerprintScanner> DeviceHandle<S> {
    /// Start the worker thread.
    ///
    /// The vendor resource is not created until the first `open`.
    ///
    /// # Errors
    ///
    /// Returns `NO_READER` if the worker thread cannot be started.
    pub fn spawn<F>(factory: F, emitter: StatusEmitter, queue_depth: usize) -> Result<Self>
    where
        F: ScannerFactory<Scanner = S>,
    {
        let (jobs, rx) = mpsc::channel(queue_depth.max(1));
        let state = Arc::new(AtomicU8::new(DeviceState::Closed as u8));

        let worker = Worker {
            factory,
            scanner: None,
            state: Arc::clone(&state),
            emitter,
        };

        std::thread::Builder::new()
            .name("fingerprint-device".to_string())
            .spawn(move || worker.run(rx))
            .map_err(|e| ReaderError::new(ErrorKind::NoReader, e.to_string()))?;

        Ok(Self { jobs, state })
    }

    /// Current state.
    pub fn state(&self) -> DeviceState {
        DeviceState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether captures may start.
    pub fn is_open(&self) -> bool {
        self.state() == DeviceState::Open
    }

    /// Open the device. A no-op success when already open.
    ///
    /// # Errors
    ///
    /// - `OPEN_FAIL` when the driver rejects the open
    /// - `OPEN_EX` when constructing or opening the device faults
    /// - `NO_READER` when the worker is gone
    pub async fn open(&self, device_id: Option<String>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.submit(Job::Open { device_id, reply }).await?;
        rx.await.map_err(|_| ReaderError::no_reader())?
    }

    /// Release the device. Never fails; release errors are logged and dropped.
    pub async fn close(&self) {
        let (reply, rx) = oneshot::channel();
        if self.submit(Job::Close { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Queue a capture body behind any pending device work.
    ///
    /// The body is skipped if `cancel` fires before the worker reaches it.
    ///
    /// # Errors
    ///
    /// Returns `NO_READER` when the worker is gone.
    pub async fn submit_capture(&self, cancel: CancellationToken, task: DeviceTask<S>) -> Result<()> {
        self.submit(Job::Capture { cancel, task }).await
    }

    async fn submit(&self, job: Job<S>) -> Result<()> {
        self.jobs
            .send(job)
            .await
            .map_err(|_| ReaderError::no_reader())
    }
}

/// State owned by the worker thread.
struct Worker<F: ScannerFactory> {
    factory: F,
    scanner: Option<F::Scanner>,
    state: Arc<AtomicU8>,
    emitter: StatusEmitter,
}

impl<F: ScannerFactory> Worker<F> {
    fn run(mut self, mut rx: mpsc::Receiver<Job<F::Scanner>>) {
        debug!("Device worker started");

        while let Some(job) = rx.blocking_recv() {
            match job {
                Job::Open { device_id, reply } => {
                    let result = self.open(device_id.as_deref());
                    let _ = reply.send(result);
                }
                Job::Close { reply } => {
                    self.close();
                    let _ = reply.send(());
                }
                Job::Capture { cancel, task } => {
                    if cancel.is_cancelled() {
                        debug!("Skipping capture resolved before it started");
                        continue;
                    }
                    self.capture(task);
                }
            }
        }

        // Every handle is gone: release quietly, nobody is listening.
        if let Some(mut scanner) = self.scanner.take()
            && self.state() != DeviceState::Closed
            && let Err(e) = scanner.close()
        {
            debug!(error = %e, "Release on shutdown failed");
        }
        debug!("Device worker stopped");
    }

    fn state(&self) -> DeviceState {
        DeviceState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: DeviceState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn open(&mut self, device_id: Option<&str>) -> Result<()> {
        if self.state() == DeviceState::Open {
            debug!("Device already open");
            return Ok(());
        }

        self.set_state(DeviceState::Opening);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_open(device_id)))
            .unwrap_or_else(|payload| {
                Err(ReaderError::new(ErrorKind::OpenException, panic_message(payload.as_ref())))
            });

        match outcome {
            Ok(()) => {
                self.set_state(DeviceState::Open);
                info!(device_id = ?device_id, "Device opened");
                self.emitter.publish(StatusEvent::idle(MSG_OPENED));
                Ok(())
            }
            Err(e) => {
                self.set_state(DeviceState::Closed);
                error!(device_id = ?device_id, code = e.code(), detail = %e.detail, "Device open failed");
                self.emitter.publish(StatusEvent::error(e.detail.clone()));
                Err(e)
            }
        }
    }

    fn try_open(&mut self, device_id: Option<&str>) -> Result<()> {
        if self.scanner.is_none() {
            let scanner = self
                .factory
                .create(device_id)
                .map_err(|e| ReaderError::new(ErrorKind::OpenException, e.to_string()))?;
            let info = scanner.device_info();
            debug!(
                device = %info.name,
                model = %info.model,
                dpi = info.resolution_dpi,
                firmware = ?info.firmware_version,
                "Device resource created"
            );
            self.scanner = Some(scanner);
        }
        let scanner = self.scanner.as_mut().ok_or_else(ReaderError::no_api)?;

        scanner.open().map_err(|e| match e {
            HardwareError::OpenRejected { .. } => ReaderError::new(ErrorKind::OpenFailed, e.to_string()),
            other => ReaderError::new(ErrorKind::OpenException, other.to_string()),
        })
    }

    fn close(&mut self) {
        if let Some(mut scanner) = self.scanner.take() {
            self.set_state(DeviceState::Closing);
            match panic::catch_unwind(AssertUnwindSafe(|| scanner.close())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Device release failed, ignoring"),
                Err(payload) => warn!(
                    error = %panic_message(payload.as_ref()),
                    "Device release panicked, ignoring"
                ),
            }
        }

        self.set_state(DeviceState::Closed);
        info!("Device closed");
        self.emitter.publish(StatusEvent::idle(MSG_CLOSED));
    }

    fn capture(&mut self, task: DeviceTask<F::Scanner>) {
        let scanner = match self.state() {
            DeviceState::Open => self.scanner.as_mut(),
            _ => None,
        };

        match panic::catch_unwind(AssertUnwindSafe(|| task(scanner))) {
            Ok(DeviceHealth::Healthy) => {}
            Ok(DeviceHealth::Faulted) => {
                warn!("Device lost during capture");
                self.set_state(DeviceState::Error);
            }
            Err(payload) => {
                error!(error = %panic_message(payload.as_ref()), "Capture body panicked");
            }
        }
    }
}

/// Best-effort text of a caught panic.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
