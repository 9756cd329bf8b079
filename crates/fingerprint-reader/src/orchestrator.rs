//! Capture orchestration: single-flight attempts and the resolution race.
//!
//! At most one capture attempt is active at a time. Each attempt can be ended
//! by four independent actors:
//!
//! - the device worker, when the adapter returns (success or failure)
//! - the timeout timer
//! - an explicit [`cancel`](CaptureOrchestrator::cancel) or `close`
//! - a newer `capture`, which supersedes it
//!
//! Every actor funnels through [`Shared::resolve`], where a compare-and-set on
//! the attempt's `resolved` flag picks exactly one winner. Only the winner
//! publishes a terminal status and completes the caller's result; everybody
//! else is a no-op. Before announcing, the winner cancels the attempt's token
//! (stopping the timer and any worker job that has not started yet) and
//! clears the slot if it still points at this attempt.
//!
//! The slot itself is an [`ArcSwapOption`], so installing, superseding and
//! clearing are atomic exchanges. No lock is ever held across device work.
//!
//! # Status Sequence
//!
//! ```text
//! capture ──► Capturing("start") ──┬─► Done(quality)       adapter succeeded
//!                                  ├─► Error(detail)       adapter failed
//!                                  ├─► Error("timeout")    timer fired first
//!                                  ├─► Idle("cancelled")   cancel() or close()
//!                                  └─► Idle("superseded")  newer capture()
//! ```

use arc_swap::ArcSwapOption;
use fingerprint_core::constants::{MSG_CANCELLED, MSG_START, MSG_SUPERSEDED, MSG_TIMEOUT};
use fingerprint_core::{
    CaptureOutcome, CaptureRequest, Captured, ErrorKind, ReaderError, StatusEvent,
};
use fingerprint_hardware::FingerprintScanner;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapter::{Acquisition, CaptureAdapter, CaptureConfig};
use crate::config::CaptureDefaults;
use crate::device::{DeviceHandle, DeviceHealth, DeviceTask, DeviceState, panic_message};
use crate::emitter::StatusEmitter;

/// How an attempt ended.
#[derive(Debug)]
enum Resolution {
    Completed(Acquisition),
    Failed(ReaderError),
    TimedOut(Duration),
    Cancelled,
    Superseded,
}

impl Resolution {
    fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::TimedOut(_) => "timed_out",
            Self::Cancelled => "cancelled",
            Self::Superseded => "superseded",
        }
    }
}

/// One capture attempt.
struct Attempt {
    id: Uuid,
    request: CaptureRequest,

    /// Single-resolution guard.
    resolved: AtomicBool,

    /// Fired by the winner; stops the timer and a not-yet-started job.
    cancel: CancellationToken,

    /// Taken once, by the winner.
    reply: Mutex<Option<oneshot::Sender<CaptureOutcome>>>,

    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Attempt {
    fn new(request: CaptureRequest, reply: oneshot::Sender<CaptureOutcome>) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            resolved: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            reply: Mutex::new(Some(reply)),
            timer: Mutex::new(None),
        }
    }

    fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    fn take_reply(&self) -> Option<oneshot::Sender<CaptureOutcome>> {
        self.reply
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    fn set_timer(&self, timer: JoinHandle<()>) {
        if self.is_resolved() {
            timer.abort();
            return;
        }
        *self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(timer);
    }

    fn take_timer(&self) -> Option<JoinHandle<()>> {
        self.timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

/// State reachable from the caller, the worker and the timer.
struct Shared {
    slot: ArcSwapOption<Attempt>,
    emitter: StatusEmitter,
}

impl Shared {
    /// Try to end `attempt`. Returns `true` for the single winner.
    fn resolve(&self, attempt: &Arc<Attempt>, resolution: Resolution) -> bool {
        if attempt
            .resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(
                attempt = %attempt.id,
                lost = resolution.label(),
                "Attempt already resolved, discarding"
            );
            return false;
        }

        let mode = attempt.request.mode;
        let label = resolution.label();
        let (status, outcome) = match resolution {
            Resolution::Completed(acquisition) => (
                StatusEvent::done(acquisition.quality),
                Ok(Captured {
                    mode,
                    payload: acquisition.payload,
                    quality: acquisition.quality,
                }),
            ),
            Resolution::Failed(error) => (StatusEvent::error(error.detail.clone()), Err(error)),
            Resolution::TimedOut(after) => {
                let ms = u64::try_from(after.as_millis()).unwrap_or(u64::MAX);
                (StatusEvent::error(MSG_TIMEOUT), Err(ReaderError::timeout(ms)))
            }
            Resolution::Cancelled => (
                StatusEvent::idle(MSG_CANCELLED),
                Err(ReaderError::cancelled(MSG_CANCELLED)),
            ),
            Resolution::Superseded => (
                StatusEvent::idle(MSG_SUPERSEDED),
                Err(ReaderError::cancelled(MSG_SUPERSEDED)),
            ),
        };

        match &outcome {
            Ok(captured) => info!(
                attempt = %attempt.id,
                mode = %mode,
                bytes = captured.payload.len(),
                quality = ?captured.quality,
                "Capture completed"
            ),
            Err(e) => info!(
                attempt = %attempt.id,
                mode = %mode,
                outcome = label,
                code = e.code(),
                "Capture ended"
            ),
        }

        attempt.cancel.cancel();
        if let Some(timer) = attempt.take_timer() {
            timer.abort();
        }

        // Only clear the slot if a newer attempt has not replaced this one.
        let expected = Some(Arc::clone(attempt));
        let _ = self.slot.compare_and_swap(&expected, None::<Arc<Attempt>>);

        // The slot is empty before the caller can observe the outcome.
        self.emitter.publish(status);
        if let Some(reply) = attempt.take_reply() {
            self.emitter.deliver(reply, outcome);
        }
        true
    }
}

/// Future resolving to the outcome of one capture attempt.
///
/// Dropping the ticket does not cancel the attempt.
#[derive(Debug)]
pub struct CaptureTicket {
    id: Uuid,
    rx: oneshot::Receiver<CaptureOutcome>,
}

impl CaptureTicket {
    /// Identifier of the attempt, as it appears in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Future for CaptureTicket {
    type Output = CaptureOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(ReaderError::no_reader())))
    }
}

/// Owns the device and the single-flight capture slot.
pub struct CaptureOrchestrator<S: FingerprintScanner> {
    device: DeviceHandle<S>,
    adapter: Arc<dyn CaptureAdapter<S>>,
    defaults: CaptureDefaults,
    shared: Arc<Shared>,
}

impl<S: FingerprintScanner> CaptureOrchestrator<S> {
    pub fn new(
        device: DeviceHandle<S>,
        adapter: Arc<dyn CaptureAdapter<S>>,
        defaults: CaptureDefaults,
        emitter: StatusEmitter,
    ) -> Self {
        Self {
            device,
            adapter,
            defaults,
            shared: Arc::new(Shared {
                slot: ArcSwapOption::empty(),
                emitter,
            }),
        }
    }

    /// The device this orchestrator drives.
    pub fn device(&self) -> &DeviceHandle<S> {
        &self.device
    }

    /// Current device state.
    pub fn device_state(&self) -> DeviceState {
        self.device.state()
    }

    /// Whether an attempt currently occupies the slot.
    pub fn is_capturing(&self) -> bool {
        self.shared.slot.load().is_some()
    }

    /// Start a capture attempt, superseding any attempt still in flight.
    ///
    /// Returns once the attempt has been handed to the device worker (or
    /// resolved by the open-device precondition). Await the ticket for the
    /// outcome.
    pub async fn capture(&self, request: CaptureRequest) -> CaptureTicket {
        let (reply, rx) = oneshot::channel();
        let attempt = Arc::new(Attempt::new(request, reply));
        let ticket = CaptureTicket { id: attempt.id, rx };

        // Preempt: the old attempt sees its termination before this one starts.
        if let Some(previous) = self.shared.slot.swap(None) {
            self.shared.resolve(&previous, Resolution::Superseded);
        }

        // Guard
        if !self.device.is_open() {
            let error = ReaderError::not_opened();
            debug!(
                attempt = %attempt.id,
                state = %self.device.state(),
                "Capture rejected, device not open"
            );
            attempt.resolved.store(true, Ordering::Release);
            self.shared.emitter.publish(StatusEvent::error(error.detail.clone()));
            if let Some(reply) = attempt.take_reply() {
                self.shared.emitter.deliver(reply, Err(error));
            }
            return ticket;
        }

        // Capturing is published before anything else can resolve the attempt.
        self.shared.emitter.publish(StatusEvent::capturing(MSG_START));
        info!(
            attempt = %attempt.id,
            mode = %request.mode,
            timeout_ms = ?request.timeout_ms,
            "Capture started"
        );

        if let Some(raced) = self.shared.slot.swap(Some(Arc::clone(&attempt))) {
            self.shared.resolve(&raced, Resolution::Superseded);
        }

        if let Some(timeout) = request.timeout() {
            attempt.set_timer(self.arm_timer(&attempt, timeout));
        }

        let config = self.defaults.capture_config(&request);
        let task = self.capture_task(&attempt, config);
        if let Err(e) = self
            .device
            .submit_capture(attempt.cancel.clone(), task)
            .await
        {
            self.shared.resolve(&attempt, Resolution::Failed(e));
        }

        ticket
    }

    /// Cancel the active attempt.
    ///
    /// Always publishes `Idle("cancelled")`, even when nothing was in flight.
    pub fn cancel(&self) {
        let resolved = match self.shared.slot.swap(None) {
            Some(attempt) => self.shared.resolve(&attempt, Resolution::Cancelled),
            None => false,
        };
        if !resolved {
            debug!("Cancel with no active capture");
            self.shared.emitter.publish(StatusEvent::idle(MSG_CANCELLED));
        }
    }

    /// Cancel the active attempt, staying silent when there is none.
    pub(crate) fn abort_active(&self) {
        if let Some(attempt) = self.shared.slot.swap(None) {
            self.shared.resolve(&attempt, Resolution::Cancelled);
        }
    }

    /// Cancel any active attempt, then release the device.
    pub async fn close(&self) {
        self.abort_active();
        self.device.close().await;
    }

    fn arm_timer(&self, attempt: &Arc<Attempt>, timeout: Duration) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let attempt = Arc::clone(attempt);

        tokio::spawn(async move {
            tokio::select! {
                _ = attempt.cancel.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    warn!(attempt = %attempt.id, timeout = ?timeout, "Capture timed out");
                    shared.resolve(&attempt, Resolution::TimedOut(timeout));
                }
            }
        })
    }

    fn capture_task(&self, attempt: &Arc<Attempt>, config: CaptureConfig) -> DeviceTask<S> {
        let shared = Arc::clone(&self.shared);
        let adapter = Arc::clone(&self.adapter);
        let attempt = Arc::clone(attempt);

        Box::new(move |scanner: Option<&mut S>| {
            if attempt.is_resolved() {
                debug!(attempt = %attempt.id, "Attempt resolved before acquisition");
                return DeviceHealth::Healthy;
            }

            let Some(scanner) = scanner else {
                shared.resolve(&attempt, Resolution::Failed(ReaderError::no_api()));
                return DeviceHealth::Healthy;
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| adapter.acquire(scanner, &config)))
                .unwrap_or_else(|payload| {
                    Err(ReaderError::capture_exception(panic_message(payload.as_ref())))
                });

            let health = match &outcome {
                Err(e) if e.kind == ErrorKind::NoApi => DeviceHealth::Faulted,
                _ => DeviceHealth::Healthy,
            };

            let resolution = match outcome {
                Ok(acquisition) => Resolution::Completed(acquisition),
                Err(e) => Resolution::Failed(e),
            };
            if !shared.resolve(&attempt, resolution) {
                debug!(attempt = %attempt.id, "Discarded late acquisition result");
            }

            health
        })
    }
}

impl<S: FingerprintScanner> Drop for CaptureOrchestrator<S> {
    fn drop(&mut self) {
        self.abort_active();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ScannerPipeline;
    use crate::emitter::StatusStream;
    use fingerprint_core::{CaptureMode, ReaderState};
    use fingerprint_hardware::mock::{MockScanner, MockScannerHandle};
    use std::sync::Barrier;
    use std::sync::atomic::AtomicUsize;

    fn orchestrator() -> (CaptureOrchestrator<MockScanner>, MockScannerHandle, StatusStream) {
        let (_scanner, mock) = MockScanner::new();
        let emitter = StatusEmitter::spawn();
        let stream = emitter.subscribe();
        let device = DeviceHandle::spawn(mock.factory(), emitter.clone(), 8).unwrap();
        let orchestrator = CaptureOrchestrator::new(
            device,
            Arc::new(ScannerPipeline),
            CaptureDefaults::default(),
            emitter,
        );
        (orchestrator, mock, stream)
    }

    fn shared_with_stream() -> (Arc<Shared>, StatusStream) {
        let emitter = StatusEmitter::spawn();
        let stream = emitter.subscribe();
        let shared = Arc::new(Shared {
            slot: ArcSwapOption::empty(),
            emitter,
        });
        (shared, stream)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_resolve_has_exactly_one_winner() {
        let (shared, mut stream) = shared_with_stream();

        for _ in 0..50 {
            let (reply, rx) = oneshot::channel();
            let attempt = Arc::new(Attempt::new(CaptureRequest::new(CaptureMode::Miaxis), reply));
            shared.slot.store(Some(Arc::clone(&attempt)));

            let winners = Arc::new(AtomicUsize::new(0));
            let barrier = Arc::new(Barrier::new(4));
            let racers: Vec<_> = (0..4)
                .map(|i| {
                    let shared = Arc::clone(&shared);
                    let attempt = Arc::clone(&attempt);
                    let winners = Arc::clone(&winners);
                    let barrier = Arc::clone(&barrier);
                    std::thread::spawn(move || {
                        let resolution = match i {
                            0 => Resolution::Completed(Acquisition {
                                payload: vec![1],
                                quality: Some(1),
                            }),
                            1 => Resolution::TimedOut(Duration::from_millis(10)),
                            2 => Resolution::Cancelled,
                            _ => Resolution::Failed(ReaderError::capture_exception("boom")),
                        };
                        barrier.wait();
                        if shared.resolve(&attempt, resolution) {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();
            for racer in racers {
                racer.join().unwrap();
            }

            assert_eq!(winners.load(Ordering::SeqCst), 1);
            assert!(rx.await.is_ok());
            assert!(shared.slot.load().is_none());

            // Exactly one terminal status per attempt.
            let status = stream.recv().await.unwrap();
            assert!(status.state.is_terminal());
            assert_eq!(stream.try_recv(), None);
        }
    }

    #[tokio::test]
    async fn test_resolve_keeps_newer_attempt_in_slot() {
        let (shared, _stream) = shared_with_stream();
        let (reply, _rx) = oneshot::channel();
        let old = Arc::new(Attempt::new(CaptureRequest::new(CaptureMode::Image), reply));
        let (reply, _rx2) = oneshot::channel();
        let new = Arc::new(Attempt::new(CaptureRequest::new(CaptureMode::Image), reply));

        shared.slot.store(Some(Arc::clone(&new)));
        assert!(shared.resolve(&old, Resolution::Superseded));

        let current = shared.slot.load_full().unwrap();
        assert!(Arc::ptr_eq(&current, &new));
    }

    #[tokio::test]
    async fn test_precondition_publishes_error_only() {
        let (orchestrator, _mock, mut stream) = orchestrator();

        let outcome = orchestrator
            .capture(CaptureRequest::new(CaptureMode::Image))
            .await
            .await;

        assert_eq!(outcome.unwrap_err().kind, ErrorKind::NotOpened);
        let status = stream.recv().await.unwrap();
        assert_eq!(status.state, ReaderState::Error);
        assert_eq!(stream.try_recv(), None);
        assert!(!orchestrator.is_capturing());
    }

    #[tokio::test]
    async fn test_successful_capture_clears_slot() {
        let (orchestrator, mock, mut stream) = orchestrator();
        orchestrator.device().open(None).await.unwrap();
        mock.queue_frame(vec![0x10; 64], 8, 8, Some(4)).unwrap();

        let captured = orchestrator
            .capture(CaptureRequest::new(CaptureMode::Miaxis))
            .await
            .await
            .unwrap();

        assert_eq!(captured.mode, CaptureMode::Miaxis);
        assert_eq!(captured.quality, Some(4));
        assert!(!orchestrator.is_capturing());

        assert_eq!(stream.recv().await.unwrap().message(), Some("opened"));
        assert_eq!(stream.recv().await, Some(StatusEvent::capturing("start")));
        assert_eq!(stream.recv().await, Some(StatusEvent::done(Some(4))));
    }

    #[tokio::test]
    async fn test_adapter_panic_is_capture_exception() {
        let (orchestrator, mock, _stream) = orchestrator();
        orchestrator.device().open(None).await.unwrap();
        mock.queue_panic("sdk crashed");

        let error = orchestrator
            .capture(CaptureRequest::new(CaptureMode::Ansi378))
            .await
            .await
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::CaptureException);
        assert_eq!(error.detail, "sdk crashed");
        assert!(orchestrator.device().is_open());
    }

    #[tokio::test]
    async fn test_lost_device_faults_session() {
        let (orchestrator, mock, _stream) = orchestrator();
        orchestrator.device().open(None).await.unwrap();
        mock.queue_frame(vec![0; 4], 2, 2, Some(1)).unwrap();

        // Pull the device out from under the open session.
        mock.scanner().close().unwrap();

        let error = orchestrator
            .capture(CaptureRequest::new(CaptureMode::Iso19794_2))
            .await
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::NoApi);

        // The fault is recorded once the worker finishes the body.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(orchestrator.device_state(), DeviceState::Error);
    }

    #[tokio::test]
    async fn test_cancel_without_attempt_still_announces() {
        let (orchestrator, _mock, mut stream) = orchestrator();

        orchestrator.cancel();
        orchestrator.cancel();

        assert_eq!(stream.recv().await, Some(StatusEvent::idle("cancelled")));
        assert_eq!(stream.recv().await, Some(StatusEvent::idle("cancelled")));
    }
}
