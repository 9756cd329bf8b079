//! Common test utilities for reader integration tests.
//!
//! Helpers fall into two groups:
//!
//! 1. **Setup** (`reader`, `open_reader`, `queue_frames`) builds a reader over
//!    a scriptable mock scanner with a live status subscription.
//! 2. **Observation** (`next_event`, `assert_quiet`) reads the status stream
//!    with a deadline so a missing event fails the test instead of hanging it.

#![allow(dead_code)]

use fingerprint_core::{ReaderState, StatusEvent};
use fingerprint_hardware::mock::{MockScanner, MockScannerHandle};
use fingerprint_reader::{FingerprintReader, StatusStream};
use std::time::Duration;

/// Longest a test waits for a single event.
pub const EVENT_DEADLINE: Duration = Duration::from_secs(2);

/// Side of the square test frame.
pub const FRAME_SIDE: u32 = 16;

/// Reader over a fresh mock, subscribed, device closed.
pub fn reader() -> (FingerprintReader<MockScanner>, MockScannerHandle, StatusStream) {
    let (_scanner, mock) = MockScanner::new();
    let reader = FingerprintReader::builder(mock.factory())
        .build()
        .expect("reader starts");
    let status = reader.subscribe();
    (reader, mock, status)
}

/// Reader with the device open and the `opened` event consumed.
pub async fn open_reader() -> (FingerprintReader<MockScanner>, MockScannerHandle, StatusStream) {
    let (reader, mock, mut status) = reader();
    assert!(reader.open(Some("Miaxis-USB-0")).await.expect("device opens"));
    assert_eq!(next_event(&mut status).await, StatusEvent::idle("opened"));
    (reader, mock, status)
}

/// Deterministic frame pixels.
pub fn frame_pixels() -> Vec<u8> {
    (0..FRAME_SIDE * FRAME_SIDE).map(|i| (i % 251) as u8).collect()
}

/// Queue `count` identical frames reporting `quality`.
pub fn queue_frames(mock: &MockScannerHandle, count: usize, quality: Option<i32>) {
    for _ in 0..count {
        mock.queue_frame(frame_pixels(), FRAME_SIDE, FRAME_SIDE, quality)
            .expect("valid frame");
    }
}

/// Next status event, failing the test after [`EVENT_DEADLINE`].
pub async fn next_event(status: &mut StatusStream) -> StatusEvent {
    tokio::time::timeout(EVENT_DEADLINE, status.recv())
        .await
        .expect("status event within deadline")
        .expect("status stream open")
}

/// Assert nothing else arrives within `window`.
pub async fn assert_quiet(status: &mut StatusStream, window: Duration) {
    if let Ok(Some(event)) = tokio::time::timeout(window, status.recv()).await {
        panic!("unexpected status event: {event:?}");
    }
}

/// Assert the next event is `Capturing("start")`.
pub async fn expect_capturing(status: &mut StatusStream) {
    let event = next_event(status).await;
    assert_eq!(event.state, ReaderState::Capturing, "got {event:?}");
    assert_eq!(event.message(), Some("start"));
}
