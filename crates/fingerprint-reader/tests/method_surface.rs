//! Integration tests for the JSON method-call surface.

mod common;

use common::{next_event, queue_frames};
use fingerprint_core::StatusEvent;
use fingerprint_reader::{CaptureResponse, MethodResponse};
use serde_json::{Value, json};

fn result(response: MethodResponse) -> Value {
    match response {
        MethodResponse::Success { result } => result,
        MethodResponse::Error { code, message } => panic!("{code}: {message}"),
    }
}

fn error_code(response: MethodResponse) -> String {
    match response {
        MethodResponse::Error { code, .. } => code,
        MethodResponse::Success { result } => panic!("unexpected success: {result}"),
    }
}

#[tokio::test]
async fn test_open_capture_close_session() {
    let (reader, mock, mut status) = common::reader();
    queue_frames(&mock, 2, Some(2));
    mock.queue_frame(common::frame_pixels(), common::FRAME_SIDE, common::FRAME_SIDE, None)
        .unwrap();

    let opened = reader
        .dispatch_value(json!({"method": "open", "deviceId": "Miaxis-USB-0"}))
        .await;
    assert_eq!(result(opened), json!(true));

    let captured = reader
        .dispatch_value(json!({"method": "capture", "mode": "ANSI378", "timeoutMs": 5000}))
        .await;
    let captured: CaptureResponse = serde_json::from_value(result(captured)).unwrap();
    assert_eq!(captured.mode, "ANSI378");
    assert_eq!(captured.quality, 2);
    assert_eq!(&captured.bytes[..4], &[b'F', b'M', b'R', 3]);

    // No mode: the default ISO path.
    let captured = reader.dispatch_value(json!({"method": "capture"})).await;
    let captured: CaptureResponse = serde_json::from_value(result(captured)).unwrap();
    assert_eq!(captured.mode, "iso19794_2");
    assert_eq!(captured.bytes[3], 1);

    // A frame without a score reports -1.
    let captured = reader
        .dispatch_value(json!({"method": "capture", "mode": "miaxis"}))
        .await;
    assert_eq!(result(captured)["quality"], json!(-1));

    let closed = reader.dispatch_value(json!({"method": "close"})).await;
    assert_eq!(result(closed), Value::Null);

    let events: Vec<StatusEvent> = {
        let mut events = Vec::new();
        for _ in 0..8 {
            events.push(next_event(&mut status).await);
        }
        events
    };
    assert_eq!(events[0], StatusEvent::idle("opened"));
    assert_eq!(events[2], StatusEvent::done(Some(2)));
    assert_eq!(events[6], StatusEvent::done(None));
    assert_eq!(events[7], StatusEvent::idle("closed"));
}

#[tokio::test]
async fn test_capture_before_open_is_an_error_response() {
    let (reader, _mock, _status) = common::reader();

    let response = reader
        .dispatch_value(json!({"method": "capture", "mode": "image"}))
        .await;
    assert_eq!(error_code(response), "NOT_OPENED");
}

#[tokio::test]
async fn test_unknown_and_malformed_calls() {
    let (reader, _mock, _status) = common::reader();

    let response = reader.dispatch_value(json!({"method": "enroll"})).await;
    assert_eq!(error_code(response), "NOT_IMPLEMENTED");

    let response = reader
        .dispatch_value(json!({"method": "capture", "timeoutMs": [1]}))
        .await;
    assert_eq!(error_code(response), "BAD_ARGS");
}

#[tokio::test]
async fn test_list_devices_and_platform_version() {
    let (reader, _mock, _status) = common::reader();

    let devices = result(reader.dispatch_value(json!({"method": "listDevices"})).await);
    assert_eq!(
        devices,
        json!([{"id": "Miaxis-USB-0", "name": "Miaxis FPR", "type": "USB"}])
    );

    let version = result(
        reader
            .dispatch_value(json!({"method": "getPlatformVersion"}))
            .await,
    );
    assert!(version.as_str().unwrap().contains(std::env::consts::ARCH));
}

#[tokio::test]
async fn test_cancel_without_capture_succeeds() {
    let (reader, _mock, mut status) = common::reader();

    let response = reader.dispatch_value(json!({"method": "cancel"})).await;
    assert_eq!(result(response), Value::Null);
    assert_eq!(next_event(&mut status).await, StatusEvent::idle("cancelled"));
}
