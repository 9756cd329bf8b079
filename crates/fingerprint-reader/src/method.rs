//! Method-call surface.
//!
//! Maps named calls with JSON arguments onto a [`FingerprintReader`], one to
//! one, producing a JSON success value or a `{code, message}` error. The
//! transport that carries these values is up to the embedding layer; the CLI
//! uses JSON lines.
//!
//! | method               | arguments                 | success value              |
//! |----------------------|---------------------------|----------------------------|
//! | `getPlatformVersion` |                           | string                     |
//! | `listDevices`        |                           | `[{id, name, type}]`       |
//! | `open`               | `deviceId?`               | `true`                     |
//! | `close`              |                           | `null`                     |
//! | `capture`            | `mode?`, `timeoutMs?`     | `{mode, bytes, quality}`   |
//! | `cancel`             |                           | `null`                     |

use fingerprint_core::constants::{DEFAULT_MODE, MISSING_QUALITY};
use fingerprint_core::{ErrorKind, ReaderError, Result};
use fingerprint_hardware::FingerprintScanner;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::reader::FingerprintReader;

const METHODS: [&str; 6] = [
    "getPlatformVersion",
    "listDevices",
    "open",
    "close",
    "capture",
    "cancel",
];

/// A decoded method call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum MethodCall {
    GetPlatformVersion,
    ListDevices,
    Open {
        #[serde(default, rename = "deviceId")]
        device_id: Option<String>,
    },
    Close,
    Capture {
        #[serde(default)]
        mode: Option<String>,
        #[serde(default, rename = "timeoutMs")]
        timeout_ms: Option<i64>,
    },
    Cancel,
}

impl MethodCall {
    /// Decode a call object such as `{"method": "capture", "mode": "ansi378"}`.
    ///
    /// # Errors
    ///
    /// - `NOT_IMPLEMENTED` for a missing or unknown method name
    /// - `BAD_ARGS` for a known method with malformed arguments
    pub fn from_value(value: Value) -> Result<Self> {
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ReaderError::new(ErrorKind::NotImplemented, "Missing method name"))?;

        if !METHODS.contains(&method.as_str()) {
            return Err(ReaderError::new(
                ErrorKind::NotImplemented,
                format!("Unknown method: {method}"),
            ));
        }

        serde_json::from_value(value)
            .map_err(|e| ReaderError::new(ErrorKind::BadArguments, format!("{method}: {e}")))
    }

    /// Method name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetPlatformVersion => "getPlatformVersion",
            Self::ListDevices => "listDevices",
            Self::Open { .. } => "open",
            Self::Close => "close",
            Self::Capture { .. } => "capture",
            Self::Cancel => "cancel",
        }
    }
}

/// Success value of `capture`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureResponse {
    /// Mode name as the caller sent it.
    pub mode: String,
    pub bytes: Vec<u8>,
    /// NFIQ score, `-1` when unavailable.
    pub quality: i32,
}

/// Wire form of a call's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MethodResponse {
    Success { result: Value },
    Error { code: String, message: String },
}

impl From<Result<Value>> for MethodResponse {
    fn from(result: Result<Value>) -> Self {
        match result {
            Ok(result) => Self::Success { result },
            Err(e) => Self::Error {
                code: e.code().to_string(),
                message: e.detail,
            },
        }
    }
}

impl<S: FingerprintScanner> FingerprintReader<S> {
    /// Execute one method call.
    ///
    /// # Errors
    ///
    /// Returns the failure of the underlying operation.
    pub async fn dispatch(&self, call: MethodCall) -> Result<Value> {
        debug!(method = call.name(), "Dispatching method call");

        match call {
            MethodCall::GetPlatformVersion => Ok(Value::String(self.platform_version())),
            MethodCall::ListDevices => to_value(&self.list_devices()),
            MethodCall::Open { device_id } => {
                let opened = self.open(device_id.as_deref()).await?;
                Ok(Value::Bool(opened))
            }
            MethodCall::Close => {
                self.close().await;
                Ok(Value::Null)
            }
            MethodCall::Capture { mode, timeout_ms } => {
                let mode = mode.unwrap_or_else(|| DEFAULT_MODE.to_string());
                let captured = self.capture(&mode, timeout_ms).await?;
                to_value(&CaptureResponse {
                    mode,
                    bytes: captured.payload,
                    quality: captured.quality.unwrap_or(MISSING_QUALITY),
                })
            }
            MethodCall::Cancel => {
                self.cancel();
                Ok(Value::Null)
            }
        }
    }

    /// Decode and execute a raw call object.
    pub async fn dispatch_value(&self, value: Value) -> MethodResponse {
        let result = match MethodCall::from_value(value) {
            Ok(call) => self.dispatch(call).await,
            Err(e) => Err(e),
        };
        MethodResponse::from(result)
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ReaderError::capture_exception(e.to_string()))
}
