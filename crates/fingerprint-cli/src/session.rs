//! JSON-lines framing for the method surface.
//!
//! Each input line is one call object; an optional `id` is echoed back on the
//! matching response. Status events are interleaved on the same output with
//! `"type": "status"`.
//!
//! ```text
//! > {"id": 1, "method": "open"}
//! < {"type":"status","state":"idle","quality":null,"message":"opened"}
//! < {"id":1,"type":"success","result":true}
//! ```

use fingerprint_core::{ErrorKind, StatusEvent};
use fingerprint_reader::MethodResponse;
use serde::Serialize;
use serde_json::Value;

/// One line written to stdout.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Output {
    Response {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
        #[serde(flatten)]
        response: MethodResponse,
    },
    Status {
        #[serde(rename = "type")]
        kind: &'static str,
        #[serde(flatten)]
        event: StatusEvent,
    },
}

impl Output {
    pub fn response(id: Option<Value>, response: MethodResponse) -> Self {
        Self::Response { id, response }
    }

    pub fn status(event: StatusEvent) -> Self {
        Self::Status {
            kind: "status",
            event,
        }
    }

    /// Serialize as a single line, newline included.
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Split an input line into its request id and call object.
///
/// A line that is not a JSON object yields a ready-made `BAD_ARGS` response.
pub fn parse_line(line: &str) -> Result<(Option<Value>, Value), MethodResponse> {
    let value: Value = serde_json::from_str(line).map_err(|e| bad_args(e.to_string()))?;

    match value {
        Value::Object(mut call) => {
            let id = call.remove("id");
            Ok((id, Value::Object(call)))
        }
        other => Err(bad_args(format!("expected a call object, got {other}"))),
    }
}

fn bad_args(message: String) -> MethodResponse {
    MethodResponse::Error {
        code: ErrorKind::BadArguments.code().to_string(),
        message,
    }
}
