// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON envelopes for the replay socket.
//!
//! Outbound: `{ id, method, params, sessionId?, pauseId? }`.
//! Inbound: either a response `{ id, result }` / `{ id, error }` or a push
//! event `{ method, params }` (no id).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{PauseId, SessionId};

/// Errors raised while encoding or decoding envelopes.
#[derive(Debug, Error)]
pub enum WireError {
    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Message is valid JSON but not a response or event.
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Outbound request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Monotonically increasing id; responses are matched on it.
    pub id: u64,
    /// Method name, e.g. `Analysis.createAnalysis`.
    pub method: String,
    /// Method params.
    pub params: Value,
    /// Session the request is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Pause the request is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_id: Option<PauseId>,
}

/// Error payload carried by a failed response.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ErrorPayload {
    /// Numeric error code.
    pub code: i64,
    /// Human readable message.
    pub message: String,
    /// Optional machine-readable details.
    #[serde(default)]
    pub data: Option<Value>,
}

impl serde::Serialize for ErrorPayload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut m = serializer.serialize_map(Some(3))?;
        m.serialize_entry("code", &self.code)?;
        m.serialize_entry("message", &self.message)?;
        m.serialize_entry("data", &self.data)?;
        m.end()
    }
}

/// Push event as received, before typed decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    /// Event method name.
    pub method: String,
    /// Event params.
    pub params: Value,
}

/// Classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Answer to the request with the same id.
    Response {
        /// Request id being answered.
        id: u64,
        /// Result or remote error.
        result: Result<Value, ErrorPayload>,
    },
    /// Unsolicited push event.
    Event(EventEnvelope),
}

#[derive(Deserialize)]
struct RawIncoming {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorPayload>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
}

/// Encode a request as a JSON text frame.
pub fn encode_request(request: &Request) -> Result<String, WireError> {
    Ok(serde_json::to_string(request)?)
}

/// Decode and classify an inbound JSON text frame.
pub fn decode_incoming(text: &str) -> Result<Incoming, WireError> {
    let raw: RawIncoming = serde_json::from_str(text)?;
    match (raw.id, raw.method) {
        (Some(id), _) => {
            let result = match raw.error {
                Some(error) => Err(error),
                None => Ok(raw.result.unwrap_or(Value::Null)),
            };
            Ok(Incoming::Response { id, result })
        }
        (None, Some(method)) => Ok(Incoming::Event(EventEnvelope {
            method,
            params: raw.params.unwrap_or(Value::Null),
        })),
        (None, None) => Err(WireError::Malformed(
            "message has neither id nor method".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use serde_json::json;

    #[test]
    fn request_omits_absent_scopes() {
        let req = Request {
            id: 3,
            method: "Graphics.findPaints".into(),
            params: json!({}),
            session_id: Some("s1".into()),
            pause_id: None,
        };
        let text = encode_request(&req).unwrap();
        let v: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["sessionId"], "s1");
        assert!(v.get("pauseId").is_none());
    }

    #[test]
    fn classifies_responses_errors_and_events() {
        match decode_incoming(r#"{"id":4,"result":{"sessionId":"abc"}}"#).unwrap() {
            Incoming::Response { id, result } => {
                assert_eq!(id, 4);
                assert_eq!(result.unwrap()["sessionId"], "abc");
            }
            other => panic!("expected response, got {other:?}"),
        }

        match decode_incoming(r#"{"id":5,"error":{"code":21,"message":"bad recording"}}"#)
            .unwrap()
        {
            Incoming::Response { result, .. } => {
                let err = result.unwrap_err();
                assert_eq!(err.code, 21);
                assert_eq!(err.message, "bad recording");
            }
            other => panic!("expected error response, got {other:?}"),
        }

        match decode_incoming(r#"{"method":"Debugger.resumed","params":{}}"#).unwrap() {
            Incoming::Event(env) => assert_eq!(env.method, "Debugger.resumed"),
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn rejects_anonymous_messages() {
        assert!(matches!(
            decode_incoming(r#"{"params":{}}"#),
            Err(WireError::Malformed(_))
        ));
        assert!(matches!(decode_incoming("not json"), Err(WireError::Json(_))));
    }
}
