// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scripted in-process transport.
//!
//! Records every request synchronously, in call order, and answers from a
//! script: queued one-shot replies first, then a sticky reply per method,
//! then built-in defaults (fresh session and analysis ids, an empty
//! recording description, `{}` for everything else).

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use replay_client::{ClientError, RequestScope, Transport};
use replay_protocol::methods::names;
use serde_json::{json, Value};

/// A request as the transport saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Method name.
    pub method: String,
    /// Encoded params.
    pub params: Value,
    /// Session/pause scope.
    pub scope: RequestScope,
}

#[derive(Debug, Clone)]
enum Reply {
    Value(Value),
    Fail(String),
}

#[derive(Default)]
struct Script {
    requests: Vec<RecordedRequest>,
    queued: HashMap<String, VecDeque<Reply>>,
    sticky: HashMap<String, Value>,
    delays: HashMap<String, Duration>,
    sessions: u64,
    analyses: u64,
}

impl Script {
    fn reply(&mut self, method: &str) -> Reply {
        if let Some(reply) = self.queued.get_mut(method).and_then(VecDeque::pop_front) {
            return reply;
        }
        if let Some(value) = self.sticky.get(method) {
            return Reply::Value(value.clone());
        }
        Reply::Value(match method {
            names::CREATE_SESSION => {
                self.sessions += 1;
                json!({ "sessionId": format!("session-{}", self.sessions) })
            }
            names::CREATE_ANALYSIS => {
                self.analyses += 1;
                json!({ "analysisId": format!("analysis-{}", self.analyses) })
            }
            names::GET_DESCRIPTION => json!({ "duration": 0.0 }),
            _ => json!({}),
        })
    }
}

/// Transport double answering from a script.
///
/// # Example
///
/// ```
/// use replay_client::{RequestScope, Transport};
/// use replay_dry_tests::ScriptedTransport;
/// use serde_json::json;
///
/// let transport = ScriptedTransport::new();
/// transport.post("Debugger.resume", &json!({}), RequestScope::none());
/// assert_eq!(transport.count("Debugger.resume"), 1);
/// ```
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Transport answering with defaults only.
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer every `method` request with `value` unless a queued reply is
    /// pending.
    pub fn respond_with(&self, method: &str, value: Value) {
        self.script().sticky.insert(method.to_string(), value);
    }

    /// Answer the next `method` request with `value`.
    pub fn queue_response(&self, method: &str, value: Value) {
        self.script()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(Reply::Value(value));
    }

    /// Fail the next `method` request with a remote error.
    pub fn fail_next(&self, method: &str, message: &str) {
        self.script()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(Reply::Fail(message.to_string()));
    }

    /// Hold every `method` answer back by `delay` on the tokio clock.
    pub fn delay(&self, method: &str, delay: Duration) {
        self.script().delays.insert(method.to_string(), delay);
    }

    /// Every request so far, in call order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script().requests.clone()
    }

    /// Requests for `method`, in call order.
    pub fn requests_for(&self, method: &str) -> Vec<RecordedRequest> {
        self.script()
            .requests
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    /// Number of requests for `method`.
    pub fn count(&self, method: &str) -> usize {
        self.script()
            .requests
            .iter()
            .filter(|r| r.method == method)
            .count()
    }
}

impl Transport for ScriptedTransport {
    fn send_raw(
        &self,
        method: &str,
        params: Value,
        scope: RequestScope,
    ) -> impl Future<Output = Result<Value, ClientError>> + Send {
        let (reply, delay) = {
            let mut script = self.script();
            script.requests.push(RecordedRequest {
                method: method.to_string(),
                params,
                scope,
            });
            (script.reply(method), script.delays.get(method).copied())
        };
        let method = method.to_string();
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match reply {
                Reply::Value(value) => Ok(value),
                Reply::Fail(message) => Err(ClientError::Remote {
                    method,
                    code: -1,
                    message,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use replay_protocol::methods::{CreateAnalysisResult, Empty};

    #[tokio::test]
    async fn defaults_hand_out_fresh_analysis_ids() {
        let transport = ScriptedTransport::new();
        let a: CreateAnalysisResult = transport
            .call(names::CREATE_ANALYSIS, &Empty {}, RequestScope::none())
            .await
            .unwrap();
        let b: CreateAnalysisResult = transport
            .call(names::CREATE_ANALYSIS, &Empty {}, RequestScope::none())
            .await
            .unwrap();
        assert_ne!(a.analysis_id, b.analysis_id);
    }

    #[tokio::test]
    async fn queued_replies_precede_sticky_ones() {
        let transport = ScriptedTransport::new();
        transport.respond_with("X.y", json!(1));
        transport.queue_response("X.y", json!(2));
        transport.fail_next("X.y", "nope");
        let first = transport.send_raw("X.y", Value::Null, RequestScope::none()).await;
        let second = transport.send_raw("X.y", Value::Null, RequestScope::none()).await;
        let third = transport.send_raw("X.y", Value::Null, RequestScope::none()).await;
        assert_eq!(first.unwrap(), json!(2));
        assert!(matches!(second, Err(ClientError::Remote { .. })));
        assert_eq!(third.unwrap(), json!(1));
    }

    #[tokio::test(start_paused = true)]
    async fn requests_are_recorded_at_call_time() {
        let transport = ScriptedTransport::new();
        transport.delay("Slow.call", Duration::from_secs(5));
        let pending = transport.send_raw("Slow.call", json!({ "n": 1 }), RequestScope::none());
        transport.post("Fast.call", &json!({}), RequestScope::none());
        let methods: Vec<_> = transport.requests().into_iter().map(|r| r.method).collect();
        assert_eq!(methods, vec!["Slow.call", "Fast.call"]);
        assert_eq!(pending.await.unwrap(), json!({}));
    }
}
