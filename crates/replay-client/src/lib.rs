// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Client for the replay backend: JSON requests over a WebSocket, answered
//! by id, plus push events routed by method name.
//!
//! Requests are queued at call time, before the returned future is polled.
//! Dropping the future therefore still sends the request (fire-and-forget),
//! and requests leave the socket in call order. Requests issued before the
//! socket opens wait in the outbound queue and are flushed once the link runs.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use replay_protocol::wire::{decode_incoming, encode_request};
use replay_protocol::{
    ErrorPayload, Incoming, PauseId, PushEvent, Request, SessionId, WireError,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

pub mod tool;

pub use tool::{ChannelEvents, EventPort};

/// Errors surfaced to callers of the transport.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend answered with an error.
    #[error("{method} failed ({code}): {message}")]
    Remote {
        /// Method that failed.
        method: String,
        /// Backend error code.
        code: i64,
        /// Backend message.
        message: String,
    },
    /// The connection closed before an answer arrived.
    #[error("connection closed")]
    Closed,
    /// Params could not be serialized.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
    /// Result did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(#[source] serde_json::Error),
    /// Envelope-level failure.
    #[error(transparent)]
    Wire(#[from] WireError),
    /// WebSocket failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] Box<tungstenite::Error>),
    /// A listener for this method is already registered.
    #[error("duplicate event listener for {0}")]
    DuplicateListener(String),
}

impl From<tungstenite::Error> for ClientError {
    fn from(err: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

/// Session/pause a request is scoped to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestScope {
    /// Session scope.
    pub session_id: Option<SessionId>,
    /// Pause scope.
    pub pause_id: Option<PauseId>,
}

impl RequestScope {
    /// Unscoped request.
    pub fn none() -> Self {
        Self::default()
    }

    /// Request scoped to a session.
    pub fn session(session_id: &SessionId) -> Self {
        Self {
            session_id: Some(session_id.clone()),
            pause_id: None,
        }
    }
}

/// Request/response channel to the replay backend.
///
/// Implementations must queue the request when `send_raw` is called, not
/// when the returned future is first polled.
pub trait Transport: Clone + Send + Sync + 'static {
    /// Send `method` with raw JSON params.
    fn send_raw(
        &self,
        method: &str,
        params: Value,
        scope: RequestScope,
    ) -> impl Future<Output = Result<Value, ClientError>> + Send;

    /// Typed request.
    fn call<P, R>(
        &self,
        method: &str,
        params: &P,
        scope: RequestScope,
    ) -> impl Future<Output = Result<R, ClientError>> + Send
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let sent = serde_json::to_value(params).map(|p| self.send_raw(method, p, scope));
        async move {
            let value = sent.map_err(ClientError::Encode)?.await?;
            serde_json::from_value(value).map_err(ClientError::Decode)
        }
    }

    /// Send and ignore the answer. Remote failures are only logged.
    fn post<P: Serialize>(&self, method: &str, params: &P, scope: RequestScope) {
        match serde_json::to_value(params) {
            Ok(p) => drop(self.send_raw(method, p, scope)),
            Err(err) => warn!(method, ?err, "dropping unencodable request"),
        }
    }
}

/// Set of push-event methods the link forwards.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    methods: HashSet<String>,
}

impl EventTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding every typed [`PushEvent`] method.
    pub fn with_push_events() -> Self {
        let mut table = Self::new();
        for method in PushEvent::METHODS {
            table.methods.insert(method.to_string());
        }
        table
    }

    /// Register a method; registering the same method twice is an error.
    pub fn register(&mut self, method: &str) -> Result<(), ClientError> {
        if !self.methods.insert(method.to_string()) {
            return Err(ClientError::DuplicateListener(method.to_string()));
        }
        Ok(())
    }

    /// Stop forwarding a method.
    pub fn remove(&mut self, method: &str) {
        self.methods.remove(method);
    }

    /// Whether `method` is forwarded.
    pub fn handles(&self, method: &str) -> bool {
        self.methods.contains(method)
    }
}

struct Waiter {
    method: String,
    tx: oneshot::Sender<Result<Value, ErrorPayload>>,
}

struct Inner {
    next_id: AtomicU64,
    waiters: Mutex<HashMap<u64, Waiter>>,
    outbound: mpsc::UnboundedSender<String>,
}

impl Inner {
    fn waiters(&self) -> MutexGuard<'_, HashMap<u64, Waiter>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// WebSocket JSON-RPC client. Cheap to clone.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<Inner>,
}

/// Socket side of an [`RpcClient`]: pumps the outbound queue and
/// dispatches inbound messages.
pub struct Link {
    inner: Arc<Inner>,
    outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<PushEvent>,
    table: EventTable,
}

impl RpcClient {
    /// Create a client and its unattached link. Requests queue until
    /// [`Link::run`] starts.
    pub fn new(table: EventTable) -> (Self, Link, mpsc::UnboundedReceiver<PushEvent>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            next_id: AtomicU64::new(1),
            waiters: Mutex::new(HashMap::new()),
            outbound: out_tx,
        });
        let link = Link {
            inner: inner.clone(),
            outbound: out_rx,
            events: event_tx,
            table,
        };
        (Self { inner }, link, event_rx)
    }

    /// Connect to `address` and run the link on a background task.
    pub async fn connect(
        address: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PushEvent>, JoinHandle<()>), ClientError> {
        let (client, link, events) = Self::new(EventTable::with_push_events());
        let (socket, _response) = tokio_tungstenite::connect_async(address).await?;
        info!(%address, "socket open");
        let handle = tokio::spawn(link.run(socket));
        Ok((client, events, handle))
    }

    /// Requests still waiting for an answer, as `(id, method)`.
    pub fn outstanding(&self) -> Vec<(u64, String)> {
        let mut out: Vec<_> = self
            .inner
            .waiters()
            .iter()
            .map(|(id, w)| (*id, w.method.clone()))
            .collect();
        out.sort_unstable();
        out
    }
}

impl Transport for RpcClient {
    fn send_raw(
        &self,
        method: &str,
        params: Value,
        scope: RequestScope,
    ) -> impl Future<Output = Result<Value, ClientError>> + Send {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let method = method.to_string();
        let (tx, rx) = oneshot::channel();
        let request = Request {
            id,
            method: method.clone(),
            params,
            session_id: scope.session_id,
            pause_id: scope.pause_id,
        };
        let queued = encode_request(&request)
            .map_err(ClientError::from)
            .and_then(|text| {
                self.inner.waiters().insert(
                    id,
                    Waiter {
                        method: method.clone(),
                        tx,
                    },
                );
                self.inner.outbound.send(text).map_err(|_| {
                    self.inner.waiters().remove(&id);
                    ClientError::Closed
                })
            });

        async move {
            queued?;
            match rx.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => Err(ClientError::Remote {
                    method,
                    code: error.code,
                    message: error.message,
                }),
                Err(_) => Err(ClientError::Closed),
            }
        }
    }
}

impl Link {
    /// Pump messages until the socket closes, then fail every outstanding
    /// request with [`ClientError::Closed`].
    pub async fn run<S>(mut self, socket: S)
    where
        S: Stream<Item = Result<Message, tungstenite::Error>> + Sink<Message, Error = tungstenite::Error>,
    {
        let (mut write, mut read) = socket.split();
        loop {
            tokio::select! {
                out = self.outbound.recv() => {
                    let Some(text) = out else { break };
                    if let Err(err) = write.send(Message::Text(text.into())).await {
                        warn!(?err, "socket send failed");
                        break;
                    }
                }
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.dispatch(text.as_str()),
                    Some(Ok(Message::Close(frame))) => {
                        info!(?frame, "socket closed");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(?err, "socket error");
                        break;
                    }
                    None => break,
                }
            }
        }
        let dropped = std::mem::take(&mut *self.inner.waiters());
        if !dropped.is_empty() {
            warn!(outstanding = dropped.len(), "disconnected with requests in flight");
        }
    }

    /// Route one inbound text frame.
    pub fn dispatch(&self, text: &str) {
        match decode_incoming(text) {
            Ok(Incoming::Response { id, result }) => {
                let Some(waiter) = self.inner.waiters().remove(&id) else {
                    warn!(id, "response for unknown request");
                    return;
                };
                if let Err(error) = &result {
                    warn!(method = %waiter.method, code = error.code, message = %error.message, "message failed");
                }
                // The caller may have dropped its future (fire-and-forget).
                let _ = waiter.tx.send(result);
            }
            Ok(Incoming::Event(envelope)) => {
                if !self.table.handles(&envelope.method) {
                    warn!(method = %envelope.method, "received unknown message");
                    return;
                }
                match PushEvent::decode(&envelope) {
                    Ok(Some(event)) => {
                        debug!(method = %envelope.method, "push event");
                        let _ = self.events.send(event);
                    }
                    Ok(None) => debug!(method = %envelope.method, "no typed decoder"),
                    Err(err) => warn!(method = %envelope.method, ?err, "undecodable event"),
                }
            }
            Err(err) => warn!(?err, "undecodable message"),
        }
    }
}
