// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tool-facing event adapter: a port trait plus a channel-backed
//! implementation wrapping the receiver returned by [`crate::RpcClient`].
//! Consumers (timeline session, headless driver, tests) drain events through
//! the port without knowing about the socket.

use replay_protocol::PushEvent;
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};

/// Abstract port for receiving push events.
pub trait EventPort {
    /// Drain up to `max` events that are immediately available.
    fn drain_events(&mut self, max: usize) -> Vec<PushEvent>;
    /// Whether the producing side has gone away.
    fn is_closed(&self) -> bool;
}

/// Channel-backed event port.
#[derive(Default)]
pub struct ChannelEvents {
    rx: Option<UnboundedReceiver<PushEvent>>,
    closed: bool,
}

impl ChannelEvents {
    /// Port over an existing receiver.
    pub fn new(rx: UnboundedReceiver<PushEvent>) -> Self {
        Self {
            rx: Some(rx),
            closed: false,
        }
    }

    /// Replace the underlying receiver (e.g. after reconnecting).
    pub fn set_receiver(&mut self, rx: UnboundedReceiver<PushEvent>) {
        self.rx = Some(rx);
        self.closed = false;
    }
}

impl EventPort for ChannelEvents {
    fn drain_events(&mut self, max: usize) -> Vec<PushEvent> {
        let mut out = Vec::new();
        if let Some(rx) = &mut self.rx {
            for _ in 0..max {
                match rx.try_recv() {
                    Ok(event) => out.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.closed = true;
                        break;
                    }
                }
            }
        }
        out
    }

    fn is_closed(&self) -> bool {
        self.closed || self.rx.is_none()
    }
}
