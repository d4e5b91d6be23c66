// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire schema for the replay session protocol.
//!
//! The replay backend speaks JSON over a single multiplexed socket: requests
//! carry a monotonically increasing `id` and are answered by a response with
//! the same id, while push events are identified by their `method` name.
//!
//! This crate owns the value types that cross that boundary:
//!
//! - [`ExecutionPoint`]: coordinates inside a recording and their total order.
//! - [`wire`]: request/response/event envelopes.
//! - [`methods`]: method names and typed params/results for outbound calls.
//! - [`events`]: typed push events.
//! - [`pause_data`]: pause data (frames, scopes, objects) and its two-pass
//!   resolution into immutable value trees.

mod point;

pub mod events;
pub mod methods;
pub mod pause_data;
pub mod wire;

pub use events::{
    AnalysisEntry, AnalysisPoint, AnalysisPointsEvent, AnalysisResultEvent, MouseEvent,
    MouseEventKind, MouseEventsEvent, NewCheckpointEvent, PaintPoint, PaintPointsEvent,
    PausedEvent, PushEvent,
};
pub use methods::{Location, ScreenShot, ScreenShotDescriptor};
pub use point::{CheckpointId, ExecutionPoint, Position, FIRST_CHECKPOINT_ID};
pub use wire::{ErrorPayload, EventEnvelope, Incoming, Request, WireError};

/// Server-assigned session identifier.
pub type SessionId = String;
/// Identifier of a pause (a point where the backend can be inspected).
pub type PauseId = String;
/// Identifier of a remote analysis.
pub type AnalysisId = String;
/// Identifier of an object inside pause data.
pub type ObjectId = String;
/// Identifier of a stack frame inside pause data.
pub type FrameId = String;

/// Default dispatch endpoint for the replay backend.
///
/// Honors `REPLAY_DISPATCH` when set so local backends can be targeted
/// without touching config files.
pub fn default_dispatch_address() -> String {
    std::env::var("REPLAY_DISPATCH").unwrap_or_else(|_| "wss://dispatch.webreplay.io".to_string())
}
