// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Timeline core for a replay debugger.
//!
//! Maps execution points to wall-clock time, indexes paints and mouse
//! events, drives seeking and playback, and runs logpoint analyses against
//! a replay backend.
//!
//! - [`checkpoints`]: checkpoint times and point-to-time interpolation.
//! - [`event_index`]: time-sorted paint, mouse and click series.
//! - [`graphics`]: screenshot cache and graphics-at-time lookup.
//! - [`logpoint`]: logpoint analyses and result routing.
//! - [`scheduler`]: seek, step, zoom and playback state machine.
//! - [`playback`]: the time-based playback loop.
//! - [`session`]: the actor tying them to a transport.

pub mod checkpoints;
pub mod error;
pub mod event_index;
pub mod graphics;
pub mod logpoint;
pub mod mapper;
pub mod playback;
pub mod scheduler;
pub mod session;

pub use checkpoints::{CheckpointInfo, CheckpointTable, WidgetEvent};
pub use error::TimelineError;
pub use event_index::{EventIndex, MouseOverlay, Timed, TimedEntry};
pub use graphics::{Graphics, GraphicsPlan, ScreenCache};
pub use logpoint::{AnalysisPipeline, LogGroupId, LogpointHandler, LogpointMessage, PointLoading, ScriptUrls};
pub use playback::{FrameStep, PlaybackRun};
pub use scheduler::{ResumeKind, SchedulerTuning, Timeline, TimelineEffect, TimelineStatus, ZoomEdge, ZoomRegion};
pub use session::{SessionHandle, SessionView, TimelineSession, UserCommand};
