// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed push events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::methods::{names, Location, ScreenShotDescriptor};
use crate::wire::{EventEnvelope, WireError};
use crate::{AnalysisId, CheckpointId, ExecutionPoint, PauseId};

/// The debuggee paused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedEvent {
    /// Where it paused; absent when the backend only signals a pause.
    #[serde(default, alias = "executionPoint")]
    pub point: Option<ExecutionPoint>,
    /// Time of the pause, when known.
    #[serde(default)]
    pub time: Option<f64>,
    /// Pause id for follow-up inspection.
    #[serde(default)]
    pub pause_id: Option<PauseId>,
}

/// One discovered paint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaintPoint {
    /// Where the paint happened.
    pub point: ExecutionPoint,
    /// Wall-clock time in ms.
    pub time: f64,
    /// Screenshots available for this paint.
    #[serde(default)]
    pub screen_shots: Vec<ScreenShotDescriptor>,
}

/// A batch of paints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaintPointsEvent {
    /// Paints in arbitrary order.
    pub paints: Vec<PaintPoint>,
}

/// Kind of a recorded mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseEventKind {
    /// Pointer moved.
    Mousemove,
    /// Button pressed.
    Mousedown,
    /// Button released.
    Mouseup,
    /// Anything else the backend reports.
    #[serde(other)]
    Other,
}

/// One recorded mouse event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseEvent {
    /// Where it happened.
    pub point: ExecutionPoint,
    /// Wall-clock time in ms.
    pub time: f64,
    /// Event kind.
    pub kind: MouseEventKind,
    /// Viewport x coordinate.
    pub client_x: f64,
    /// Viewport y coordinate.
    pub client_y: f64,
}

/// A batch of mouse events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouseEventsEvent {
    /// Events in arbitrary order.
    pub events: Vec<MouseEvent>,
}

/// One evaluated analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisEntry {
    /// Point the result was computed at.
    pub key: ExecutionPoint,
    /// Mapper output; its shape is defined by the mapper program.
    pub value: Value,
}

/// A batch of evaluated analysis results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResultEvent {
    /// Analysis that produced the results.
    pub analysis_id: AnalysisId,
    /// Results in arbitrary order.
    pub results: Vec<AnalysisEntry>,
}

/// One point an analysis hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPoint {
    /// Hit point.
    pub point: ExecutionPoint,
    /// Wall-clock time in ms.
    pub time: f64,
    /// Frame location(s), generated first.
    #[serde(default)]
    pub frame: Vec<Location>,
}

/// A batch of analysis hit points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPointsEvent {
    /// Analysis that hit the points.
    pub analysis_id: AnalysisId,
    /// Points in arbitrary order.
    pub points: Vec<AnalysisPoint>,
}

/// A checkpoint became known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCheckpointEvent {
    /// Checkpoint id.
    pub checkpoint: CheckpointId,
    /// Progress counter value at the checkpoint; omitted by older backends.
    #[serde(default)]
    pub progress: f64,
    /// Wall-clock time in ms.
    pub time: f64,
}

impl NewCheckpointEvent {
    /// The checkpoint's own execution point.
    pub fn point(&self) -> ExecutionPoint {
        ExecutionPoint::new(self.checkpoint, self.progress)
    }
}

/// Push events the timeline core listens to.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// `Debugger.paused`.
    Paused(PausedEvent),
    /// `Debugger.resumed`.
    Resumed,
    /// `Graphics.paintPoints`.
    PaintPoints(PaintPointsEvent),
    /// `Session.mouseEvents`.
    MouseEvents(MouseEventsEvent),
    /// `Analysis.analysisResult`.
    AnalysisResult(AnalysisResultEvent),
    /// `Analysis.analysisPoints`.
    AnalysisPoints(AnalysisPointsEvent),
    /// `Session.newCheckpoint`.
    NewCheckpoint(NewCheckpointEvent),
}

impl PushEvent {
    /// Method names with a typed decoder.
    pub const METHODS: [&'static str; 7] = [
        names::PAUSED,
        names::RESUMED,
        names::PAINT_POINTS,
        names::MOUSE_EVENTS,
        names::ANALYSIS_RESULT,
        names::ANALYSIS_POINTS,
        names::NEW_CHECKPOINT,
    ];

    /// Decode an envelope. Returns `Ok(None)` for methods this crate does
    /// not know about.
    pub fn decode(envelope: &EventEnvelope) -> Result<Option<Self>, WireError> {
        let params = envelope.params.clone();
        let event = match envelope.method.as_str() {
            names::PAUSED => Self::Paused(serde_json::from_value(params)?),
            names::RESUMED => Self::Resumed,
            names::PAINT_POINTS => Self::PaintPoints(serde_json::from_value(params)?),
            names::MOUSE_EVENTS => Self::MouseEvents(serde_json::from_value(params)?),
            names::ANALYSIS_RESULT => Self::AnalysisResult(serde_json::from_value(params)?),
            names::ANALYSIS_POINTS => Self::AnalysisPoints(serde_json::from_value(params)?),
            names::NEW_CHECKPOINT => Self::NewCheckpoint(serde_json::from_value(params)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Canonical method name for this event.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Paused(_) => names::PAUSED,
            Self::Resumed => names::RESUMED,
            Self::PaintPoints(_) => names::PAINT_POINTS,
            Self::MouseEvents(_) => names::MOUSE_EVENTS,
            Self::AnalysisResult(_) => names::ANALYSIS_RESULT,
            Self::AnalysisPoints(_) => names::ANALYSIS_POINTS,
            Self::NewCheckpoint(_) => names::NEW_CHECKPOINT,
        }
    }
}
