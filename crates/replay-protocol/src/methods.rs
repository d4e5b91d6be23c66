// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Outbound method names and their typed params/results.

use serde::{Deserialize, Serialize};

use crate::{AnalysisId, ExecutionPoint, SessionId};

/// Method names used by the timeline core.
pub mod names {
    /// Create a session for a recording.
    pub const CREATE_SESSION: &str = "Session.createSession";
    /// Fetch recording metadata.
    pub const GET_DESCRIPTION: &str = "Recording.getDescription";
    /// Start streaming mouse events.
    pub const FIND_MOUSE_EVENTS: &str = "Session.findMouseEvents";
    /// Start streaming paint points.
    pub const FIND_PAINTS: &str = "Graphics.findPaints";
    /// Fetch the screenshot painted at a point.
    pub const GET_PAINT_CONTENTS: &str = "Graphics.getPaintContents";
    /// Jump to an execution point.
    pub const TIME_WARP: &str = "Debugger.timeWarp";
    /// Run forward to the next breakpoint.
    pub const RESUME: &str = "Debugger.resume";
    /// Run backward to the previous breakpoint.
    pub const REWIND: &str = "Debugger.rewind";
    /// Step over forward.
    pub const STEP_OVER: &str = "Debugger.stepOver";
    /// Step over backward.
    pub const REVERSE_STEP_OVER: &str = "Debugger.reverseStepOver";
    /// Step into.
    pub const STEP_IN: &str = "Debugger.stepIn";
    /// Step out.
    pub const STEP_OUT: &str = "Debugger.stepOut";
    /// Create an analysis.
    pub const CREATE_ANALYSIS: &str = "Analysis.createAnalysis";
    /// Add a location entry point to an analysis.
    pub const ADD_LOCATION: &str = "Analysis.addLocation";
    /// Add event handler entry points to an analysis.
    pub const ADD_EVENT_HANDLER_ENTRY_POINTS: &str = "Analysis.addEventHandlerEntryPoints";
    /// Add exception points to an analysis.
    pub const ADD_EXCEPTION_POINTS: &str = "Analysis.addExceptionPoints";
    /// Add random points to an analysis.
    pub const ADD_RANDOM_POINTS: &str = "Analysis.addRandomPoints";
    /// Start evaluating an analysis.
    pub const RUN_ANALYSIS: &str = "Analysis.runAnalysis";
    /// Start streaming the points an analysis hits.
    pub const FIND_ANALYSIS_POINTS: &str = "Analysis.findAnalysisPoints";
    /// Release an analysis.
    pub const RELEASE_ANALYSIS: &str = "Analysis.releaseAnalysis";

    /// Push: the debuggee paused.
    pub const PAUSED: &str = "Debugger.paused";
    /// Push: the debuggee resumed.
    pub const RESUMED: &str = "Debugger.resumed";
    /// Push: a batch of paints.
    pub const PAINT_POINTS: &str = "Graphics.paintPoints";
    /// Push: a batch of mouse events.
    pub const MOUSE_EVENTS: &str = "Session.mouseEvents";
    /// Push: evaluated analysis results.
    pub const ANALYSIS_RESULT: &str = "Analysis.analysisResult";
    /// Push: points an analysis hits.
    pub const ANALYSIS_POINTS: &str = "Analysis.analysisPoints";
    /// Push: a checkpoint became known.
    pub const NEW_CHECKPOINT: &str = "Session.newCheckpoint";
}

/// Source location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Script id.
    pub script_id: String,
    /// 1-based line.
    pub line: u32,
    /// 0-based column.
    pub column: u32,
}

/// Params with no fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Params naming a recording (`Session.createSession`,
/// `Recording.getDescription`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingParams {
    /// Recording to open.
    pub recording_id: String,
}

/// `Session.createSession` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResult {
    /// New session id.
    pub session_id: SessionId,
}

/// `Recording.getDescription` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingDescription {
    /// Recording length in milliseconds.
    pub duration: f64,
    /// Optional title.
    #[serde(default)]
    pub title: Option<String>,
}

/// `Debugger.timeWarp` params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWarpParams {
    /// Destination.
    pub point: ExecutionPoint,
}

/// Params for resume/rewind/step commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeParams {
    /// Point to resume from.
    pub point: ExecutionPoint,
}

/// `Analysis.createAnalysis` params.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnalysisParams {
    /// Program evaluated at every entry point.
    pub mapper: String,
    /// Whether the mapper may run effectful commands.
    pub effectful: bool,
}

/// `Analysis.createAnalysis` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnalysisResult {
    /// New analysis id.
    pub analysis_id: AnalysisId,
}

/// `Analysis.addLocation` params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLocationParams {
    /// Analysis to extend.
    pub analysis_id: AnalysisId,
    /// Owning session.
    pub session_id: SessionId,
    /// Location whose executions become entry points.
    pub location: Location,
    /// Restrict hits to calls made while this point's frame is on the stack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_stack_frame: Option<ExecutionPoint>,
}

/// `Analysis.addEventHandlerEntryPoints` params.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEventHandlerEntryPointsParams {
    /// Analysis to extend.
    pub analysis_id: AnalysisId,
    /// Owning session.
    pub session_id: SessionId,
    /// DOM event type, e.g. `click`.
    pub event_type: String,
}

/// `Analysis.addExceptionPoints` params.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddExceptionPointsParams {
    /// Analysis to extend.
    pub analysis_id: AnalysisId,
    /// Owning session.
    pub session_id: SessionId,
}

/// `Analysis.addRandomPoints` params.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRandomPointsParams {
    /// Analysis to extend.
    pub analysis_id: AnalysisId,
    /// Owning session.
    pub session_id: SessionId,
    /// Number of points to pick.
    pub num_points: u32,
}

/// Params for `runAnalysis`, `findAnalysisPoints` and `releaseAnalysis`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisParams {
    /// Target analysis.
    pub analysis_id: AnalysisId,
}

/// `Graphics.getPaintContents` params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPaintContentsParams {
    /// Paint point.
    pub point: ExecutionPoint,
    /// Requested encoding.
    pub mime_type: String,
}

/// Screenshot descriptor attached to paint points (no pixel data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenShotDescriptor {
    /// Encoding.
    pub mime_type: String,
    /// Content hash.
    pub hash: String,
}

/// Full screenshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenShot {
    /// Encoding.
    pub mime_type: String,
    /// Content hash.
    pub hash: String,
    /// Base64 image data.
    pub data: String,
}

/// `Graphics.getPaintContents` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaintContentsResult {
    /// The screenshot.
    pub screen: ScreenShot,
}

/// Screenshot encoding requested from the backend.
pub const PAINT_MIME_TYPE: &str = "image/jpeg";
