// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Push-event builders for tests.

use replay_protocol::events::{
    AnalysisEntry, AnalysisPoint, AnalysisPointsEvent, AnalysisResultEvent, MouseEvent,
    MouseEventKind, MouseEventsEvent, NewCheckpointEvent, PaintPoint, PaintPointsEvent,
    PausedEvent,
};
use replay_protocol::methods::{ScreenShotDescriptor, PAINT_MIME_TYPE};
use replay_protocol::{CheckpointId, ExecutionPoint, PushEvent};
use serde_json::{json, Value};

/// Point with no position.
pub fn point(checkpoint: CheckpointId, progress: f64) -> ExecutionPoint {
    ExecutionPoint::new(checkpoint, progress)
}

/// `Session.newCheckpoint`.
pub fn checkpoint(checkpoint: CheckpointId, progress: f64, time: f64) -> PushEvent {
    PushEvent::NewCheckpoint(NewCheckpointEvent {
        checkpoint,
        progress,
        time,
    })
}

/// A paint with one jpeg screenshot.
pub fn paint(point: ExecutionPoint, time: f64, hash: &str) -> PaintPoint {
    PaintPoint {
        point,
        time,
        screen_shots: vec![ScreenShotDescriptor {
            mime_type: PAINT_MIME_TYPE.to_string(),
            hash: hash.to_string(),
        }],
    }
}

/// `Graphics.paintPoints`.
pub fn paints(paints: Vec<PaintPoint>) -> PushEvent {
    PushEvent::PaintPoints(PaintPointsEvent { paints })
}

/// One mouse event.
pub fn mouse(kind: MouseEventKind, point: ExecutionPoint, time: f64, x: f64, y: f64) -> MouseEvent {
    MouseEvent {
        point,
        time,
        kind,
        client_x: x,
        client_y: y,
    }
}

/// `Session.mouseEvents`.
pub fn mouse_events(events: Vec<MouseEvent>) -> PushEvent {
    PushEvent::MouseEvents(MouseEventsEvent { events })
}

/// `Debugger.paused` at a known point and time.
pub fn paused(point: ExecutionPoint, time: f64) -> PushEvent {
    PushEvent::Paused(PausedEvent {
        point: Some(point),
        time: Some(time),
        pause_id: None,
    })
}

/// `Analysis.analysisPoints` without frame locations.
pub fn analysis_points(analysis_id: &str, hits: &[(ExecutionPoint, f64)]) -> PushEvent {
    PushEvent::AnalysisPoints(AnalysisPointsEvent {
        analysis_id: analysis_id.to_string(),
        points: hits
            .iter()
            .map(|(point, time)| AnalysisPoint {
                point: point.clone(),
                time: *time,
                frame: Vec::new(),
            })
            .collect(),
    })
}

/// `Analysis.analysisResult`.
pub fn analysis_result(analysis_id: &str, results: Vec<(ExecutionPoint, Value)>) -> PushEvent {
    PushEvent::AnalysisResult(AnalysisResultEvent {
        analysis_id: analysis_id.to_string(),
        results: results
            .into_iter()
            .map(|(key, value)| AnalysisEntry { key, value })
            .collect(),
    })
}

/// Mapper output for a plain logpoint hit.
pub fn logpoint_value(time: f64, values: &[Value]) -> Value {
    json!({
        "time": time,
        "pauseId": "pause-1",
        "location": [],
        "values": values,
        "data": {},
    })
}

/// `Graphics.getPaintContents` answer.
pub fn paint_contents(hash: &str) -> Value {
    json!({
        "screen": {
            "mimeType": PAINT_MIME_TYPE,
            "hash": hash,
            "data": format!("data-{hash}"),
        }
    })
}
