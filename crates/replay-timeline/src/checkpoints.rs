// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Checkpoint time table.
//!
//! Maps checkpoint ids to their execution point, wall-clock time and the
//! widget events (paints, mouse events) observed inside them. The time of
//! an arbitrary point is interpolated between the nearest known points on
//! either side of it.

use std::collections::BTreeMap;

use replay_protocol::{CheckpointId, ExecutionPoint, FIRST_CHECKPOINT_ID};
use tracing::{debug, warn};

/// Relative time difference under which two points count as similar.
const SIMILAR_FRACTION: f64 = 0.001;

/// A paint or mouse event pinned to a point and time.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetEvent {
    /// Where the event happened.
    pub point: ExecutionPoint,
    /// Wall-clock time in ms.
    pub time: f64,
}

/// What is known about one checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointInfo {
    /// The checkpoint's own point.
    pub point: ExecutionPoint,
    /// Wall-clock time in ms.
    pub time: f64,
    /// Widget events inside the checkpoint, ordered by point.
    pub widget_events: Vec<WidgetEvent>,
}

/// Append-only table of checkpoint times.
#[derive(Debug, Clone)]
pub struct CheckpointTable {
    entries: BTreeMap<CheckpointId, CheckpointInfo>,
    // Widget events for checkpoints whose time has not arrived yet.
    early_widgets: BTreeMap<CheckpointId, Vec<WidgetEvent>>,
}

impl Default for CheckpointTable {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_by_point(events: &mut Vec<WidgetEvent>, event: WidgetEvent) {
    let idx = events.partition_point(|e| !event.point.precedes(&e.point));
    events.insert(idx, event);
}

impl CheckpointTable {
    /// Table holding only the first checkpoint, at time zero.
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            FIRST_CHECKPOINT_ID,
            CheckpointInfo {
                point: ExecutionPoint::first(),
                time: 0.0,
                widget_events: Vec::new(),
            },
        );
        Self {
            entries,
            early_widgets: BTreeMap::new(),
        }
    }

    /// Record a checkpoint's time and the progress its point starts at.
    /// Interpolation inside the previous checkpoint spans up to that
    /// progress, so a checkpoint recorded at progress zero behind another
    /// at progress zero leaves nothing to interpolate across.
    pub fn record_time(&mut self, checkpoint: CheckpointId, progress: f64, time: f64) {
        self.record_checkpoint(ExecutionPoint::new(checkpoint, progress), time);
    }

    /// Record a checkpoint from its point. Known checkpoints keep their
    /// first recorded time.
    pub fn record_checkpoint(&mut self, point: ExecutionPoint, time: f64) {
        let id = point.checkpoint;
        if let Some(existing) = self.entries.get(&id) {
            debug!(checkpoint = id, known = existing.time, time, "checkpoint already recorded");
            return;
        }
        let mut widget_events = Vec::new();
        for event in self.early_widgets.remove(&id).unwrap_or_default() {
            insert_by_point(&mut widget_events, event);
        }
        self.entries.insert(
            id,
            CheckpointInfo {
                point,
                time,
                widget_events,
            },
        );
    }

    /// Attach a widget event to the checkpoint containing `point`.
    pub fn record_widget_event(&mut self, point: ExecutionPoint, time: f64) {
        let event = WidgetEvent { point, time };
        match self.entries.get_mut(&event.point.checkpoint) {
            Some(info) => insert_by_point(&mut info.widget_events, event),
            None => self
                .early_widgets
                .entry(event.point.checkpoint)
                .or_default()
                .push(event),
        }
    }

    /// Info for a checkpoint, if known.
    pub fn checkpoint(&self, checkpoint: CheckpointId) -> Option<&CheckpointInfo> {
        self.entries.get(&checkpoint)
    }

    /// Number of known checkpoints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the first checkpoint is always known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last known checkpoint.
    pub fn last_checkpoint(&self) -> Option<&CheckpointInfo> {
        self.entries.values().next_back()
    }

    /// Point of the last known checkpoint.
    pub fn last_checkpoint_point(&self) -> ExecutionPoint {
        self.last_checkpoint()
            .map_or_else(ExecutionPoint::first, |info| info.point.clone())
    }

    /// Time of the last known checkpoint.
    pub fn recording_end_time(&self) -> f64 {
        self.last_checkpoint().map_or(0.0, |info| info.time)
    }

    /// Wall-clock time of `point`.
    ///
    /// Unknown checkpoints fall back to the recording end time. Inside the
    /// newest checkpoint the checkpoint's own time is used. Otherwise the
    /// bracket `[checkpoint, next checkpoint]` is narrowed with the widget
    /// events on either side of `point` and the time is interpolated on
    /// progress.
    pub fn time_for_point(&self, point: &ExecutionPoint) -> f64 {
        let Some(info) = self.entries.get(&point.checkpoint) else {
            warn!(%point, "time requested for unknown checkpoint");
            return self.recording_end_time();
        };
        let Some(next) = self.entries.get(&(point.checkpoint + 1)) else {
            return info.time;
        };

        let (mut prev_point, mut prev_time) = (&info.point, info.time);
        let (mut next_point, mut next_time) = (&next.point, next.time);
        for event in &info.widget_events {
            if prev_point.precedes(&event.point) && !point.precedes(&event.point) {
                prev_point = &event.point;
                prev_time = event.time;
            }
            if point.precedes(&event.point) && event.point.precedes(next_point) {
                next_point = &event.point;
                next_time = event.time;
            }
        }

        if point.equals(prev_point) {
            return prev_time;
        }
        let span = next_point.progress - prev_point.progress;
        let fraction = (point.progress - prev_point.progress) / span;
        if !fraction.is_finite() {
            return prev_time;
        }
        fraction
            .clamp(0.0, 1.0)
            .mul_add(next_time - prev_time, prev_time)
    }

    /// Nearest known point (checkpoint or widget event) to `time`.
    pub fn closest_point_to_time(&self, time: f64) -> ExecutionPoint {
        let Some(containing) = self
            .entries
            .values()
            .take_while(|info| info.time <= time)
            .last()
            .or_else(|| self.entries.values().next())
        else {
            return ExecutionPoint::first();
        };
        let next = self.entries.get(&(containing.point.checkpoint + 1));

        let candidates = std::iter::once((&containing.point, containing.time))
            .chain(containing.widget_events.iter().map(|e| (&e.point, e.time)))
            .chain(next.map(|info| (&info.point, info.time)));
        let mut best: Option<(&ExecutionPoint, f64)> = None;
        for (candidate, at) in candidates {
            let closer = best.is_none_or(|(_, best_at)| (time - at).abs() < (time - best_at).abs());
            if closer {
                best = Some((candidate, at));
            }
        }
        best.map_or_else(ExecutionPoint::first, |(point, _)| point.clone())
    }

    /// True when the two points are within a thousandth of the recording's
    /// length of each other.
    pub fn similar_points(&self, a: &ExecutionPoint, b: &ExecutionPoint) -> bool {
        let end = self.recording_end_time();
        let delta = (self.time_for_point(a) - self.time_for_point(b)).abs();
        if end <= 0.0 {
            return delta <= 0.0;
        }
        delta / end < SIMILAR_FRACTION
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn table_with_two() -> CheckpointTable {
        let mut table = CheckpointTable::new();
        table.record_checkpoint(ExecutionPoint::new(2, 1.0), 1000.0);
        table
    }

    #[test]
    fn interpolates_halfway() {
        let table = table_with_two();
        let t = table.time_for_point(&ExecutionPoint::new(1, 0.5));
        assert!((t - 500.0).abs() < 1e-9);
    }

    #[test]
    fn recorded_times_interpolate_by_progress() {
        let mut table = CheckpointTable::new();
        table.record_time(2, 1.0, 1000.0);
        let t = table.time_for_point(&ExecutionPoint::new(1, 0.5));
        assert!((t - 500.0).abs() < 1e-9);
        assert_eq!(table.checkpoint(2).unwrap().point, ExecutionPoint::new(2, 1.0));
    }

    #[test]
    fn checkpoint_points_map_to_their_time() {
        let table = table_with_two();
        assert_eq!(table.time_for_point(&ExecutionPoint::first()), 0.0);
        assert_eq!(table.time_for_point(&ExecutionPoint::new(2, 1.0)), 1000.0);
    }

    #[test]
    fn newest_checkpoint_uses_its_own_time() {
        let table = table_with_two();
        assert_eq!(table.time_for_point(&ExecutionPoint::new(2, 50.0)), 1000.0);
    }

    #[test]
    fn unknown_checkpoint_falls_back_to_end_time() {
        let table = table_with_two();
        assert_eq!(table.time_for_point(&ExecutionPoint::new(9, 0.0)), 1000.0);
    }

    #[test]
    fn zero_span_falls_back_to_previous_time() {
        let mut table = CheckpointTable::new();
        table.record_time(2, 0.0, 800.0);
        assert_eq!(table.time_for_point(&ExecutionPoint::new(1, 0.0)), 0.0);
        let inside = ExecutionPoint::new(1, 0.0).with_position(replay_protocol::Position {
            kind: "Break".into(),
            script: 1,
            offset: 1,
            frame_index: 0,
        });
        assert_eq!(table.time_for_point(&inside), 0.0);
    }

    #[test]
    fn widget_events_tighten_both_sides() {
        let mut table = table_with_two();
        table.record_widget_event(ExecutionPoint::new(1, 0.2), 100.0);
        table.record_widget_event(ExecutionPoint::new(1, 0.6), 700.0);
        // Between 0.2@100 and 0.6@700.
        let t = table.time_for_point(&ExecutionPoint::new(1, 0.4));
        assert!((t - 400.0).abs() < 1e-9);
        assert_eq!(table.time_for_point(&ExecutionPoint::new(1, 0.2)), 100.0);
    }

    #[test]
    fn early_widget_events_attach_when_checkpoint_arrives() {
        let mut table = CheckpointTable::new();
        table.record_widget_event(ExecutionPoint::new(2, 1.5), 1200.0);
        assert!(table.checkpoint(2).is_none());
        table.record_checkpoint(ExecutionPoint::new(2, 1.0), 1000.0);
        assert_eq!(table.checkpoint(2).unwrap().widget_events.len(), 1);
    }

    #[test]
    fn first_record_wins() {
        let mut table = table_with_two();
        table.record_time(2, 1.0, 5.0);
        assert_eq!(table.checkpoint(2).unwrap().time, 1000.0);
        assert_eq!(table.recording_end_time(), 1000.0);
    }

    #[test]
    fn closest_point_considers_widgets_and_next_checkpoint() {
        let mut table = table_with_two();
        table.record_widget_event(ExecutionPoint::new(1, 0.3), 300.0);
        assert_eq!(table.closest_point_to_time(320.0), ExecutionPoint::new(1, 0.3));
        assert_eq!(table.closest_point_to_time(900.0), ExecutionPoint::new(2, 1.0));
        assert_eq!(table.closest_point_to_time(10.0), ExecutionPoint::first());
        assert_eq!(table.closest_point_to_time(5000.0), ExecutionPoint::new(2, 1.0));
    }

    #[test]
    fn similar_points_use_a_thousandth_of_the_recording() {
        let table = table_with_two();
        let a = ExecutionPoint::new(1, 0.5);
        let b = ExecutionPoint::new(1, 0.5005);
        let c = ExecutionPoint::new(1, 0.6);
        assert!(table.similar_points(&a, &b));
        assert!(!table.similar_points(&a, &c));
        assert!(CheckpointTable::new().similar_points(&a, &a));
    }
}
