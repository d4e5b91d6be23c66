// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Seek, step, zoom and playback state for one timeline.
//!
//! [`Timeline`] performs no I/O. Operations that need the backend return a
//! [`TimelineEffect`] for the owner to carry out; the backend's answer comes
//! back later as [`Timeline::on_paused`].
//!
//! # Invariants
//!
//! - The execution point, playback point and zoom edges stay inside
//!   `[first point, recording endpoint]`, and seeks, steps and playback
//!   never leave the zoom region.
//! - Playback points advance monotonically and playback always ends exactly
//!   at the zoom region's end.

use replay_protocol::methods::names;
use replay_protocol::{ExecutionPoint, FIRST_CHECKPOINT_ID};
use tracing::{debug, instrument, trace, warn};

use crate::checkpoints::CheckpointTable;

/// Where the timeline is in its lifecycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TimelineStatus {
    /// Stopped at the execution point.
    #[default]
    Paused,
    /// Playing back through paints.
    Playing,
    /// Waiting for the backend to arrive at a new point.
    Seeking,
}

/// Backend-driven ways to leave the current pause.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResumeKind {
    /// Run forward to the next breakpoint.
    Resume,
    /// Run backward to the previous breakpoint.
    Rewind,
    /// Step over forward.
    StepOver,
    /// Step over backward.
    ReverseStepOver,
    /// Step into the next call.
    StepIn,
    /// Step out of the current frame.
    StepOut,
}

impl ResumeKind {
    /// Protocol method carrying out this kind of resume.
    pub fn method(self) -> &'static str {
        match self {
            Self::Resume => names::RESUME,
            Self::Rewind => names::REWIND,
            Self::StepOver => names::STEP_OVER,
            Self::ReverseStepOver => names::REVERSE_STEP_OVER,
            Self::StepIn => names::STEP_IN,
            Self::StepOut => names::STEP_OUT,
        }
    }
}

/// Work the owner of a [`Timeline`] must carry out.
#[derive(Clone, PartialEq, Debug)]
pub enum TimelineEffect {
    /// Ask the backend to travel to a point.
    TimeWarp(ExecutionPoint),
    /// Ask the backend to resume from a point.
    Resume {
        /// How to resume.
        kind: ResumeKind,
        /// Point to resume from.
        point: ExecutionPoint,
    },
    /// Show the graphics for a point without moving the backend.
    Paint(ExecutionPoint),
}

/// Visible slice of the recording.
#[derive(Clone, PartialEq, Debug)]
pub struct ZoomRegion {
    /// First visible point.
    pub start: ExecutionPoint,
    /// Last visible point.
    pub end: ExecutionPoint,
}

impl ZoomRegion {
    fn clamp(&self, point: ExecutionPoint) -> ExecutionPoint {
        if point.precedes(&self.start) {
            self.start.clone()
        } else if self.end.precedes(&point) {
            self.end.clone()
        } else {
            point
        }
    }

    fn contains(&self, point: &ExecutionPoint) -> bool {
        !point.precedes(&self.start) && !self.end.precedes(point)
    }
}

/// Which zoom edge to move.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ZoomEdge {
    /// The start edge.
    Start,
    /// The end edge.
    End,
}

/// Knobs for playback stepping and zoom dragging.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SchedulerTuning {
    /// Minimum wall-clock gap between consecutive playback points.
    pub min_step_ms: f64,
    /// Smallest drag, as a fraction of the visible width, that zooms.
    pub zoom_drag_threshold: f64,
}

impl Default for SchedulerTuning {
    fn default() -> Self {
        Self {
            min_step_ms: 100.0,
            zoom_drag_threshold: 0.02,
        }
    }
}

/// Seek and playback state machine.
#[derive(Clone, Debug)]
pub struct Timeline {
    tuning: SchedulerTuning,
    status: TimelineStatus,
    execution_point: ExecutionPoint,
    recording_endpoint: ExecutionPoint,
    zoom: ZoomRegion,
    playback: Option<ExecutionPoint>,
    hover: Option<ExecutionPoint>,
    drag_start: Option<ExecutionPoint>,
    overlay_width: f64,
}

impl Timeline {
    /// Timeline paused at the first point, with nothing recorded yet.
    pub fn new(tuning: SchedulerTuning) -> Self {
        Self {
            tuning,
            status: TimelineStatus::Paused,
            execution_point: ExecutionPoint::first(),
            recording_endpoint: ExecutionPoint::first(),
            zoom: ZoomRegion {
                start: ExecutionPoint::first(),
                end: ExecutionPoint::first(),
            },
            playback: None,
            hover: None,
            drag_start: None,
            overlay_width: 0.0,
        }
    }

    /// Current status.
    pub fn status(&self) -> TimelineStatus {
        self.status
    }

    /// Current execution point.
    pub fn execution_point(&self) -> &ExecutionPoint {
        &self.execution_point
    }

    /// Last known point of the recording.
    pub fn recording_endpoint(&self) -> &ExecutionPoint {
        &self.recording_endpoint
    }

    /// Visible region.
    pub fn zoom(&self) -> &ZoomRegion {
        &self.zoom
    }

    /// Current playback point, while playing.
    pub fn playback_point(&self) -> Option<&ExecutionPoint> {
        self.playback.as_ref()
    }

    /// Point under the pointer.
    pub fn hover_point(&self) -> Option<&ExecutionPoint> {
        self.hover.as_ref()
    }

    /// The point whose graphics should be on screen: hover, then playback,
    /// then the execution point.
    pub fn displayed_point(&self) -> &ExecutionPoint {
        self.hover
            .as_ref()
            .or(self.playback.as_ref())
            .unwrap_or(&self.execution_point)
    }

    /// Width of the timeline overlay in pixels.
    pub fn set_overlay_width(&mut self, width: f64) {
        self.overlay_width = width.max(0.0);
    }

    /// A new checkpoint arrived. Extends the recording and, unless the user
    /// zoomed in on the end, the zoom region.
    pub fn on_new_checkpoint(&mut self, point: &ExecutionPoint) {
        if !self.recording_endpoint.precedes(point) {
            return;
        }
        if self.zoom.end.equals(&self.recording_endpoint) {
            self.zoom.end = point.clone();
        }
        self.recording_endpoint = point.clone();
    }

    /// Seek to `point`, clamped to the zoom region. Stops playback.
    #[instrument(level = "debug", skip_all, fields(point = ?point))]
    pub fn seek(&mut self, point: Option<ExecutionPoint>) -> Option<TimelineEffect> {
        let point = point?;
        let target = self.zoom.clamp(point);
        if self.playback.take().is_some() {
            debug!("StopPlayback");
        }
        self.status = TimelineStatus::Seeking;
        Some(TimelineEffect::TimeWarp(target))
    }

    /// The backend paused. Playback, if running, keeps its own point.
    pub fn on_paused(&mut self, point: Option<&ExecutionPoint>) {
        if let Some(point) = point {
            self.execution_point = point.clone();
        }
        if self.status != TimelineStatus::Playing {
            self.status = TimelineStatus::Paused;
        }
    }

    /// The backend started running.
    pub fn on_resumed(&mut self) {
        if self.status != TimelineStatus::Playing {
            self.status = TimelineStatus::Seeking;
        }
    }

    /// Resume the backend from the execution point.
    pub fn resume(&mut self, kind: ResumeKind) -> TimelineEffect {
        self.playback = None;
        self.status = TimelineStatus::Seeking;
        TimelineEffect::Resume {
            kind,
            point: self.execution_point.clone(),
        }
    }

    /// Seek to the start of the current checkpoint, or of the previous one
    /// when already there. No-op at the zoom region's start.
    pub fn step_previous(&mut self, table: &CheckpointTable) -> Option<TimelineEffect> {
        let point = &self.execution_point;
        let mut checkpoint = point.checkpoint;
        let at_start = table
            .checkpoint(checkpoint)
            .is_some_and(|info| info.point.equals(point));
        if at_start {
            if checkpoint == FIRST_CHECKPOINT_ID {
                return None;
            }
            checkpoint -= 1;
        }
        let Some(info) = table.checkpoint(checkpoint) else {
            warn!(checkpoint, "step to unknown checkpoint");
            return None;
        };
        let target = self.zoom.clamp(info.point.clone());
        if target.equals(&self.execution_point) {
            return None;
        }
        self.seek(Some(target))
    }

    /// Seek to the start of the next checkpoint, clamped to the zoom
    /// region's end. No-op at the end.
    pub fn step_next(&mut self, table: &CheckpointTable) -> Option<TimelineEffect> {
        if !self.execution_point.precedes(&self.zoom.end) {
            return None;
        }
        let next = table
            .checkpoint(self.execution_point.checkpoint + 1)
            .map_or_else(|| self.zoom.end.clone(), |info| info.point.clone());
        let target = self.zoom.clamp(next);
        self.seek(Some(target))
    }

    /// Next point to show after `point` while playing: the next checkpoint,
    /// or an earlier widget event at least `min_step_ms` later than `point`,
    /// clamped to the zoom region's end. `None` at the end.
    pub fn next_playback_point(
        &self,
        point: &ExecutionPoint,
        table: &CheckpointTable,
    ) -> Option<ExecutionPoint> {
        if !point.precedes(&self.zoom.end) {
            return None;
        }
        let time = table.time_for_point(point);
        let mut next = table
            .checkpoint(point.checkpoint + 1)
            .map_or_else(|| self.zoom.end.clone(), |info| info.point.clone());
        if let Some(info) = table.checkpoint(point.checkpoint) {
            let ahead = info.widget_events.iter().find(|event| {
                point.precedes(&event.point) && event.time >= time + self.tuning.min_step_ms
            });
            if let Some(event) = ahead {
                if event.point.precedes(&next) {
                    next = event.point.clone();
                }
            }
        }
        if self.zoom.end.precedes(&next) {
            next = self.zoom.end.clone();
        }
        Some(next)
    }

    /// Enter playback and return the point it runs from. From the zoom
    /// region's end, playback restarts at its start; otherwise it runs from
    /// the execution point. The playback point starts there too, so a stop
    /// before any frame is shown stays put.
    #[instrument(level = "debug", skip_all)]
    pub fn start_playback(&mut self) -> ExecutionPoint {
        let from = if self.execution_point.precedes(&self.zoom.end) {
            self.zoom.clamp(self.execution_point.clone())
        } else {
            self.zoom.start.clone()
        };
        debug!(%from, "StartPlayback");
        self.playback = Some(from.clone());
        self.status = TimelineStatus::Playing;
        from
    }

    /// Playback showed `point`. Earlier points are ignored.
    pub fn on_playback_frame(&mut self, point: &ExecutionPoint) {
        match &self.playback {
            Some(current) if point.precedes(current) => {
                trace!(%point, "ignoring stale playback frame");
            }
            Some(_) => {
                debug!(%point, "PlaybackNext");
                self.playback = Some(self.zoom.clamp(point.clone()));
            }
            None => {}
        }
    }

    /// Playback ran to the zoom region's end.
    pub fn finish_playback(&mut self) -> Option<TimelineEffect> {
        self.playback.as_ref()?;
        debug!("FinishPlayback");
        let end = self.zoom.end.clone();
        self.seek(Some(end))
    }

    /// Stop playback and seek to the playback point.
    pub fn stop_playback(&mut self) -> Option<TimelineEffect> {
        self.stop_playback_at(None)
    }

    /// Stop playback and seek to `shown`, the point whose graphics are on
    /// screen. Falls back to the playback point when `shown` is absent or
    /// precedes it.
    pub fn stop_playback_at(&mut self, shown: Option<ExecutionPoint>) -> Option<TimelineEffect> {
        let current = self.playback.take()?;
        let point = match shown {
            Some(shown) if current.precedes(&shown) => shown,
            _ => current,
        };
        debug!(%point, "StopPlayback");
        self.seek(Some(point))
    }

    /// Point-by-point playback: the graphics for `point` are on screen.
    /// Advances to the next playback point, or stops at the end. The first
    /// call passes the point [`Timeline::start_playback`] returned.
    pub fn on_paint_finished(
        &mut self,
        point: &ExecutionPoint,
        table: &CheckpointTable,
    ) -> Option<TimelineEffect> {
        let current = self.playback.as_ref()?;
        if !current.equals(point) {
            return None;
        }
        match self.next_playback_point(point, table) {
            Some(next) => {
                debug!(%next, "PlaybackNext");
                self.playback = Some(next.clone());
                Some(TimelineEffect::Paint(next))
            }
            None => self.stop_playback(),
        }
    }

    /// Fraction of the visible width at which `point` is drawn, in `[0, 1]`.
    /// Points before the zoom region sit at 0, points at or past its end
    /// at 1.
    pub fn visible_position(&self, point: &ExecutionPoint, table: &CheckpointTable) -> f64 {
        let start = table.time_for_point(&self.zoom.start);
        let end = table.time_for_point(&self.zoom.end);
        let span = end - start;
        if span <= 0.0 {
            return 0.0;
        }
        ((table.time_for_point(point) - start) / span).clamp(0.0, 1.0)
    }

    /// Horizontal pixel offset of `point` on the overlay.
    pub fn pixel_offset(&self, point: &ExecutionPoint, table: &CheckpointTable) -> f64 {
        self.visible_position(point, table) * self.overlay_width
    }

    /// Time under the pointer at `fraction` of the visible width.
    pub fn time_for_mouse(&self, fraction: f64, table: &CheckpointTable) -> f64 {
        let start = table.time_for_point(&self.zoom.start);
        let end = table.time_for_point(&self.zoom.end);
        fraction.clamp(0.0, 1.0).mul_add(end - start, start)
    }

    /// Pointer moved to `fraction` of the visible width. Returns a paint
    /// effect when the hovered point changed.
    pub fn hover(&mut self, fraction: f64, table: &CheckpointTable) -> Option<TimelineEffect> {
        let time = self.time_for_mouse(fraction, table);
        let point = self.zoom.clamp(table.closest_point_to_time(time));
        if self.hover.as_ref().is_some_and(|hover| hover.equals(&point)) {
            return None;
        }
        self.hover = Some(point.clone());
        Some(TimelineEffect::Paint(point))
    }

    /// Pointer left the overlay.
    pub fn leave(&mut self) -> Option<TimelineEffect> {
        self.drag_start = None;
        self.hover.take()?;
        Some(TimelineEffect::Paint(self.displayed_point().clone()))
    }

    /// Button pressed at the hovered point.
    pub fn begin_drag(&mut self) {
        self.drag_start.clone_from(&self.hover);
    }

    /// Zoom region spanned by the drag, if it is wide enough.
    pub fn zoomed_region(&self, table: &CheckpointTable) -> Option<ZoomRegion> {
        let start = self.drag_start.as_ref()?;
        let hover = self.hover.as_ref()?;
        let start_pos = self.visible_position(start, table);
        let hover_pos = self.visible_position(hover, table);
        if (start_pos - hover_pos).abs() < self.tuning.zoom_drag_threshold {
            return None;
        }
        let (start, end) = if start.precedes(hover) {
            (start, hover)
        } else {
            (hover, start)
        };
        Some(ZoomRegion {
            start: start.clone(),
            end: end.clone(),
        })
    }

    /// Button released. A wide drag zooms in, moving the execution point to
    /// the nearest edge when it falls outside; a click seeks to the
    /// hovered point.
    pub fn end_drag(&mut self, table: &CheckpointTable) -> Option<TimelineEffect> {
        let effect = match self.zoomed_region(table) {
            Some(region) => {
                debug!(start = %region.start, end = %region.end, "zoom");
                self.zoom = region;
                self.seek_into_zoom()
            }
            None => {
                let clicked = self.drag_start.as_ref().and(self.hover.clone());
                self.seek(clicked)
            }
        };
        self.drag_start = None;
        effect
    }

    /// Move one zoom edge to `point`. Rejected when it would invert the
    /// region.
    pub fn set_zoom_boundary(&mut self, point: &ExecutionPoint, edge: ZoomEdge) -> Option<TimelineEffect> {
        let point = ZoomRegion {
            start: ExecutionPoint::first(),
            end: self.recording_endpoint.clone(),
        }
        .clamp(point.clone());
        match edge {
            ZoomEdge::Start if !self.zoom.end.precedes(&point) => self.zoom.start = point,
            ZoomEdge::End if !point.precedes(&self.zoom.start) => self.zoom.end = point,
            _ => {
                debug!(%point, ?edge, "zoom boundary would invert region");
                return None;
            }
        }
        self.seek_into_zoom()
    }

    /// Show the whole recording.
    pub fn zoom_out(&mut self) {
        self.zoom = ZoomRegion {
            start: ExecutionPoint::first(),
            end: self.recording_endpoint.clone(),
        };
    }

    fn seek_into_zoom(&mut self) -> Option<TimelineEffect> {
        if self.zoom.contains(&self.execution_point) {
            return None;
        }
        let target = self.zoom.clamp(self.execution_point.clone());
        self.seek(Some(target))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn table() -> CheckpointTable {
        let mut table = CheckpointTable::new();
        table.record_checkpoint(ExecutionPoint::new(2, 100.0), 1000.0);
        table.record_checkpoint(ExecutionPoint::new(3, 200.0), 2000.0);
        table.record_widget_event(ExecutionPoint::new(1, 30.0), 300.0);
        table.record_widget_event(ExecutionPoint::new(1, 35.0), 350.0);
        table
    }

    fn timeline(table: &CheckpointTable) -> Timeline {
        let mut timeline = Timeline::new(SchedulerTuning::default());
        for id in 2..=3 {
            timeline.on_new_checkpoint(&table.checkpoint(id).unwrap().point);
        }
        timeline
    }

    fn warp_target(effect: Option<TimelineEffect>) -> ExecutionPoint {
        match effect {
            Some(TimelineEffect::TimeWarp(point)) => point,
            other => panic!("expected time warp, got {other:?}"),
        }
    }

    fn arrive(timeline: &mut Timeline, effect: Option<TimelineEffect>) {
        let point = warp_target(effect);
        timeline.on_paused(Some(&point));
    }

    #[test]
    fn new_checkpoints_extend_unzoomed_region() {
        let table = table();
        let timeline = timeline(&table);
        assert_eq!(timeline.zoom().end, ExecutionPoint::new(3, 200.0));
        assert_eq!(timeline.recording_endpoint(), &ExecutionPoint::new(3, 200.0));
    }

    #[test]
    fn seek_requires_a_point_and_clamps() {
        let table = table();
        let mut timeline = timeline(&table);
        assert!(timeline.seek(None).is_none());
        assert_eq!(timeline.status(), TimelineStatus::Paused);
        let target = warp_target(timeline.seek(Some(ExecutionPoint::new(9, 0.0))));
        assert_eq!(target, ExecutionPoint::new(3, 200.0));
        assert_eq!(timeline.status(), TimelineStatus::Seeking);
        timeline.on_paused(Some(&target));
        assert_eq!(timeline.status(), TimelineStatus::Paused);
    }

    #[test]
    fn step_previous_walks_checkpoint_starts() {
        let table = table();
        let mut timeline = timeline(&table);
        let effect = timeline.seek(Some(ExecutionPoint::new(2, 150.0)));
        arrive(&mut timeline, effect);

        let effect = timeline.step_previous(&table);
        assert_eq!(warp_target(effect.clone()), ExecutionPoint::new(2, 100.0));
        arrive(&mut timeline, effect);
        let effect = timeline.step_previous(&table);
        assert_eq!(warp_target(effect.clone()), ExecutionPoint::first());
        arrive(&mut timeline, effect);
        assert!(timeline.step_previous(&table).is_none());
    }

    #[test]
    fn step_next_stops_at_zoom_end() {
        let table = table();
        let mut timeline = timeline(&table);
        let effect = timeline.step_next(&table);
        assert_eq!(warp_target(effect.clone()), ExecutionPoint::new(2, 100.0));
        arrive(&mut timeline, effect);
        let effect = timeline.step_next(&table);
        arrive(&mut timeline, effect);
        assert!(timeline.step_next(&table).is_none());
    }

    #[test]
    fn playback_points_respect_minimum_step() {
        let table = table();
        let timeline = timeline(&table);
        let first = timeline
            .next_playback_point(&ExecutionPoint::first(), &table)
            .unwrap();
        assert_eq!(first, ExecutionPoint::new(1, 30.0));
        // The widget at 350ms is only 50ms ahead.
        let second = timeline.next_playback_point(&first, &table).unwrap();
        assert_eq!(second, ExecutionPoint::new(2, 100.0));
        let end = ExecutionPoint::new(3, 200.0);
        assert!(timeline.next_playback_point(&end, &table).is_none());
    }

    #[test]
    fn playback_from_end_restarts_at_zoom_start() {
        let table = table();
        let mut timeline = timeline(&table);
        let effect = timeline.seek(Some(ExecutionPoint::new(3, 200.0)));
        arrive(&mut timeline, effect);
        let from = timeline.start_playback();
        assert_eq!(from, ExecutionPoint::first());
        assert_eq!(timeline.playback_point(), Some(&from));
        assert_eq!(timeline.status(), TimelineStatus::Playing);
    }

    #[test]
    fn point_granular_playback_ends_at_zoom_end() {
        let table = table();
        let mut timeline = timeline(&table);
        let mut point = timeline.start_playback();
        let mut shown = vec![point.clone()];
        loop {
            match timeline.on_paint_finished(&point, &table) {
                Some(TimelineEffect::Paint(next)) => {
                    assert!(point.precedes(&next));
                    shown.push(next.clone());
                    point = next;
                }
                Some(TimelineEffect::TimeWarp(last)) => {
                    assert_eq!(last, ExecutionPoint::new(3, 200.0));
                    break;
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(shown[1], ExecutionPoint::new(1, 30.0));
        assert_eq!(shown.last(), Some(&ExecutionPoint::new(3, 200.0)));
        assert!(timeline.playback_point().is_none());
    }

    #[test]
    fn stale_paint_completion_is_ignored() {
        let table = table();
        let mut timeline = timeline(&table);
        timeline.start_playback();
        assert!(timeline
            .on_paint_finished(&ExecutionPoint::new(2, 100.0), &table)
            .is_none());
        assert_eq!(timeline.playback_point(), Some(&ExecutionPoint::first()));
    }

    #[test]
    fn stop_playback_seeks_to_playback_point() {
        let table = table();
        let mut timeline = timeline(&table);
        let from = timeline.start_playback();
        let target = warp_target(timeline.stop_playback());
        assert_eq!(target, from);
        assert!(timeline.stop_playback().is_none());
    }

    #[test]
    fn frames_before_the_next_checkpoint_move_the_playback_point() {
        let table = table();
        let mut timeline = timeline(&table);
        timeline.start_playback();
        timeline.on_playback_frame(&ExecutionPoint::new(1, 5.0));
        assert_eq!(timeline.playback_point(), Some(&ExecutionPoint::new(1, 5.0)));
        let target = warp_target(timeline.stop_playback());
        assert_eq!(target, ExecutionPoint::new(1, 5.0));
    }

    #[test]
    fn stop_at_shown_point_never_moves_backward() {
        let table = table();
        let mut timeline = timeline(&table);
        timeline.start_playback();
        timeline.on_playback_frame(&ExecutionPoint::new(1, 30.0));
        let target = warp_target(timeline.stop_playback_at(Some(ExecutionPoint::first())));
        assert_eq!(target, ExecutionPoint::new(1, 30.0));

        timeline.start_playback();
        let target = warp_target(timeline.stop_playback_at(Some(ExecutionPoint::new(1, 35.0))));
        assert_eq!(target, ExecutionPoint::new(1, 35.0));
    }

    #[test]
    fn short_drag_seeks_to_hover() {
        let table = table();
        let mut timeline = timeline(&table);
        timeline.hover(0.5, &table);
        timeline.begin_drag();
        timeline.hover(0.51, &table);
        let target = warp_target(timeline.end_drag(&table));
        assert_eq!(Some(&target), timeline.hover_point());
        assert_eq!(timeline.zoom().start, ExecutionPoint::first());
    }

    #[test]
    fn wide_drag_zooms_and_pulls_point_inside() {
        let table = table();
        let mut timeline = timeline(&table);
        timeline.hover(0.5, &table);
        timeline.begin_drag();
        timeline.hover(1.0, &table);
        let target = warp_target(timeline.end_drag(&table));
        assert_eq!(timeline.zoom().start, ExecutionPoint::new(2, 100.0));
        assert_eq!(timeline.zoom().end, ExecutionPoint::new(3, 200.0));
        assert_eq!(target, ExecutionPoint::new(2, 100.0));

        timeline.zoom_out();
        assert_eq!(timeline.zoom().start, ExecutionPoint::first());
    }

    #[test]
    fn zoom_boundary_cannot_invert() {
        let table = table();
        let mut timeline = timeline(&table);
        assert!(timeline
            .set_zoom_boundary(&ExecutionPoint::new(2, 100.0), ZoomEdge::End)
            .is_none());
        assert_eq!(timeline.zoom().end, ExecutionPoint::new(2, 100.0));
        timeline.set_zoom_boundary(&ExecutionPoint::new(3, 200.0), ZoomEdge::Start);
        assert_eq!(timeline.zoom().start, ExecutionPoint::first());
    }

    #[test]
    fn positions_map_time_to_width() {
        let table = table();
        let mut timeline = timeline(&table);
        timeline.set_overlay_width(400.0);
        let mid = ExecutionPoint::new(2, 100.0);
        assert!((timeline.visible_position(&mid, &table) - 0.5).abs() < 1e-9);
        assert!((timeline.pixel_offset(&mid, &table) - 200.0).abs() < 1e-9);
        assert!((timeline.time_for_mouse(0.25, &table) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn positions_outside_the_zoom_stick_to_the_edges() {
        let table = table();
        let mut timeline = timeline(&table);
        timeline.set_overlay_width(400.0);
        timeline.set_zoom_boundary(&ExecutionPoint::new(1, 30.0), ZoomEdge::Start);
        timeline.set_zoom_boundary(&ExecutionPoint::new(2, 100.0), ZoomEdge::End);
        let past = ExecutionPoint::new(3, 200.0);
        assert_eq!(timeline.visible_position(&past, &table), 1.0);
        assert_eq!(timeline.pixel_offset(&past, &table), 400.0);
        let before = ExecutionPoint::first();
        assert_eq!(timeline.visible_position(&before, &table), 0.0);
        assert_eq!(timeline.pixel_offset(&before, &table), 0.0);
    }

    #[test]
    fn resume_carries_execution_point() {
        let table = table();
        let mut timeline = timeline(&table);
        let effect = timeline.resume(ResumeKind::StepOver);
        assert_eq!(
            effect,
            TimelineEffect::Resume {
                kind: ResumeKind::StepOver,
                point: ExecutionPoint::first()
            }
        );
        assert_eq!(ResumeKind::ReverseStepOver.method(), names::REVERSE_STEP_OVER);
        timeline.on_resumed();
        assert_eq!(timeline.status(), TimelineStatus::Seeking);
    }
}
