// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Timeline session: owns every piece of timeline state for one recording
//! and applies push events, user commands and frame ticks to it.
//!
//! The session is a single-owner actor. [`TimelineSession::run`] selects
//! over the event stream, the command channel, finished paints and, while
//! playing, a frame interval; a [`SessionView`] snapshot is published after
//! every step. Only the logpoint registry is shared with other tasks, so
//! logpoints can be set while the actor runs.

use std::sync::Arc;
use std::time::Duration;

use replay_app_core::ViewerConfig;
use replay_client::{EventPort, RequestScope, Transport};
use replay_protocol::methods::{
    names, CreateSessionResult, Empty, RecordingDescription, RecordingParams, ResumeParams,
    TimeWarpParams,
};
use replay_protocol::{ExecutionPoint, PushEvent, SessionId};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, trace};

use crate::checkpoints::CheckpointTable;
use crate::error::TimelineError;
use crate::event_index::EventIndex;
use crate::graphics::{Graphics, GraphicsPlan, ScreenCache};
use crate::logpoint::{AnalysisPipeline, LogpointHandler};
use crate::playback::{FrameStep, PlaybackRun};
use crate::scheduler::{
    ResumeKind, SchedulerTuning, Timeline, TimelineEffect, TimelineStatus, ZoomEdge, ZoomRegion,
};

/// Input from the user or host.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Seek to a point.
    Seek(ExecutionPoint),
    /// Seek to the latest paint or mouse event at or before a time.
    SeekTime(f64),
    /// Step to the next checkpoint.
    StepNext,
    /// Step to the previous checkpoint.
    StepPrevious,
    /// Start playback.
    Play,
    /// Stop playback.
    Stop,
    /// Resume the backend.
    Resume(ResumeKind),
    /// Pointer at a fraction of the overlay width.
    Hover(f64),
    /// Pointer left the overlay.
    Leave,
    /// Button pressed on the overlay.
    BeginDrag,
    /// Button released on the overlay.
    EndDrag,
    /// Move one zoom edge.
    SetZoomBoundary(ExecutionPoint, ZoomEdge),
    /// Show the whole recording.
    ZoomOut,
    /// Overlay width in pixels.
    SetOverlayWidth(f64),
}

/// Snapshot of what the timeline shows.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    /// Lifecycle status.
    pub status: TimelineStatus,
    /// Current execution point.
    pub execution_point: ExecutionPoint,
    /// Playback point, while playing.
    pub playback_point: Option<ExecutionPoint>,
    /// Point under the pointer.
    pub hover_point: Option<ExecutionPoint>,
    /// Visible region.
    pub zoom: ZoomRegion,
    /// Time of the playhead in ms.
    pub current_time: f64,
    /// Time of the last known checkpoint.
    pub recording_end_time: f64,
    /// Recording length reported by the backend.
    pub duration: f64,
    /// Graphics on screen.
    pub graphics: Option<Graphics>,
}

/// Timeline state for one recording.
pub struct TimelineSession<T: Transport> {
    transport: T,
    session_id: SessionId,
    config: ViewerConfig,
    description: RecordingDescription,
    checkpoints: CheckpointTable,
    events: EventIndex,
    timeline: Timeline,
    screens: ScreenCache<T>,
    analyses: AnalysisPipeline<T>,
    playback: Option<PlaybackRun>,
    graphics: Option<Graphics>,
    painted_tx: mpsc::UnboundedSender<Graphics>,
    painted_rx: Option<mpsc::UnboundedReceiver<Graphics>>,
}

/// Handle to a session running on its own task.
pub struct SessionHandle<T: Transport> {
    commands: mpsc::Sender<UserCommand>,
    view: watch::Receiver<SessionView>,
    analyses: AnalysisPipeline<T>,
    task: JoinHandle<TimelineSession<T>>,
}

impl<T: Transport> SessionHandle<T> {
    /// Send a command to the session.
    pub async fn send(&self, command: UserCommand) -> Result<(), TimelineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| TimelineError::SessionClosed)
    }

    /// Latest published view.
    pub fn view(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Logpoint pipeline shared with the session.
    pub fn analyses(&self) -> &AnalysisPipeline<T> {
        &self.analyses
    }

    /// Stop accepting commands and wait for the session to wind down.
    pub async fn shutdown(self) -> Result<TimelineSession<T>, TimelineError> {
        drop(self.commands);
        self.task.await.map_err(|_| TimelineError::SessionClosed)
    }
}

impl<T: Transport> TimelineSession<T> {
    /// Create a backend session for `recording_id` and start discovering
    /// paints and mouse events.
    #[instrument(skip(transport, config, handler))]
    pub async fn open(
        transport: T,
        recording_id: &str,
        config: ViewerConfig,
        handler: Arc<dyn LogpointHandler>,
    ) -> Result<Self, TimelineError> {
        let params = RecordingParams {
            recording_id: recording_id.to_string(),
        };
        let created: CreateSessionResult = transport
            .call(names::CREATE_SESSION, &params, RequestScope::none())
            .await?;
        let session_id = created.session_id;
        let scope = RequestScope::session(&session_id);
        let description: RecordingDescription = transport
            .call(names::GET_DESCRIPTION, &params, scope.clone())
            .await?;
        info!(%session_id, duration = description.duration, "session created");

        transport.post(names::FIND_PAINTS, &Empty {}, scope.clone());
        transport.post(names::FIND_MOUSE_EVENTS, &Empty {}, scope);

        Ok(Self::with_session(
            transport,
            session_id,
            description,
            config,
            handler,
        ))
    }

    /// Session state for an already created backend session.
    pub fn with_session(
        transport: T,
        session_id: SessionId,
        description: RecordingDescription,
        config: ViewerConfig,
        handler: Arc<dyn LogpointHandler>,
    ) -> Self {
        let config = config.sanitized();
        let tuning = SchedulerTuning {
            min_step_ms: config.playback_min_step_ms,
            zoom_drag_threshold: config.zoom_drag_threshold,
        };
        let (painted_tx, painted_rx) = mpsc::unbounded_channel();
        Self {
            screens: ScreenCache::new(transport.clone(), session_id.clone()),
            analyses: AnalysisPipeline::new(transport.clone(), session_id.clone(), handler),
            transport,
            session_id,
            config,
            description,
            checkpoints: CheckpointTable::new(),
            events: EventIndex::new(),
            timeline: Timeline::new(tuning),
            playback: None,
            graphics: None,
            painted_tx,
            painted_rx: Some(painted_rx),
        }
    }

    /// Backend session id.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Checkpoint time table.
    pub fn checkpoints(&self) -> &CheckpointTable {
        &self.checkpoints
    }

    /// Paint and mouse index.
    pub fn events(&self) -> &EventIndex {
        &self.events
    }

    /// Seek and playback state.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Logpoint pipeline.
    pub fn analyses(&self) -> &AnalysisPipeline<T> {
        &self.analyses
    }

    /// Wall-clock time of a point.
    pub fn time_for_point(&self, point: &ExecutionPoint) -> f64 {
        self.checkpoints.time_for_point(point)
    }

    /// Snapshot of the current state.
    pub fn view(&self) -> SessionView {
        let current_time = self.playback.as_ref().map_or_else(
            || self.checkpoints.time_for_point(self.timeline.displayed_point()),
            PlaybackRun::current_time,
        );
        SessionView {
            status: self.timeline.status(),
            execution_point: self.timeline.execution_point().clone(),
            playback_point: self.timeline.playback_point().cloned(),
            hover_point: self.timeline.hover_point().cloned(),
            zoom: self.timeline.zoom().clone(),
            current_time,
            recording_end_time: self.checkpoints.recording_end_time(),
            duration: self.description.duration,
            graphics: self.graphics.clone(),
        }
    }

    /// Apply one push event.
    pub fn apply_event(&mut self, event: PushEvent) {
        trace!(method = event.method_name(), "push event");
        match event {
            PushEvent::Paused(paused) => {
                self.timeline.on_paused(paused.point.as_ref());
                if self.timeline.status() == TimelineStatus::Paused {
                    let point = self.timeline.displayed_point().clone();
                    self.paint(&point);
                }
            }
            PushEvent::Resumed => self.timeline.on_resumed(),
            PushEvent::PaintPoints(batch) => {
                self.events.add_paints(&batch.paints);
                for paint in batch.paints {
                    self.checkpoints.record_widget_event(paint.point, paint.time);
                }
            }
            PushEvent::MouseEvents(batch) => {
                self.events.add_mouse_events(&batch.events);
                for event in batch.events {
                    self.checkpoints.record_widget_event(event.point, event.time);
                }
            }
            PushEvent::AnalysisResult(result) => self.analyses.on_analysis_result(result),
            PushEvent::AnalysisPoints(points) => self.analyses.on_analysis_points(points),
            PushEvent::NewCheckpoint(checkpoint) => {
                self.checkpoints
                    .record_checkpoint(checkpoint.point(), checkpoint.time);
                if let Some(info) = self.checkpoints.checkpoint(checkpoint.checkpoint) {
                    let point = info.point.clone();
                    self.timeline.on_new_checkpoint(&point);
                }
            }
        }
    }

    /// Apply up to `max` events that are ready on `port`.
    pub fn drain(&mut self, port: &mut impl EventPort, max: usize) -> usize {
        let events = port.drain_events(max);
        let count = events.len();
        for event in events {
            self.apply_event(event);
        }
        count
    }

    /// Apply one user command.
    #[instrument(level = "debug", skip(self))]
    pub fn handle_command(&mut self, command: UserCommand) {
        let table = &self.checkpoints;
        let effect = match command {
            UserCommand::Seek(point) => self.timeline.seek(Some(point)),
            UserCommand::SeekTime(time) => {
                let point = self
                    .events
                    .most_recent_paint_or_mouse_event(time)
                    .map(|hit| hit.point.clone());
                self.timeline.seek(point)
            }
            UserCommand::StepNext => self.timeline.step_next(table),
            UserCommand::StepPrevious => self.timeline.step_previous(table),
            UserCommand::Play => {
                self.start_playback();
                None
            }
            UserCommand::Stop => {
                let shown = self.playback.as_ref().and_then(|run| {
                    self.events
                        .most_recent_paint_or_mouse_event(run.shown_time())
                        .map(|hit| hit.point.clone())
                });
                self.timeline.stop_playback_at(shown)
            }
            UserCommand::Resume(kind) => Some(self.timeline.resume(kind)),
            UserCommand::Hover(fraction) => self.timeline.hover(fraction, table),
            UserCommand::Leave => self.timeline.leave(),
            UserCommand::BeginDrag => {
                self.timeline.begin_drag();
                None
            }
            UserCommand::EndDrag => self.timeline.end_drag(table),
            UserCommand::SetZoomBoundary(point, edge) => {
                self.timeline.set_zoom_boundary(&point, edge)
            }
            UserCommand::ZoomOut => {
                self.timeline.zoom_out();
                None
            }
            UserCommand::SetOverlayWidth(width) => {
                self.timeline.set_overlay_width(width);
                None
            }
        };
        if self.timeline.status() != TimelineStatus::Playing {
            self.playback = None;
        }
        if let Some(effect) = effect {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: TimelineEffect) {
        let scope = RequestScope::session(&self.session_id);
        match effect {
            TimelineEffect::TimeWarp(point) => {
                debug!(%point, "time warp");
                self.transport
                    .post(names::TIME_WARP, &TimeWarpParams { point }, scope);
            }
            TimelineEffect::Resume { kind, point } => {
                self.transport
                    .post(kind.method(), &ResumeParams { point }, scope);
            }
            TimelineEffect::Paint(point) => self.paint(&point),
        }
    }

    fn plan(&self, time: f64) -> GraphicsPlan {
        GraphicsPlan::at(
            &self.events,
            time,
            self.config.paint_prefetch,
            self.config.click_threshold_ms,
        )
    }

    fn paint(&self, point: &ExecutionPoint) {
        let plan = self.plan(self.checkpoints.time_for_point(point));
        let screens = self.screens.clone();
        let painted = self.painted_tx.clone();
        tokio::spawn(async move {
            let graphics = screens.graphics(plan).await;
            if painted.send(graphics).is_err() {
                trace!("session gone before paint finished");
            }
        });
    }

    /// Collect paints that finished since the last call.
    pub fn poll_paints(&mut self) -> usize {
        let Some(painted) = self.painted_rx.as_mut() else {
            return 0;
        };
        let mut count = 0;
        while let Ok(graphics) = painted.try_recv() {
            self.graphics = Some(graphics);
            count += 1;
        }
        count
    }

    fn start_playback(&mut self) {
        let from = self.timeline.start_playback();
        let start_time = self.checkpoints.time_for_point(&from);
        let end_time = self.checkpoints.time_for_point(&self.timeline.zoom().end);
        self.playback = Some(PlaybackRun::new(
            start_time,
            end_time,
            Instant::now(),
            Duration::from_secs_f64(self.config.playback_stall_ms / 1000.0),
        ));
        self.prepare_next_frame();
    }

    fn prepare_next_frame(&mut self) {
        let Some(run) = self.playback.as_ref() else {
            return;
        };
        let (time, point) = match self.events.next_paint_or_mouse_event(run.current_time()) {
            Some(hit) => (hit.time, Some(hit.point.clone())),
            None => (run.end_time(), None),
        };
        let graphics = self.screens.spawn_graphics(self.plan(time));
        if let Some(run) = self.playback.as_mut() {
            run.set_next_frame(time, point, graphics);
        }
    }

    /// Advance playback to `now`.
    pub fn on_frame(&mut self, now: Instant) {
        let Some(run) = self.playback.as_mut() else {
            return;
        };
        match run.tick(now) {
            FrameStep::Finished => {
                self.playback = None;
                if let Some(effect) = self.timeline.finish_playback() {
                    self.execute(effect);
                }
            }
            FrameStep::Advanced { .. } | FrameStep::Waiting { .. } => {}
            FrameStep::Show {
                point, graphics, ..
            } => {
                if let Some(graphics) = graphics {
                    self.graphics = Some(graphics);
                }
                if let Some(point) = point {
                    self.timeline.on_playback_frame(&point);
                }
                self.prepare_next_frame();
            }
        }
    }

    /// Run until the command channel or the event stream closes.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<PushEvent>,
        mut commands: mpsc::Receiver<UserCommand>,
        view: watch::Sender<SessionView>,
    ) -> Self {
        let Some(mut painted) = self.painted_rx.take() else {
            return self;
        };
        let mut frames = tokio::time::interval(self.config.frame_interval());
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            let playing = self.playback.is_some();
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.apply_event(event),
                    None => {
                        debug!("event stream closed");
                        break;
                    }
                },
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("command channel closed");
                        break;
                    }
                },
                Some(graphics) = painted.recv() => self.graphics = Some(graphics),
                now = frames.tick(), if playing => self.on_frame(now),
            }
            view.send_replace(self.view());
        }
        self.painted_rx = Some(painted);
        self
    }

    /// Run on a new task, returning a handle for commands and views.
    pub fn spawn(self, events: mpsc::UnboundedReceiver<PushEvent>) -> SessionHandle<T> {
        let (commands_tx, commands_rx) = mpsc::channel(64);
        let (view_tx, view_rx) = watch::channel(self.view());
        let analyses = self.analyses.clone();
        let task = tokio::spawn(self.run(events, commands_rx, view_tx));
        SessionHandle {
            commands: commands_tx,
            view: view_rx,
            analyses,
            task,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::logpoint::LogpointMessage;
    use replay_dry_tests::fixtures::{self, checkpoint};
    use replay_dry_tests::ScriptedTransport;
    use serde_json::json;

    struct Quiet;

    impl LogpointHandler for Quiet {
        fn on_result(&self, _message: LogpointMessage) {}
    }

    fn session(transport: &ScriptedTransport) -> TimelineSession<ScriptedTransport> {
        TimelineSession::with_session(
            transport.clone(),
            "s1".into(),
            RecordingDescription {
                duration: 2000.0,
                title: None,
            },
            ViewerConfig::default(),
            Arc::new(Quiet),
        )
    }

    fn paints(times: &[(u32, f64, f64)]) -> PushEvent {
        fixtures::paints(
            times
                .iter()
                .map(|&(checkpoint, progress, time)| {
                    fixtures::paint(fixtures::point(checkpoint, progress), time, &format!("h{time}"))
                })
                .collect(),
        )
    }

    fn populated(transport: &ScriptedTransport) -> TimelineSession<ScriptedTransport> {
        let mut session = session(transport);
        session.apply_event(checkpoint(2, 100.0, 1000.0));
        session.apply_event(checkpoint(3, 200.0, 2000.0));
        session.apply_event(paints(&[(1, 30.0, 300.0), (2, 150.0, 1500.0)]));
        session
    }

    #[tokio::test]
    async fn open_creates_session_and_starts_discovery() {
        let transport = ScriptedTransport::new();
        transport.respond_with(names::CREATE_SESSION, json!({ "sessionId": "abc" }));
        transport.respond_with(names::GET_DESCRIPTION, json!({ "duration": 1234.0 }));
        let session = TimelineSession::open(
            transport.clone(),
            "rec-1",
            ViewerConfig::default(),
            Arc::new(Quiet),
        )
        .await
        .unwrap();
        assert_eq!(session.session_id(), "abc");
        assert_eq!(session.view().duration, 1234.0);

        let requests = transport.requests();
        let methods: Vec<_> = requests.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(
            methods,
            vec![
                names::CREATE_SESSION,
                names::GET_DESCRIPTION,
                names::FIND_PAINTS,
                names::FIND_MOUSE_EVENTS
            ]
        );
        assert_eq!(requests[0].params, json!({ "recordingId": "rec-1" }));
        assert_eq!(requests[2].scope.session_id.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn events_feed_checkpoints_and_index() {
        let transport = ScriptedTransport::new();
        let session = populated(&transport);
        assert_eq!(session.checkpoints().len(), 3);
        assert_eq!(session.events().paints().len(), 3);
        assert_eq!(
            session.checkpoints().checkpoint(2).unwrap().widget_events.len(),
            1
        );
        assert_eq!(session.time_for_point(&ExecutionPoint::new(1, 30.0)), 300.0);
        assert_eq!(session.view().zoom.end, ExecutionPoint::new(3, 200.0));
        assert_eq!(session.view().recording_end_time, 2000.0);
    }

    #[tokio::test]
    async fn seek_time_warps_and_paused_event_lands() {
        let transport = ScriptedTransport::new();
        let mut session = populated(&transport);
        session.handle_command(UserCommand::SeekTime(1600.0));
        let warp = transport.requests_for(names::TIME_WARP);
        assert_eq!(warp.len(), 1);
        assert_eq!(warp[0].params["point"]["checkpoint"], json!(2));
        assert_eq!(warp[0].params["point"]["progress"], json!(150.0));
        assert_eq!(session.view().status, TimelineStatus::Seeking);

        session.apply_event(fixtures::paused(ExecutionPoint::new(2, 150.0), 1500.0));
        let view = session.view();
        assert_eq!(view.status, TimelineStatus::Paused);
        assert_eq!(view.execution_point, ExecutionPoint::new(2, 150.0));
        assert_eq!(view.current_time, 1500.0);
    }

    #[tokio::test]
    async fn resume_posts_the_matching_method() {
        let transport = ScriptedTransport::new();
        let mut session = populated(&transport);
        session.handle_command(UserCommand::Resume(ResumeKind::Rewind));
        let rewind = transport.requests_for(names::REWIND);
        assert_eq!(rewind.len(), 1);
        assert_eq!(rewind[0].params["point"]["checkpoint"], json!(1));
    }

    #[tokio::test]
    async fn hover_paints_without_moving_the_backend() {
        let transport = ScriptedTransport::new();
        transport.respond_with(
            names::GET_PAINT_CONTENTS,
            json!({ "screen": { "mimeType": "image/jpeg", "hash": "h300", "data": "jpeg" } }),
        );
        let mut session = populated(&transport);
        session.handle_command(UserCommand::Hover(0.16));
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(session.poll_paints(), 1);
        let view = session.view();
        assert_eq!(view.hover_point, Some(ExecutionPoint::new(1, 30.0)));
        assert_eq!(view.graphics.unwrap().screen.unwrap().data, "jpeg");
        assert!(transport.requests_for(names::TIME_WARP).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn playback_runs_to_zoom_end_and_seeks_there() {
        let transport = ScriptedTransport::new();
        transport.respond_with(names::GET_PAINT_CONTENTS, fixtures::paint_contents("h"));
        let mut session = populated(&transport);
        session.handle_command(UserCommand::Play);
        assert_eq!(session.view().status, TimelineStatus::Playing);

        let mut last_time = 0.0;
        for _ in 0..1000 {
            tokio::time::advance(Duration::from_millis(16)).await;
            tokio::task::yield_now().await;
            session.on_frame(Instant::now());
            let view = session.view();
            if view.status != TimelineStatus::Playing {
                break;
            }
            assert!(view.current_time >= last_time);
            last_time = view.current_time;
        }

        assert_eq!(session.view().status, TimelineStatus::Seeking);
        let warps = transport.requests_for(names::TIME_WARP);
        let last = warps.last().unwrap();
        assert_eq!(last.params["point"]["checkpoint"], json!(3));
        assert_eq!(last.params["point"]["progress"], json!(200.0));
    }

    #[tokio::test]
    async fn stop_seeks_to_playback_point() {
        let transport = ScriptedTransport::new();
        let mut session = populated(&transport);
        session.handle_command(UserCommand::Play);
        let playing_at = session.view().playback_point.unwrap();
        session.handle_command(UserCommand::Stop);
        let warp = transport.requests_for(names::TIME_WARP);
        assert_eq!(warp.len(), 1);
        assert_eq!(warp[0].params["point"]["progress"], json!(playing_at.progress));
        assert!(session.view().playback_point.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_seeks_to_the_paint_on_screen() {
        let transport = ScriptedTransport::new();
        transport.respond_with(names::GET_PAINT_CONTENTS, fixtures::paint_contents("p"));
        let mut session = session(&transport);
        session.apply_event(checkpoint(2, 100.0, 1000.0));
        session.apply_event(checkpoint(3, 200.0, 2000.0));
        session.apply_event(paints(&[(1, 5.0, 50.0)]));
        session.handle_command(UserCommand::Play);
        for _ in 0..5 {
            tokio::time::advance(Duration::from_millis(16)).await;
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
            session.on_frame(Instant::now());
        }
        let view = session.view();
        assert!(view.current_time > 50.0 && view.current_time < 1000.0);
        assert_eq!(view.playback_point, Some(ExecutionPoint::new(1, 5.0)));

        session.handle_command(UserCommand::Stop);
        let warp = transport.requests_for(names::TIME_WARP);
        assert_eq!(warp.len(), 1);
        assert_eq!(warp[0].params["point"]["checkpoint"], json!(1));
        assert_eq!(warp[0].params["point"]["progress"], json!(5.0));
    }

    #[tokio::test]
    async fn actor_applies_commands_and_publishes_views() {
        let transport = ScriptedTransport::new();
        let session = populated(&transport);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let handle = session.spawn(events_rx);
        let mut view = handle.view();

        events_tx.send(checkpoint(4, 300.0, 3000.0)).unwrap();
        handle.send(UserCommand::StepNext).await.unwrap();
        view.wait_for(|v| {
            v.status == TimelineStatus::Seeking && v.zoom.end == ExecutionPoint::new(4, 300.0)
        })
        .await
        .unwrap();

        let session = handle.shutdown().await.unwrap();
        assert_eq!(session.checkpoints().len(), 4);
        assert_eq!(transport.count(names::TIME_WARP), 1);
    }
}
