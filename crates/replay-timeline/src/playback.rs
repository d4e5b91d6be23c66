// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Time-based playback loop.
//!
//! Playback time runs at wall-clock speed from a baseline. Each frame the
//! run advances its current time; once that reaches the time of the next
//! prepared frame, time freezes until the frame's graphics arrive. If the
//! wait exceeded the stall threshold, the baseline is reset to the frozen
//! time so playback resumes from there instead of jumping ahead.
//!
//! Graphics are fetched elsewhere; the run only polls the receiver, so a
//! frame tick never blocks.

use std::time::Duration;

use replay_protocol::ExecutionPoint;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::graphics::Graphics;

/// Outcome of one frame tick.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameStep {
    /// Playback time passed the end; seek to the zoom region's end.
    Finished,
    /// Time advanced; nothing new to show.
    Advanced {
        /// Current playback time.
        time: f64,
    },
    /// Waiting for the next frame's graphics; time is frozen.
    Waiting {
        /// Frozen playback time.
        time: f64,
    },
    /// The next frame is ready. Prepare the one after it.
    Show {
        /// Current playback time.
        time: f64,
        /// Point the frame belongs to, when it came from a widget event.
        point: Option<ExecutionPoint>,
        /// Graphics, absent when the fetch failed.
        graphics: Option<Graphics>,
        /// Whether the baseline was reset after a stall.
        rebaselined: bool,
    },
}

#[derive(Debug)]
struct PendingFrame {
    time: f64,
    point: Option<ExecutionPoint>,
    graphics: oneshot::Receiver<Graphics>,
    reached: Option<(Instant, f64)>,
}

/// One playback run from start to end time.
#[derive(Debug)]
pub struct PlaybackRun {
    start_time: f64,
    start_instant: Instant,
    end_time: f64,
    current_time: f64,
    shown_time: f64,
    stall: Duration,
    pending: Option<PendingFrame>,
}

impl PlaybackRun {
    /// Run from `start_time` to `end_time`, with its baseline at `now`.
    pub fn new(start_time: f64, end_time: f64, now: Instant, stall: Duration) -> Self {
        Self {
            start_time,
            start_instant: now,
            end_time,
            current_time: start_time,
            shown_time: start_time,
            stall,
            pending: None,
        }
    }

    /// Current playback time.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Time of the last frame shown, or the start time before the first.
    /// Trails the current time while a frame's graphics are awaited.
    pub fn shown_time(&self) -> f64 {
        self.shown_time
    }

    /// Time the run ends at.
    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// True when no next frame is prepared.
    pub fn needs_frame(&self) -> bool {
        self.pending.is_none()
    }

    /// Prepare the next frame at `time`.
    pub fn set_next_frame(
        &mut self,
        time: f64,
        point: Option<ExecutionPoint>,
        graphics: oneshot::Receiver<Graphics>,
    ) {
        trace!(time, "next playback frame");
        self.pending = Some(PendingFrame {
            time,
            point,
            graphics,
            reached: None,
        });
    }

    /// Advance to `now`.
    pub fn tick(&mut self, now: Instant) -> FrameStep {
        let frozen = self.pending.as_ref().and_then(|p| p.reached);
        if let Some((_, time)) = frozen {
            self.current_time = time;
        } else {
            let elapsed = now.saturating_duration_since(self.start_instant);
            self.current_time = self.start_time + elapsed.as_secs_f64() * 1000.0;
            if self.current_time > self.end_time {
                return FrameStep::Finished;
            }
        }

        let current_time = self.current_time;
        let Some(pending) = self.pending.as_mut() else {
            return FrameStep::Advanced { time: current_time };
        };
        if current_time < pending.time {
            return FrameStep::Advanced { time: current_time };
        }
        let (reached_at, reached_time) = *pending.reached.get_or_insert((now, current_time));
        let graphics = match pending.graphics.try_recv() {
            Ok(graphics) => Some(graphics),
            Err(TryRecvError::Empty) => return FrameStep::Waiting { time: current_time },
            Err(TryRecvError::Closed) => {
                debug!(time = pending.time, "frame graphics unavailable");
                None
            }
        };
        let point = pending.point.take();
        self.shown_time = pending.time;
        self.pending = None;

        let rebaselined = now.saturating_duration_since(reached_at) > self.stall;
        if rebaselined {
            debug!(time = reached_time, "playback stalled; resetting baseline");
            self.start_time = reached_time;
            self.start_instant = now;
        }
        FrameStep::Show {
            time: current_time,
            point,
            graphics,
            rebaselined,
        }
    }
}
