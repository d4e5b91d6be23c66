// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Viewer host settings: transport endpoint and timeline timing knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Config key the viewer settings are stored under.
pub const VIEWER_CONFIG_KEY: &str = "viewer";

/// Host settings for the timeline viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Transport endpoint.
    pub dispatch_address: String,
    /// Period of the animation-frame callback driving playback.
    pub frame_interval_ms: u64,
    /// Drift after which playback re-baselines its clock.
    pub playback_stall_ms: f64,
    /// Minimum wall-time gap for a widget event to become the next playback point.
    pub playback_min_step_ms: f64,
    /// Minimum visible-position difference for a drag to zoom.
    pub zoom_drag_threshold: f64,
    /// How recently a click must have happened to be drawn.
    pub click_threshold_ms: f64,
    /// Paints prefetched after the one being shown.
    pub paint_prefetch: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            dispatch_address: replay_protocol::default_dispatch_address(),
            frame_interval_ms: 16,
            playback_stall_ms: 100.0,
            playback_min_step_ms: 100.0,
            zoom_drag_threshold: 0.02,
            click_threshold_ms: 200.0,
            paint_prefetch: 5,
        }
    }
}

impl ViewerConfig {
    /// Frame period as a [`Duration`] (never zero).
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    /// Clamp nonsensical values coming from hand-edited files.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.zoom_drag_threshold.is_finite() && (0.0..1.0).contains(&self.zoom_drag_threshold)) {
            self.zoom_drag_threshold = defaults.zoom_drag_threshold;
        }
        for (value, fallback) in [
            (&mut self.playback_stall_ms, defaults.playback_stall_ms),
            (&mut self.playback_min_step_ms, defaults.playback_min_step_ms),
            (&mut self.click_threshold_ms, defaults.click_threshold_ms),
        ] {
            if !value.is_finite() || *value < 0.0 {
                *value = fallback;
            }
        }
        if self.dispatch_address.trim().is_empty() {
            self.dispatch_address = defaults.dispatch_address;
        }
        self
    }
}
