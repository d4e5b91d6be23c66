// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Screenshot cache and graphics lookup by time.
//!
//! A graphics request is planned synchronously against the [`EventIndex`]
//! (which paint, which upcoming paints to prefetch, where the mouse is) and
//! then fetched asynchronously. Each screenshot hash is fetched at most once;
//! concurrent requests for the same hash share one fetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use replay_client::{ClientError, RequestScope, Transport};
use replay_protocol::methods::{
    names, GetPaintContentsParams, PaintContentsResult, PAINT_MIME_TYPE,
};
use replay_protocol::{ExecutionPoint, ScreenShot, SessionId};
use tokio::sync::{oneshot, OnceCell};
use tracing::{debug, trace};

use crate::event_index::{EventIndex, MouseOverlay};

/// A paint to fetch: its point and screenshot hash.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintRef {
    /// Paint point.
    pub point: ExecutionPoint,
    /// Screenshot hash.
    pub hash: String,
}

/// What to show for one time, before any screenshot is fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsPlan {
    /// Requested time.
    pub time: f64,
    /// Most recent paint with a screenshot, if any.
    pub paint: Option<PaintRef>,
    /// Upcoming paints worth warming the cache with.
    pub prefetch: Vec<PaintRef>,
    /// Mouse overlay at `time`.
    pub mouse: Option<MouseOverlay>,
}

impl GraphicsPlan {
    /// Plan graphics for `time`.
    pub fn at(index: &EventIndex, time: f64, prefetch: usize, click_threshold_ms: f64) -> Self {
        let paint = index.most_recent_paint(time).and_then(|entry| {
            entry.payload.as_ref().map(|hash| PaintRef {
                point: entry.point.clone(),
                hash: hash.clone(),
            })
        });
        let prefetch = index
            .upcoming_paints(time, prefetch)
            .iter()
            .filter_map(|entry| {
                entry.payload.as_ref().map(|hash| PaintRef {
                    point: entry.point.clone(),
                    hash: hash.clone(),
                })
            })
            .collect();
        Self {
            time,
            paint,
            prefetch,
            mouse: index.mouse_overlay(time, click_threshold_ms),
        }
    }
}

/// Screenshot plus mouse overlay for a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Graphics {
    /// Time the graphics were requested for.
    pub time: f64,
    /// Screenshot; absent before the first paint or when the fetch failed.
    pub screen: Option<ScreenShot>,
    /// Mouse overlay.
    pub mouse: Option<MouseOverlay>,
}

type Slot = Arc<OnceCell<ScreenShot>>;

/// Hash-keyed screenshot cache with single-flight fetches.
#[derive(Clone)]
pub struct ScreenCache<T: Transport> {
    transport: T,
    session_id: SessionId,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl<T: Transport> ScreenCache<T> {
    /// Empty cache bound to a session.
    pub fn new(transport: T, session_id: SessionId) -> Self {
        Self {
            transport,
            session_id,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, hash: &str) -> Slot {
        self.slots().entry(hash.to_string()).or_default().clone()
    }

    /// Seed the cache with a screenshot obtained elsewhere.
    pub fn insert(&self, shot: ScreenShot) {
        let slot = self.slot(&shot.hash);
        if slot.set(shot).is_err() {
            trace!("screenshot already cached");
        }
    }

    /// Cached screenshot for `hash`, without fetching.
    pub fn cached(&self, hash: &str) -> Option<ScreenShot> {
        self.slots().get(hash).and_then(|slot| slot.get().cloned())
    }

    /// Fetch the screenshot for a paint, reusing a cached or in-flight
    /// fetch for the same hash. Failed fetches are not cached.
    pub async fn screen_shot(&self, paint: &PaintRef) -> Result<ScreenShot, ClientError> {
        let slot = self.slot(&paint.hash);
        let shot = slot
            .get_or_try_init(|| async {
                debug!(hash = %paint.hash, point = %paint.point, "fetching paint contents");
                let result: PaintContentsResult = self
                    .transport
                    .call(
                        names::GET_PAINT_CONTENTS,
                        &GetPaintContentsParams {
                            point: paint.point.clone(),
                            mime_type: PAINT_MIME_TYPE.to_string(),
                        },
                        RequestScope::session(&self.session_id),
                    )
                    .await?;
                Ok::<_, ClientError>(result.screen)
            })
            .await?;
        Ok(shot.clone())
    }

    /// Warm the cache for `paints` in the background.
    pub fn prefetch(&self, paints: &[PaintRef]) {
        for paint in paints {
            if self.cached(&paint.hash).is_some() {
                continue;
            }
            let cache = self.clone();
            let paint = paint.clone();
            tokio::spawn(async move {
                if let Err(err) = cache.screen_shot(&paint).await {
                    debug!(?err, hash = %paint.hash, "prefetch failed");
                }
            });
        }
    }

    /// Resolve a plan into graphics. Starts the prefetches first.
    pub async fn graphics(&self, plan: GraphicsPlan) -> Graphics {
        self.prefetch(&plan.prefetch);
        let screen = match &plan.paint {
            Some(paint) => match self.screen_shot(paint).await {
                Ok(shot) => Some(shot),
                Err(err) => {
                    debug!(?err, time = plan.time, "screenshot unavailable");
                    None
                }
            },
            None => None,
        };
        Graphics {
            time: plan.time,
            screen,
            mouse: plan.mouse,
        }
    }

    /// Resolve a plan on a background task; the receiver yields the result.
    pub fn spawn_graphics(&self, plan: GraphicsPlan) -> oneshot::Receiver<Graphics> {
        let (tx, rx) = oneshot::channel();
        let cache = self.clone();
        tokio::spawn(async move {
            let graphics = cache.graphics(plan).await;
            if tx.send(graphics).is_err() {
                trace!("graphics receiver dropped");
            }
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use replay_dry_tests::ScriptedTransport;
    use serde_json::json;

    fn index_with_paints() -> EventIndex {
        let mut index = EventIndex::new();
        for (i, t) in [100.0, 200.0, 300.0].into_iter().enumerate() {
            index.add_paint(ExecutionPoint::new(1, t), t, Some(format!("h{i}")));
        }
        index
    }

    #[test]
    fn plan_picks_most_recent_paint_and_prefetches_upcoming() {
        let index = index_with_paints();
        let plan = GraphicsPlan::at(&index, 150.0, 5, 200.0);
        assert_eq!(plan.paint.as_ref().map(|p| p.hash.as_str()), Some("h0"));
        let upcoming: Vec<_> = plan.prefetch.iter().map(|p| p.hash.as_str()).collect();
        assert_eq!(upcoming, vec!["h1", "h2"]);
        assert!(plan.mouse.is_none());
    }

    #[test]
    fn plan_before_first_screenshot_has_no_paint() {
        let index = index_with_paints();
        let plan = GraphicsPlan::at(&index, 50.0, 1, 200.0);
        assert!(plan.paint.is_none());
        assert_eq!(plan.prefetch.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_fetch() {
        let transport = ScriptedTransport::new();
        transport.respond_with(
            names::GET_PAINT_CONTENTS,
            json!({ "screen": { "mimeType": PAINT_MIME_TYPE, "hash": "h0", "data": "AAAA" } }),
        );
        let cache = ScreenCache::new(transport.clone(), "s1".to_string());
        let paint = PaintRef {
            point: ExecutionPoint::new(1, 100.0),
            hash: "h0".into(),
        };
        let (a, b) = tokio::join!(cache.screen_shot(&paint), cache.screen_shot(&paint));
        assert_eq!(a.unwrap().data, "AAAA");
        assert_eq!(b.unwrap().data, "AAAA");
        assert_eq!(transport.count(names::GET_PAINT_CONTENTS), 1);
        assert!(cache.cached("h0").is_some());
    }

    #[tokio::test]
    async fn failed_fetch_yields_graphics_without_screen() {
        let transport = ScriptedTransport::new();
        transport.fail_next(names::GET_PAINT_CONTENTS, "no such paint");
        let cache = ScreenCache::new(transport.clone(), "s1".to_string());
        let plan = GraphicsPlan::at(&index_with_paints(), 100.0, 0, 200.0);
        let graphics = cache.graphics(plan).await;
        assert!(graphics.screen.is_none());
        assert!(cache.cached("h0").is_none());
    }
}
