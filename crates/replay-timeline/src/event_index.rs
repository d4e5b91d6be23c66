// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Time-sorted series of paints and mouse events.
//!
//! Every series is kept sorted by ascending wall-clock time. Lookups are
//! binary searches: "most recent" is the last entry whose time is at or
//! before the query, "next" is the entry after that, and "closest" picks
//! between the two by distance. Distance ties go to the earlier entry.

use replay_protocol::methods::PAINT_MIME_TYPE;
use replay_protocol::{ExecutionPoint, MouseEvent, MouseEventKind, PaintPoint};
use tracing::warn;

/// Anything placed on the time axis.
pub trait Timed {
    /// Wall-clock time in ms.
    fn time(&self) -> f64;
    /// Execution point the entry was recorded at.
    fn point(&self) -> &ExecutionPoint;
}

/// Entry on one of the index's series.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEntry<P> {
    /// Where the entry happened.
    pub point: ExecutionPoint,
    /// Wall-clock time in ms.
    pub time: f64,
    /// Series-specific payload.
    pub payload: P,
}

impl<P> Timed for TimedEntry<P> {
    fn time(&self) -> f64 {
        self.time
    }

    fn point(&self) -> &ExecutionPoint {
        &self.point
    }
}

/// Paint entry; the payload is the hash of its JPEG screenshot, if any.
pub type PaintEntry = TimedEntry<Option<String>>;

/// Mouse entry payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MousePayload {
    /// Event kind.
    pub kind: MouseEventKind,
    /// Viewport x coordinate.
    pub client_x: f64,
    /// Viewport y coordinate.
    pub client_y: f64,
}

/// Mouse entry.
pub type MouseEntry = TimedEntry<MousePayload>;

/// Borrowed view of an entry from any series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetHit<'a> {
    /// Where the entry happened.
    pub point: &'a ExecutionPoint,
    /// Wall-clock time in ms.
    pub time: f64,
}

impl Timed for WidgetHit<'_> {
    fn time(&self) -> f64 {
        self.time
    }

    fn point(&self) -> &ExecutionPoint {
        self.point
    }
}

impl<'a, T: Timed> From<&'a T> for WidgetHit<'a> {
    fn from(entry: &'a T) -> Self {
        Self {
            point: entry.point(),
            time: entry.time(),
        }
    }
}

/// Index of the last entry with `time <= t`, or `None` when every entry is
/// later than `t` (or the series is empty).
pub fn most_recent_index<T: Timed>(entries: &[T], time: f64) -> Option<usize> {
    entries
        .partition_point(|entry| entry.time() <= time)
        .checked_sub(1)
}

/// Last entry with `time <= t`.
pub fn most_recent_entry<T: Timed>(entries: &[T], time: f64) -> Option<&T> {
    most_recent_index(entries, time).map(|idx| &entries[idx])
}

/// First entry strictly after the most recent one; the first entry when no
/// entry is at or before `t`.
pub fn next_entry<T: Timed>(entries: &[T], time: f64) -> Option<&T> {
    let idx = most_recent_index(entries, time).map_or(0, |idx| idx + 1);
    entries.get(idx)
}

/// The entry nearer to `time`. Equal distances pick the earlier entry, and
/// equal times pick `first`.
pub fn closer_entry<'a, A: Timed + ?Sized>(
    time: f64,
    first: Option<&'a A>,
    second: Option<&'a A>,
) -> Option<&'a A> {
    match (first, second) {
        (None, other) | (other, None) => other,
        (Some(a), Some(b)) => {
            let da = (time - a.time()).abs();
            let db = (time - b.time()).abs();
            if da < db || (da <= db && a.time() <= b.time()) {
                Some(a)
            } else {
                Some(b)
            }
        }
    }
}

/// Entry whose time is nearest to `time`.
pub fn closest_entry<T: Timed>(entries: &[T], time: f64) -> Option<&T> {
    closer_entry(
        time,
        most_recent_entry(entries, time),
        next_entry(entries, time),
    )
}

/// Insert keeping ascending time; equal times land after existing entries.
pub fn insert_sorted<T: Timed>(entries: &mut Vec<T>, entry: T) {
    let idx = entries.partition_point(|existing| existing.time() <= entry.time());
    entries.insert(idx, entry);
}

/// A series that can be searched without knowing its payload type.
pub trait TimedSeries {
    /// Closest entry to `time`.
    fn closest_hit(&self, time: f64) -> Option<WidgetHit<'_>>;
    /// Most recent entry at or before `time`.
    fn most_recent_hit(&self, time: f64) -> Option<WidgetHit<'_>>;
    /// Next entry after `time`.
    fn next_hit(&self, time: f64) -> Option<WidgetHit<'_>>;
}

impl<T: Timed> TimedSeries for Vec<T> {
    fn closest_hit(&self, time: f64) -> Option<WidgetHit<'_>> {
        closest_entry(self, time).map(WidgetHit::from)
    }

    fn most_recent_hit(&self, time: f64) -> Option<WidgetHit<'_>> {
        most_recent_entry(self, time).map(WidgetHit::from)
    }

    fn next_hit(&self, time: f64) -> Option<WidgetHit<'_>> {
        next_entry(self, time).map(WidgetHit::from)
    }
}

/// Entry nearest to `time` across several series. Ties go to the earlier
/// entry, then to the earlier series.
pub fn closest_across_series<'a>(
    time: f64,
    series: &[&'a dyn TimedSeries],
) -> Option<WidgetHit<'a>> {
    series
        .iter()
        .copied()
        .fold(None::<WidgetHit<'a>>, |best, s| {
            closer_entry(time, best.as_ref(), s.closest_hit(time).as_ref()).copied()
        })
}

/// Mouse state to overlay on a screenshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseOverlay {
    /// Viewport x coordinate.
    pub x: f64,
    /// Viewport y coordinate.
    pub y: f64,
    /// Whether a click happened within the click threshold.
    pub clicked: bool,
}

/// Sorted paint, mouse and click series for one recording.
#[derive(Debug, Clone)]
pub struct EventIndex {
    paints: Vec<PaintEntry>,
    mouse_events: Vec<MouseEntry>,
    clicks: Vec<MouseEntry>,
}

impl Default for EventIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl EventIndex {
    /// Index seeded with a paint at the start of the recording, time zero,
    /// without a screenshot.
    pub fn new() -> Self {
        Self {
            paints: vec![PaintEntry {
                point: ExecutionPoint::first(),
                time: 0.0,
                payload: None,
            }],
            mouse_events: Vec::new(),
            clicks: Vec::new(),
        }
    }

    /// Paints in time order.
    pub fn paints(&self) -> &[PaintEntry] {
        &self.paints
    }

    /// Mouse events in time order.
    pub fn mouse_events(&self) -> &[MouseEntry] {
        &self.mouse_events
    }

    /// Mouse-down events in time order.
    pub fn clicks(&self) -> &[MouseEntry] {
        &self.clicks
    }

    /// Add a batch of paints. Paints without a JPEG screenshot are kept but
    /// carry no hash.
    pub fn add_paints(&mut self, paints: &[PaintPoint]) {
        for paint in paints {
            let hash = paint
                .screen_shots
                .iter()
                .find(|shot| shot.mime_type == PAINT_MIME_TYPE)
                .map(|shot| shot.hash.clone());
            if hash.is_none() {
                warn!(point = %paint.point, "paint without a {PAINT_MIME_TYPE} screenshot");
            }
            self.add_paint(paint.point.clone(), paint.time, hash);
        }
    }

    /// Add one paint.
    pub fn add_paint(&mut self, point: ExecutionPoint, time: f64, hash: Option<String>) {
        insert_sorted(
            &mut self.paints,
            PaintEntry {
                point,
                time,
                payload: hash,
            },
        );
    }

    /// Add a batch of mouse events; mouse-downs also go to the click series.
    pub fn add_mouse_events(&mut self, events: &[MouseEvent]) {
        for event in events {
            let entry = MouseEntry {
                point: event.point.clone(),
                time: event.time,
                payload: MousePayload {
                    kind: event.kind,
                    client_x: event.client_x,
                    client_y: event.client_y,
                },
            };
            if event.kind == MouseEventKind::Mousedown {
                insert_sorted(&mut self.clicks, entry.clone());
            }
            insert_sorted(&mut self.mouse_events, entry);
        }
    }

    fn widget_series(&self) -> [&dyn TimedSeries; 2] {
        [&self.paints as &dyn TimedSeries, &self.mouse_events]
    }

    /// Paint or mouse event nearest to `time`.
    pub fn closest_paint_or_mouse_event(&self, time: f64) -> Option<WidgetHit<'_>> {
        closest_across_series(time, &self.widget_series())
    }

    /// Latest paint or mouse event at or before `time`.
    pub fn most_recent_paint_or_mouse_event(&self, time: f64) -> Option<WidgetHit<'_>> {
        self.widget_series()
            .into_iter()
            .filter_map(|s| s.most_recent_hit(time))
            .fold(None, |best: Option<WidgetHit<'_>>, hit| match best {
                Some(b) if b.time >= hit.time => Some(b),
                _ => Some(hit),
            })
    }

    /// Earliest paint or mouse event after `time`.
    pub fn next_paint_or_mouse_event(&self, time: f64) -> Option<WidgetHit<'_>> {
        let [paints, mice] = self.widget_series();
        closer_entry(time, paints.next_hit(time).as_ref(), mice.next_hit(time).as_ref()).copied()
    }

    /// Most recent paint at or before `time`.
    pub fn most_recent_paint(&self, time: f64) -> Option<&PaintEntry> {
        most_recent_entry(&self.paints, time)
    }

    /// First paint after `time`.
    pub fn next_paint_event(&self, time: f64) -> Option<&PaintEntry> {
        next_entry(&self.paints, time)
    }

    /// Paint strictly before `time`: when the most recent paint sits exactly
    /// at `time`, the one before it.
    #[allow(clippy::float_cmp)]
    pub fn previous_paint_event(&self, time: f64) -> Option<&PaintEntry> {
        let entry = most_recent_entry(&self.paints, time)?;
        if entry.time == time {
            return most_recent_entry(&self.paints, time - 1.0);
        }
        Some(entry)
    }

    /// Up to `count` paints after `time`.
    pub fn upcoming_paints(&self, time: f64, count: usize) -> &[PaintEntry] {
        let start = most_recent_index(&self.paints, time).map_or(0, |idx| idx + 1);
        let end = start.saturating_add(count).min(self.paints.len());
        self.paints.get(start..end).unwrap_or(&[])
    }

    /// Mouse position at `time`, flagged as clicked when the latest click is
    /// within `click_threshold_ms` before it.
    pub fn mouse_overlay(&self, time: f64, click_threshold_ms: f64) -> Option<MouseOverlay> {
        let mouse = most_recent_entry(&self.mouse_events, time)?;
        let clicked = most_recent_entry(&self.clicks, time)
            .is_some_and(|click| time - click.time < click_threshold_ms);
        Some(MouseOverlay {
            x: mouse.payload.client_x,
            y: mouse.payload.client_y,
            clicked,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn paint(checkpoint: u32, time: f64) -> PaintEntry {
        PaintEntry {
            point: ExecutionPoint::new(checkpoint, time),
            time,
            payload: None,
        }
    }

    fn mouse(time: f64, kind: MouseEventKind) -> MouseEvent {
        MouseEvent {
            point: ExecutionPoint::new(1, time),
            time,
            kind,
            client_x: time,
            client_y: 1.0,
        }
    }

    #[test]
    fn most_recent_is_last_at_or_before() {
        let series = vec![paint(1, 0.0), paint(1, 10.0), paint(1, 10.0), paint(1, 20.0)];
        assert_eq!(most_recent_index(&series, -1.0), None);
        assert_eq!(most_recent_index(&series, 10.0), Some(2));
        assert_eq!(most_recent_index(&series, 15.0), Some(2));
        assert_eq!(most_recent_index(&series, 99.0), Some(3));
        assert_eq!(most_recent_index::<PaintEntry>(&[], 5.0), None);
        assert_eq!(most_recent_index(&series, f64::NAN), None);
    }

    #[test]
    fn next_entry_before_first_is_first() {
        let series = vec![paint(1, 5.0), paint(1, 10.0)];
        assert_eq!(next_entry(&series, 0.0).map(|e| e.time), Some(5.0));
        assert_eq!(next_entry(&series, 5.0).map(|e| e.time), Some(10.0));
        assert!(next_entry(&series, 10.0).is_none());
    }

    #[test]
    fn closest_entry_ties_go_to_earlier() {
        let series = vec![paint(1, 10.0), paint(1, 20.0)];
        assert_eq!(closest_entry(&series, 15.0).map(|e| e.time), Some(10.0));
        assert_eq!(closest_entry(&series, 16.0).map(|e| e.time), Some(20.0));
        assert_eq!(closest_entry(&series, 0.0).map(|e| e.time), Some(10.0));
    }

    #[test]
    fn insert_sorted_keeps_order_and_stability() {
        let mut series = vec![paint(1, 0.0), paint(1, 20.0)];
        insert_sorted(&mut series, paint(2, 10.0));
        insert_sorted(&mut series, paint(3, 10.0));
        let checkpoints: Vec<_> = series.iter().map(|e| e.point.checkpoint).collect();
        assert_eq!(checkpoints, vec![1, 2, 3, 1]);
    }

    #[test]
    fn index_is_seeded_with_first_paint() {
        let index = EventIndex::new();
        let first = &index.paints()[0];
        assert_eq!(first.point, ExecutionPoint::first());
        assert_eq!(first.time, 0.0);
        assert!(first.payload.is_none());
    }

    #[test]
    fn closest_across_paints_and_mouse() {
        let mut index = EventIndex::new();
        index.add_paint(ExecutionPoint::new(1, 100.0), 100.0, Some("h".into()));
        index.add_mouse_events(&[mouse(60.0, MouseEventKind::Mousemove)]);
        let hit = index.closest_paint_or_mouse_event(70.0).unwrap();
        assert_eq!(hit.time, 60.0);
        let next = index.next_paint_or_mouse_event(60.0).unwrap();
        assert_eq!(next.time, 100.0);
        let recent = index.most_recent_paint_or_mouse_event(99.0).unwrap();
        assert_eq!(recent.time, 60.0);
    }

    #[test]
    fn previous_paint_skips_exact_match() {
        let mut index = EventIndex::new();
        index.add_paint(ExecutionPoint::new(1, 50.0), 50.0, None);
        assert_eq!(index.previous_paint_event(50.0).unwrap().time, 0.0);
        assert_eq!(index.previous_paint_event(60.0).unwrap().time, 50.0);
    }

    #[test]
    fn clicks_are_indexed_separately() {
        let mut index = EventIndex::new();
        index.add_mouse_events(&[
            mouse(10.0, MouseEventKind::Mousemove),
            mouse(20.0, MouseEventKind::Mousedown),
            mouse(30.0, MouseEventKind::Mouseup),
        ]);
        assert_eq!(index.mouse_events().len(), 3);
        assert_eq!(index.clicks().len(), 1);

        let overlay = index.mouse_overlay(100.0, 200.0).unwrap();
        assert!(overlay.clicked);
        assert_eq!(overlay.x, 30.0);
        assert!(!index.mouse_overlay(500.0, 200.0).unwrap().clicked);
        assert!(index.mouse_overlay(5.0, 200.0).is_none());
    }

    #[test]
    fn upcoming_paints_are_bounded() {
        let mut index = EventIndex::new();
        for t in 1..10 {
            index.add_paint(ExecutionPoint::new(1, f64::from(t)), f64::from(t), None);
        }
        let upcoming = index.upcoming_paints(3.0, 5);
        assert_eq!(upcoming.len(), 5);
        assert_eq!(upcoming[0].time, 4.0);
        assert!(index.upcoming_paints(9.0, 5).is_empty());
    }
}
