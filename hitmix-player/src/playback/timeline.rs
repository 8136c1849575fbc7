//! Timeline and dispatch queue
//!
//! The timeline is built once from an unordered event list: companions are
//! split out into independent members, identities are assigned in source
//! order and the result is stable-sorted by offset (ties keep source order,
//! so a stop encoded before a start at the same offset stays first).
//!
//! A dispatch queue is a cursor over the shared immutable timeline. It is
//! rebuilt wholesale on play-from-time and seek; draining it is lock-free for
//! the single consumer (the playback loop).

use crate::playback::events::{EventId, ScheduledEvent, SoundEvent, SoundKey};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::warn;

/// How many trailing sounding events are considered for ring-out
const RING_OUT_WINDOW: usize = 9;

/// Immutable, time-ordered sequence of scheduled events
#[derive(Debug, Default)]
pub struct Timeline {
    events: Vec<ScheduledEvent>,
}

impl Timeline {
    /// Flatten companions, assign identities and sort by offset
    ///
    /// Events with a non-finite offset cannot be scheduled; they are dropped
    /// with a warning instead of failing construction.
    pub fn build(source: Vec<SoundEvent>) -> Self {
        let mut events = Vec::with_capacity(source.len());
        let mut next_id = 0u32;

        for event in source {
            push_flattened(event, &mut events, &mut next_id);
        }

        // Stable: equal offsets keep flattened source order
        events.sort_by(|a, b| a.offset().total_cmp(&b.offset()));

        Self { events }
    }

    pub fn events(&self) -> &[ScheduledEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Offset of the latest event (0 for an empty timeline)
    pub fn last_offset(&self) -> f64 {
        self.events.last().map(ScheduledEvent::offset).unwrap_or(0.0)
    }

    /// Index of the first event with `offset >= from_ms`
    pub fn first_index_at(&self, from_ms: f64) -> usize {
        self.events.partition_point(|e| e.offset() < from_ms)
    }

    /// Total playing time including the ring-out of trailing sounds
    ///
    /// `ring_out` returns the natural length (ms) of an event's sound when
    /// known. Only the last few sounding events are inspected: anything
    /// earlier is already covered by a later trigger in practice.
    pub fn duration<F>(&self, ring_out: F) -> f64
    where
        F: Fn(&ScheduledEvent) -> Option<f64>,
    {
        let near_end = self
            .events
            .iter()
            .rev()
            .filter(|e| e.control().plays_sound())
            .take(RING_OUT_WINDOW)
            .map(|e| e.offset() + ring_out(e).unwrap_or(0.0).max(0.0))
            .fold(f64::MIN, f64::max);

        self.last_offset().max(near_end)
    }

    /// Distinct sounds referenced by one-shot and sustained-start events
    pub fn sound_keys(&self) -> BTreeSet<SoundKey> {
        self.events
            .iter()
            .filter(|e| e.control().plays_sound())
            .filter_map(|e| e.event.sound.clone())
            .collect()
    }

    /// Look up an event by identity
    pub fn get(&self, id: EventId) -> Option<&ScheduledEvent> {
        self.events.iter().find(|e| e.id == id)
    }
}

fn push_flattened(
    mut event: SoundEvent,
    events: &mut Vec<ScheduledEvent>,
    next_id: &mut u32,
) -> Option<EventId> {
    let companion = event.companion.take();

    if !event.offset.is_finite() {
        warn!(
            "Dropping {} event for {} with non-finite offset {}",
            event.control,
            event.sound_label(),
            event.offset
        );
        // The companion is still a valid member on its own
        if let Some(companion) = companion {
            push_flattened(*companion, events, next_id);
        }
        return None;
    }

    let id = EventId(*next_id);
    *next_id += 1;
    let index = events.len();
    events.push(ScheduledEvent {
        id,
        companion_id: None,
        event,
    });

    if let Some(companion) = companion {
        events[index].companion_id = push_flattened(*companion, events, next_id);
    }

    Some(id)
}

/// Position-aware cursor over a timeline
///
/// Single consumer: only the playback loop dequeues. Rebuilding replaces the
/// whole queue (see `PlaybackEngine::skip_to`), never mutates it.
#[derive(Debug)]
pub struct DispatchQueue {
    timeline: Arc<Timeline>,
    next: AtomicUsize,
}

impl DispatchQueue {
    /// Queue holding every timeline event with `offset >= from_ms`
    pub fn starting_at(timeline: Arc<Timeline>, from_ms: f64) -> Self {
        let next = timeline.first_index_at(from_ms);
        Self {
            timeline,
            next: AtomicUsize::new(next),
        }
    }

    /// Queue with nothing left to dispatch
    pub fn empty() -> Self {
        Self {
            timeline: Arc::new(Timeline::default()),
            next: AtomicUsize::new(0),
        }
    }

    /// The timeline this queue walks
    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    /// Head event without removing it
    pub fn peek(&self) -> Option<&ScheduledEvent> {
        self.timeline.events.get(self.next.load(Ordering::Acquire))
    }

    /// Remove and return the head event
    pub fn dequeue(&self) -> Option<&ScheduledEvent> {
        let len = self.timeline.events.len();
        let index = self
            .next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| (i < len).then_some(i + 1))
            .ok()?;
        self.timeline.events.get(index)
    }

    /// Dequeue every head event whose offset is `<= now_ms`
    ///
    /// Stops at the first future event; returns the dequeued run in order.
    pub fn take_due(&self, now_ms: f64) -> &[ScheduledEvent] {
        let start = self.next.load(Ordering::Acquire);
        let mut end = start;
        while let Some(head) = self.timeline.events.get(end) {
            if head.offset() > now_ms {
                break;
            }
            end += 1;
        }
        self.next.store(end, Ordering::Release);
        &self.timeline.events[start.min(end)..end]
    }

    /// Events not yet dispatched, in order
    pub fn remaining(&self) -> &[ScheduledEvent] {
        let start = self.next.load(Ordering::Acquire).min(self.timeline.events.len());
        &self.timeline.events[start..]
    }

    pub fn len(&self) -> usize {
        self.remaining().len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::events::{ControlKind, SustainCategory};

    fn sample_timeline() -> Arc<Timeline> {
        Arc::new(Timeline::build(vec![
            SoundEvent::one_shot(300.0, "c", 1.0, 0.0),
            SoundEvent::one_shot(0.0, "a", 1.0, 0.0),
            SoundEvent::start_sustained(100.0, "slide", SustainCategory::Slide, 1.0, 0.0),
            SoundEvent::one_shot(100.0, "b", 1.0, 0.0),
            SoundEvent::stop_all_sustained(500.0),
        ]))
    }

    fn offsets(events: &[ScheduledEvent]) -> Vec<f64> {
        events.iter().map(ScheduledEvent::offset).collect()
    }

    #[test]
    fn test_build_sorts_by_offset() {
        let timeline = sample_timeline();
        assert_eq!(offsets(timeline.events()), vec![0.0, 100.0, 100.0, 300.0, 500.0]);
    }

    #[test]
    fn test_build_keeps_source_order_on_ties() {
        let timeline = sample_timeline();
        // start_sustained was listed before the "b" one-shot at 100ms
        assert_eq!(timeline.events()[1].control(), ControlKind::StartSustained);
        assert_eq!(timeline.events()[2].control(), ControlKind::OneShot);
    }

    #[test]
    fn test_stop_before_start_preserved() {
        let timeline = Timeline::build(vec![
            SoundEvent::stop_all_sustained(200.0),
            SoundEvent::start_sustained(200.0, "s", SustainCategory::Slide, 1.0, 0.0),
        ]);
        assert_eq!(timeline.events()[0].control(), ControlKind::StopAllSustained);
        assert_eq!(timeline.events()[1].control(), ControlKind::StartSustained);
    }

    #[test]
    fn test_companion_becomes_member() {
        let timeline = Timeline::build(vec![SoundEvent::one_shot(100.0, "hold", 1.0, 0.0)
            .with_companion(SoundEvent::stop_sustained(800.0))]);

        assert_eq!(timeline.len(), 2);
        let parent = &timeline.events()[0];
        let companion = &timeline.events()[1];
        assert_eq!(parent.companion_id, Some(companion.id));
        assert!(parent.event.companion.is_none());
        assert_eq!(companion.control(), ControlKind::StopSustained);
    }

    #[test]
    fn test_non_finite_offset_is_dropped_not_fatal() {
        let timeline = Timeline::build(vec![
            SoundEvent::one_shot(f64::NAN, "broken", 1.0, 0.0)
                .with_companion(SoundEvent::stop_sustained(50.0)),
            SoundEvent::one_shot(10.0, "ok", 1.0, 0.0),
        ]);
        assert_eq!(offsets(timeline.events()), vec![10.0, 50.0]);
    }

    #[test]
    fn test_duration_includes_ring_out() {
        let timeline = sample_timeline();
        assert_eq!(timeline.duration(|_| None), 500.0);

        // The last one-shot at 300ms rings for 400ms
        let duration = timeline.duration(|e| {
            (e.event.sound.as_ref().map(SoundKey::as_str) == Some("c")).then_some(400.0)
        });
        assert_eq!(duration, 700.0);
    }

    #[test]
    fn test_duration_of_empty_timeline() {
        assert_eq!(Timeline::default().duration(|_| Some(100.0)), 0.0);
    }

    #[test]
    fn test_sound_keys_skip_control_events() {
        let keys = sample_timeline().sound_keys();
        let names: Vec<&str> = keys.iter().map(SoundKey::as_str).collect();
        assert_eq!(names, vec!["a", "b", "c", "slide"]);
    }

    #[test]
    fn test_rebuild_contains_exactly_events_at_or_after() {
        let timeline = sample_timeline();
        for &t in &[0.0, 50.0, 100.0, 100.5, 300.0, 500.0, 501.0] {
            let queue = DispatchQueue::starting_at(timeline.clone(), t);
            let expected: Vec<&ScheduledEvent> =
                timeline.events().iter().filter(|e| e.offset() >= t).collect();
            let actual: Vec<&ScheduledEvent> = queue.remaining().iter().collect();
            assert_eq!(actual, expected, "rebuild at {}", t);
        }
    }

    #[test]
    fn test_take_due_never_dispatches_future() {
        let queue = DispatchQueue::starting_at(sample_timeline(), 0.0);

        assert_eq!(offsets(queue.take_due(-1.0)), Vec::<f64>::new());
        assert_eq!(offsets(queue.take_due(99.9)), vec![0.0]);
        assert_eq!(offsets(queue.take_due(100.0)), vec![100.0, 100.0]);
        assert_eq!(offsets(queue.take_due(100.0)), Vec::<f64>::new());
        assert_eq!(queue.peek().map(ScheduledEvent::offset), Some(300.0));
        assert_eq!(offsets(queue.take_due(10_000.0)), vec![300.0, 500.0]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_take_due_dispatches_each_event_once() {
        let timeline = sample_timeline();
        let queue = DispatchQueue::starting_at(timeline.clone(), 0.0);

        let mut seen = Vec::new();
        let mut now = 0.0;
        while now <= 600.0 {
            for event in queue.take_due(now) {
                assert!(event.offset() <= now);
                seen.push(event.id);
            }
            now += 7.0;
        }

        let all: Vec<EventId> = timeline.events().iter().map(|e| e.id).collect();
        assert_eq!(seen, all);
    }

    #[test]
    fn test_peek_and_dequeue() {
        let queue = DispatchQueue::starting_at(sample_timeline(), 300.0);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek().map(ScheduledEvent::offset), Some(300.0));
        assert_eq!(queue.dequeue().map(ScheduledEvent::offset), Some(300.0));
        assert_eq!(queue.dequeue().map(ScheduledEvent::offset), Some(500.0));
        assert!(queue.dequeue().is_none());
        assert!(queue.peek().is_none());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_empty_queue() {
        let queue = DispatchQueue::empty();
        assert!(queue.is_empty());
        assert!(queue.take_due(f64::MAX).is_empty());
    }
}
