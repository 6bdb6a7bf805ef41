use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
struct Scheduled<E> {
    time: Duration,
    id: u64, // Insertion order, breaks ties at equal time
    event: E,
}

// Custom Ord for Min-Heap (smallest time pops first)
impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Single-threaded event queue with a monotonically advancing clock.
///
/// Events never run concurrently: the owner pops one, handles it (possibly
/// scheduling more), then pops the next. Events at equal times run in the
/// order they were scheduled.
pub struct EventClock<E> {
    now: Duration,
    queue: BinaryHeap<Scheduled<E>>,
    next_id: u64,
    executed: u64,
}

impl<E: fmt::Debug> Default for EventClock<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: fmt::Debug> EventClock<E> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            queue: BinaryHeap::new(),
            next_id: 0,
            executed: 0,
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `event` to run `delay` after the current time.
    pub fn schedule(&mut self, delay: Duration, event: E) {
        self.push(self.now + delay, event);
    }

    /// Schedule at an absolute time. Times in the past run at `now`.
    pub fn schedule_at(&mut self, time: Duration, event: E) {
        self.push(time.max(self.now), event);
    }

    fn push(&mut self, time: Duration, event: E) {
        self.queue.push(Scheduled {
            time,
            id: self.next_id,
            event,
        });
        self.next_id += 1;
    }

    pub fn peek_next_event_time(&self) -> Option<Duration> {
        self.queue.peek().map(|e| e.time)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// Pop the next event if it is due at or before `stop`, advancing the
    /// clock to its time. Returns `None` once nothing is left before `stop`;
    /// later events stay queued.
    pub fn next_until(&mut self, stop: Duration) -> Option<E> {
        if self.peek_next_event_time()? > stop {
            return None;
        }
        let scheduled = self.queue.pop()?;
        self.now = scheduled.time;
        self.executed += 1;
        debug!("Processing event at {:?}: {:?}", self.now, scheduled.event);
        Some(scheduled.event)
    }

    /// Drop every pending event without running it. Returns how many were
    /// discarded.
    pub fn destroy(&mut self) -> usize {
        let discarded = self.queue.len();
        self.queue.clear();
        discarded
    }
}
