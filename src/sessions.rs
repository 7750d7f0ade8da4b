//! Per-date session tracking for bounce classification
//!
//! Each date's state is a map from a reduced-precision session key to a
//! running event count. A file's worker calls `init` before its stream
//! starts, feeds every sampled event through `session_event_count`, and
//! `release`s the map the moment the stream ends, so memory is bounded by
//! the worker pool size rather than the full date range.
//!
//! Session keys are the last hex segment of the session UUID parsed as a
//! `u64` instead of the whole identifier. With 12 hex digits any two
//! sessions collide with probability 1 in 16^12 (~281 trillion); the
//! birthday effect raises that to ~0.2% across a million sessions in one
//! day, which is an accepted tradeoff for compact per-date memory.

use crate::event::RawEvent;
use std::collections::HashMap;
use std::sync::Mutex;

// Don't treat these as evidence of a non-bounce session. Changing this set
// shifts the bounce metrics, so compare before and after if it is ever
// revisited.
const IGNORE_EVENTS: [&str; 5] = [
    "error",
    "mouse-shake",
    "page-unloaded",
    "page-scrolled-first",
    "page-clicked-first",
];

type SessionMap = HashMap<u64, u32>;

/// Per-date session event counters.
///
/// One slot per DateIndex, each behind its own lock: a date's map is only
/// ever touched by the worker currently processing that date's file, so
/// in-flight files never contend.
pub struct SessionTracker {
    days: Vec<Mutex<Option<SessionMap>>>,
}

impl SessionTracker {
    pub fn new(num_dates: usize) -> Self {
        Self {
            days: (0..num_dates).map(|_| Mutex::new(None)).collect(),
        }
    }

    /// Allocate the map for a date before its file's stream starts.
    pub fn init(&self, date_index: usize) {
        *self.days[date_index].lock().unwrap() = Some(HashMap::new());
    }

    /// Discard the map for a date as soon as its file's stream ends.
    pub fn release(&self, date_index: usize) {
        *self.days[date_index].lock().unwrap() = None;
    }

    /// Count this event against its session and return the running total.
    ///
    /// Ignored event names return `None` without touching any counter.
    /// Anonymous events (no session id, or an id whose tail is not valid
    /// hex) return `Some(0)` without recording state. The first counted
    /// event of a session returns 1.
    pub fn session_event_count(&self, date_index: usize, event: &RawEvent) -> Option<u32> {
        if IGNORE_EVENTS.contains(&event.name.as_str()) {
            return None;
        }

        let key = match event.session_id.as_deref().and_then(session_key) {
            Some(key) => key,
            None => return Some(0),
        };

        let mut slot = self.days[date_index].lock().unwrap();
        let sessions = slot
            .as_mut()
            .expect("session state used before init or after release");
        let count = sessions.entry(key).or_insert(0);
        *count += 1;
        Some(*count)
    }

    /// Number of distinct sessions seen for this date so far.
    pub fn num_sessions(&self, date_index: usize) -> usize {
        self.days[date_index]
            .lock()
            .unwrap()
            .as_ref()
            .map_or(0, |sessions| sessions.len())
    }

    /// Number of sessions with more than one counted event (non-bounce).
    pub fn num_non_bounce_sessions(&self, date_index: usize) -> usize {
        self.days[date_index]
            .lock()
            .unwrap()
            .as_ref()
            .map_or(0, |sessions| {
                sessions.values().filter(|count| **count > 1).count()
            })
    }
}

/// Reduced-precision session key: the last hyphen-delimited segment of the
/// UUID (12 hex digits) as an integer.
fn session_key(session_id: &str) -> Option<u64> {
    let hex_part = session_id.rsplit('-').next()?;
    u64::from_str_radix(hex_part, 16).ok()
}
