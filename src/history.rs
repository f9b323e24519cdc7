//! HVAC on/off history.
//!
//! Only transitions are recorded.  Entries older than the retention window
//! are pruned on every append and once per control tick, so the ring holds
//! at most one day of edges.

use chrono::{DateTime, Duration as ChronoDuration, SubsecRound, Utc};
use heapless::Deque;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{HISTORY_WINDOW_HOURS, HVAC_POLL_INTERVAL};

/// Ring capacity: one edge per blower poll across the whole window, plus
/// the edge sitting exactly on the window boundary.  The sense line cannot
/// produce more than that, so the ring only overflows on a clock jump.
pub const HISTORY_CAPACITY: usize =
    (HISTORY_WINDOW_HOURS as u64 * 3600 / HVAC_POLL_INTERVAL.as_secs()) as usize + 1;

/// One HVAC transition.
///
/// Timestamps are kept to the millisecond, which is what the log stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub hvac_running: bool,
}

pub struct HistoryRecorder {
    // Boxed: a full day of edges is too large to move around on the stack.
    entries: Box<Deque<HistoryEntry, HISTORY_CAPACITY>>,
    window: ChronoDuration,
}

impl HistoryRecorder {
    pub fn new() -> Self {
        Self {
            entries: Box::new(Deque::new()),
            window: ChronoDuration::hours(HISTORY_WINDOW_HOURS),
        }
    }

    /// Rebuild from a persisted log.  Entries are sorted and anything
    /// outside the window ending at `now` is discarded.
    pub fn from_entries(mut entries: Vec<HistoryEntry>, now: DateTime<Utc>) -> Self {
        entries.sort_by_key(|e| e.timestamp);
        let mut recorder = Self::new();
        for entry in entries {
            recorder.push(entry);
        }
        recorder.prune(now);
        recorder
    }

    /// Append a transition and prune.  Returns the number of entries pruned.
    pub fn record(&mut self, timestamp: DateTime<Utc>, hvac_running: bool) -> usize {
        self.push(HistoryEntry {
            timestamp,
            hvac_running,
        });
        self.prune(timestamp)
    }

    /// Drop entries older than the retention window.  Returns how many.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        let mut dropped = 0;
        while self.entries.front().is_some_and(|e| e.timestamp < cutoff) {
            self.entries.pop_front();
            dropped += 1;
        }
        dropped
    }

    /// Chronologically ordered copy.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, mut entry: HistoryEntry) {
        entry.timestamp = entry.timestamp.trunc_subsecs(3);
        if self.entries.is_full() {
            warn!("History ring full, dropping oldest entry");
            self.entries.pop_front();
        }
        // Cannot fail: a slot was freed above if needed.
        let _ = self.entries.push_back(entry);
    }
}

impl Default for HistoryRecorder {
    fn default() -> Self {
        Self::new()
    }
}
