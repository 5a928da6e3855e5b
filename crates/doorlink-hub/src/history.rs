//! Bounded log of received lines.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use doorlink_core::ModuleId;

/// One history record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEvent {
    /// Monotonic receive time, comparable with module timestamps
    pub at: Instant,

    /// Wall-clock receive time for display
    pub wall_time: DateTime<Utc>,

    pub module_id: ModuleId,

    pub text: String,
}

impl fmt::Display for HistoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.wall_time.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.module_id,
            self.text
        )
    }
}

/// Fixed-capacity ring; the oldest entry is overwritten when full.
#[derive(Debug)]
pub struct HistoryRing {
    entries: VecDeque<HistoryEvent>,
    capacity: usize,
}

impl HistoryRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, at: Instant, module_id: ModuleId, text: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEvent {
            at,
            wall_time: Utc::now(),
            module_id,
            text: text.into(),
        });
    }

    /// The most recent `max_n` entries, oldest first.
    pub fn recent(&self, max_n: usize) -> Vec<HistoryEvent> {
        let skip = self.entries.len().saturating_sub(max_n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
