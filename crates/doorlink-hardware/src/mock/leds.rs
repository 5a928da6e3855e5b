//! Recording LED board.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::{Result, led::LedSink, traits::LedPatterns, types::LedEvent};

/// LED board that records every event it is asked to show.
///
/// Implements both [`LedPatterns`] (to sit behind a
/// [`LedWorker`](crate::led::LedWorker)) and [`LedSink`] (to be handed to a
/// controller directly in tests).
#[derive(Debug, Clone, Default)]
pub struct MockLeds {
    events: Arc<Mutex<Vec<LedEvent>>>,
}

impl MockLeds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events shown so far, oldest first.
    pub fn events(&self) -> Vec<LedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, event: LedEvent) {
        debug!(%event, "LED");
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl LedPatterns for MockLeds {
    async fn play(&mut self, event: LedEvent) -> Result<()> {
        self.record(event);
        Ok(())
    }
}

impl LedSink for MockLeds {
    fn signal(&self, event: LedEvent) {
        self.record(event);
    }
}
