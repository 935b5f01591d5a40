//! Process-wide metrics aggregation.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use carta_core::{MetricsState, Outcome, RecentWindow, Sample};

use crate::TRACING_TARGET_METRICS;

/// Default number of recent outcomes kept for health evaluation.
pub const DEFAULT_WINDOW: usize = 10;

#[derive(Debug, Default)]
struct Inner {
    state: MetricsState,
    recent: VecDeque<Sample>,
}

/// Accumulates counters and a bounded window of recent outcomes.
///
/// [`MetricsAggregator::record`] is the only mutation point; every reader
/// gets a copy.
#[derive(Debug)]
pub struct MetricsAggregator {
    inner: Mutex<Inner>,
    window: usize,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl MetricsAggregator {
    /// Creates an aggregator keeping the last `window` outcomes.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            inner: Mutex::new(Inner {
                state: MetricsState::default(),
                recent: VecDeque::with_capacity(window),
            }),
            window,
        }
    }

    /// Folds one completed request into the counters and the window.
    pub fn record(&self, outcome: Outcome, processing_time: Duration, retry_count: u32) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.state.apply(outcome, processing_time, retry_count);

        if inner.recent.len() == self.window {
            inner.recent.pop_front();
        }
        inner.recent.push_back(Sample {
            success: outcome.is_success(),
            processing_time,
        });

        tracing::trace!(
            target: TRACING_TARGET_METRICS,
            %outcome,
            processing_time_ms = processing_time.as_millis(),
            retry_count,
            total_requests = inner.state.total_requests,
            "request recorded"
        );
    }

    /// Returns a copy of the counters.
    pub fn snapshot(&self) -> MetricsState {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .clone()
    }

    /// Returns the last completed outcomes, oldest first.
    pub fn recent(&self) -> RecentWindow {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        RecentWindow {
            samples: inner.recent.iter().copied().collect(),
        }
    }

    /// Capacity of the recent window.
    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }
}
