//! Operational metrics value types.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Terminal outcome of a completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    /// Fields were extracted.
    Success,
    /// The request ended with an error.
    Failure,
}

impl Outcome {
    /// Returns the outcome matching a success flag.
    #[inline]
    pub const fn from_success(success: bool) -> Self {
        if success { Self::Success } else { Self::Failure }
    }

    /// Returns true for [`Outcome::Success`].
    #[inline]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Process-wide request counters.
///
/// `successful_requests + failed_requests == total_requests` holds after
/// every [`MetricsState::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsState {
    /// Number of completed requests.
    pub total_requests: u64,
    /// Number of requests that ended in success.
    pub successful_requests: u64,
    /// Number of requests that ended in failure.
    pub failed_requests: u64,
    /// Sum of processing times of all completed requests.
    pub sum_processing_time: Duration,
    /// Sum of retries performed by all completed requests.
    pub retry_total: u64,
}

impl MetricsState {
    /// Folds a single completed request into the counters.
    pub fn apply(&mut self, outcome: Outcome, processing_time: Duration, retry_count: u32) {
        self.total_requests += 1;
        match outcome {
            Outcome::Success => self.successful_requests += 1,
            Outcome::Failure => self.failed_requests += 1,
        }
        self.sum_processing_time = self.sum_processing_time.saturating_add(processing_time);
        self.retry_total += u64::from(retry_count);
    }

    /// Success rate as a percentage (0.0 to 100.0), zero when empty.
    pub fn success_rate_percent(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64 * 100.0
        }
    }

    /// Mean processing time per completed request.
    pub fn average_processing_time(&self) -> Option<Duration> {
        if self.total_requests == 0 {
            return None;
        }

        let nanos = self.sum_processing_time.as_nanos() / u128::from(self.total_requests);
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }

    /// Mean processing time in seconds, zero when empty.
    pub fn average_processing_time_seconds(&self) -> f64 {
        self.average_processing_time()
            .map(|average| average.as_secs_f64())
            .unwrap_or_default()
    }
}

/// A single completed request as seen by the recent window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Whether the request succeeded.
    pub success: bool,
    /// End-to-end processing time.
    pub processing_time: Duration,
}

/// The last N completed requests, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentWindow {
    /// Samples in completion order.
    pub samples: Vec<Sample>,
}

impl RecentWindow {
    /// Number of samples in the window.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if no request has completed yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Success rate over the window, `None` when empty.
    pub fn success_rate_percent(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }

        let successes = self.samples.iter().filter(|s| s.success).count();
        Some(successes as f64 / self.samples.len() as f64 * 100.0)
    }

    /// Mean processing time over the window, `None` when empty.
    pub fn mean_processing_time(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }

        let total: Duration = self.samples.iter().map(|s| s.processing_time).sum();
        let count = u32::try_from(self.samples.len()).unwrap_or(u32::MAX);
        Some(total / count)
    }
}
