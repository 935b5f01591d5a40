//! Single-slot ownership of the loaded inference worker.
//!
//! The worker lives behind a fair [`tokio::sync::Mutex`], so callers are
//! admitted in arrival order and at most one inference runs at any instant.
//! Each admitted call runs on its own task that owns the slot guard: a
//! caller that stops waiting never interrupts the worker, and the slot is
//! only released once the worker is idle again.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use carta_core::{Error, ErrorCode, ExtractionRequest, InferenceOutput, InferenceWorker, Result};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

use crate::TRACING_TARGET_SESSION;

type Slot = Arc<Mutex<Box<dyn InferenceWorker>>>;

/// How the last call into the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The worker produced an output.
    Success,
    /// The call failed with this classification.
    Failed(ErrorCode),
}

impl AttemptOutcome {
    /// Returns true if the failure means the worker could not be reached.
    pub fn is_connectivity_failure(self) -> bool {
        matches!(self, Self::Failed(code) if code.is_connectivity())
    }
}

/// Point-in-time view of session activity, read by the health monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Liveness {
    /// Whether the worker was loaded at startup.
    pub initialized: bool,
    /// Why the worker failed to load, if it did.
    pub init_error: Option<String>,
    /// Last time a call entered or left the session.
    pub last_activity: Option<Instant>,
    /// Last time a call succeeded.
    pub last_success: Option<Instant>,
    /// Outcome of the most recent completed call.
    pub last_outcome: Option<AttemptOutcome>,
    /// Callers waiting for the slot.
    pub queue_depth: usize,
    /// Whether an inference is running right now.
    pub in_flight: bool,
}

#[derive(Debug, Default)]
struct ActivityState {
    last_activity: Option<Instant>,
    last_success: Option<Instant>,
    last_outcome: Option<AttemptOutcome>,
}

#[derive(Debug, Default)]
struct Activity {
    state: StdMutex<ActivityState>,
    waiting: AtomicUsize,
    in_flight: AtomicBool,
}

impl Activity {
    fn state(&self) -> std::sync::MutexGuard<'_, ActivityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self) {
        self.state().last_activity = Some(Instant::now());
    }

    fn record(&self, outcome: AttemptOutcome) {
        let now = Instant::now();
        let mut state = self.state();
        state.last_activity = Some(now);
        state.last_outcome = Some(outcome);
        if outcome == AttemptOutcome::Success {
            state.last_success = Some(now);
        }
    }
}

/// Counts a caller as queued until it holds the slot or gives up.
struct Waiting<'a>(&'a Activity);

impl<'a> Waiting<'a> {
    fn enter(activity: &'a Activity) -> Self {
        activity.waiting.fetch_add(1, Ordering::SeqCst);
        Self(activity)
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.0.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Marks the worker busy; records an internal failure if the task unwinds.
struct InFlight {
    activity: Arc<Activity>,
    finished: bool,
}

impl InFlight {
    fn enter(activity: Arc<Activity>) -> Self {
        activity.in_flight.store(true, Ordering::SeqCst);
        activity.touch();
        Self {
            activity,
            finished: false,
        }
    }

    fn finish(mut self, outcome: AttemptOutcome) {
        self.activity.record(outcome);
        self.finished = true;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.finished {
            self.activity
                .record(AttemptOutcome::Failed(ErrorCode::InternalError));
        }
        self.activity.in_flight.store(false, Ordering::SeqCst);
    }
}

/// Sole owner of the loaded inference worker.
pub struct ModelSession {
    slot: Option<Slot>,
    init_error: Option<String>,
    activity: Arc<Activity>,
}

impl ModelSession {
    /// Takes ownership of a loaded worker.
    pub fn new(worker: impl InferenceWorker) -> Self {
        let worker: Box<dyn InferenceWorker> = Box::new(worker);
        Self {
            slot: Some(Arc::new(Mutex::new(worker))),
            init_error: None,
            activity: Arc::default(),
        }
    }

    /// Creates a session whose worker failed to load.
    ///
    /// Every call fails with [`ErrorCode::WorkerUnavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            slot: None,
            init_error: Some(reason.into()),
            activity: Arc::default(),
        }
    }

    /// Returns true if the worker was loaded.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.slot.is_some()
    }

    /// Runs one inference, waiting as long as needed for the slot.
    pub async fn infer(&self, request: &ExtractionRequest) -> Result<InferenceOutput> {
        let slot = self.slot()?;
        let guard = self.acquire(slot).await;
        let task = self.spawn_inference(guard, request.clone());
        Self::joined(task.await)
    }

    /// Runs one inference, giving up after `limit`.
    ///
    /// If the limit elapses while queued the worker is never entered. If it
    /// elapses while the worker runs, the inference completes on its task
    /// and keeps the slot until then; its output is discarded. Both cases
    /// are reported as [`ErrorCode::TransientInferenceError`].
    pub async fn infer_within(
        &self,
        request: &ExtractionRequest,
        limit: Duration,
    ) -> Result<InferenceOutput> {
        let started = Instant::now();
        let slot = self.slot()?;

        let Ok(guard) = tokio::time::timeout(limit, self.acquire(slot)).await else {
            tracing::debug!(
                target: TRACING_TARGET_SESSION,
                request_id = %request.request_id,
                limit_ms = limit.as_millis(),
                "gave up waiting for the worker slot"
            );
            return Err(Error::transient(format!(
                "worker slot not available within {}s",
                limit.as_secs_f64()
            )));
        };

        let remaining = limit.saturating_sub(started.elapsed());
        let task = self.spawn_inference(guard, request.clone());

        match tokio::time::timeout(remaining, task).await {
            Ok(joined) => Self::joined(joined),
            Err(_) => {
                tracing::warn!(
                    target: TRACING_TARGET_SESSION,
                    request_id = %request.request_id,
                    limit_ms = limit.as_millis(),
                    "inference still running after the attempt limit, detaching"
                );
                Err(Error::transient(format!(
                    "inference did not finish within {}s",
                    limit.as_secs_f64()
                )))
            }
        }
    }

    /// Returns a snapshot of session activity.
    pub fn liveness(&self) -> Liveness {
        let state = self.activity.state();
        Liveness {
            initialized: self.is_initialized(),
            init_error: self.init_error.clone(),
            last_activity: state.last_activity,
            last_success: state.last_success,
            last_outcome: state.last_outcome,
            queue_depth: self.activity.waiting.load(Ordering::SeqCst),
            in_flight: self.activity.in_flight.load(Ordering::SeqCst),
        }
    }

    /// Waits for the slot and tears the worker down.
    pub async fn shutdown(&self) {
        let Some(slot) = &self.slot else {
            return;
        };

        let mut worker = slot.lock().await;
        tracing::info!(target: TRACING_TARGET_SESSION, "shutting down inference worker");
        worker.shutdown().await;
    }

    fn slot(&self) -> Result<Slot> {
        match &self.slot {
            Some(slot) => Ok(Arc::clone(slot)),
            None => {
                self.activity
                    .record(AttemptOutcome::Failed(ErrorCode::WorkerUnavailable));
                let reason = self.init_error.as_deref().unwrap_or("not loaded");
                Err(Error::worker_unavailable(format!(
                    "inference worker is unavailable: {reason}"
                )))
            }
        }
    }

    async fn acquire(&self, slot: Slot) -> OwnedMutexGuard<Box<dyn InferenceWorker>> {
        let _waiting = Waiting::enter(&self.activity);
        slot.lock_owned().await
    }

    fn spawn_inference(
        &self,
        mut worker: OwnedMutexGuard<Box<dyn InferenceWorker>>,
        request: ExtractionRequest,
    ) -> JoinHandle<Result<InferenceOutput>> {
        let in_flight = InFlight::enter(Arc::clone(&self.activity));

        tokio::spawn(async move {
            let started = Instant::now();
            let result = worker.infer(&request).await;

            let outcome = match &result {
                Ok(_) => AttemptOutcome::Success,
                Err(error) => AttemptOutcome::Failed(error.code()),
            };
            in_flight.finish(outcome);

            tracing::debug!(
                target: TRACING_TARGET_SESSION,
                request_id = %request.request_id,
                inference_ms = started.elapsed().as_millis(),
                success = result.is_ok(),
                "inference finished"
            );

            // The slot is released here, after the worker is idle.
            drop(worker);
            result
        })
    }

    fn joined(joined: Result<Result<InferenceOutput>, JoinError>) -> Result<InferenceOutput> {
        joined.unwrap_or_else(|join_error| {
            tracing::error!(
                target: TRACING_TARGET_SESSION,
                error = %join_error,
                "inference task did not complete"
            );
            Err(Error::internal("inference task aborted").with_source(join_error))
        })
    }
}

impl fmt::Debug for ModelSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSession")
            .field("initialized", &self.is_initialized())
            .field("init_error", &self.init_error)
            .field("queue_depth", &self.activity.waiting.load(Ordering::SeqCst))
            .field("in_flight", &self.activity.in_flight.load(Ordering::SeqCst))
            .finish()
    }
}
