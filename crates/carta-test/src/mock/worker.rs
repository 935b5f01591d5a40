//! Scripted and instrumented inference worker.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use carta_core::{
    Error, ErrorCode, ExtractionRequest, InferenceOutput, InferenceWorker, Result,
};
use tokio::time::Instant;

use crate::fixtures;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Return the output.
    Success(InferenceOutput),
    /// Fail with the given classification.
    Failure(ErrorCode, String),
    /// Panic inside the worker.
    Panic,
}

impl Reply {
    /// Shorthand for a transient failure.
    pub fn transient() -> Self {
        Self::Failure(ErrorCode::TransientInferenceError, "connection reset".into())
    }

    /// Shorthand for a success with [`fixtures::sample_output`].
    pub fn success() -> Self {
        Self::Success(fixtures::sample_output())
    }
}

/// Shared view of what a [`ScriptedWorker`] has seen.
#[derive(Debug, Default)]
pub struct WorkerProbe {
    calls: AtomicUsize,
    active: AtomicBool,
    reentered: AtomicBool,
    shut_down: AtomicBool,
    started_at: Mutex<Vec<Instant>>,
}

impl WorkerProbe {
    /// Number of calls that entered the worker.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Instants at which calls entered the worker.
    pub fn started_at(&self) -> Vec<Instant> {
        self.started_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True if a call entered while another one was still running.
    pub fn was_reentered(&self) -> bool {
        self.reentered.load(Ordering::SeqCst)
    }

    /// True if the worker's shutdown hook ran.
    pub fn was_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        if self.active.swap(true, Ordering::SeqCst) {
            self.reentered.store(true, Ordering::SeqCst);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Instant::now());
    }

    fn exit(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Clears the active flag even when the worker panics.
struct ActiveGuard<'a>(&'a WorkerProbe);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.exit();
    }
}

/// Worker that replays a queue of replies.
///
/// Once the queue is drained every call gets the fallback reply, which is a
/// success unless changed with [`ScriptedWorker::otherwise`].
#[derive(Debug)]
pub struct ScriptedWorker {
    replies: VecDeque<Reply>,
    fallback: Reply,
    latency: Duration,
    probe: Arc<WorkerProbe>,
}

impl Default for ScriptedWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedWorker {
    /// Creates a worker that always succeeds immediately.
    pub fn new() -> Self {
        Self {
            replies: VecDeque::new(),
            fallback: Reply::success(),
            latency: Duration::ZERO,
            probe: Arc::new(WorkerProbe::default()),
        }
    }

    /// Queues a reply.
    pub fn then(mut self, reply: Reply) -> Self {
        self.replies.push_back(reply);
        self
    }

    /// Sets the reply used once the queue is drained.
    pub fn otherwise(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    /// Sleeps this long inside every call before replying.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Returns the probe shared with this worker.
    pub fn probe(&self) -> Arc<WorkerProbe> {
        Arc::clone(&self.probe)
    }
}

#[async_trait::async_trait]
impl InferenceWorker for ScriptedWorker {
    async fn infer(&mut self, _request: &ExtractionRequest) -> Result<InferenceOutput> {
        self.probe.enter();
        let _active = ActiveGuard(&self.probe);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let reply = self
            .replies
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Success(output) => Ok(output),
            Reply::Failure(code, message) => Err(Error::new(code, message)),
            Reply::Panic => panic!("scripted worker panic"),
        }
    }

    async fn shutdown(&mut self) {
        self.probe.shut_down.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use carta_core::{DocumentSide, DocumentVersion};

    use super::*;

    fn request() -> ExtractionRequest {
        ExtractionRequest::new(
            fixtures::png_bytes(),
            DocumentVersion::V2018,
            DocumentSide::Recto,
            false,
        )
    }

    #[tokio::test]
    async fn replays_queue_then_fallback() {
        let mut worker = ScriptedWorker::new()
            .then(Reply::transient())
            .otherwise(Reply::Failure(ErrorCode::InferenceFailure, "bad".into()));
        let probe = worker.probe();

        let first = worker.infer(&request()).await.unwrap_err();
        assert_eq!(first.code(), ErrorCode::TransientInferenceError);

        let second = worker.infer(&request()).await.unwrap_err();
        assert_eq!(second.code(), ErrorCode::InferenceFailure);

        assert_eq!(probe.calls(), 2);
        assert!(!probe.was_reentered());
    }

    #[tokio::test(start_paused = true)]
    async fn records_entry_instants() {
        let mut worker = ScriptedWorker::new().with_latency(Duration::from_secs(3));
        let probe = worker.probe();

        worker.infer(&request()).await.unwrap();
        worker.infer(&request()).await.unwrap();

        let started = probe.started_at();
        assert_eq!(started.len(), 2);
        assert_eq!(started[1] - started[0], Duration::from_secs(3));
    }
}
