//! Stub implementations of the worker and engine traits.
//!
//! Stubs hold their replies as `(ErrorCode, message)` pairs rather than
//! [`carta_core::Error`] values because the error type is not `Clone`.

mod engines;
mod worker;

pub use engines::{MockPostProcessor, MockRecognizer};
pub use worker::{Reply, ScriptedWorker, WorkerProbe};
