//! Latency-budgeted execution.
//!
//! The projection runs on a dedicated worker thread. If the budget elapses
//! first the caller gets `Timeout` immediately and whatever the worker later
//! produces is dropped with the channel.

use log::warn;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::error::LeaseProjectionError;
use crate::projection::engine::{run_projection, CalculationEngineOutput};
use crate::projection::input::EngineInput;
use crate::LeaseProjectionResult;

/// Run `job` on a worker thread, giving up after `budget`.
pub fn with_deadline<T, F>(budget: Duration, job: F) -> LeaseProjectionResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> LeaseProjectionResult<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("lease-projection".into())
        .spawn(move || {
            // Receiver may already be gone after a timeout
            let _ = tx.send(job());
        })
        .map_err(|e| LeaseProjectionError::ComputationAbandoned(e.to_string()))?;

    match rx.recv_timeout(budget) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            let budget_ms = budget.as_millis() as u64;
            warn!("Projection abandoned after {budget_ms}ms budget");
            Err(LeaseProjectionError::Timeout { budget_ms })
        }
        Err(RecvTimeoutError::Disconnected) => Err(LeaseProjectionError::ComputationAbandoned(
            "worker exited without a result".into(),
        )),
    }
}

/// `run_projection` under a latency budget.
pub fn run_with_deadline(
    input: &EngineInput,
    budget: Duration,
) -> LeaseProjectionResult<CalculationEngineOutput> {
    let owned = input.clone();
    with_deadline(budget, move || run_projection(&owned))
}
