//! Solver worker thread
//!
//! The solve runs off the scheduler thread so a slow cycle cannot stall the
//! timer. Requests and responses travel over bounded channels; the scheduler
//! waits with `recv_timeout`, so a solve that overruns its budget is simply
//! abandoned — the worker's late response is stamped with its cycle number
//! and discarded when it eventually arrives. The worker never touches shared
//! state, so an abandoned solve leaves nothing partial behind.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};

use crate::optimizer::{HoldingProblem, SolverError};

struct SolveRequest {
    cycle: u64,
    problem: HoldingProblem,
    budget: Duration,
}

struct SolveResponse {
    cycle: u64,
    result: Result<Vec<f64>, SolverError>,
}

/// Handle to the dedicated solver thread.
pub(crate) struct SolverWorker {
    request_tx: Option<Sender<SolveRequest>>,
    response_rx: Option<Receiver<SolveResponse>>,
    handle: Option<JoinHandle<()>>,
}

impl SolverWorker {
    pub(crate) fn spawn() -> Self {
        let (request_tx, request_rx) = bounded::<SolveRequest>(1);
        let (response_tx, response_rx) = bounded::<SolveResponse>(1);

        let handle = std::thread::Builder::new()
            .name("holding-solver".to_string())
            .spawn(move || {
                for request in request_rx.iter() {
                    let result = request.problem.solve(request.budget);
                    if response_tx
                        .send(SolveResponse {
                            cycle: request.cycle,
                            result,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
            })
            .expect("failed to spawn solver worker thread");

        Self {
            request_tx: Some(request_tx),
            response_rx: Some(response_rx),
            handle: Some(handle),
        }
    }

    /// Dispatch one solve and wait at most `budget` for its result.
    pub(crate) fn solve(
        &self,
        cycle: u64,
        problem: HoldingProblem,
        budget: Duration,
    ) -> Result<Vec<f64>, SolverError> {
        let budget_ms = budget.as_millis() as u64;
        let deadline = Instant::now() + budget;

        let request_tx = self.request_tx.as_ref().ok_or(SolverError::WorkerLost)?;
        let response_rx = self.response_rx.as_ref().ok_or(SolverError::WorkerLost)?;
        match request_tx.send_timeout(
            SolveRequest {
                cycle,
                problem,
                budget,
            },
            budget,
        ) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => return Err(SolverError::TimedOut { budget_ms }),
            Err(SendTimeoutError::Disconnected(_)) => return Err(SolverError::WorkerLost),
        }

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match response_rx.recv_timeout(remaining) {
                Ok(response) if response.cycle == cycle => return response.result,
                // Late answer from an abandoned cycle; drop it and keep waiting.
                Ok(_stale) => continue,
                Err(RecvTimeoutError::Timeout) => return Err(SolverError::TimedOut { budget_ms }),
                Err(RecvTimeoutError::Disconnected) => return Err(SolverError::WorkerLost),
            }
        }
    }
}

impl Drop for SolverWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop. The response
        // receiver must go too: a worker stuck publishing an abandoned
        // cycle's result into the full bounded channel only unblocks once
        // the receiving side is gone, and joining before that would hang.
        self.request_tx.take();
        self.response_rx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
