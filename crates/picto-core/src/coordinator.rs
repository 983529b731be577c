use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::engine::SyncReport;
use crate::error::Error;

/// Single-flight guard for the library sync.
///
/// At most one sync runs at a time. Callers of [`run`](Self::run) that
/// arrive while a sync is in flight wait for it and share its outcome instead
/// of starting another. [`try_run`](Self::try_run) returns immediately so a
/// query can be answered from the last committed data.
#[derive(Default)]
pub struct SyncCoordinator {
    state: Mutex<FlightState>,
    finished: Condvar,
}

#[derive(Default)]
struct FlightState {
    running: bool,
    waiters: usize,
    generation: u64,
    last: Option<Result<SyncReport, String>>,
}

#[derive(Debug)]
pub enum SyncAttempt {
    Completed(SyncReport),
    /// Another caller's sync is still running.
    InFlight,
}

impl SyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Callers currently blocked on an in-flight sync.
    pub fn waiters(&self) -> usize {
        self.lock().waiters
    }

    /// Report of the most recent successful sync, if any.
    pub fn last_report(&self) -> Option<SyncReport> {
        match &self.lock().last {
            Some(Ok(report)) => Some(report.clone()),
            _ => None,
        }
    }

    /// Run `sync` unless one is already in flight, in which case wait for
    /// that one and return its outcome.
    pub fn run<F>(&self, sync: F) -> Result<SyncReport, Error>
    where
        F: FnOnce() -> Result<SyncReport, Error>,
    {
        let mut state = self.lock();
        if state.running {
            let generation = state.generation;
            debug!("Sync in flight, waiting for generation {}", generation);
            state.waiters += 1;
            while state.running && state.generation == generation {
                state = self
                    .finished
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            state.waiters -= 1;
            return match &state.last {
                Some(Ok(report)) => Ok(report.clone()),
                Some(Err(message)) => Err(Error::SyncFailed(message.clone())),
                None => Err(Error::SyncFailed("no outcome recorded".to_string())),
            };
        }
        state.running = true;
        drop(state);

        self.lead(sync)
    }

    /// Run `sync` only if no sync is in flight.
    pub fn try_run<F>(&self, sync: F) -> Result<SyncAttempt, Error>
    where
        F: FnOnce() -> Result<SyncReport, Error>,
    {
        {
            let mut state = self.lock();
            if state.running {
                debug!("Sync in flight, serving last snapshot");
                return Ok(SyncAttempt::InFlight);
            }
            state.running = true;
        }
        self.lead(sync).map(SyncAttempt::Completed)
    }

    fn lead<F>(&self, sync: F) -> Result<SyncReport, Error>
    where
        F: FnOnce() -> Result<SyncReport, Error>,
    {
        let mut flight = Flight {
            owner: self,
            outcome: None,
        };
        let result = sync();
        flight.outcome = Some(match &result {
            Ok(report) => Ok(report.clone()),
            Err(e) => Err(e.to_string()),
        });
        drop(flight);
        result
    }

    fn lock(&self) -> MutexGuard<'_, FlightState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the flight finished and wakes waiters, even if the sync panicked.
struct Flight<'a> {
    owner: &'a SyncCoordinator,
    outcome: Option<Result<SyncReport, String>>,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        let outcome = self
            .outcome
            .take()
            .unwrap_or_else(|| Err("sync aborted".to_string()));
        let mut state = self.owner.lock();
        state.running = false;
        state.generation += 1;
        state.last = Some(outcome);
        self.owner.finished.notify_all();
    }
}
