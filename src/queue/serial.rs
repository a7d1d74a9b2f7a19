//! Serial queue
//!
//! Routes operations to per-lane workers and hands results back.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use crossbeam::channel::{bounded, Receiver};
use parking_lot::Mutex;

use crate::error::{FlatDocError, Result};

use super::lane::{Job, Lane};

/// FIFO admission of operations, one lane per resource
///
/// ## Ordering:
/// - Same lane: strictly sequential, in the order `enqueue` was called
/// - Different lanes: independent, may run concurrently
///
/// The registry lock is held while a job is pushed onto its lane, so the
/// order in which callers win the lock is the order the lane runs them.
pub struct SerialQueue {
    /// Live lanes keyed by identifier (created on first use)
    lanes: Mutex<HashMap<String, Lane>>,
}

impl SerialQueue {
    /// Create a queue with no lanes
    pub fn new() -> Self {
        Self {
            lanes: Mutex::new(HashMap::new()),
        }
    }

    /// Admit an operation onto a lane
    ///
    /// Returns immediately with a [`Pending`] handle; the operation runs once
    /// every operation submitted before it on the same lane has finished.
    pub fn enqueue<T, F>(&self, lane: &str, operation: F) -> Result<Pending<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (result_tx, result_rx) = bounded(1);
        let lane_name = lane.to_string();

        let job: Job = Box::new(move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(operation)) {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(lane = %lane_name, "Operation panicked; continuing with next entry");
                    Err(FlatDocError::OperationPanicked(lane_name))
                }
            };

            if let Err(ref e) = outcome {
                tracing::debug!("Operation failed: {}", e);
            }

            // The caller may have dropped its Pending handle
            let _ = result_tx.send(outcome);
        });

        let mut lanes = self.lanes.lock();
        let entry = match lanes.entry(lane.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                tracing::debug!(lane = %lane, "Creating lane");
                entry.insert(Lane::spawn(lane)?)
            }
        };

        tracing::trace!(lane = %lane, backlog = entry.backlog(), "Operation admitted");
        entry.submit(job)?;

        Ok(Pending {
            receiver: result_rx,
            lane: lane.to_string(),
        })
    }

    /// Admit an operation and block until it has run
    pub fn run<T, F>(&self, lane: &str, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        self.enqueue(lane, operation)?.wait()
    }

    /// Get the number of lanes created so far
    pub fn lane_count(&self) -> usize {
        self.lanes.lock().len()
    }
}

impl Default for SerialQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// The eventual result of an enqueued operation
#[must_use = "an enqueued operation's result is only observed through wait()"]
pub struct Pending<T> {
    receiver: Receiver<Result<T>>,
    lane: String,
}

impl<T> Pending<T> {
    /// Block until the operation has run and return its result
    pub fn wait(self) -> Result<T> {
        match self.receiver.recv() {
            Ok(result) => result,
            Err(_) => Err(FlatDocError::QueueClosed(format!(
                "lane '{}' dropped the operation before it completed",
                self.lane
            ))),
        }
    }

    /// The lane this operation was admitted to
    pub fn lane(&self) -> &str {
        &self.lane
    }
}
