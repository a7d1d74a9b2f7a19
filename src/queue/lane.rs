//! Lane worker
//!
//! One thread per lane, fed by a crossbeam channel.

use std::thread;

use crossbeam::channel::{unbounded, Sender};

use crate::error::{FlatDocError, Result};

/// A unit of work admitted to a lane
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a worker thread that runs jobs one at a time, in arrival order
pub(crate) struct Lane {
    /// Lane identifier (collection name)
    name: String,

    /// Submission side of the lane's FIFO
    sender: Sender<Job>,
}

impl Lane {
    /// Spawn the worker thread for a new lane
    pub(crate) fn spawn(name: &str) -> Result<Self> {
        let (sender, receiver) = unbounded::<Job>();
        let lane_name = name.to_string();

        thread::Builder::new()
            .name(format!("flatdoc-{}", name))
            .spawn(move || {
                tracing::trace!(lane = %lane_name, "Lane worker started");

                // recv() fails once every sender is gone
                while let Ok(job) = receiver.recv() {
                    job();
                }

                tracing::trace!(lane = %lane_name, "Lane worker stopped");
            })?;

        Ok(Self {
            name: name.to_string(),
            sender,
        })
    }

    /// Append a job to the end of the lane
    pub(crate) fn submit(&self, job: Job) -> Result<()> {
        self.sender.send(job).map_err(|_| {
            FlatDocError::QueueClosed(format!("lane '{}' worker has stopped", self.name))
        })
    }

    /// Number of jobs waiting behind the running one
    pub(crate) fn backlog(&self) -> usize {
        self.sender.len()
    }
}
