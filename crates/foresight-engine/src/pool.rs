//! Worker pool for asynchronous simulation runs.
//!
//! Workers receive [`SimTask`]s over a bounded crossbeam channel and run
//! them to completion; there is no cancellation. Each task carries an
//! in-flight guard, so the predictor's busy flag and the body's busy-set
//! entry are released when the task finishes, unwinds, or is dropped
//! without ever running.
//!
//! Dispatchers never block on the channel: a full or closed queue makes
//! the caller run the task inline (see `Predictor::dispatch`), so workers
//! resolving dependencies through the pool cannot deadlock it.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use foresight_core::{ConfigError, FrameId};
use log::{error, trace};

use crate::context::{Origin, SimContext};
use crate::predictor::InFlight;
use crate::simulate::SimRequest;

/// What a task produces.
pub(crate) enum Work {
    /// Run the simulation engine.
    Simulate(SimRequest),
    /// Publish an all-zero trajectory.
    Blank,
}

/// One asynchronous trajectory update.
pub(crate) struct SimTask {
    pub in_flight: InFlight,
    pub frame: FrameId,
    /// Buffer generation the run was planned under.
    pub generation: u64,
    pub work: Work,
}

impl SimTask {
    /// Run the task on the calling thread, then release the predictor.
    pub fn execute(self, origin: Origin) {
        let ctx = SimContext::new(self.in_flight.shared(), self.frame, origin);
        let predictor = self.in_flight.predictor();
        match &self.work {
            Work::Simulate(request) => predictor.run(&ctx, request, self.generation),
            Work::Blank => predictor.publish_blank(self.generation),
        }
    }
}

/// Spawn `count` workers on a fresh `bounded(count * 4)` queue.
pub(crate) fn spawn_workers(
    count: usize,
) -> Result<(Sender<SimTask>, Vec<JoinHandle<()>>), ConfigError> {
    let (task_tx, task_rx) = crossbeam_channel::bounded(count * 4);
    let mut workers = Vec::with_capacity(count);
    for i in 0..count {
        let task_rx = task_rx.clone();
        let handle = thread::Builder::new()
            .name(format!("foresight-worker-{i}"))
            .spawn(move || worker_loop(task_rx))
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: format!("worker {i}: {e}"),
            })?;
        workers.push(handle);
    }
    Ok((task_tx, workers))
}

/// Main loop for a worker thread. Runs until every sender is dropped and
/// the queue is drained.
pub(crate) fn worker_loop(task_rx: Receiver<SimTask>) {
    while let Ok(task) = task_rx.recv() {
        let body = task.in_flight.predictor().id();
        let frame = task.frame;
        trace!("worker: running body {body} for frame {frame}");
        // A panicking run has already released its guard while unwinding;
        // the worker survives to serve the rest of the queue.
        if panic::catch_unwind(AssertUnwindSafe(|| task.execute(Origin::Worker))).is_err() {
            error!("worker: simulation for body {body} panicked in frame {frame}");
        }
    }
}
