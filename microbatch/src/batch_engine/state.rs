// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::collections::{HashSet, VecDeque};

use async_channel::Sender;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::batch_engine::error::DispatchError;
use crate::batch_engine::job::{Job, JobResult};
use crate::batch_engine::processor::BatchProcessor;

/// Where a dispatcher is in its life. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Lifecycle {
    Created,
    /// The flush loop is running
    Running,
    /// Shutdown has begun, new jobs are rejected
    Draining,
    /// All jobs are drained and the result channel is closed
    Closed,
}

/// Counters collected across all flushes of a dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherStats {
    /// Number of processor invocations
    pub batches: u64,
    /// Jobs removed from the pending queue by a flush
    pub jobs_flushed: u64,
    /// Results handed to the result channel
    pub results_delivered: u64,
    /// Jobs the processor returned no result for
    pub results_missing: u64,
}

/// What caused a flush. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Tick,
    Full,
    Drain,
}

/// Pending jobs, the shutting-down flag and the processor, guarded by one lock.
///
/// All mutation goes through `enqueue`, `flush` and `begin_shutdown`, so nothing can
/// touch the queue without observing the flag.
pub struct BatchState<J: Job, P: BatchProcessor<J>> {
    pending: VecDeque<J>,
    shutting_down: bool,
    lifecycle: Lifecycle,
    processor: P,
    stats: DispatcherStats,
}

impl<J: Job, P: BatchProcessor<J>> BatchState<J, P> {
    pub fn new(processor: P) -> Self {
        Self {
            pending: VecDeque::new(),
            shutting_down: false,
            lifecycle: Lifecycle::Created,
            processor,
            stats: DispatcherStats::default(),
        }
    }

    /// Appends a job and returns the new queue length.
    pub fn enqueue(&mut self, job: J) -> Result<usize, DispatchError> {
        if self.shutting_down {
            return Err(DispatchError::AlreadyShuttingDown);
        }
        self.pending.push_back(job);
        Ok(self.pending.len())
    }

    /// Sets the shutting-down flag. Returns false if shutdown had already begun.
    pub fn begin_shutdown(&mut self) -> bool {
        if self.shutting_down {
            return false;
        }
        self.shutting_down = true;
        self.lifecycle = Lifecycle::Draining;
        true
    }

    /// Runs one batch of at most `batch_size` jobs through the processor and
    /// forwards its results. Returns the number of jobs removed from the queue.
    ///
    /// Blocks while the result channel is full.
    pub fn flush(
        &mut self,
        batch_size: usize,
        results: &Sender<JobResult<P::Output>>,
        trigger: FlushTrigger,
    ) -> usize {
        let n = self.pending.len().min(batch_size);
        if n == 0 {
            return 0;
        }

        debug!("Flushing {} of {} pending jobs ({:?})", n, self.pending.len(), trigger);
        let batch = &self.pending.make_contiguous()[..n];
        let job_results = self.processor.process(batch);

        let reported: HashSet<&str> = job_results.iter().map(|r| r.job_id.as_str()).collect();
        let missing: Vec<&str> = batch
            .iter()
            .map(|j| j.id())
            .filter(|id| !reported.contains(id))
            .collect();
        if !missing.is_empty() {
            warn!(
                "Processor returned {} results for {} jobs, no result for {:?}",
                job_results.len(),
                n,
                missing
            );
            self.stats.results_missing += missing.len() as u64;
        }

        for result in job_results {
            match results.send_blocking(result) {
                Ok(()) => self.stats.results_delivered += 1,
                Err(e) => warn!("Dropping result for job {}: channel closed", e.0.job_id),
            }
        }

        self.pending.drain(..n);
        self.stats.batches += 1;
        self.stats.jobs_flushed += n as u64;
        n
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Moves the lifecycle forward. Earlier states are ignored.
    pub fn advance(&mut self, next: Lifecycle) {
        if next > self.lifecycle {
            self.lifecycle = next;
        }
    }

    pub fn stats(&self) -> DispatcherStats {
        self.stats
    }
}
