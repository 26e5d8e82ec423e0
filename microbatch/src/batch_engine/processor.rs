// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::marker::PhantomData;

use crate::batch_engine::job::{Job, JobResult};

/// Turns a batch of jobs into their results.
///
/// The dispatcher calls `process` from at most one thread at a time, so the
/// processor may keep mutable state without further locking. It is never retried:
/// any retry or error reporting has to happen inside the processor and be folded
/// into `Output`.
///
/// Every job that does not show up in the returned list is considered processed
/// anyway and will never get a result.
pub trait BatchProcessor<J: Job>: Send + 'static {
    /// Payload handed back to the caller for each job
    type Output: Send + 'static;

    fn process(&mut self, jobs: &[J]) -> Vec<JobResult<Self::Output>>;
}

impl<J: Job, P: BatchProcessor<J> + ?Sized> BatchProcessor<J> for Box<P> {
    type Output = P::Output;

    fn process(&mut self, jobs: &[J]) -> Vec<JobResult<Self::Output>> {
        (**self).process(jobs)
    }
}

/// Wraps a closure so it can be used as a [`BatchProcessor`].
pub struct ClosureProcessor<F, R> {
    desc: String,
    process_fn: F,
    _output: PhantomData<fn() -> R>,
}

impl<F, R> ClosureProcessor<F, R> {
    pub fn new(desc: impl Into<String>, process_fn: F) -> Self {
        Self {
            desc: desc.into(),
            process_fn,
            _output: PhantomData,
        }
    }

    /// Free-form description, used for logging
    pub fn desc(&self) -> &str {
        &self.desc
    }
}

impl<J, F, R> BatchProcessor<J> for ClosureProcessor<F, R>
where
    J: Job,
    F: FnMut(&[J]) -> Vec<JobResult<R>> + Send + 'static,
    R: Send + 'static,
{
    type Output = R;

    fn process(&mut self, jobs: &[J]) -> Vec<JobResult<R>> {
        log::trace!("{}: processing {} jobs", self.desc, jobs.len());
        (self.process_fn)(jobs)
    }
}

impl<F, R> std::fmt::Debug for ClosureProcessor<F, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureProcessor")
            .field("desc", &self.desc)
            .finish()
    }
}
