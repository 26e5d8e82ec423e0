// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use serde::{Deserialize, Serialize};

/// A unit of work accepted by the [`Dispatcher`](crate::batch_engine::dispatcher::Dispatcher).
///
/// The dispatcher never looks inside a job. The id is only carried along so that
/// callers can match a [`JobResult`] to the job it belongs to.
pub trait Job: Send + 'static {
    /// Stable, caller-assigned identifier
    fn id(&self) -> &str;
}

impl Job for String {
    fn id(&self) -> &str {
        self
    }
}

impl<J: Job + ?Sized> Job for Box<J> {
    fn id(&self) -> &str {
        (**self).id()
    }
}

/// Outcome of a single job, as reported by the batch processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult<R> {
    pub job_id: String,
    /// Processor-defined payload
    pub result: R,
}

impl<R> JobResult<R> {
    pub fn new(job_id: impl Into<String>, result: R) -> Self {
        Self {
            job_id: job_id.into(),
            result,
        }
    }

    /// Builds a result for `job`, copying its id.
    pub fn for_job<J: Job + ?Sized>(job: &J, result: R) -> Self {
        Self::new(job.id(), result)
    }
}
