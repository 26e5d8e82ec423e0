// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use microbatch::{BatchProcessor, Job, JobResult};

use crate::batch_log::{BatchLog, LoggedBatch};
use crate::test_job::TestJob;

/// Answers every job and records each batch it was given.
pub struct RecordingProcessor {
    log: Arc<Mutex<BatchLog>>,
    created: Instant,
    delay: Option<Duration>,
    panic_on_call: bool,
}

impl RecordingProcessor {
    /// Returns the processor and a handle on its log.
    pub fn new() -> (Self, Arc<Mutex<BatchLog>>) {
        let log = Arc::new(Mutex::new(BatchLog::default()));
        let processor = Self {
            log: log.clone(),
            created: Instant::now(),
            delay: None,
            panic_on_call: false,
        };
        (processor, log)
    }

    /// Sleeps this long inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_call = true;
        self
    }

    pub fn result_for(id: &str) -> String {
        format!("I am the result for job with id {id}")
    }
}

impl BatchProcessor<TestJob> for RecordingProcessor {
    type Output = String;

    fn process(&mut self, jobs: &[TestJob]) -> Vec<JobResult<String>> {
        if self.panic_on_call {
            panic!("processor failure on purpose");
        }
        {
            let mut log = self.log.lock().unwrap();
            let seq = log.batches.len();
            log.batches.push(LoggedBatch {
                seq,
                job_ids: jobs.iter().map(|j| j.id().to_string()).collect(),
                at_ms: self.created.elapsed().as_millis(),
            });
        }
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        jobs.iter()
            .map(|j| JobResult::for_job(j, Self::result_for(j.id())))
            .collect()
    }
}
