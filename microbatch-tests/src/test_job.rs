// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use microbatch::Job;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestJob {
    id: String,
}

impl TestJob {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// `count` jobs named `<prefix>-0`, `<prefix>-1`, ...
    pub fn many(prefix: &str, count: usize) -> Vec<TestJob> {
        (0..count)
            .map(|i| TestJob::new(format!("{prefix}-{i}")))
            .collect()
    }
}

impl Job for TestJob {
    fn id(&self) -> &str {
        &self.id
    }
}
