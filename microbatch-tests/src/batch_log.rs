// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggedBatch {
    /// Position of the processor call, starting at 0
    pub seq: usize,

    pub job_ids: Vec<String>,

    /// Milliseconds since the processor was created
    pub at_ms: u128,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct BatchLog {
    pub batches: Vec<LoggedBatch>,
}

impl BatchLog {
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.iter().map(|b| b.job_ids.len()).collect()
    }

    pub fn max_batch_size(&self) -> usize {
        self.batch_sizes().into_iter().max().unwrap_or(0)
    }

    /// All job ids in the order the processor saw them
    pub fn job_ids(&self) -> Vec<String> {
        self.batches
            .iter()
            .flat_map(|b| b.job_ids.iter().cloned())
            .collect()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
