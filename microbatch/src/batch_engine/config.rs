// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch_engine::error::DispatchError;

/// Batching parameters of a dispatcher. Immutable once the dispatcher is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Maximum number of jobs handed to the processor in one call
    pub batch_size: usize,

    /// Time between two timer-driven flushes
    #[serde(rename = "interval_ms", with = "duration_ms")]
    pub interval: Duration,

    /// Flush right away once `batch_size` jobs are pending instead of waiting for the next tick
    #[serde(default)]
    pub flush_when_full: bool,
}

impl Config {
    pub fn new(batch_size: usize, interval: Duration) -> Self {
        Self {
            batch_size,
            interval,
            flush_when_full: false,
        }
    }

    pub fn with_flush_when_full(mut self, flush_when_full: bool) -> Self {
        self.flush_when_full = flush_when_full;
        self
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.batch_size == 0 {
            return Err(DispatchError::InvalidConfig(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(DispatchError::InvalidConfig(
                "interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Capacity of the result channel. Leaves room for one full batch plus slack,
    /// a slower consumer will still block the flush.
    pub fn result_capacity(&self) -> usize {
        self.batch_size.saturating_mul(2)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        // round up, a sub-millisecond interval must not turn into zero
        let ms = u64::try_from(d.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX);
        s.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
