// SPDX-License-Identifier: MIT
// microbatch: groups individually submitted jobs into batches
//
// - Jobs are flushed to a batch processor every interval or once a batch is full.
// - Every result is handed back through a bounded channel.
//
// Author: Johannes Leupolz <dev@leupolz.eu>

pub mod batch_engine;

pub use batch_engine::config::Config;
pub use batch_engine::dispatcher::Dispatcher;
pub use batch_engine::error::DispatchError;
pub use batch_engine::job::{Job, JobResult};
pub use batch_engine::processor::{BatchProcessor, ClosureProcessor};
pub use batch_engine::state::{DispatcherStats, Lifecycle};

/// Receiving end of a dispatcher's result channel
pub use async_channel::Receiver as ResultReceiver;
