// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>
//! # Design: Micro-Batching Dispatcher
//!
//! ## Overview
//! Callers submit single jobs, the dispatcher groups them and hands each group to a
//! user supplied batch processor.
//!
//! - Jobs are queued in submission order and flushed as FIFO prefixes of at most `batch_size`.
//! - A dedicated thread flushes once per `interval`, and optionally as soon as a full batch is pending.
//! - At most one flush is in flight. Timer flushes, drain flushes and the shutdown
//!   transition share one lock.
//! - Results leave through a bounded channel (`2 * batch_size`). A slow consumer blocks the
//!   flush and thereby every submitter (backpressure).
//! - Shutdown rejects new jobs, drains the backlog on the calling thread, stops the loop and
//!   closes the result channel.
//!
//! ```text
//!         +-----------+   submit    +-----------------------------+
//!         |  callers  +-----------> |  BatchState (Mutex)         |
//!         +-----------+             |  pending | shutting_down    |
//!                                   +------+-------------+--------+
//!                          tick / full     |             | drain (shutdown)
//!                                   +------v------+      |
//!                                   | flush loop  |      |
//!                                   |  (thread)   |      |
//!                                   +------+------+      |
//!                                          v             v
//!                                   +----------------------------+
//!                                   |     BatchProcessor         |
//!                                   +-------------+--------------+
//!                                                 v
//!                                       bounded result channel
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod processor;
pub mod state;
