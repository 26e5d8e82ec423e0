// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use async_channel::{Receiver, Sender};
use async_io::Timer;
use futures::{pin_mut, select, FutureExt, StreamExt};
use log::{debug, error, info, warn};

use crate::batch_engine::config::Config;
use crate::batch_engine::error::DispatchError;
use crate::batch_engine::job::{Job, JobResult};
use crate::batch_engine::processor::BatchProcessor;
use crate::batch_engine::state::{BatchState, DispatcherStats, FlushTrigger, Lifecycle};

/// State shared between the caller-facing [`Dispatcher`] and its flush loop thread.
struct Shared<J: Job, P: BatchProcessor<J>> {
    config: Config,
    state: Mutex<BatchState<J, P>>,
    results_tx: Sender<JobResult<P::Output>>,
    // one-shot: closed exactly once by shutdown (or drop)
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    // coalescing "a full batch is pending" notification, capacity 1
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl<J: Job, P: BatchProcessor<J>> Shared<J, P> {
    fn lock_state(&self) -> Result<MutexGuard<'_, BatchState<J, P>>, DispatchError> {
        self.state
            .lock()
            .map_err(|_| DispatchError::ProcessorPanicked)
    }

    /// Read-only access that also works after a processor panic.
    fn peek_state(&self) -> MutexGuard<'_, BatchState<J, P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush_once(&self, trigger: FlushTrigger) -> Result<usize, DispatchError> {
        let mut state = self.lock_state()?;
        Ok(state.flush(self.config.batch_size, &self.results_tx, trigger))
    }

    /// Flushes full batches only, releasing the lock between batches.
    fn flush_full_batches(&self) -> Result<(), DispatchError> {
        loop {
            let mut state = self.lock_state()?;
            if state.pending_len() < self.config.batch_size {
                return Ok(());
            }
            state.flush(self.config.batch_size, &self.results_tx, FlushTrigger::Full);
        }
    }
}

/// Collects submitted jobs and hands them to a [`BatchProcessor`] in batches of at most
/// `batch_size` jobs, once per `interval` (and, with `flush_when_full`, as soon as a full
/// batch is pending).
///
/// Results are delivered through a bounded channel of capacity `2 * batch_size`. When
/// nobody drains it, flushing blocks and with it every call to `submit`.
///
/// ```no_run
/// use std::time::Duration;
/// use microbatch::{ClosureProcessor, Config, Dispatcher, JobResult};
///
/// let processor = ClosureProcessor::new("echo", |jobs: &[String]| -> Vec<JobResult<usize>> {
///     jobs.iter().map(|j| JobResult::for_job(j, j.len())).collect()
/// });
/// let dispatcher = Dispatcher::new(processor, Config::new(10, Duration::from_millis(200)))?;
/// let results = dispatcher.run();
/// dispatcher.submit("job-1".to_string())?;
/// dispatcher.shutdown();
/// while let Ok(result) = results.recv_blocking() {
///     println!("{result:?}");
/// }
/// # Ok::<(), microbatch::DispatchError>(())
/// ```
pub struct Dispatcher<J: Job, P: BatchProcessor<J>> {
    shared: Arc<Shared<J, P>>,
    results_rx: Receiver<JobResult<P::Output>>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<J: Job, P: BatchProcessor<J>> Dispatcher<J, P> {
    /// Creates a dispatcher. No background activity starts before [`Dispatcher::run`].
    pub fn new(processor: P, config: Config) -> Result<Self, DispatchError> {
        config.validate()?;

        let (results_tx, results_rx) = async_channel::bounded(config.result_capacity());
        let (stop_tx, stop_rx) = async_channel::bounded(1);
        let (wake_tx, wake_rx) = async_channel::bounded(1);

        let shared = Arc::new(Shared {
            config,
            state: Mutex::new(BatchState::new(processor)),
            results_tx,
            stop_tx,
            stop_rx,
            wake_tx,
            wake_rx,
        });

        Ok(Self {
            shared,
            results_rx,
            thread_handle: Mutex::new(None),
        })
    }

    /// Queues a job for the next flush.
    pub fn submit(&self, job: J) -> Result<(), DispatchError> {
        let queued = self.shared.lock_state()?.enqueue(job)?;
        if self.shared.config.flush_when_full && queued >= self.shared.config.batch_size {
            // a pending wake-up already covers this batch
            let _ = self.shared.wake_tx.try_send(());
        }
        Ok(())
    }

    /// Starts the flush loop on a dedicated thread and returns the result channel.
    ///
    /// Calling it again returns the same channel without starting a second loop.
    pub fn run(&self) -> Receiver<JobResult<P::Output>> {
        let mut handle = self
            .thread_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if handle.is_some() {
            warn!("Flush loop is already running");
            return self.results_rx.clone();
        }

        match self.shared.lock_state() {
            Ok(mut state) if !state.is_shutting_down() => state.advance(Lifecycle::Running),
            Ok(_) => {
                warn!("Dispatcher is shutting down, flush loop not started");
                return self.results_rx.clone();
            }
            Err(e) => {
                error!("Flush loop not started: {e}");
                return self.results_rx.clone();
            }
        }

        let shared = self.shared.clone();
        *handle = Some(thread::spawn(move || {
            futures::executor::block_on(flush_loop(shared));
        }));

        self.results_rx.clone()
    }

    /// Result channel, without starting the flush loop.
    pub fn results(&self) -> Receiver<JobResult<P::Output>> {
        self.results_rx.clone()
    }

    /// Rejects further jobs, drains everything still pending, stops the flush loop and
    /// closes the result channel. Blocks until all of that is done.
    ///
    /// Only the first call does anything.
    pub fn shutdown(&self) {
        match self.shared.lock_state() {
            Ok(mut state) => {
                if !state.begin_shutdown() {
                    debug!("Shutdown already requested");
                    return;
                }
                info!("Shutting down, draining {} pending jobs", state.pending_len());
                while state.pending_len() > 0 {
                    state.flush(
                        self.shared.config.batch_size,
                        &self.shared.results_tx,
                        FlushTrigger::Drain,
                    );
                }
            }
            Err(e) => {
                if self.shared.results_tx.is_closed() {
                    return;
                }
                error!("Pending jobs are lost: {e}");
            }
        }

        self.shared.stop_tx.close();
        let handle = self
            .thread_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Flush loop ended with a panic");
            }
        }

        self.shared.results_tx.close();
        self.shared.peek_state().advance(Lifecycle::Closed);
        info!("Dispatcher shut down");
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn pending_len(&self) -> usize {
        self.shared.peek_state().pending_len()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.peek_state().lifecycle()
    }

    pub fn stats(&self) -> DispatcherStats {
        self.shared.peek_state().stats()
    }
}

impl<J: Job, P: BatchProcessor<J>> Drop for Dispatcher<J, P> {
    fn drop(&mut self) {
        if self.shared.results_tx.is_closed() {
            return;
        }
        warn!("Dispatcher dropped without shutdown, pending jobs are discarded");
        self.shared.stop_tx.close();
        self.shared.results_tx.close();
    }
}

impl<J: Job, P: BatchProcessor<J>> std::fmt::Debug for Dispatcher<J, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.shared.config)
            .field("lifecycle", &self.lifecycle())
            .field("pending", &self.pending_len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopEvent {
    Tick,
    Full,
    Stop,
}

/// Waits for the next tick, a full-batch wake-up or the stop signal, whichever comes first.
async fn flush_loop<J: Job, P: BatchProcessor<J>>(shared: Arc<Shared<J, P>>) {
    info!(
        "Flush loop started (batch size {}, interval {:?})",
        shared.config.batch_size, shared.config.interval
    );
    let mut ticker = Timer::interval(shared.config.interval);

    loop {
        let event = {
            let tick = ticker.next().fuse();
            let woke = shared.wake_rx.recv().fuse();
            let stopped = shared.stop_rx.recv().fuse();
            pin_mut!(tick, woke, stopped);
            select! {
                _ = tick => LoopEvent::Tick,
                r = woke => if r.is_ok() { LoopEvent::Full } else { LoopEvent::Stop },
                _ = stopped => LoopEvent::Stop,
            }
        };

        let flushed = match event {
            LoopEvent::Tick => shared.flush_once(FlushTrigger::Tick).map(|_| ()),
            LoopEvent::Full => shared.flush_full_batches(),
            LoopEvent::Stop => break,
        };
        if let Err(e) = flushed {
            error!("Flush loop stopping: {e}");
            break;
        }
    }

    info!("Flush loop stopped");
}
