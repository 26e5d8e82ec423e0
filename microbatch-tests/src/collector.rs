// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use microbatch::{JobResult, ResultReceiver};

/// Drains the result channel on its own thread until it is closed.
pub fn collect_results<R: Send + 'static>(
    rx: ResultReceiver<JobResult<R>>,
) -> JoinHandle<Vec<JobResult<R>>> {
    thread::spawn(move || {
        let mut results = Vec::new();
        while let Ok(result) = rx.recv_blocking() {
            results.push(result);
        }
        results
    })
}

/// Polls `cond` until it holds or `timeout` expires.
pub fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
