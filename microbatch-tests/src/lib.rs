// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

pub mod batch_log;
pub mod collector;
pub mod recording_processor;
pub mod test_job;

/// Routes `log` output of the dispatcher into the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}
