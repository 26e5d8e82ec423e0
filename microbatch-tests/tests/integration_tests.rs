// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use microbatch::{Config, DispatchError, Dispatcher, Job, Lifecycle};
use microbatch_tests::collector::{collect_results, wait_for};
use microbatch_tests::init_logging;
use microbatch_tests::recording_processor::RecordingProcessor;
use microbatch_tests::test_job::TestJob;

#[test]
fn test_hundred_jobs_in_batches_of_five() {
    init_logging();
    let (processor, log) = RecordingProcessor::new();
    let dispatcher =
        Dispatcher::new(processor, Config::new(5, Duration::from_millis(200))).unwrap();
    let consumer = collect_results(dispatcher.run());

    for job in TestJob::many("burst", 100) {
        dispatcher.submit(job).unwrap();
    }

    thread::sleep(Duration::from_secs(4));
    dispatcher.shutdown();
    let results = consumer.join().unwrap();

    let log = log.lock().unwrap();
    println!("{}", log.to_json());

    assert_eq!(results.len(), 100);
    let unique: HashSet<&str> = results.iter().map(|r| r.job_id.as_str()).collect();
    assert_eq!(unique.len(), 100);
    for result in &results {
        assert_eq!(result.result, RecordingProcessor::result_for(&result.job_id));
    }
    assert!(log.max_batch_size() <= 5);
    let submitted: Vec<String> = TestJob::many("burst", 100)
        .iter()
        .map(|j| j.id().to_string())
        .collect();
    assert_eq!(log.job_ids(), submitted);
}

#[test]
fn test_timer_only_calls_processor_for_non_empty_batches() {
    init_logging();
    let (processor, log) = RecordingProcessor::new();
    let dispatcher =
        Dispatcher::new(processor, Config::new(5, Duration::from_millis(100))).unwrap();

    for job in TestJob::many("lifetime", 10) {
        dispatcher.submit(job).unwrap();
    }
    let consumer = collect_results(dispatcher.run());

    thread::sleep(Duration::from_millis(500));
    dispatcher.shutdown();

    assert_eq!(consumer.join().unwrap().len(), 10);
    assert_eq!(log.lock().unwrap().batch_sizes(), vec![5, 5]);
}

#[test]
fn test_single_job_drained_by_shutdown() {
    init_logging();
    let (processor, log) = RecordingProcessor::new();
    let dispatcher = Dispatcher::new(processor, Config::new(1, Duration::from_secs(30))).unwrap();
    let consumer = collect_results(dispatcher.run());

    dispatcher.submit(TestJob::new("lonely")).unwrap();
    dispatcher.shutdown();

    let results = consumer.join().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].job_id, "lonely");
    assert_eq!(log.lock().unwrap().batch_sizes(), vec![1]);
    assert_eq!(dispatcher.lifecycle(), Lifecycle::Closed);
}

#[test]
fn test_concurrent_submitters_keep_their_order() {
    init_logging();
    let (processor, log) = RecordingProcessor::new();
    let dispatcher = Arc::new(
        Dispatcher::new(
            processor,
            Config::new(7, Duration::from_millis(10)).with_flush_when_full(true),
        )
        .unwrap(),
    );
    let consumer = collect_results(dispatcher.run());

    let submitters: Vec<_> = (0..8)
        .map(|t| {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                for job in TestJob::many(&format!("t{t}"), 50) {
                    dispatcher.submit(job).unwrap();
                }
            })
        })
        .collect();
    for submitter in submitters {
        submitter.join().unwrap();
    }

    dispatcher.shutdown();
    let results = consumer.join().unwrap();
    assert_eq!(results.len(), 400);

    let log = log.lock().unwrap();
    assert!(log.max_batch_size() <= 7);
    let seen = log.job_ids();
    for t in 0..8 {
        let prefix = format!("t{t}-");
        let own: Vec<String> = seen.iter().filter(|id| id.starts_with(&prefix)).cloned().collect();
        let expected: Vec<String> = TestJob::many(&format!("t{t}"), 50)
            .iter()
            .map(|j| j.id().to_string())
            .collect();
        assert_eq!(own, expected);
    }

    let stats = dispatcher.stats();
    assert_eq!(stats.jobs_flushed, 400);
    assert_eq!(stats.results_delivered, 400);
}

#[test]
fn test_full_batches_flush_while_one_thread_submits() {
    init_logging();
    let (processor, log) = RecordingProcessor::new();
    let dispatcher = Arc::new(
        Dispatcher::new(
            processor,
            Config::new(5, Duration::from_millis(100)).with_flush_when_full(true),
        )
        .unwrap(),
    );
    // far more results than the channel holds (10), so this only finishes with a live reader
    let consumer = collect_results(dispatcher.run());

    let submitting = dispatcher.clone();
    let submitter = thread::spawn(move || {
        for job in TestJob::many("eager", 500) {
            submitting.submit(job).unwrap();
        }
        let to_shut_down = submitting.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            to_shut_down.shutdown();
        })
        .join()
        .unwrap();
    });

    assert!(wait_for(Duration::from_secs(10), || submitter.is_finished()));
    submitter.join().unwrap();

    let results = consumer.join().unwrap();
    assert_eq!(results.len(), 500);
    let log = log.lock().unwrap();
    assert!(log.max_batch_size() <= 5);
    assert_eq!(dispatcher.stats().results_missing, 0);
}

#[test]
fn test_slow_consumer_blocks_submitters() {
    init_logging();
    let (processor, _log) = RecordingProcessor::new();
    let dispatcher = Arc::new(
        Dispatcher::new(processor, Config::new(1, Duration::from_millis(5))).unwrap(),
    );
    let rx = dispatcher.run();

    let submitting = dispatcher.clone();
    let submitter = thread::spawn(move || {
        for job in TestJob::many("slow", 10) {
            submitting.submit(job).unwrap();
            thread::sleep(Duration::from_millis(20));
        }
    });

    // nobody reads, so the flush holding the lock is stuck on the third result
    thread::sleep(Duration::from_millis(500));
    assert!(!submitter.is_finished());
    assert_eq!(rx.len(), 2);

    let consumer = collect_results(rx);
    submitter.join().unwrap();
    dispatcher.shutdown();
    assert_eq!(consumer.join().unwrap().len(), 10);
}

#[test]
fn test_processor_panic_stops_dispatcher() {
    init_logging();
    let (processor, _log) = RecordingProcessor::new();
    let dispatcher =
        Dispatcher::new(processor.panicking(), Config::new(2, Duration::from_millis(10))).unwrap();
    let rx = dispatcher.run();

    dispatcher.submit(TestJob::new("doomed")).unwrap();
    assert!(wait_for(Duration::from_secs(5), || {
        dispatcher.submit(TestJob::new("probe")) == Err(DispatchError::ProcessorPanicked)
    }));

    // must neither hang nor panic, and must release consumers
    dispatcher.shutdown();
    assert!(rx.is_closed());
    assert!(rx.recv_blocking().is_err());
}

#[test]
fn test_slow_processor_never_overlaps() {
    init_logging();
    let (processor, log) = RecordingProcessor::new();
    let dispatcher = Dispatcher::new(
        processor.with_delay(Duration::from_millis(30)),
        Config::new(3, Duration::from_millis(5)),
    )
    .unwrap();
    for job in TestJob::many("overlap", 12) {
        dispatcher.submit(job).unwrap();
    }
    let consumer = collect_results(dispatcher.run());

    // let the first tick grab the lock, then race the drain against the loop
    thread::sleep(Duration::from_millis(40));
    dispatcher.shutdown();
    assert_eq!(consumer.join().unwrap().len(), 12);

    // each call sleeps 30ms while holding the lock, so calls start at least that far apart
    let log = log.lock().unwrap();
    assert_eq!(log.batch_sizes(), vec![3, 3, 3, 3]);
    for pair in log.batches.windows(2) {
        assert!(pair[1].at_ms >= pair[0].at_ms + 30);
    }
}
