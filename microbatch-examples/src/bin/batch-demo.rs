// SPDX-License-Identifier: MIT
// batch-demo: submits a burst of jobs to a micro-batching dispatcher
//
// - Every job gets a random uuid as id.
// - The processor answers each job with a greeting that names the job.
// - A helper thread shuts the dispatcher down after a delay, which drains the rest.
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use microbatch::{BatchProcessor, Config, Dispatcher, Job, JobResult};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Maximum number of jobs per batch
    #[arg(long, default_value_t = 10)]
    batch_size: usize,

    /// Milliseconds between two timer-driven flushes
    #[arg(long, default_value_t = 200)]
    interval_ms: u64,

    /// Number of jobs to submit
    #[arg(long, default_value_t = 100)]
    jobs: usize,

    /// Milliseconds to wait before shutting down
    #[arg(long, default_value_t = 5000)]
    shutdown_after_ms: u64,

    /// Flush as soon as a full batch is pending
    #[arg(long)]
    flush_when_full: bool,

    /// Print results and statistics as JSON lines
    #[arg(long)]
    json: bool,

    /// Dispatcher config (JSON encoded). Note that this replaces --batch-size, --interval-ms and --flush-when-full.
    #[arg(long, value_name = "JSON")]
    config: Option<String>,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let config = match &args.config {
        Some(json) => serde_json::from_str::<Config>(json).context("failed to parse --config")?,
        None => Config::new(args.batch_size, Duration::from_millis(args.interval_ms))
            .with_flush_when_full(args.flush_when_full),
    };
    if let Err(e) = config.validate() {
        bail!("{e}");
    }
    Ok(config)
}

struct UuidJob {
    id: String,
}

impl UuidJob {
    fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl Job for UuidJob {
    fn id(&self) -> &str {
        &self.id
    }
}

struct GreetingProcessor;

impl BatchProcessor<UuidJob> for GreetingProcessor {
    type Output = String;

    fn process(&mut self, jobs: &[UuidJob]) -> Vec<JobResult<String>> {
        jobs.iter()
            .map(|job| {
                JobResult::for_job(job, format!("I am the result for job with id {}", job.id()))
            })
            .collect()
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let dispatcher = Arc::new(Dispatcher::new(GreetingProcessor, config)?);
    let results = dispatcher.run();

    // drain before submitting: a full result channel would block every submit
    let json = args.json;
    let printer = thread::spawn(move || -> anyhow::Result<()> {
        while let Ok(result) = results.recv_blocking() {
            if json {
                println!("{}", serde_json::to_string(&result)?);
            } else {
                println!("{:?}", result);
            }
        }
        Ok(())
    });

    info!("Submitting {} jobs with {:?}", args.jobs, config);
    for _ in 0..args.jobs {
        dispatcher
            .submit(UuidJob::new())
            .context("failed to submit job")?;
    }

    let shutdown_after = Duration::from_millis(args.shutdown_after_ms);
    let to_shut_down = dispatcher.clone();
    let shutdown_thread = thread::spawn(move || {
        thread::sleep(shutdown_after);
        to_shut_down.shutdown();
    });

    match printer.join() {
        Ok(printed) => printed?,
        Err(_) => bail!("result printer panicked"),
    }
    if shutdown_thread.join().is_err() {
        bail!("shutdown thread panicked");
    }

    let stats = dispatcher.stats();
    if args.json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        info!("Finished: {:?}", stats);
    }

    Ok(())
}
