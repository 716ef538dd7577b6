// Main entrypoint for the threadunion demo.

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use threadunion::config::{load_cfg, Config, ConfigTrait};
use threadunion::group::ThreadGroup;
use threadunion::interrupt;
use threadunion::shutdown::{GracefulShutdown, DEFAULT_TIMEOUT};

const DEFAULT_TASK_DURATION: Duration = Duration::from_millis(250);
const FAILING_UNIT: u64 = 3;

/// threadunion - run a group of worker threads and report their outcomes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, value_name = "FILE")]
    cfg: Option<PathBuf>,

    /// Number of workers to start (defaults to the number of cores)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Make every n-th worker fail
    #[arg(long)]
    fail_every: Option<usize>,

    /// Stop the group after this long, e.g. "2s" (runs until Ctrl-C otherwise)
    #[arg(long, value_parser = humantime::parse_duration)]
    run_for: Option<Duration>,
}

/// Configures structured logging based on configuration.
fn configure_logger(cfg: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let log_level = cfg
        .logs()
        .and_then(|logs| logs.level.as_deref())
        .unwrap_or("info");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if cfg.is_prod() {
        // Production: JSON format
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        // Development: Pretty console format
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init();
    }
}

/// Starts `count` workers doing interruptible units of work.
fn spawn_workload(
    group: &ThreadGroup,
    count: usize,
    fail_every: usize,
    unit: Duration,
) -> Result<()> {
    let mut rng = rand::thread_rng();
    for i in 0..count {
        let fails = fail_every > 0 && (i + 1) % fail_every == 0;
        let jitter = rng.gen_range(0.5..1.5);
        let pause = unit.mul_f64(jitter);

        let worker = group.new_fallible_worker(move || {
            let mut units: u64 = 0;
            loop {
                if interrupt::sleep(pause).is_err() {
                    info!(component = "workload", units, "interrupted, stopping");
                    return Ok(());
                }
                units += 1;
                if fails && units == FAILING_UNIT {
                    anyhow::bail!("simulated failure after {} units", units);
                }
            }
        })?;
        worker
            .start()
            .with_context(|| format!("failed to start {}", worker.name()))?;
    }
    Ok(())
}

fn report(group: &ThreadGroup) {
    let results = group.results();
    let failed = results.iter().filter(|o| !o.is_success()).count();
    for outcome in &results {
        match outcome.failure() {
            None => info!(component = "main", worker = outcome.worker_name(), "worker succeeded"),
            Some(fault) => warn!(
                component = "main",
                worker = outcome.worker_name(),
                error = %fault,
                "worker failed"
            ),
        }
    }
    info!(
        component = "main",
        group = %group.name(),
        total = group.total_size(),
        outcomes = results.len(),
        failed,
        finished = group.is_finished(),
        "run complete"
    );
}

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let result = runtime.block_on(async_main(args));
    // Workers that ignore interruption must not keep the process alive.
    runtime.shutdown_background();
    result
}

async fn async_main(args: Args) -> Result<()> {
    let (cfg, source) = load_cfg(args.cfg.clone())?;

    // Configure logger (must be done after config is loaded)
    configure_logger(&cfg);
    info!(component = "config", event = "load_success", source = %source, "config loaded");

    let demo = cfg.demo().clone();
    let workers = args.workers.unwrap_or(demo.workers);
    let workers = if workers == 0 { num_cpus::get() } else { workers };
    let fail_every = args.fail_every.unwrap_or(demo.fail_every);
    let run_for = args.run_for.or(demo.run_for);

    let group = Arc::new(ThreadGroup::with_join_poll(cfg.group().name.clone(), cfg.join_poll()));
    spawn_workload(
        &group,
        workers,
        fail_every,
        demo.task_duration.unwrap_or(DEFAULT_TASK_DURATION),
    )?;
    info!(
        component = "main",
        group = %group.name(),
        workers,
        active = group.active_size(),
        "workers started"
    );

    let graceful_shutdown = GracefulShutdown::new(CancellationToken::new(), group.clone())
        .with_timeout(demo.shutdown_timeout.unwrap_or(DEFAULT_TIMEOUT));

    let outcome = graceful_shutdown.await_shutdown(run_for).await;
    if let Err(e) = &outcome {
        error!(
            component = "main",
            event = "graceful_shutdown_failed",
            error = %e,
            "failed to gracefully shut down group"
        );
    }

    report(&group);
    outcome
}
