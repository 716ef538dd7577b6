// Package shutdown provides graceful shutdown of a thread group.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::group::ThreadGroup;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
#[error("graceful shutdown timeout exceeded")]
pub struct TimeoutError;

/// Graceful shutdown handler.
///
/// Waits for a stop trigger, shuts the group down and waits for its workers
/// off the async runtime, bounded by a timeout.
#[derive(Clone)]
pub struct GracefulShutdown {
    shutdown_token: CancellationToken,
    group: Arc<ThreadGroup>,
    timeout: Duration,
}

impl GracefulShutdown {
    /// Creates a new graceful shutdown handler.
    pub fn new(shutdown_token: CancellationToken, group: Arc<ThreadGroup>) -> Self {
        Self {
            shutdown_token,
            group,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the graceful shutdown timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Waits for SIGINT, token cancellation or the optional run deadline,
    /// then stops the group.
    pub async fn await_shutdown(&self, run_for: Option<Duration>) -> Result<()> {
        let deadline = async {
            match run_for {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!(
                    component = "graceful-shutdown",
                    event = "os_signal",
                    signal = "SIGINT",
                    "cancellation started"
                );
            }
            _ = self.shutdown_token.cancelled() => {
                info!(
                    component = "graceful-shutdown",
                    event = "ctx_done",
                    "cancellation started"
                );
            }
            _ = deadline => {
                info!(
                    component = "graceful-shutdown",
                    event = "run_deadline",
                    "cancellation started"
                );
            }
        }

        self.cancel_and_await_with_timeout().await
    }

    async fn cancel_and_await_with_timeout(&self) -> Result<()> {
        self.shutdown_token.cancel();
        self.group.shutdown();

        let group = self.group.clone();
        let waiter = tokio::task::spawn_blocking(move || group.await_termination());

        match timeout(self.timeout, waiter).await {
            Ok(Ok(Ok(()))) => {
                info!(
                    component = "graceful-shutdown",
                    event = "shutdown_success",
                    group = %self.group.name(),
                    "group was gracefully shut down"
                );
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(e.into()),
            Ok(Err(e)) => Err(anyhow::Error::new(e).context("termination waiter failed")),
            Err(_) => {
                warn!(
                    component = "graceful-shutdown",
                    event = "shutdown_timeout",
                    timeout_ms = self.timeout.as_millis() as u64,
                    active = self.group.active_size(),
                    "not all workers were stopped within timeout"
                );
                Err(TimeoutError.into())
            }
        }
    }
}
