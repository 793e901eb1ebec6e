//! Background task management
//!
//! Registers long-running tasks (consumer pool, periodic jobs) so
//! shutdown can cancel them all and wait for each to drain within a
//! deadline.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct RegisteredTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

/// Background task manager
///
/// Tasks are expected to watch the shutdown token and exit on their
/// own; the deadline bounds how long each one gets.
pub struct BackgroundTasks {
    tasks: Vec<RegisteredTask>,
    shutdown: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token tasks should watch for the shutdown signal.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Register and start a background task.
    pub fn spawn<F>(&mut self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        tracing::debug!(task = %name, "Registered background task");
        self.tasks.push(RegisteredTask { name, handle });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Graceful shutdown: cancel all tasks and wait for each to finish
    /// within the deadline. Stragglers are aborted.
    pub async fn shutdown(self, deadline: Duration) {
        if self.tasks.is_empty() {
            return;
        }
        tracing::info!("Shutting down {} background tasks...", self.tasks.len());

        self.shutdown.cancel();

        for mut task in self.tasks {
            match tokio::time::timeout(deadline, &mut task.handle).await {
                Ok(Ok(())) => {
                    tracing::debug!(task = %task.name, "Task completed");
                }
                Ok(Err(e)) if e.is_cancelled() => {
                    tracing::debug!(task = %task.name, "Task cancelled");
                }
                Ok(Err(e)) => {
                    tracing::error!(task = %task.name, error = ?e, "Task panicked");
                }
                Err(_) => {
                    tracing::error!(task = %task.name, "Task did not stop within deadline, aborting");
                    task.handle.abort();
                }
            }
        }

        tracing::info!("All background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tasks_drain_on_shutdown() {
        let mut tasks = BackgroundTasks::new();
        let token = tasks.shutdown_token();
        tasks.spawn("waiter", async move {
            token.cancelled().await;
        });
        assert_eq!(tasks.len(), 1);
        tasks.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_shutdown_survives_deadline_overrun() {
        let mut tasks = BackgroundTasks::new();
        tasks.spawn("stuck", async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        // Returns despite the stuck task.
        tasks.shutdown(Duration::from_millis(50)).await;
    }
}
