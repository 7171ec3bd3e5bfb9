//! Worker pool coordination.
//!
//! Spawns one task per page up front and lets the `ConcurrencyLimiter`
//! decide how many of them touch the network at once. The coordinator waits
//! on a `JoinSet` until every task has reported, then returns a `RunReport`
//! with one recorded outcome per task.

use std::time::Instant;

use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, instrument};

use crate::domain::{FetchTask, RunReport, TaskOutcome};

use super::fetcher::PageFetcher;
use super::limiter::ConcurrencyLimiter;

/// Aborts the fetch when the worker awaiting it is dropped
struct AbortOnDrop(JoinHandle<TaskOutcome>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs fetch tasks under a concurrency budget
#[derive(Debug, Clone)]
pub struct Coordinator {
    fetcher: PageFetcher,
    limiter: ConcurrencyLimiter,
}

impl Coordinator {
    pub fn new(fetcher: PageFetcher, limiter: ConcurrencyLimiter) -> Self {
        Self { fetcher, limiter }
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Run every task and wait for all of them to finish
    #[instrument(skip_all, fields(label = %target, tasks = tasks.len(), workers = self.limiter.capacity()))]
    pub async fn run(&self, target: &str, tasks: Vec<FetchTask>) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::new(target, tasks.len());
        info!("Starting downloads");

        let mut join_set = JoinSet::new();
        for task in tasks {
            let fetcher = self.fetcher.clone();
            let limiter = self.limiter.clone();

            join_set.spawn(async move {
                let slot = match limiter.acquire().await {
                    Ok(slot) => slot,
                    Err(e) => return TaskOutcome::failed(task.page_url, e),
                };

                // Run the fetch as its own task so a panic becomes this page's failure
                let page_url = task.page_url.clone();
                let mut fetch = AbortOnDrop(tokio::spawn(async move { fetcher.run(&task).await }));
                let outcome = match (&mut fetch.0).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(page_url = %page_url, error = %e, "Fetch task aborted");
                        TaskOutcome::failed(page_url, e)
                    }
                };
                drop(slot);
                outcome
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    error!(error = %e, "Worker task aborted");
                    report.record(TaskOutcome::failed("<unknown page>", e));
                }
            }
        }

        report.finish(started.elapsed(), self.limiter.peak_in_flight());

        info!(
            elapsed_ms = report.elapsed.as_millis() as u64,
            succeeded = report.tasks_succeeded,
            failed = report.tasks_failed(),
            empty = report.empty_pages,
            persisted = report.assets_persisted,
            skipped = report.assets_skipped,
            "Downloads finished"
        );

        report
    }
}
