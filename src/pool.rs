//! Bounded fan-out of one command per matched context.
//!
//! Dispatch follows match-set order. Each context waits for one of `limit`
//! semaphore permits and then runs on its own tokio task. A failure never
//! stops the remaining contexts; cancellation stops dispatch, kills running
//! commands through the executor, and the pool still drains every started
//! task before returning.

use crate::errors::{AllctxError, TaskError};
use crate::exec::CommandExecutor;
use crate::output::{Labels, Palette, Sinks};
use crate::task::ArgTemplate;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Outcome of one dispatched command.
#[derive(Debug)]
pub struct TaskResult {
    pub target: String,
    pub error: Option<TaskError>,
}

impl TaskResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything the pool did during one run.
#[derive(Debug)]
pub struct RunSummary {
    /// Size of the match set.
    pub total: usize,
    /// One entry per dispatched command, in match-set order.
    pub results: Vec<TaskResult>,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn dispatched(&self) -> usize {
        self.results.len()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }

    /// Collapse into the aggregate error that decides the exit status.
    pub fn into_result(self) -> Result<Self, AllctxError> {
        if self.cancelled {
            return Err(AllctxError::Cancelled {
                dispatched: self.dispatched(),
                total: self.total,
            });
        }
        match self.failed() {
            0 => Ok(self),
            failed => Err(AllctxError::TasksFailed {
                failed,
                dispatched: self.dispatched(),
            }),
        }
    }
}

/// Runs the wrapped command once per context with bounded concurrency.
pub struct WorkerPool {
    executor: Arc<dyn CommandExecutor>,
    sinks: Sinks,
    palette: Palette,
    /// 0 means one slot per context.
    limit: usize,
}

impl WorkerPool {
    pub fn new(executor: Arc<dyn CommandExecutor>, sinks: Sinks) -> Self {
        Self {
            executor,
            sinks,
            palette: Palette::default(),
            limit: 0,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Slots never exceed the number of targets, so any `-c` fits a semaphore.
    fn effective_limit(&self, targets: usize) -> usize {
        let slots = targets.max(1);
        match self.limit {
            0 => slots,
            n => n.min(slots),
        }
    }

    /// Run every target and fail if any command failed or the run was cancelled.
    pub async fn run_all(
        &self,
        targets: &[String],
        template: &ArgTemplate,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, AllctxError> {
        self.dispatch(targets, template, cancel).await.into_result()
    }

    /// Run every target and report each outcome without aggregating.
    pub async fn dispatch(
        &self,
        targets: &[String],
        template: &ArgTemplate,
        cancel: &CancellationToken,
    ) -> RunSummary {
        let limit = self.effective_limit(targets.len());
        let labels = Labels::new(targets, &self.palette);
        let semaphore = Arc::new(Semaphore::new(limit));
        let mut set = JoinSet::new();
        let mut positions = HashMap::new();

        debug!(targets = targets.len(), limit, "dispatching");

        for (position, target) in targets.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let task = template.build(target);
            let label = labels
                .get(position)
                .unwrap_or_else(|| Arc::from(format!("{} | ", target).into_bytes()));
            let (stdout, stderr) = self.sinks.writers(label);
            let executor = self.executor.clone();
            let cancel = cancel.clone();

            debug!(context = %task.target, position, "dispatch");
            let handle = set.spawn(async move {
                let _permit = permit;
                let mut failure_writer = stderr.clone();
                let result = executor.execute(&task.argv, stdout, stderr, &cancel).await;
                if let Err(e) = &result {
                    warn!(context = %task.target, error = %e, "command failed");
                    // One write call so the message stays on one labeled line.
                    if let Err(write_err) =
                        failure_writer.write_all(format!("error: {}\n", e).as_bytes())
                    {
                        warn!(context = %task.target, error = %write_err, "failed to report failure");
                    }
                }
                TaskResult {
                    target: task.target,
                    error: result.err(),
                }
            });
            positions.insert(handle.id(), (position, target.clone()));
        }

        let mut results = Vec::with_capacity(positions.len());
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((id, result)) => {
                    let position = positions.get(&id).map_or(usize::MAX, |(p, _)| *p);
                    results.push((position, result));
                }
                Err(e) => {
                    let (position, target) = positions
                        .get(&e.id())
                        .cloned()
                        .unwrap_or((usize::MAX, String::new()));
                    warn!(context = %target, error = %e, "task aborted");
                    results.push((
                        position,
                        TaskResult {
                            target,
                            error: Some(TaskError::Aborted(e.to_string())),
                        },
                    ));
                }
            }
        }
        results.sort_by_key(|(position, _)| *position);

        RunSummary {
            total: targets.len(),
            results: results.into_iter().map(|(_, r)| r).collect(),
            cancelled: cancel.is_cancelled(),
        }
    }
}
