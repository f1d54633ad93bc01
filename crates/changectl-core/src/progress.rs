//! Progress tracking and task polling for asynchronous server operations
//!
//! Applying a changeset returns an [`AsyncTask`] handle which must be polled
//! until it reaches a terminal state. This module provides that polling with
//! optional progress callbacks for UI updates.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::api::ChangesetApi;
use crate::error::{CoreError, Result};
use crate::types::AsyncTask;

/// Where a task stands, independent of the server's exact wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl TaskState {
    /// Map a server state string onto a [`TaskState`] (case-insensitive).
    ///
    /// Unrecognised states count as still running.
    pub fn classify(state: &str) -> Self {
        match state.to_lowercase().as_str() {
            "finished" | "succeeded" | "success" | "completed" | "complete" => TaskState::Succeeded,
            "error" | "failed" | "timed_out" | "timed out" => TaskState::Failed,
            "canceled" | "cancelled" | "cancelling" => TaskState::Canceled,
            _ => TaskState::Running,
        }
    }
}

/// Progress events emitted during polling
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Polling has begun
    Started { task_id: String },
    /// Polling iteration with current status
    Polling {
        task_id: String,
        state: String,
        elapsed: Duration,
    },
    /// Task completed successfully
    Completed { task_id: String },
    /// Task failed or was canceled
    Failed { task_id: String, error: String },
}

/// Callback type for progress updates
///
/// CLI can use this to update spinners.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Terminal result of a polled task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Succeeded(AsyncTask),
    Failed { task: AsyncTask, errors: Vec<String> },
    Canceled(AsyncTask),
}

impl TaskOutcome {
    pub fn task(&self) -> &AsyncTask {
        match self {
            TaskOutcome::Succeeded(task) | TaskOutcome::Canceled(task) => task,
            TaskOutcome::Failed { task, .. } => task,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded(_))
    }
}

/// Poll a task until it reaches a terminal state
///
/// # Arguments
///
/// * `api` - Used for status queries
/// * `task` - The handle returned when the operation was submitted
/// * `timeout` - Maximum time to wait for completion
/// * `interval` - Time between polling attempts
/// * `on_progress` - Optional callback for progress updates
///
/// # Returns
///
/// The terminal outcome, [`CoreError::TaskTimeout`] when `timeout` elapses first,
/// or the first transport/API error raised by a status query. Nothing is retried.
///
/// # Example
///
/// ```rust,ignore
/// use changectl_core::{poll_task, ProgressEvent};
/// use std::time::Duration;
///
/// let handle = client.apply(changeset.id).await?;
/// let outcome = poll_task(
///     &client,
///     handle,
///     Duration::from_secs(3600),
///     Duration::from_secs(1),
///     Some(Box::new(|event| {
///         if let ProgressEvent::Polling { state, elapsed, .. } = event {
///             println!("{} ({}s)", state, elapsed.as_secs());
///         }
///     })),
/// ).await?;
/// ```
pub async fn poll_task<A: ChangesetApi + ?Sized>(
    api: &A,
    task: AsyncTask,
    timeout: Duration,
    interval: Duration,
    on_progress: Option<ProgressCallback>,
) -> Result<TaskOutcome> {
    let start = Instant::now();
    let task_id = task.uuid.clone();
    let mut current = task;

    emit(
        &on_progress,
        ProgressEvent::Started {
            task_id: task_id.clone(),
        },
    );

    loop {
        match TaskState::classify(&current.state) {
            TaskState::Succeeded => {
                debug!("Task {} finished", task_id);
                emit(
                    &on_progress,
                    ProgressEvent::Completed {
                        task_id: task_id.clone(),
                    },
                );
                return Ok(TaskOutcome::Succeeded(current));
            }
            TaskState::Failed => {
                let errors = current.errors();
                let error = if errors.is_empty() {
                    format!("Task ended with state: {}", current.state)
                } else {
                    errors.join("; ")
                };
                debug!("Task {} failed: {}", task_id, error);
                emit(
                    &on_progress,
                    ProgressEvent::Failed {
                        task_id: task_id.clone(),
                        error,
                    },
                );
                return Ok(TaskOutcome::Failed {
                    task: current,
                    errors,
                });
            }
            TaskState::Canceled => {
                emit(
                    &on_progress,
                    ProgressEvent::Failed {
                        task_id: task_id.clone(),
                        error: "Task was canceled".to_string(),
                    },
                );
                return Ok(TaskOutcome::Canceled(current));
            }
            TaskState::Running => {}
        }

        if start.elapsed() >= timeout {
            return Err(CoreError::TaskTimeout(timeout));
        }

        tokio::time::sleep(interval).await;
        current = api.task(&task_id).await?;
        trace!("Task {} state: {}", task_id, current.state);

        emit(
            &on_progress,
            ProgressEvent::Polling {
                task_id: task_id.clone(),
                state: current.state.clone(),
                elapsed: start.elapsed(),
            },
        );
    }
}

/// Helper to emit progress events
fn emit(callback: &Option<ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}
