//! Fixed-interval polling of a remote task until it reaches a terminal state.

use std::time::Duration;

use artefact_remote::{TaskKind, TaskService, TaskState};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{OrchestrationError, Result};

/// How often, and how many times, to poll a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Image generation is usually quick.
    pub const IMAGE: Self = Self::new(Duration::from_secs(5), 20);
    /// Model generation is slow.
    pub const MODEL: Self = Self::new(Duration::from_secs(30), 40);

    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Wall-clock upper bound of the sleeps between polls.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Poll `task_id` until it succeeds, fails, or the budget runs out.
///
/// Returns the result reference for `kind`. No sleep follows the last
/// attempt. Errors from the service itself are returned immediately.
pub async fn wait_for(
    service: &dyn TaskService,
    kind: TaskKind,
    task_id: &str,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> Result<String> {
    let cancelled = || OrchestrationError::Cancelled {
        kind,
        task_id: task_id.to_string(),
    };

    for attempt in 1..=policy.max_attempts {
        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            status = service.poll_once(task_id) => status?,
        };

        match status.state {
            TaskState::Success => {
                return status
                    .result_ref(kind)
                    .map(str::to_string)
                    .ok_or_else(|| OrchestrationError::MalformedResult {
                        kind,
                        task_id: task_id.to_string(),
                        field: kind.result_field(),
                    });
            }
            TaskState::Failed => {
                return Err(OrchestrationError::RemoteTaskFailed {
                    kind,
                    task_id: task_id.to_string(),
                });
            }
            TaskState::Queued | TaskState::Running => {
                debug!(
                    task_id,
                    %kind,
                    attempt,
                    status = %status.state,
                    progress = status.progress,
                    "Task not finished"
                );
            }
        }

        if attempt < policy.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                _ = tokio::time::sleep(policy.interval) => {}
            }
        }
    }

    Err(OrchestrationError::Timeout {
        kind,
        task_id: task_id.to_string(),
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use artefact_remote::{MockPoll, MockTaskService};
    use tokio::time::Instant;

    use super::*;

    const FAST: RetryPolicy = RetryPolicy::new(Duration::from_secs(5), 3);

    #[tokio::test(start_paused = true)]
    async fn test_success_after_running() {
        let service = MockTaskService::new().with_script(
            "img-1",
            vec![
                MockPoll::queued(),
                MockPoll::running(50),
                MockPoll::image_ready("https://cdn/i.png"),
            ],
        );
        let start = Instant::now();
        let url = wait_for(&service, TaskKind::Image, "img-1", FAST, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(url, "https://cdn/i.png");
        assert_eq!(service.poll_count("img-1"), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_trailing_sleep() {
        let service = MockTaskService::new().with_script("m", vec![MockPoll::running(1)]);
        let start = Instant::now();
        let err = wait_for(&service, TaskKind::ImageToModel, "m", FAST, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestrationError::Timeout { attempts: 3, .. }));
        assert_eq!(service.poll_count("m"), 3);
        assert_eq!(start.elapsed(), FAST.budget());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_and_malformed_are_fatal() {
        let service = MockTaskService::new()
            .with_script("f", vec![MockPoll::failed()])
            .with_script("x", vec![MockPoll::success_without_output()]);
        let cancel = CancellationToken::new();

        let err = wait_for(&service, TaskKind::ImageToModel, "f", FAST, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::RemoteTaskFailed { .. }));

        let err = wait_for(&service, TaskKind::Image, "x", FAST, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::MalformedResult { field: "generated_image", .. }
        ));
        assert_eq!(service.poll_count("f"), 1);
        assert_eq!(service.poll_count("x"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_error_is_not_retried() {
        let service = MockTaskService::new().with_script("e", vec![MockPoll::HttpError(502)]);
        let err = wait_for(&service, TaskKind::Image, "e", FAST, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::RemoteService(_)));
        assert_eq!(service.poll_count("e"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_the_wait() {
        let service = MockTaskService::new().with_script("m", vec![MockPoll::running(1)]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            trigger.cancel();
        });

        let policy = RetryPolicy::MODEL;
        let err = wait_for(&service, TaskKind::ImageToModel, "m", policy, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::Cancelled { .. }));
        assert_eq!(service.poll_count("m"), 1);
    }

    #[test]
    fn test_policy_constants() {
        assert_eq!(RetryPolicy::IMAGE.max_attempts, 20);
        assert_eq!(RetryPolicy::MODEL.interval, Duration::from_secs(30));
        assert_eq!(RetryPolicy::IMAGE.with_max_attempts(60).max_attempts, 60);
    }
}
