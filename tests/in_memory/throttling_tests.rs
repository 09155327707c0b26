//! Rate-limited tracker calls made during phase actions.

use super::helpers::{DOCUMENT, Stack, stack};
use rstest::rstest;
use specsync::{
    tracker::{adapters::memory::TrackerOperation, ports::RemoteTrackerError},
    workflow::domain::Phase,
};
use std::time::Duration;

fn throttled() -> RemoteTrackerError {
    RemoteTrackerError::RateLimited { retry_after: None }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn throttled_issue_creation_is_retried(stack: Stack) {
    stack
        .remote
        .fail_next(TrackerOperation::CreateIssue, throttled())
        .expect("failure queued");
    let unit_of_work = stack.seed(DOCUMENT).await.expect("seeded");

    let outcome = stack
        .advance(&unit_of_work, Phase::Design)
        .await
        .expect("design entered");

    assert!(outcome.is_clean(), "{outcome:?}");
    assert_eq!(
        stack.remote.calls(TrackerOperation::CreateIssue).expect("calls"),
        2
    );
    assert_eq!(stack.throttle_sleeper.delays(), vec![Duration::from_millis(50)]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tracker_hints_override_the_backoff(stack: Stack) {
    stack
        .remote
        .fail_next(
            TrackerOperation::CreateIssue,
            RemoteTrackerError::RateLimited {
                retry_after: Some(Duration::from_secs(7)),
            },
        )
        .expect("failure queued");
    let unit_of_work = stack.seed(DOCUMENT).await.expect("seeded");

    stack
        .advance(&unit_of_work, Phase::Design)
        .await
        .expect("design entered");

    assert_eq!(stack.throttle_sleeper.delays(), vec![Duration::from_secs(7)]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn exhausted_retries_surface_in_the_outcome(stack: Stack) {
    for _ in 0..3 {
        stack
            .remote
            .fail_next(TrackerOperation::CreateIssue, throttled())
            .expect("failure queued");
    }
    let unit_of_work = stack.seed(DOCUMENT).await.expect("seeded");

    let outcome = stack
        .advance(&unit_of_work, Phase::Design)
        .await
        .expect("design entered");

    let ensure = outcome
        .action("ensure_parent_issue")
        .expect("action ran");
    assert!(
        ensure
            .result
            .as_ref()
            .is_err_and(|message| message.contains("rate limit exceeded after 3 attempts")),
        "{ensure:?}"
    );
    assert_eq!(
        stack.throttle_sleeper.delays(),
        vec![Duration::from_millis(50), Duration::from_millis(100)]
    );
    assert!(stack.remote.issues().expect("issues").is_empty());
}
