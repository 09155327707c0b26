//! Signed webhook deliveries driving the state machine.

use super::helpers::{DOCUMENT, Stack, number, stack};
use rstest::rstest;
use serde_json::json;
use specsync::{
    tracker::domain::RemoteIssueState,
    webhook::{WebhookError, WebhookSecret, sign},
    workflow::{
        domain::{Phase, UnitOfWork},
        ports::SubTaskRepository,
    },
};

impl Stack {
    async fn through_tasks(&self) -> UnitOfWork {
        let unit_of_work = self.seed(DOCUMENT).await.expect("seeded");
        for phase in [Phase::Design, Phase::Tasks] {
            self.advance(&unit_of_work, phase).await.expect("phase entered");
        }
        unit_of_work
    }

    fn issue_state(&self, value: u64) -> RemoteIssueState {
        let wanted = number(value).expect("number");
        self.remote
            .issues()
            .expect("issues")
            .into_iter()
            .find(|issue| issue.number == wanted)
            .expect("issue exists")
            .state
    }
}

fn closed(value: u64) -> Vec<u8> {
    json!({ "action": "closed", "issue": { "number": value } }).to_string().into_bytes()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closing_every_child_remotely_closes_the_parent(stack: Stack) {
    let unit_of_work = stack.through_tasks().await;

    for child in [2, 3] {
        stack
            .remote
            .set_state_externally(number(child).expect("number"), RemoteIssueState::Closed)
            .expect("closed remotely");
        let report = stack
            .deliver("issues", &closed(child))
            .await
            .expect("delivery accepted")
            .expect("delivery mapped to an event");
        assert!(report.is_clean(), "{:?}", report.failures);
    }

    assert_eq!(stack.issue_state(1), RemoteIssueState::Closed);
    let sub_tasks = stack
        .sub_tasks
        .find_by_parent(unit_of_work.id())
        .await
        .expect("sub-task lookup");
    assert!(sub_tasks.iter().all(|sub_task| sub_task.is_closed()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn remote_checkbox_edit_reaches_the_document(stack: Stack) {
    let unit_of_work = stack.seed(DOCUMENT).await.expect("seeded");
    for phase in [Phase::Design, Phase::Implementation] {
        stack.advance(&unit_of_work, phase).await.expect("phase entered");
    }
    let parent = number(1).expect("number");
    let before = stack
        .remote
        .issues()
        .expect("issues")
        .into_iter()
        .next()
        .expect("parent issue")
        .body;
    let after = before.replacen("- [ ] Parse input", "- [x] Parse input", 1);
    stack
        .remote
        .set_body_externally(parent, &after)
        .expect("edited remotely");
    let body = json!({
        "action": "edited",
        "issue": { "number": 1, "body": after },
        "changes": { "body": { "from": before } },
    })
    .to_string();

    stack
        .deliver("issues", body.as_bytes())
        .await
        .expect("delivery accepted");

    let document = stack.document_on_disk().expect("on disk");
    assert!(document.contains("- [x] Parse input"), "{document}");
    assert!(document.contains("- [ ] Write tests"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tampered_delivery_changes_nothing(stack: Stack) {
    let unit_of_work = stack.through_tasks().await;
    stack
        .remote
        .set_state_externally(number(2).expect("number"), RemoteIssueState::Closed)
        .expect("closed remotely");
    let forged_with = WebhookSecret::new("guessed").expect("secret");
    let body = closed(2);
    let signature = sign(&forged_with, &body).expect("signed");

    let result = stack.deliver_signed("issues", &body, &signature).await;

    assert!(matches!(result, Err(WebhookError::SignatureMismatch)));
    let sub_tasks = stack
        .sub_tasks
        .find_by_parent(unit_of_work.id())
        .await
        .expect("sub-task lookup");
    assert!(sub_tasks.iter().all(|sub_task| !sub_task.is_closed()));
}

#[rstest]
#[case("push", r#"{"ref":"refs/heads/main"}"#)]
#[case("issues", r#"{"action":"assigned","issue":{"number":1}}"#)]
#[case("pull_request", r#"{"action":"opened","pull_request":{"number":4,"merged":false}}"#)]
#[tokio::test(flavor = "multi_thread")]
async fn unhandled_deliveries_are_acknowledged(
    stack: Stack,
    #[case] event: &str,
    #[case] body: &str,
) {
    let outcome = stack
        .deliver(event, body.as_bytes())
        .await
        .expect("delivery accepted");

    assert!(outcome.is_none());
}
