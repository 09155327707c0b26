//! Phase flow over a filesystem workspace and a rate-limited tracker.

use super::helpers::{DOCUMENT, Stack, number, stack};
use mockable::DefaultClock;
use rstest::rstest;
use specsync::{
    events::{EventPayload, EventType, WorkflowEvent},
    tracker::domain::{RemoteIssueState, SyncEntity},
    tracker::ports::SyncRecordRepository,
    workflow::{domain::Phase, ports::SubTaskRepository},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn design_to_completion_closes_the_parent(stack: Stack) {
    let unit_of_work = stack.seed(DOCUMENT).await.expect("seeded");

    let design = stack
        .advance(&unit_of_work, Phase::Design)
        .await
        .expect("design entered");
    assert!(design.is_clean(), "{design:?}");
    assert_eq!(
        stack.remote.item_status("PVTI_I_1").expect("status"),
        Some("Todo".to_owned())
    );

    let tasks = stack
        .advance(&unit_of_work, Phase::Tasks)
        .await
        .expect("tasks entered");
    assert!(tasks.is_clean(), "{tasks:?}");
    let sub_tasks = stack
        .sub_tasks
        .find_by_parent(unit_of_work.id())
        .await
        .expect("sub-task lookup");
    assert_eq!(sub_tasks.len(), 2);

    for phase in [Phase::Implementation, Phase::Testing] {
        stack
            .advance(&unit_of_work, phase)
            .await
            .expect("phase entered");
    }
    let completed = stack
        .advance(&unit_of_work, Phase::Completed)
        .await
        .expect("completed entered");
    assert_eq!(
        completed.action("close_parent_issue").map(|action| &action.result),
        Some(&Ok("child issues still open".to_owned()))
    );
    assert_eq!(
        stack.remote.item_status("PVTI_I_1").expect("status"),
        Some("Done".to_owned())
    );

    for sub_task in &sub_tasks {
        let event = WorkflowEvent::new(
            "cli",
            EventPayload::TaskCompleted {
                sub_task_id: sub_task.id(),
            },
            &DefaultClock,
        );
        let report = stack.bus.publish(event).await.expect("published");
        assert!(report.is_clean(), "{:?}", report.failures);
    }

    let issues = stack.remote.issues().expect("issues");
    assert_eq!(issues.len(), 3);
    assert!(
        issues
            .iter()
            .all(|issue| issue.state == RemoteIssueState::Closed),
        "{issues:?}"
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn local_ticks_are_pushed_when_implementation_starts(stack: Stack) {
    let unit_of_work = stack.seed(DOCUMENT).await.expect("seeded");
    assert_eq!(stack.document_on_disk().expect("on disk"), DOCUMENT);
    stack
        .advance(&unit_of_work, Phase::Design)
        .await
        .expect("design entered");

    std::fs::write(
        stack.workspace.path().join("specs").join("checkout.md"),
        DOCUMENT.replacen("- [ ] Write tests", "- [x] Write tests", 1),
    )
    .expect("edited on disk");
    stack
        .advance(&unit_of_work, Phase::Implementation)
        .await
        .expect("implementation entered");

    let issues = stack.remote.issues().expect("issues");
    let parent = issues.first().expect("parent issue");
    assert!(parent.body.contains("- [x] Write tests"), "{}", parent.body);
    let record = stack
        .records
        .find(&SyncEntity::unit_of_work(unit_of_work.id()))
        .await
        .expect("record lookup")
        .expect("parent record");
    assert_eq!(record.remote_number(), number(1).expect("number"));
    assert!(record.checklist_checksum().is_some());
}

#[rstest]
fn machine_listens_on_the_shared_bus(stack: Stack) {
    for event_type in [
        EventType::PhaseChanged,
        EventType::RemoteIssueClosed,
        EventType::RemoteIssueEdited,
        EventType::TaskCompleted,
    ] {
        assert_eq!(stack.bus.handler_count(event_type).expect("count"), 1);
    }
    assert_eq!(
        stack.bus.handler_count(EventType::SyncFailed).expect("count"),
        0
    );
}
