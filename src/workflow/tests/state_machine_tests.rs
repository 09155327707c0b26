//! Tests for phase actions and remote event handling.

use super::{Harness, harness};
use crate::events::{EventPayload, EventType, WorkflowEvent};
use crate::tracker::{
    adapters::memory::TrackerOperation,
    domain::{RemoteIssueState, RemoteNumber},
    ports::RemoteTracker,
};
use crate::workflow::{
    adapters::gates::ChecklistCompleteGate,
    adapters::memory::InMemoryDocumentStore,
    domain::{DocumentRef, Phase, SubTask, UnitOfWork},
    ports::{DocumentStore, SubTaskRepository, UnitOfWorkRepository},
    services::PhaseOutcome,
};
use mockable::DefaultClock;
use rstest::rstest;

const DOCUMENT: &str = "\
# Checkout

## Build

- [ ] Parse input
- [x] Render output

## Verify

- [ ] Write tests
";

fn number(value: u64) -> RemoteNumber {
    RemoteNumber::new(value).expect("valid number")
}

impl Harness {
    async fn advance(&self, unit_of_work: &UnitOfWork, phase: Phase) -> PhaseOutcome {
        self.transitions
            .transition(unit_of_work.id(), phase)
            .await
            .expect("forward transition");
        self.machine.last_outcome().expect("machine ran")
    }

    async fn emit(&self, payload: EventPayload) {
        let event = WorkflowEvent::new("test", payload, &DefaultClock);
        let report = self.bus.publish(event).await.expect("published");
        assert!(report.is_clean(), "handler failures: {:?}", report.failures);
    }

    async fn sub_tasks_of(&self, unit_of_work: &UnitOfWork) -> Vec<SubTask> {
        self.sub_tasks
            .find_by_parent(unit_of_work.id())
            .await
            .expect("sub-task lookup")
    }

    async fn phase_of(&self, unit_of_work: &UnitOfWork) -> Phase {
        self.units
            .find_by_id(unit_of_work.id())
            .await
            .expect("lookup")
            .expect("stored unit")
            .phase()
    }

    async fn issue_state(&self, remote_number: RemoteNumber) -> RemoteIssueState {
        self.tracker
            .get_issue(remote_number)
            .await
            .expect("issue exists")
            .state
    }
}

fn action_result<'a>(outcome: &'a PhaseOutcome, name: &str) -> &'a Result<String, String> {
    &outcome.action(name).expect("action ran").result
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn design_creates_parent_and_sets_board_status(harness: Harness) {
    let unit_of_work = harness.seed(DOCUMENT).await;

    let outcome = harness.advance(&unit_of_work, Phase::Design).await;

    assert!(outcome.is_clean(), "{outcome:?}");
    assert_eq!(outcome.phase, Phase::Design);
    assert!(outcome.gates.is_empty());
    let issues = harness.tracker.issues().expect("issues");
    let parent = issues.first().expect("parent issue");
    assert_eq!(issues.len(), 1);
    assert_eq!(parent.labels, vec!["phase:design".to_owned()]);
    assert!(parent.body.contains("**Phase:** design"));
    assert!(parent.body.contains("### Build\n\n- [ ] Parse input\n- [x] Render output"));
    assert_eq!(
        harness.tracker.item_status("PVTI_I_1").expect("status"),
        Some("Todo".to_owned())
    );
    assert_eq!(
        action_result(&outcome, "sync_board_status"),
        &Ok("status Todo".to_owned())
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unconverged_board_status_is_reported_not_failed(harness: Harness) {
    harness
        .tracker
        .pin_item_status("PVTI_I_1", Some("Done"))
        .expect("pin status");
    let unit_of_work = harness.seed(DOCUMENT).await;

    let outcome = harness.advance(&unit_of_work, Phase::Design).await;

    assert_eq!(
        action_result(&outcome, "sync_board_status"),
        &Ok("status unverified after 4 checks, board shows `Done`".to_owned())
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tasks_phase_decomposes_unchecked_items(harness: Harness) {
    let unit_of_work = harness.seed(DOCUMENT).await;

    let outcome = harness.advance(&unit_of_work, Phase::Tasks).await;

    assert!(outcome.is_clean(), "{outcome:?}");
    let sub_tasks = harness.sub_tasks_of(&unit_of_work).await;
    let titles: Vec<&str> = sub_tasks.iter().map(SubTask::title).collect();
    assert_eq!(titles, vec!["Parse input", "Write tests"]);
    assert_eq!(
        sub_tasks.iter().map(SubTask::remote_number).collect::<Vec<_>>(),
        vec![Some(number(2)), Some(number(3))]
    );
    let children = harness
        .tracker
        .list_sub_issues(number(1))
        .await
        .expect("children");
    assert_eq!(children.len(), 2);
    assert!(children.iter().all(|child| child.body.ends_with("Part of #1")));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn decomposition_is_idempotent(harness: Harness) {
    let unit_of_work = harness.seed(DOCUMENT).await;
    harness.advance(&unit_of_work, Phase::Tasks).await;
    let stored = harness
        .units
        .find_by_id(unit_of_work.id())
        .await
        .expect("lookup")
        .expect("stored unit");

    let outcome = harness.machine.enter_phase(&stored, Phase::Tasks).await;

    assert!(outcome.is_clean(), "{outcome:?}");
    assert_eq!(harness.sub_tasks_of(&unit_of_work).await.len(), 2);
    assert_eq!(harness.tracker.issues().expect("issues").len(), 3);
    assert_eq!(
        harness
            .tracker
            .calls(TrackerOperation::CreateIssue)
            .expect("calls"),
        3
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn same_label_in_two_sections_yields_two_sub_tasks(harness: Harness) {
    let document = "## Backend\n- [ ] Write tests\n## Frontend\n- [ ] Write tests\n";
    let unit_of_work = harness.seed(document).await;

    let outcome = harness.advance(&unit_of_work, Phase::Tasks).await;

    assert!(outcome.is_clean(), "{outcome:?}");
    let sub_tasks = harness.sub_tasks_of(&unit_of_work).await;
    let keys: Vec<(&str, &str)> = sub_tasks
        .iter()
        .map(|sub_task| (sub_task.description(), sub_task.title()))
        .collect();
    assert_eq!(keys, vec![("Backend", "Write tests"), ("Frontend", "Write tests")]);
    assert_eq!(
        harness
            .tracker
            .list_sub_issues(number(1))
            .await
            .expect("children")
            .len(),
        2
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn implementation_reports_progress_and_reconciles(harness: Harness) {
    let unit_of_work = harness.seed(DOCUMENT).await;
    harness.advance(&unit_of_work, Phase::Tasks).await;
    let ticked = DOCUMENT.replacen("- [ ] Parse input", "- [x] Parse input", 1);
    harness
        .documents
        .write(unit_of_work.document_ref(), &ticked)
        .await
        .expect("document written");

    let outcome = harness.advance(&unit_of_work, Phase::Implementation).await;

    assert!(outcome.is_clean(), "{outcome:?}");
    let comments = harness.tracker.comments(number(1)).expect("comments");
    let comment = comments.first().expect("progress comment");
    assert!(comment.starts_with("Progress: 2/3 checklist items complete (66%)."));
    assert!(comment.contains("- Write tests"));
    let parent = harness.tracker.get_issue(number(1)).await.expect("parent");
    assert!(parent.body.contains("- [x] Parse input"));
    assert_eq!(harness.recorder.of_type(EventType::ChecklistChanged).len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completed_with_open_children_keeps_parent_open(harness: Harness) {
    let unit_of_work = harness.seed(DOCUMENT).await;
    harness.advance(&unit_of_work, Phase::Tasks).await;

    let outcome = harness.advance(&unit_of_work, Phase::Completed).await;

    assert_eq!(
        action_result(&outcome, "close_parent_issue"),
        &Ok("child issues still open".to_owned())
    );
    assert_eq!(harness.issue_state(number(1)).await, RemoteIssueState::Open);
    let gate = outcome.gates.first().expect("gate report");
    assert_eq!(gate.gate, ChecklistCompleteGate::<InMemoryDocumentStore>::NAME);
    assert!(!gate.passed);
    assert_eq!(
        gate.findings,
        vec!["Build: Parse input".to_owned(), "Verify: Write tests".to_owned()]
    );
    assert!(!outcome.is_clean());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completing_every_sub_task_closes_the_parent(harness: Harness) {
    let unit_of_work = harness.seed(DOCUMENT).await;
    harness.advance(&unit_of_work, Phase::Tasks).await;
    let sub_tasks = harness.sub_tasks_of(&unit_of_work).await;
    assert_eq!(sub_tasks.len(), 2);
    let first = sub_tasks.first().map(SubTask::id).expect("first sub-task");
    let last = sub_tasks.last().map(SubTask::id).expect("last sub-task");

    harness
        .emit(EventPayload::TaskCompleted { sub_task_id: first })
        .await;
    assert_eq!(harness.issue_state(number(2)).await, RemoteIssueState::Closed);
    assert_eq!(harness.issue_state(number(1)).await, RemoteIssueState::Open);

    harness
        .emit(EventPayload::TaskCompleted { sub_task_id: last })
        .await;
    assert_eq!(harness.issue_state(number(3)).await, RemoteIssueState::Closed);
    assert_eq!(harness.issue_state(number(1)).await, RemoteIssueState::Closed);
    assert!(harness
        .sub_tasks_of(&unit_of_work)
        .await
        .iter()
        .all(SubTask::is_closed));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn externally_closed_children_close_the_parent(harness: Harness) {
    let unit_of_work = harness.seed(DOCUMENT).await;
    harness.advance(&unit_of_work, Phase::Tasks).await;

    for child in [number(2), number(3)] {
        harness
            .tracker
            .set_state_externally(child, RemoteIssueState::Closed)
            .expect("close externally");
        harness
            .emit(EventPayload::RemoteIssueClosed {
                remote_number: child,
            })
            .await;
    }

    assert_eq!(harness.issue_state(number(1)).await, RemoteIssueState::Closed);
    assert!(harness
        .sub_tasks_of(&unit_of_work)
        .await
        .iter()
        .all(SubTask::is_closed));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn task_reopened_reopens_the_child_issue(harness: Harness) {
    let unit_of_work = harness.seed(DOCUMENT).await;
    harness.advance(&unit_of_work, Phase::Tasks).await;
    let sub_task_id = harness
        .sub_tasks_of(&unit_of_work)
        .await
        .first()
        .map(SubTask::id)
        .expect("sub-task");
    harness
        .emit(EventPayload::TaskCompleted { sub_task_id })
        .await;

    harness
        .emit(EventPayload::TaskReopened { sub_task_id })
        .await;

    assert_eq!(harness.issue_state(number(2)).await, RemoteIssueState::Open);
    let reopened = harness
        .sub_tasks
        .find_by_id(sub_task_id)
        .await
        .expect("lookup")
        .expect("sub-task");
    assert!(!reopened.is_closed());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn remote_reopen_moves_testing_back_to_implementation(harness: Harness) {
    let unit_of_work = harness.seed(DOCUMENT).await;
    harness.advance(&unit_of_work, Phase::Design).await;
    harness.advance(&unit_of_work, Phase::Testing).await;

    harness
        .emit(EventPayload::RemoteIssueReopened {
            remote_number: number(1),
        })
        .await;

    assert_eq!(harness.phase_of(&unit_of_work).await, Phase::Implementation);
    let last_change = harness
        .recorder
        .of_type(EventType::PhaseChanged)
        .last()
        .map(|event| event.payload().clone());
    assert_eq!(
        last_change,
        Some(EventPayload::PhaseChanged {
            unit_of_work_id: unit_of_work.id(),
            from: Phase::Testing,
            to: Phase::Implementation,
        })
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn remote_reopen_before_testing_is_ignored(harness: Harness) {
    let unit_of_work = harness.seed(DOCUMENT).await;
    harness.advance(&unit_of_work, Phase::Design).await;

    harness
        .emit(EventPayload::RemoteIssueReopened {
            remote_number: number(1),
        })
        .await;

    assert_eq!(harness.phase_of(&unit_of_work).await, Phase::Design);
    assert_eq!(harness.recorder.of_type(EventType::PhaseChanged).len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn events_for_untracked_issues_are_ignored(harness: Harness) {
    harness
        .emit(EventPayload::RemoteIssueClosed {
            remote_number: number(99),
        })
        .await;
    harness
        .emit(EventPayload::RemoteIssueReopened {
            remote_number: number(99),
        })
        .await;

    assert!(harness.machine.last_outcome().is_none());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_document_is_captured_in_the_outcome(harness: Harness) {
    let other = UnitOfWork::new(
        "Orphan",
        DocumentRef::new("specs/missing.md").expect("valid ref"),
        &DefaultClock,
    )
    .expect("valid unit of work");

    let outcome = harness.machine.enter_phase(&other, Phase::Design).await;

    assert!(matches!(
        action_result(&outcome, "ensure_parent_issue"),
        Err(message) if message.contains("specs/missing.md")
    ));
    assert!(action_result(&outcome, "sync_board_status").is_err());
    assert!(harness.tracker.issues().expect("issues").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn remote_body_edit_pulls_ticks_into_the_document(harness: Harness) {
    let unit_of_work = harness.seed(DOCUMENT).await;
    harness.advance(&unit_of_work, Phase::Design).await;
    harness
        .reconciler
        .reconcile(&unit_of_work)
        .await
        .expect("baseline recorded");
    let parent = number(1);
    let edited = harness
        .tracker
        .get_issue(parent)
        .await
        .expect("parent exists")
        .body
        .replacen("- [ ] Parse input", "- [x] Parse input", 1);
    harness
        .tracker
        .set_body_externally(parent, &edited)
        .expect("edited remotely");

    harness
        .emit(EventPayload::RemoteIssueEdited {
            remote_number: parent,
            body: Some(edited),
        })
        .await;

    assert!(harness.document(&unit_of_work).await.contains("- [x] Parse input"));
    assert_eq!(harness.recorder.of_type(EventType::ChecklistChanged).len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn title_only_edits_do_not_reconcile(harness: Harness) {
    let unit_of_work = harness.seed(DOCUMENT).await;
    harness.advance(&unit_of_work, Phase::Design).await;
    let reads_before = harness
        .tracker
        .calls(TrackerOperation::GetIssue)
        .expect("call count");

    harness
        .emit(EventPayload::RemoteIssueEdited {
            remote_number: number(1),
            body: None,
        })
        .await;

    assert_eq!(
        harness
            .tracker
            .calls(TrackerOperation::GetIssue)
            .expect("call count"),
        reads_before
    );
}
