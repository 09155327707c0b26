//! When steps for checklist synchronisation BDD scenarios.

use super::world::{SyncWorld, run_async};
use eyre::WrapErr;
use mockable::DefaultClock;
use rstest_bdd_macros::when;
use specsync::{
    events::{EventPayload, WorkflowEvent},
    tracker::{
        domain::{RemoteIssueState, RemoteNumber},
        ports::RemoteTracker,
    },
    workflow::ports::DocumentStore,
};

fn tick(body: &str, item: &str) -> Result<String, eyre::Report> {
    let unchecked = format!("- [ ] {item}");
    eyre::ensure!(body.contains(&unchecked), "no unchecked item `{item}`");
    Ok(body.replacen(&unchecked, &format!("- [x] {item}"), 1))
}

fn publish(world: &SyncWorld, payload: EventPayload) -> Result<(), eyre::Report> {
    let event = WorkflowEvent::new("webhook", payload, &DefaultClock);
    let report = run_async(world.bus.publish(event)).wrap_err("publish remote event")?;
    eyre::ensure!(report.is_clean(), "handler failures: {:?}", report.failures);
    Ok(())
}

#[when(r#""{item}" is ticked on the remote issue"#)]
fn ticked_remotely(world: &mut SyncWorld, item: String) -> Result<(), eyre::Report> {
    let parent = RemoteNumber::new(1)?;
    let issue = run_async(world.tracker.get_issue(parent)).wrap_err("read parent issue")?;
    world
        .tracker
        .set_body_externally(parent, &tick(&issue.body, &item)?)?;
    Ok(())
}

#[when(r#""{item}" is ticked in the document"#)]
fn ticked_locally(world: &mut SyncWorld, item: String) -> Result<(), eyre::Report> {
    let document_ref = world.unit_of_work()?.document_ref().clone();
    let document = run_async(world.documents.read(&document_ref)).wrap_err("read document")?;
    run_async(world.documents.write(&document_ref, &tick(&document, &item)?))
        .wrap_err("write document")?;
    Ok(())
}

#[when("the checklist is reconciled")]
fn checklist_reconciled(world: &mut SyncWorld) -> Result<(), eyre::Report> {
    let unit_of_work = world.unit_of_work()?.clone();
    world.last_reconcile = Some(run_async(world.reconciler.reconcile(&unit_of_work)));
    Ok(())
}

#[when(r#"the unit of work moves to "{phase}""#)]
fn unit_of_work_moves(world: &mut SyncWorld, phase: String) -> Result<(), eyre::Report> {
    world.move_to(&phase)
}

#[when("issue #{number:u64} is closed remotely")]
fn closed_remotely(world: &mut SyncWorld, number: u64) -> Result<(), eyre::Report> {
    let remote_number = RemoteNumber::new(number)?;
    world
        .tracker
        .set_state_externally(remote_number, RemoteIssueState::Closed)?;
    publish(world, EventPayload::RemoteIssueClosed { remote_number })
}

#[when("issue #{number:u64} is reopened remotely")]
fn reopened_remotely(world: &mut SyncWorld, number: u64) -> Result<(), eyre::Report> {
    let remote_number = RemoteNumber::new(number)?;
    world
        .tracker
        .set_state_externally(remote_number, RemoteIssueState::Open)?;
    publish(world, EventPayload::RemoteIssueReopened { remote_number })
}
