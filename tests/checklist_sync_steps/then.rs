//! Then steps for checklist synchronisation BDD scenarios.

use super::world::{SyncWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::then;
use specsync::{
    checklist::ChecklistDiffEngine,
    tracker::{domain::RemoteNumber, ports::RemoteTracker},
    workflow::{
        domain::Phase,
        ports::{DocumentStore, UnitOfWorkRepository},
        services::ReconcileDirection,
    },
};

fn assert_item_state(body: &str, item: &str, state: &str) -> Result<(), eyre::Report> {
    let expected = match state {
        "checked" => true,
        "unchecked" => false,
        other => return Err(eyre::eyre!("unknown checkbox state `{other}`")),
    };
    let engine = ChecklistDiffEngine::new()?;
    let found = engine
        .parse(body)
        .into_iter()
        .find(|candidate| candidate.text() == item)
        .ok_or_else(|| eyre::eyre!("no checklist item `{item}`"))?;
    eyre::ensure!(
        found.checked() == expected,
        "expected `{item}` to be {state}"
    );
    Ok(())
}

#[then(r#"the document shows "{item}" as {state}"#)]
fn document_shows(world: &SyncWorld, item: String, state: String) -> Result<(), eyre::Report> {
    let document_ref = world.unit_of_work()?.document_ref();
    let document = run_async(world.documents.read(document_ref)).wrap_err("read document")?;
    assert_item_state(&document, &item, &state)
}

#[then(r#"the remote issue shows "{item}" as {state}"#)]
fn remote_issue_shows(world: &SyncWorld, item: String, state: String) -> Result<(), eyre::Report> {
    let issue = run_async(world.tracker.get_issue(RemoteNumber::new(1)?))
        .wrap_err("read parent issue")?;
    assert_item_state(&issue.body, &item, &state)
}

#[then(r#"the reconciliation direction is "{direction}""#)]
fn reconciliation_direction(world: &SyncWorld, direction: String) -> Result<(), eyre::Report> {
    let expected = match direction.as_str() {
        "in-sync" => ReconcileDirection::InSync,
        "local-to-remote" => ReconcileDirection::LocalToRemote,
        "remote-to-local" => ReconcileDirection::RemoteToLocal,
        other => return Err(eyre::eyre!("unknown direction `{other}`")),
    };
    let outcome = world
        .last_reconcile
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing reconciliation result"))?
        .as_ref()
        .map_err(|err| eyre::eyre!("reconciliation failed: {err}"))?;
    eyre::ensure!(
        outcome.direction == expected,
        "expected {expected:?}, got {:?}",
        outcome.direction
    );
    Ok(())
}

#[then("{count:u64} child issues are linked to parent issue #{parent:u64}")]
fn children_linked(world: &SyncWorld, count: u64, parent: u64) -> Result<(), eyre::Report> {
    let children = run_async(world.tracker.list_sub_issues(RemoteNumber::new(parent)?))
        .wrap_err("list sub-issues")?;
    eyre::ensure!(
        u64::try_from(children.len())? == count,
        "expected {count} child issues, found {}",
        children.len()
    );
    Ok(())
}

#[then(r#"issue #{number:u64} is "{state}""#)]
fn issue_state_is(world: &SyncWorld, number: u64, state: String) -> Result<(), eyre::Report> {
    let issue = run_async(world.tracker.get_issue(RemoteNumber::new(number)?))
        .wrap_err("read issue")?;
    eyre::ensure!(
        issue.state.as_str() == state,
        "expected issue #{number} to be {state}, found {}",
        issue.state.as_str()
    );
    Ok(())
}

#[then(r#"the unit of work is in the "{phase}" phase"#)]
fn unit_of_work_phase(world: &SyncWorld, phase: String) -> Result<(), eyre::Report> {
    let expected = Phase::try_from(phase.as_str())
        .map_err(|err| eyre::eyre!("invalid phase in scenario: {err}"))?;
    let id = world.unit_of_work()?.id();
    let stored = run_async(world.units.find_by_id(id))
        .wrap_err("load unit of work")?
        .ok_or_else(|| eyre::eyre!("unit of work missing from store"))?;
    eyre::ensure!(
        stored.phase() == expected,
        "expected phase {expected}, found {}",
        stored.phase()
    );
    Ok(())
}
