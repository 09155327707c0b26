//! Given steps for checklist synchronisation BDD scenarios.

use super::world::{DOCUMENT, SyncWorld, run_async};
use eyre::WrapErr;
use mockable::DefaultClock;
use rstest_bdd_macros::given;
use specsync::workflow::{
    domain::{DocumentRef, UnitOfWork},
    ports::{DocumentStore, UnitOfWorkRepository},
    services::ReconcileDirection,
};

#[given(r#"a unit of work "{name}" tracked by a parent issue"#)]
fn unit_of_work_with_parent(world: &mut SyncWorld, name: String) -> Result<(), eyre::Report> {
    let document_ref = DocumentRef::new("specs/checkout.md")?;
    run_async(world.documents.write(&document_ref, DOCUMENT)).wrap_err("write document")?;
    let unit_of_work = UnitOfWork::new(name, document_ref, &DefaultClock)?;
    run_async(world.units.store(&unit_of_work)).wrap_err("store unit of work")?;
    run_async(world.issues.create_parent(&unit_of_work, DOCUMENT))
        .wrap_err("create parent issue")?;
    world.unit_of_work = Some(unit_of_work);
    Ok(())
}

#[given("the checklist baseline has been recorded")]
fn baseline_recorded(world: &mut SyncWorld) -> Result<(), eyre::Report> {
    let unit_of_work = world.unit_of_work()?;
    let outcome = run_async(world.reconciler.reconcile(unit_of_work))
        .wrap_err("record checklist baseline")?;
    eyre::ensure!(
        outcome.direction == ReconcileDirection::InSync,
        "expected both sides to agree, got {:?}",
        outcome.direction
    );
    Ok(())
}

#[given(r#"the unit of work has moved to "{phase}""#)]
fn unit_of_work_has_moved(world: &mut SyncWorld, phase: String) -> Result<(), eyre::Report> {
    world.move_to(&phase)
}
