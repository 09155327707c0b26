//! Unit tests for the checklist module.


use crate::checklist::ChecklistDiffEngine;
use rstest::fixture;

#[fixture]
pub(super) fn engine() -> ChecklistDiffEngine {
    ChecklistDiffEngine::new().expect("checklist patterns compile")
}
