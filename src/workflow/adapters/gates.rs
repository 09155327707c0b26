//! Built-in quality gates.

use async_trait::async_trait;
use std::sync::Arc;

use crate::checklist::{ChecklistDiffEngine, ChecklistSnapshot};
use crate::workflow::{
    domain::{GateReport, Phase, UnitOfWork},
    ports::{DocumentStore, QualityGate},
};

/// Fails while the unit of work's document still has unchecked items.
///
/// Runs for [`Phase::Testing`] and [`Phase::Completed`].
pub struct ChecklistCompleteGate<D>
where
    D: DocumentStore,
{
    documents: Arc<D>,
    engine: Arc<ChecklistDiffEngine>,
}

impl<D> ChecklistCompleteGate<D>
where
    D: DocumentStore,
{
    /// Gate name used in reports.
    pub const NAME: &'static str = "checklist-complete";

    /// Creates the gate.
    #[must_use]
    pub const fn new(documents: Arc<D>, engine: Arc<ChecklistDiffEngine>) -> Self {
        Self { documents, engine }
    }
}

#[async_trait]
impl<D> QualityGate for ChecklistCompleteGate<D>
where
    D: DocumentStore,
{
    fn name(&self) -> &str {
        Self::NAME
    }

    fn applies_to(&self, phase: Phase) -> bool {
        matches!(phase, Phase::Testing | Phase::Completed)
    }

    async fn check(&self, unit_of_work: &UnitOfWork, phase: Phase) -> GateReport {
        let document = match self.documents.read(unit_of_work.document_ref()).await {
            Ok(document) => document,
            Err(err) => return GateReport::failed(Self::NAME, phase, vec![err.to_string()]),
        };
        let snapshot = ChecklistSnapshot::from_document(&self.engine, &document);
        let pending: Vec<String> = snapshot
            .pending()
            .map(|item| format!("{}: {}", item.section(), item.text()))
            .collect();
        if pending.is_empty() {
            GateReport::passed(Self::NAME, phase)
        } else {
            GateReport::failed(Self::NAME, phase, pending)
        }
    }
}
