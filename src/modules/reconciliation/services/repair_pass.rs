use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::{format_amount, FinancingStore};
use crate::modules::reconciliation::models::{
    Discrepancy, FinancingOutcome, FinancingResolution, FinancingSnapshot, RepairStage,
    StageReport,
};

/// One repair strategy over a loaded financing
///
/// `repair` works purely on the snapshot; loading and the atomic write-back
/// are handled by [`run_repair_pass`].
pub trait RepairPass: Send + Sync {
    fn stage(&self) -> RepairStage;

    /// Whether this pass handles the discrepancy at all
    fn accepts(&self, discrepancy: &Discrepancy) -> bool;

    fn repair(
        &self,
        snapshot: &mut FinancingSnapshot,
        resolution: &mut FinancingResolution,
    ) -> FinancingOutcome;
}

/// Run a pass over every discrepancy it accepts, one financing at a time
///
/// A financing's changes are written in a single store call. Any error while
/// loading or writing marks that financing as failed; the batch always continues.
pub async fn run_repair_pass(
    pass: &dyn RepairPass,
    store: &dyn FinancingStore,
    discrepancies: &[Discrepancy],
    run_id: Uuid,
) -> StageReport {
    let stage = pass.stage();
    let mut report = StageReport::new(run_id, stage, discrepancies.len());

    info!(
        stage = stage.as_str(),
        candidates = discrepancies.len(),
        "Starting repair pass"
    );

    for discrepancy in discrepancies {
        let mut resolution = FinancingResolution::new(discrepancy);

        if !pass.accepts(discrepancy) {
            resolution.outcome = FinancingOutcome::Skipped {
                reason: format!(
                    "difference {} outside {} scope",
                    format_amount(discrepancy.difference),
                    stage
                ),
            };
            report.resolutions.push(resolution);
            continue;
        }

        let outcome = repair_one(pass, store, discrepancy, &mut resolution).await;
        resolution.outcome = outcome;

        match &resolution.outcome {
            FinancingOutcome::Resolved => info!(
                stage = stage.as_str(),
                financing_id = discrepancy.financing_id,
                writes = resolution.installments_written,
                "Financing reconciled"
            ),
            FinancingOutcome::Failed { error } => error!(
                stage = stage.as_str(),
                financing_id = discrepancy.financing_id,
                error = error.as_str(),
                "Repair failed; will be retried on the next run"
            ),
            FinancingOutcome::Unresolved {
                reason,
                remaining_difference,
            } => warn!(
                stage = stage.as_str(),
                financing_id = discrepancy.financing_id,
                remaining = %remaining_difference,
                reason = reason.as_str(),
                "Financing still out of balance"
            ),
            other => info!(
                stage = stage.as_str(),
                financing_id = discrepancy.financing_id,
                outcome = other.label(),
                "Financing left as is"
            ),
        }

        report.resolutions.push(resolution);
    }

    report.finished_at = Utc::now();

    info!(
        stage = stage.as_str(),
        processed = report.processed_count(),
        resolved = report.resolved_count(),
        unresolved = report.unresolved_count(),
        failed = report.failed_count(),
        "Repair pass finished"
    );

    report
}

async fn repair_one(
    pass: &dyn RepairPass,
    store: &dyn FinancingStore,
    discrepancy: &Discrepancy,
    resolution: &mut FinancingResolution,
) -> FinancingOutcome {
    let mut snapshot = match FinancingSnapshot::load(store, discrepancy.financing_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            return FinancingOutcome::Failed {
                error: e.to_string(),
            }
        }
    };

    let outcome = pass.repair(&mut snapshot, resolution);

    for installment in snapshot.overpaid_installments() {
        resolution.overpaid_cuotas.push(format!(
            "{} over-paid by {}",
            installment.label(),
            format_amount(-installment.pending)
        ));
    }

    match snapshot.commit(store).await {
        Ok(written) => {
            resolution.installments_written = written;
            resolution.difference_after = Some(snapshot.difference());
            outcome
        }
        Err(e) => {
            // Nothing from this financing was persisted
            if e.is_storage_failure() {
                resolution.record("write rolled back");
            } else {
                resolution.record("write refused by the store");
            }
            FinancingOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}
