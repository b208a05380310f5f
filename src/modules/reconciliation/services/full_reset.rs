use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::warn;

use super::allocator::allocate;
use super::repair_pass::RepairPass;
use crate::core::format_amount;
use crate::modules::reconciliation::models::{
    Discrepancy, FinancingOutcome, FinancingResolution, FinancingSnapshot, RepairStage,
};

/// Last-resort pass: rebuild the projection from the ledger total alone
///
/// Recorded allocations are ignored. The ledger total is poured into every
/// installment in ascending cuota order, each up to its full amount.
pub struct FullResetReconciler {
    as_of: NaiveDate,
}

impl FullResetReconciler {
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }
}

impl RepairPass for FullResetReconciler {
    fn stage(&self) -> RepairStage {
        RepairStage::FullResetReconcile
    }

    fn accepts(&self, _discrepancy: &Discrepancy) -> bool {
        true
    }

    fn repair(
        &self,
        snapshot: &mut FinancingSnapshot,
        resolution: &mut FinancingResolution,
    ) -> FinancingOutcome {
        let total_ledger = snapshot.ledger_total();

        let reset = snapshot.reset_all(self.as_of);
        resolution.record(format!("reset {} installments", reset));

        let capacities: Vec<(i64, Decimal)> = snapshot
            .installments()
            .iter()
            .map(|i| (i.id, i.amount))
            .collect();
        let allocation = allocate(total_ledger, &capacities);

        for (installment_id, amount) in &allocation.applied {
            if let Some(installment) = snapshot.apply(*installment_id, *amount) {
                resolution.record(format!(
                    "{}: {} ({})",
                    installment.label(),
                    format_amount(*amount),
                    installment.status
                ));
            }
        }

        if allocation.remainder > Decimal::ZERO {
            warn!(
                financing_id = snapshot.financing_id(),
                ledger = %total_ledger,
                unapplied = %allocation.remainder,
                "Ledger exceeds the sum of all cuotas; flagged for manual review"
            );
            resolution.unapplied = allocation.remainder;
            resolution.record(format!(
                "{} left unapplied after filling every cuota",
                format_amount(allocation.remainder)
            ));
            return FinancingOutcome::Unresolved {
                reason: "manual review: amount exceeds all cuotas".to_string(),
                remaining_difference: snapshot.difference(),
            };
        }

        if snapshot.is_reconciled() {
            FinancingOutcome::Resolved
        } else {
            FinancingOutcome::Unresolved {
                reason: "projection still differs after full reset".to_string(),
                remaining_difference: snapshot.difference(),
            }
        }
    }
}
