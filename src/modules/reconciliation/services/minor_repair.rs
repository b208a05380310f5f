use rust_decimal::Decimal;
use tracing::{debug, error};

use super::allocator::first_fit;
use super::repair_pass::RepairPass;
use crate::core::{format_amount, round2, sum_rounded, TOLERANCE};
use crate::modules::reconciliation::models::{
    Discrepancy, FinancingOutcome, FinancingResolution, FinancingSnapshot, RepairStage,
};

/// Discrepancies strictly below this magnitude are nudged rather than replayed
pub const DEFAULT_MINOR_THRESHOLD: Decimal = Decimal::from_parts(30, 0, 0, false, 0);

/// Repairs rounding-sized drift by moving a single cuota's paid amount
///
/// Late-fee fields and every other cuota are left alone. The pass never
/// drives a paid amount below zero.
pub struct MinorDifferenceRepairer {
    threshold: Decimal,
}

impl MinorDifferenceRepairer {
    pub fn new(threshold: Decimal) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Decimal {
        self.threshold
    }
}

impl Default for MinorDifferenceRepairer {
    fn default() -> Self {
        Self::new(DEFAULT_MINOR_THRESHOLD)
    }
}

impl RepairPass for MinorDifferenceRepairer {
    fn stage(&self) -> RepairStage {
        RepairStage::MinorDifferenceRepair
    }

    fn accepts(&self, discrepancy: &Discrepancy) -> bool {
        discrepancy.difference.abs() < self.threshold
    }

    fn repair(
        &self,
        snapshot: &mut FinancingSnapshot,
        resolution: &mut FinancingResolution,
    ) -> FinancingOutcome {
        let total_ledger = snapshot.ledger_total();
        let candidates = snapshot.paid_most_recent_first();

        if candidates.is_empty() {
            resolution.record("nothing to adjust: no cuota has a paid amount");
            return FinancingOutcome::Unchanged {
                reason: "nothing to adjust".to_string(),
            };
        }

        let current_sum = sum_rounded(candidates.iter().map(|i| i.paid));
        let adjustment = round2(total_ledger - current_sum);

        if adjustment.abs() < TOLERANCE {
            resolution.record(format!(
                "adjustment {} is below tolerance",
                format_amount(adjustment)
            ));
            return FinancingOutcome::Unchanged {
                reason: "no adjustment needed".to_string(),
            };
        }

        let most_recent_id = candidates[0].id;
        let target = first_fit(&candidates, |i| i.paid + adjustment >= Decimal::ZERO)
            .map(|i| (i.id, i.label(), i.paid));

        let Some((target_id, label, paid_before)) = target else {
            error!(
                financing_id = snapshot.financing_id(),
                adjustment = %adjustment,
                "No paid cuota can absorb the adjustment without going negative"
            );
            resolution.record(format!(
                "adjustment {} would leave every paid cuota negative; projection untouched",
                format_amount(adjustment)
            ));
            return FinancingOutcome::Unresolved {
                reason: "adjustment would force a negative paid amount".to_string(),
                remaining_difference: snapshot.difference(),
            };
        };

        if target_id != most_recent_id {
            debug!(
                financing_id = snapshot.financing_id(),
                target = label.as_str(),
                "Most recent paid cuota cannot absorb the adjustment; using an earlier one"
            );
        }

        let paid_after = snapshot
            .set_paid(target_id, paid_before + adjustment)
            .map(|i| i.paid)
            .unwrap_or(paid_before);

        resolution.record(format!(
            "{}: paid {} -> {} (adjustment {})",
            label,
            format_amount(paid_before),
            format_amount(paid_after),
            format_amount(adjustment)
        ));

        if snapshot.is_reconciled() {
            FinancingOutcome::Resolved
        } else {
            FinancingOutcome::Unresolved {
                reason: "projection still differs after single-cuota adjustment".to_string(),
                remaining_difference: snapshot.difference(),
            }
        }
    }
}
