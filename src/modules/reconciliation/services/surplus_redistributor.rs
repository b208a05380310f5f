use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, error, warn};

use super::allocator::{allocate, first_fit};
use super::repair_pass::RepairPass;
use crate::core::{format_amount, round2, TOLERANCE};
use crate::modules::financing::models::{AllocationIntent, Installment, IntentLine, Payment};
use crate::modules::reconciliation::models::{
    Discrepancy, FinancingOutcome, FinancingResolution, FinancingSnapshot, RepairStage,
};

/// Re-applies under-applied payments by resetting the projection and replaying the ledger
///
/// Each payment's recorded allocation intent is honoured when present; payments
/// without one are spread over the pending installments in cuota order.
pub struct SurplusRedistributor {
    as_of: NaiveDate,
}

impl SurplusRedistributor {
    /// `as_of` decides which reset cuotas come back as EXPIRED
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }

    fn replay_intent(
        &self,
        snapshot: &mut FinancingSnapshot,
        payment: &Payment,
        lines: &[IntentLine],
        resolution: &mut FinancingResolution,
    ) {
        for line in lines {
            let target = snapshot
                .find_by_number(line.installment_number)
                .map(|i| i.id);

            match target {
                Some(installment_id) => {
                    snapshot.apply(installment_id, line.applied_amount);
                    resolution.record(format!(
                        "payment #{}: {} to cuota {} (recorded allocation)",
                        payment.id,
                        format_amount(line.applied_amount),
                        line.installment_number
                    ));
                }
                None => {
                    warn!(
                        financing_id = snapshot.financing_id(),
                        payment_id = payment.id,
                        cuota = line.installment_number,
                        "Allocation names a cuota that does not exist; line skipped"
                    );
                    resolution.record(format!(
                        "payment #{}: cuota {} not found, {} skipped",
                        payment.id,
                        line.installment_number,
                        format_amount(line.applied_amount)
                    ));
                }
            }
        }
    }

    fn replay_sequential(
        &self,
        snapshot: &mut FinancingSnapshot,
        payment: &Payment,
        resolution: &mut FinancingResolution,
    ) {
        let capacities: Vec<(i64, Decimal)> = snapshot
            .installments()
            .iter()
            .filter(|i| i.pending > Decimal::ZERO)
            .map(|i| (i.id, i.pending))
            .collect();

        let allocation = allocate(payment.amount, &capacities);

        for (installment_id, amount) in &allocation.applied {
            if let Some(installment) = snapshot.apply(*installment_id, *amount) {
                resolution.record(format!(
                    "payment #{}: {} to {} (sequential)",
                    payment.id,
                    format_amount(*amount),
                    installment.label()
                ));
            }
        }

        if allocation.remainder > Decimal::ZERO {
            resolution.record(format!(
                "payment #{}: {} found no pending cuota",
                payment.id,
                format_amount(allocation.remainder)
            ));
        }
    }

    /// Push whatever the replay left over onto the most recent paid cuota
    fn adjust_residual(
        &self,
        snapshot: &mut FinancingSnapshot,
        residual: Decimal,
        resolution: &mut FinancingResolution,
    ) {
        let installments = snapshot.installments();
        let target = installments
            .iter()
            .filter(|i| i.paid > Decimal::ZERO)
            .last()
            .or_else(|| installments.first())
            .map(|i| (i.id, i.number, i.label(), i.paid, i.amount));

        let Some((target_id, target_number, label, paid, amount)) = target else {
            resolution.record(format!(
                "residual {}: financing has no installments",
                format_amount(residual)
            ));
            return;
        };

        let new_paid = round2(paid + residual);

        if new_paid < Decimal::ZERO {
            self.remove_negative_residual(snapshot, residual, resolution);
            return;
        }

        if new_paid <= amount {
            snapshot.set_paid(target_id, new_paid);
            resolution.record(format!(
                "residual {}: {} paid {} -> {}",
                format_amount(residual),
                label,
                format_amount(paid),
                format_amount(new_paid)
            ));
            return;
        }

        let excess = round2(new_paid - amount);
        snapshot.set_paid(target_id, amount);
        resolution.record(format!(
            "residual {}: {} capped at {}, excess {}",
            format_amount(residual),
            label,
            format_amount(amount),
            format_amount(excess)
        ));

        let next = snapshot
            .installments()
            .iter()
            .find(|i| i.number > target_number && i.pending > Decimal::ZERO)
            .map(|i| (i.id, i.label()));

        match next {
            Some((next_id, next_label)) => {
                snapshot.apply(next_id, excess);
                resolution.record(format!(
                    "excess {} spilled onto {}",
                    format_amount(excess),
                    next_label
                ));
            }
            None => {
                debug!(
                    financing_id = snapshot.financing_id(),
                    excess = %excess,
                    "No later pending cuota for the excess"
                );
                resolution.record(format!(
                    "excess {} has no later pending cuota",
                    format_amount(excess)
                ));
            }
        }
    }

    fn remove_negative_residual(
        &self,
        snapshot: &mut FinancingSnapshot,
        residual: Decimal,
        resolution: &mut FinancingResolution,
    ) {
        let candidates: Vec<&Installment> = snapshot.paid_most_recent_first();
        let target = first_fit(&candidates, |i| i.paid + residual >= Decimal::ZERO)
            .map(|i| (i.id, i.label(), i.paid));

        match target {
            Some((installment_id, label, paid)) => {
                snapshot.set_paid(installment_id, paid + residual);
                resolution.record(format!(
                    "residual {}: {} paid {} -> {}",
                    format_amount(residual),
                    label,
                    format_amount(paid),
                    format_amount(paid + residual)
                ));
            }
            None => {
                error!(
                    financing_id = snapshot.financing_id(),
                    residual = %residual,
                    "Residual cannot be removed without a negative paid amount"
                );
                resolution.record(format!(
                    "residual {} would force a negative paid amount; left in place",
                    format_amount(residual)
                ));
            }
        }
    }
}

impl RepairPass for SurplusRedistributor {
    fn stage(&self) -> RepairStage {
        RepairStage::SurplusRedistribute
    }

    fn accepts(&self, discrepancy: &Discrepancy) -> bool {
        discrepancy.is_surplus()
    }

    fn repair(
        &self,
        snapshot: &mut FinancingSnapshot,
        resolution: &mut FinancingResolution,
    ) -> FinancingOutcome {
        let reset = snapshot.reset_all(self.as_of);
        resolution.record(format!("reset {} installments", reset));

        let payments = snapshot.payments().to_vec();
        for payment in &payments {
            match payment.allocation_intent() {
                AllocationIntent::Lines(lines) => {
                    self.replay_intent(snapshot, payment, &lines, resolution)
                }
                AllocationIntent::Absent => self.replay_sequential(snapshot, payment, resolution),
                AllocationIntent::Malformed(reason) => {
                    warn!(
                        financing_id = snapshot.financing_id(),
                        payment_id = payment.id,
                        reason = reason.as_str(),
                        "Malformed allocation metadata; payment quarantined and replayed in order"
                    );
                    resolution.quarantined_payments.push(payment.id);
                    resolution.record(format!(
                        "payment #{}: metadata quarantined ({})",
                        payment.id, reason
                    ));
                    self.replay_sequential(snapshot, payment, resolution);
                }
            }
        }

        let residual = snapshot.difference();
        if residual.abs() > TOLERANCE {
            self.adjust_residual(snapshot, residual, resolution);
        }

        if snapshot.is_reconciled() {
            return FinancingOutcome::Resolved;
        }

        let remaining = snapshot.difference();
        resolution.unapplied = remaining.max(Decimal::ZERO);
        FinancingOutcome::Unresolved {
            reason: "pending: exceeds available cuotas".to_string(),
            remaining_difference: remaining,
        }
    }
}
