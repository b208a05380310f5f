use tracing::{info, warn};
use uuid::Uuid;

use crate::core::{FinancingStore, Result};
use crate::modules::reconciliation::models::{
    Discrepancy, DiscrepancyReport, FinancingSnapshot, UnreadableFinancing,
};

/// Read-only scan comparing each financing's ledger total with its projection
pub struct DiscrepancyDetector<'a> {
    store: &'a dyn FinancingStore,
}

impl<'a> DiscrepancyDetector<'a> {
    pub fn new(store: &'a dyn FinancingStore) -> Self {
        Self { store }
    }

    /// Scan every financing
    ///
    /// Failing to list financings is an error. A financing whose payments
    /// cannot be read is recorded as unreadable and the scan continues.
    pub async fn detect(&self, run_id: Uuid, label: &str) -> Result<DiscrepancyReport> {
        let financings = self.store.list_financings().await?;
        let mut report = DiscrepancyReport::new(run_id, label);
        report.financings_scanned = financings.len();

        for financing in financings {
            let financing_id = financing.id;

            let payments = match self.store.ledger_payments(financing_id).await {
                Ok(payments) => payments,
                Err(e) => {
                    warn!(
                        financing_id,
                        error = %e,
                        "Could not read ledger payments; financing excluded from this scan"
                    );
                    report.unreadable.push(UnreadableFinancing {
                        financing_id,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let snapshot = FinancingSnapshot::new(financing, payments);
            if let Some(discrepancy) = Discrepancy::measure(&snapshot) {
                report.discrepancies.push(discrepancy);
            }
        }

        let summary = report.summary();
        info!(
            label,
            scanned = report.financings_scanned,
            discrepancies = report.len(),
            surplus_count = summary.positive_count,
            surplus_total = %summary.positive_total,
            deficit_count = summary.negative_count,
            deficit_total = %summary.negative_total,
            unreadable = report.unreadable.len(),
            "Discrepancy scan finished"
        );

        Ok(report)
    }
}
