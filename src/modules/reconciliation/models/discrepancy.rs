use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::snapshot::FinancingSnapshot;
use crate::core::{round2, sum_rounded, within_tolerance};

/// Ledger vs. projection mismatch for one financing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub financing_id: i64,
    pub sale_id: Option<i64>,
    pub total_ledger: Decimal,
    pub total_projection: Decimal,
    /// `total_ledger - total_projection`; positive means payments are under-applied
    pub difference: Decimal,
}

impl Discrepancy {
    /// Compare two totals; `None` when they agree within tolerance
    pub fn from_totals(
        financing_id: i64,
        sale_id: Option<i64>,
        total_ledger: Decimal,
        total_projection: Decimal,
    ) -> Option<Self> {
        let total_ledger = round2(total_ledger);
        let total_projection = round2(total_projection);

        if within_tolerance(total_ledger, total_projection) {
            return None;
        }

        Some(Self {
            financing_id,
            sale_id,
            total_ledger,
            total_projection,
            difference: round2(total_ledger - total_projection),
        })
    }

    /// Measure a loaded financing
    pub fn measure(snapshot: &FinancingSnapshot) -> Option<Self> {
        Self::from_totals(
            snapshot.financing_id(),
            snapshot.sale_id(),
            snapshot.ledger_total(),
            snapshot.projection_total(),
        )
    }

    /// Ledger exceeds projection
    pub fn is_surplus(&self) -> bool {
        self.difference > Decimal::ZERO
    }
}

/// A financing the detector could not read
#[derive(Debug, Clone, Serialize)]
pub struct UnreadableFinancing {
    pub financing_id: i64,
    pub error: String,
}

/// Counts and magnitudes split by sign
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscrepancySummary {
    pub positive_count: usize,
    pub positive_total: Decimal,
    pub negative_count: usize,
    pub negative_total: Decimal,
}

/// Output of one detector run
#[derive(Debug, Clone, Serialize)]
pub struct DiscrepancyReport {
    pub run_id: Uuid,
    /// Where in the run this measurement was taken ("initial", "after-minor-repair", ...)
    pub label: String,
    pub generated_at: DateTime<Utc>,
    pub financings_scanned: usize,
    pub discrepancies: Vec<Discrepancy>,
    pub unreadable: Vec<UnreadableFinancing>,
}

impl DiscrepancyReport {
    pub fn new(run_id: Uuid, label: impl Into<String>) -> Self {
        Self {
            run_id,
            label: label.into(),
            generated_at: Utc::now(),
            financings_scanned: 0,
            discrepancies: Vec::new(),
            unreadable: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.discrepancies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discrepancies.is_empty()
    }

    pub fn find(&self, financing_id: i64) -> Option<&Discrepancy> {
        self.discrepancies
            .iter()
            .find(|d| d.financing_id == financing_id)
    }

    pub fn summary(&self) -> DiscrepancySummary {
        let (positive, negative): (Vec<_>, Vec<_>) =
            self.discrepancies.iter().partition(|d| d.is_surplus());

        DiscrepancySummary {
            positive_count: positive.len(),
            positive_total: sum_rounded(positive.iter().map(|d| d.difference)),
            negative_count: negative.len(),
            negative_total: sum_rounded(negative.iter().map(|d| d.difference)),
        }
    }

    /// Surplus group first, then deficits; largest magnitude first within a group
    pub fn grouped(&self) -> Vec<&Discrepancy> {
        let mut ordered: Vec<&Discrepancy> = self.discrepancies.iter().collect();
        ordered.sort_by(|a, b| {
            b.is_surplus()
                .cmp(&a.is_surplus())
                .then_with(|| b.difference.abs().cmp(&a.difference.abs()))
                .then_with(|| a.financing_id.cmp(&b.financing_id))
        });
        ordered
    }
}
