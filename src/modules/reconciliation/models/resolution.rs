use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::discrepancy::Discrepancy;

/// Repair passes, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStage {
    MinorDifferenceRepair,
    SurplusRedistribute,
    FullResetReconcile,
}

impl RepairStage {
    /// Fixed execution order used by `run-all`
    pub const ORDER: [RepairStage; 3] = [
        RepairStage::MinorDifferenceRepair,
        RepairStage::SurplusRedistribute,
        RepairStage::FullResetReconcile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MinorDifferenceRepair => "minor-difference-repair",
            Self::SurplusRedistribute => "surplus-redistribute",
            Self::FullResetReconcile => "full-reset-reconcile",
        }
    }
}

impl std::fmt::Display for RepairStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a repair pass did for one financing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FinancingOutcome {
    /// Projection now matches the ledger
    Resolved,
    /// The pass found nothing to change
    Unchanged { reason: String },
    /// The pass does not apply to this financing
    Skipped { reason: String },
    /// Changes (if any) were committed but the discrepancy remains
    Unresolved {
        reason: String,
        remaining_difference: Decimal,
    },
    /// The repair was rolled back; retry on a later run
    Failed { error: String },
}

impl FinancingOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::Unchanged { .. } => "unchanged",
            Self::Skipped { .. } => "skipped",
            Self::Unresolved { .. } => "unresolved",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Resolved => None,
            Self::Unchanged { reason }
            | Self::Skipped { reason }
            | Self::Unresolved { reason, .. } => Some(reason),
            Self::Failed { error } => Some(error),
        }
    }
}

/// Resolution log entry for one processed financing
#[derive(Debug, Clone, Serialize)]
pub struct FinancingResolution {
    pub financing_id: i64,
    pub sale_id: Option<i64>,
    pub difference_before: Decimal,
    pub difference_after: Option<Decimal>,
    pub outcome: FinancingOutcome,
    /// Human-readable steps: resets, applications, adjustments
    pub actions: Vec<String>,
    /// Payments whose allocation metadata was malformed and replayed sequentially
    pub quarantined_payments: Vec<i64>,
    /// Cuotas left with a negative pending balance
    pub overpaid_cuotas: Vec<String>,
    /// Ledger money no cuota could absorb
    pub unapplied: Decimal,
    pub installments_written: usize,
}

impl FinancingResolution {
    pub fn new(discrepancy: &Discrepancy) -> Self {
        Self {
            financing_id: discrepancy.financing_id,
            sale_id: discrepancy.sale_id,
            difference_before: discrepancy.difference,
            difference_after: None,
            outcome: FinancingOutcome::Skipped {
                reason: "not processed".to_string(),
            },
            actions: Vec::new(),
            quarantined_payments: Vec::new(),
            overpaid_cuotas: Vec::new(),
            unapplied: Decimal::ZERO,
            installments_written: 0,
        }
    }

    pub fn record(&mut self, action: impl Into<String>) {
        self.actions.push(action.into());
    }
}

/// Resolution log of one repair pass
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub run_id: Uuid,
    pub stage: RepairStage,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Discrepancies the pass was handed
    pub candidates: usize,
    pub resolutions: Vec<FinancingResolution>,
}

impl StageReport {
    pub fn new(run_id: Uuid, stage: RepairStage, candidates: usize) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            stage,
            started_at: now,
            finished_at: now,
            candidates,
            resolutions: Vec::new(),
        }
    }

    fn count(&self, label: &str) -> usize {
        self.resolutions
            .iter()
            .filter(|r| r.outcome.label() == label)
            .count()
    }

    pub fn resolved_count(&self) -> usize {
        self.count("resolved")
    }

    pub fn unresolved_count(&self) -> usize {
        self.count("unresolved")
    }

    pub fn unchanged_count(&self) -> usize {
        self.count("unchanged")
    }

    pub fn failed_count(&self) -> usize {
        self.count("failed")
    }

    /// Processed financings (everything the pass accepted)
    pub fn processed_count(&self) -> usize {
        self.resolutions
            .iter()
            .filter(|r| !matches!(r.outcome, FinancingOutcome::Skipped { .. }))
            .count()
    }

    pub fn resolution(&self, financing_id: i64) -> Option<&FinancingResolution> {
        self.resolutions
            .iter()
            .find(|r| r.financing_id == financing_id)
    }
}
