use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::modules::reconciliation::models::{RepairStage, StageReport};

/// Before/after discrepancy counts for one repair stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: RepairStage,
    /// Discrepancies going into the stage
    pub before: usize,
    /// Discrepancies measured right after it
    pub after: usize,
    /// Financings the pass reported as resolved
    pub resolved: usize,
    pub unresolved: usize,
    pub failed: usize,
}

impl StageRecord {
    pub fn new(before: usize, after: usize, report: &StageReport) -> Self {
        Self {
            stage: report.stage,
            before,
            after,
            resolved: report.resolved_count(),
            unresolved: report.unresolved_count(),
            failed: report.failed_count(),
        }
    }

    /// Net drop in the discrepancy count across the stage
    pub fn net_resolved(&self) -> usize {
        self.before.saturating_sub(self.after)
    }
}

/// Terminal output of a full pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub initial_discrepancies: usize,
    pub final_discrepancies: usize,
    pub stages: Vec<StageRecord>,
    /// Set when the run stopped before the last stage because nothing was left
    pub terminated_early: bool,
    /// Where the manual-review report went, when there is one
    pub manual_review: Option<String>,
}

impl PipelineSummary {
    pub fn new(run_id: Uuid, started_at: DateTime<Utc>, initial_discrepancies: usize) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: started_at,
            initial_discrepancies,
            final_discrepancies: initial_discrepancies,
            stages: Vec::new(),
            terminated_early: false,
            manual_review: None,
        }
    }

    pub fn total_resolved(&self) -> usize {
        self.initial_discrepancies
            .saturating_sub(self.final_discrepancies)
    }

    pub fn total_unresolved(&self) -> usize {
        self.final_discrepancies
    }

    pub fn stage(&self, stage: RepairStage) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// One financing that automated repair could not settle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualReviewEntry {
    pub financing_id: i64,
    pub sale_id: Option<i64>,
    /// `None` when the financing could not be read at all
    pub difference: Option<Decimal>,
    pub total_ledger: Option<Decimal>,
    pub total_projection: Option<Decimal>,
    /// Last reason recorded for the financing during the run
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManualReviewReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<ManualReviewEntry>,
}

impl ManualReviewReport {
    pub fn new(run_id: Uuid, entries: Vec<ManualReviewEntry>) -> Self {
        Self {
            run_id,
            generated_at: Utc::now(),
            entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, financing_id: i64) -> Option<&ManualReviewEntry> {
        self.entries.iter().find(|e| e.financing_id == financing_id)
    }
}
