use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use super::detector::DiscrepancyDetector;
use super::full_reset::FullResetReconciler;
use super::minor_repair::{MinorDifferenceRepairer, DEFAULT_MINOR_THRESHOLD};
use super::repair_pass::{run_repair_pass, RepairPass};
use super::surplus_redistributor::SurplusRedistributor;
use crate::core::{FinancingStore, Result};
use crate::modules::reconciliation::models::{
    DiscrepancyReport, FinancingOutcome, RepairStage, StageReport,
};
use crate::modules::reports::models::{
    ManualReviewEntry, ManualReviewReport, PipelineSummary, StageRecord,
};
use crate::modules::reports::services::{
    render_discrepancy_report, render_manual_review, render_stage_report, render_summary,
    RenderedReport, ReportSink, MANUAL_REVIEW_REPORT,
};

/// Knobs shared by every pass of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub minor_threshold: Decimal,
    /// Reference date for EXPIRED status on reset cuotas
    pub as_of: NaiveDate,
}

impl PipelineSettings {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            minor_threshold: DEFAULT_MINOR_THRESHOLD,
            as_of,
        }
    }

    pub fn with_minor_threshold(mut self, threshold: Decimal) -> Self {
        self.minor_threshold = threshold;
        self
    }
}

/// Detect, repair, detect again for a single stage
#[derive(Debug, Clone)]
pub struct StageRun {
    pub before: DiscrepancyReport,
    pub report: StageReport,
    pub after: DiscrepancyReport,
}

impl StageRun {
    pub fn record(&self) -> StageRecord {
        StageRecord::new(self.before.len(), self.after.len(), &self.report)
    }
}

/// Everything a full run produced
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub summary: PipelineSummary,
    pub manual_review: ManualReviewReport,
}

/// Runs the repair passes in a fixed order, measuring between each
pub struct ReconciliationPipeline<'a> {
    store: &'a dyn FinancingStore,
    sink: &'a dyn ReportSink,
    settings: PipelineSettings,
    run_id: Uuid,
}

impl<'a> ReconciliationPipeline<'a> {
    pub fn new(
        store: &'a dyn FinancingStore,
        sink: &'a dyn ReportSink,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            sink,
            settings,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    fn pass_for(&self, stage: RepairStage) -> Box<dyn RepairPass> {
        match stage {
            RepairStage::MinorDifferenceRepair => {
                Box::new(MinorDifferenceRepairer::new(self.settings.minor_threshold))
            }
            RepairStage::SurplusRedistribute => {
                Box::new(SurplusRedistributor::new(self.settings.as_of))
            }
            RepairStage::FullResetReconcile => {
                Box::new(FullResetReconciler::new(self.settings.as_of))
            }
        }
    }

    /// Measure and publish the current discrepancies
    pub async fn detect(&self, label: &str) -> Result<DiscrepancyReport> {
        let report = DiscrepancyDetector::new(self.store)
            .detect(self.run_id, label)
            .await?;
        self.publish(render_discrepancy_report(&report)).await;
        Ok(report)
    }

    /// Run one stage on its own: Detect, repair, Detect
    pub async fn run_stage(&self, stage: RepairStage) -> Result<StageRun> {
        let before = self.detect(&format!("before-{}", stage)).await?;
        let report = self.repair(stage, &before).await;
        let after = self.detect(&format!("after-{}", stage)).await?;

        Ok(StageRun {
            before,
            report,
            after,
        })
    }

    async fn repair(&self, stage: RepairStage, current: &DiscrepancyReport) -> StageReport {
        let pass = self.pass_for(stage);
        let report =
            run_repair_pass(pass.as_ref(), self.store, &current.discrepancies, self.run_id).await;
        self.publish(render_stage_report(&report)).await;
        report
    }

    /// Run every stage in order, stopping as soon as nothing is left to repair
    ///
    /// Individual financing failures never abort the run; only a failure to
    /// list financings at a Detect step does.
    pub async fn run_all(&self) -> Result<PipelineRun> {
        let started_at = Utc::now();
        info!(run_id = %self.run_id, as_of = %self.settings.as_of, "Starting reconciliation run");

        let mut current = self.detect("initial").await?;
        let mut summary = PipelineSummary::new(self.run_id, started_at, current.len());
        let mut last_reason: HashMap<i64, String> = HashMap::new();

        for stage in RepairStage::ORDER {
            if current.is_empty() {
                summary.terminated_early = true;
                info!(
                    run_id = %self.run_id,
                    next_stage = stage.as_str(),
                    "No discrepancies left; remaining stages skipped"
                );
                break;
            }

            let report = self.repair(stage, &current).await;
            for resolution in &report.resolutions {
                if matches!(resolution.outcome, FinancingOutcome::Skipped { .. }) {
                    continue;
                }
                if let Some(reason) = resolution.outcome.reason() {
                    last_reason.insert(resolution.financing_id, format!("{}: {}", stage, reason));
                }
            }

            let after = self.detect(&format!("after-{}", stage)).await?;
            let record = StageRecord::new(current.len(), after.len(), &report);
            info!(
                run_id = %self.run_id,
                stage = stage.as_str(),
                before = record.before,
                after = record.after,
                resolved = record.resolved,
                failed = record.failed,
                "Stage complete"
            );
            summary.stages.push(record);
            current = after;
        }

        let manual_review = self.manual_review(&current, &last_reason);
        if !manual_review.is_empty() {
            self.publish(render_manual_review(&manual_review)).await;
            summary.manual_review = Some(self.sink.location(self.run_id, MANUAL_REVIEW_REPORT));
        }

        summary.final_discrepancies = current.len();
        summary.finished_at = Utc::now();
        self.publish(render_summary(&summary)).await;

        info!(
            run_id = %self.run_id,
            initial = summary.initial_discrepancies,
            resolved = summary.total_resolved(),
            unresolved = summary.total_unresolved(),
            manual_review = manual_review.len(),
            "Reconciliation run finished"
        );

        Ok(PipelineRun {
            summary,
            manual_review,
        })
    }

    fn manual_review(
        &self,
        residual: &DiscrepancyReport,
        last_reason: &HashMap<i64, String>,
    ) -> ManualReviewReport {
        let mut entries: Vec<ManualReviewEntry> = residual
            .grouped()
            .into_iter()
            .map(|d| ManualReviewEntry {
                financing_id: d.financing_id,
                sale_id: d.sale_id,
                difference: Some(d.difference),
                total_ledger: Some(d.total_ledger),
                total_projection: Some(d.total_projection),
                reason: last_reason
                    .get(&d.financing_id)
                    .cloned()
                    .unwrap_or_else(|| "no repair pass changed this financing".to_string()),
            })
            .collect();

        entries.extend(residual.unreadable.iter().map(|u| ManualReviewEntry {
            financing_id: u.financing_id,
            sale_id: None,
            difference: None,
            total_ledger: None,
            total_projection: None,
            reason: format!("unreadable: {}", u.error),
        }));

        ManualReviewReport::new(self.run_id, entries)
    }

    /// Reports are best effort; a sink failure never fails the run
    async fn publish(&self, rendered: Result<RenderedReport>) {
        let outcome = match rendered {
            Ok(report) => self.sink.publish(self.run_id, &report).await,
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            warn!(run_id = %self.run_id, error = %e, "Could not publish report");
        }
    }
}
