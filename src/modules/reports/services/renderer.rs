use std::fmt::{self, Write};

use serde::Serialize;

use crate::core::{format_amount, AppError, Result};
use crate::modules::reconciliation::models::{DiscrepancyReport, FinancingOutcome, StageReport};
use crate::modules::reports::models::{ManualReviewReport, PipelineSummary};

pub const MANUAL_REVIEW_REPORT: &str = "manual-review";
pub const SUMMARY_REPORT: &str = "summary";

/// A report rendered for a sink: operator text plus the same data as JSON
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    /// File-safe name, unique within a run
    pub name: String,
    pub text: String,
    pub json: String,
}

impl RenderedReport {
    fn build<T, F>(name: impl Into<String>, value: &T, write_text: F) -> Result<Self>
    where
        T: Serialize,
        F: FnOnce(&mut String) -> fmt::Result,
    {
        let mut text = String::new();
        write_text(&mut text)
            .map_err(|e| AppError::internal(format!("Report rendering failed: {}", e)))?;

        Ok(Self {
            name: name.into(),
            text,
            json: serde_json::to_string_pretty(value)?,
        })
    }
}

fn sale_label(sale_id: Option<i64>) -> String {
    sale_id.map_or_else(|| "-".to_string(), |id| id.to_string())
}

pub fn render_discrepancy_report(report: &DiscrepancyReport) -> Result<RenderedReport> {
    RenderedReport::build(format!("detect-{}", report.label), report, |out| {
        let summary = report.summary();

        writeln!(out, "Discrepancy report: {}", report.label)?;
        writeln!(out, "run {} at {}", report.run_id, report.generated_at.to_rfc3339())?;
        writeln!(
            out,
            "scanned {} financings, {} discrepancies, {} unreadable",
            report.financings_scanned,
            report.len(),
            report.unreadable.len()
        )?;
        writeln!(
            out,
            "ledger above projection: {} ({}) | ledger below projection: {} ({})",
            summary.positive_count,
            format_amount(summary.positive_total),
            summary.negative_count,
            format_amount(summary.negative_total)
        )?;

        if !report.is_empty() {
            writeln!(out)?;
            writeln!(
                out,
                "{:>10}  {:>8}  {:>14}  {:>14}  {:>12}",
                "financing", "sale", "ledger", "projection", "difference"
            )?;
        }
        for d in report.grouped() {
            writeln!(
                out,
                "{:>10}  {:>8}  {:>14}  {:>14}  {:>12}",
                d.financing_id,
                sale_label(d.sale_id),
                format_amount(d.total_ledger),
                format_amount(d.total_projection),
                format_amount(d.difference)
            )?;
        }

        if !report.unreadable.is_empty() {
            writeln!(out)?;
            writeln!(out, "Unreadable financings:")?;
            for u in &report.unreadable {
                writeln!(out, "  financing {}: {}", u.financing_id, u.error)?;
            }
        }

        Ok(())
    })
}

pub fn render_stage_report(report: &StageReport) -> Result<RenderedReport> {
    RenderedReport::build(format!("stage-{}", report.stage), report, |out| {
        writeln!(out, "Repair stage: {}", report.stage)?;
        writeln!(
            out,
            "run {} from {} to {}",
            report.run_id,
            report.started_at.to_rfc3339(),
            report.finished_at.to_rfc3339()
        )?;
        writeln!(
            out,
            "candidates {}, processed {}, resolved {}, unresolved {}, unchanged {}, failed {}",
            report.candidates,
            report.processed_count(),
            report.resolved_count(),
            report.unresolved_count(),
            report.unchanged_count(),
            report.failed_count()
        )?;

        for r in &report.resolutions {
            if matches!(r.outcome, FinancingOutcome::Skipped { .. }) {
                continue;
            }

            writeln!(out)?;
            write!(
                out,
                "financing {} (sale {}): {} | difference {}",
                r.financing_id,
                sale_label(r.sale_id),
                r.outcome.label(),
                format_amount(r.difference_before)
            )?;
            match r.difference_after {
                Some(after) => writeln!(out, " -> {}", format_amount(after))?,
                None => writeln!(out)?,
            }
            if let Some(reason) = r.outcome.reason() {
                writeln!(out, "  reason: {}", reason)?;
            }
            for action in &r.actions {
                writeln!(out, "  - {}", action)?;
            }
            if !r.quarantined_payments.is_empty() {
                writeln!(out, "  quarantined payments: {:?}", r.quarantined_payments)?;
            }
            for overpaid in &r.overpaid_cuotas {
                writeln!(out, "  over-paid: {}", overpaid)?;
            }
            if !r.unapplied.is_zero() {
                writeln!(out, "  unapplied: {}", format_amount(r.unapplied))?;
            }
            writeln!(out, "  installments written: {}", r.installments_written)?;
        }

        let skipped = report.resolutions.len() - report.processed_count();
        if skipped > 0 {
            writeln!(out)?;
            writeln!(out, "{} financings outside this stage's scope", skipped)?;
        }

        Ok(())
    })
}

pub fn render_manual_review(report: &ManualReviewReport) -> Result<RenderedReport> {
    RenderedReport::build(MANUAL_REVIEW_REPORT, report, |out| {
        writeln!(out, "Manual review: {} financings", report.len())?;
        writeln!(out, "run {} at {}", report.run_id, report.generated_at.to_rfc3339())?;

        for entry in &report.entries {
            writeln!(out)?;
            match entry.difference {
                Some(difference) => writeln!(
                    out,
                    "financing {} (sale {}): difference {}",
                    entry.financing_id,
                    sale_label(entry.sale_id),
                    format_amount(difference)
                )?,
                None => writeln!(
                    out,
                    "financing {} (sale {}): not readable",
                    entry.financing_id,
                    sale_label(entry.sale_id)
                )?,
            }
            if let (Some(ledger), Some(projection)) = (entry.total_ledger, entry.total_projection) {
                writeln!(
                    out,
                    "  ledger {} projection {}",
                    format_amount(ledger),
                    format_amount(projection)
                )?;
            }
            writeln!(out, "  reason: {}", entry.reason)?;
        }

        Ok(())
    })
}

pub fn render_summary(summary: &PipelineSummary) -> Result<RenderedReport> {
    RenderedReport::build(SUMMARY_REPORT, summary, |out| {
        writeln!(out, "Reconciliation run {}", summary.run_id)?;
        writeln!(
            out,
            "{} to {}",
            summary.started_at.to_rfc3339(),
            summary.finished_at.to_rfc3339()
        )?;
        writeln!(out)?;
        writeln!(
            out,
            "{:<26}  {:>7}  {:>7}  {:>9}  {:>10}  {:>7}",
            "stage", "before", "after", "resolved", "unresolved", "failed"
        )?;
        for s in &summary.stages {
            writeln!(
                out,
                "{:<26}  {:>7}  {:>7}  {:>9}  {:>10}  {:>7}",
                s.stage.as_str(),
                s.before,
                s.after,
                s.resolved,
                s.unresolved,
                s.failed
            )?;
        }
        if summary.terminated_early {
            writeln!(out, "(remaining stages skipped: no discrepancies left)")?;
        }
        writeln!(out)?;
        writeln!(
            out,
            "initial {} | resolved {} | unresolved {}",
            summary.initial_discrepancies,
            summary.total_resolved(),
            summary.total_unresolved()
        )?;
        if let Some(location) = &summary.manual_review {
            writeln!(out, "manual review: {}", location)?;
        }

        Ok(())
    })
}
