pub mod renderer;
pub mod report_sink;

pub use renderer::{
    render_discrepancy_report, render_manual_review, render_stage_report, render_summary,
    RenderedReport, MANUAL_REVIEW_REPORT, SUMMARY_REPORT,
};
pub use report_sink::{FileReportSink, LogReportSink, ReportSink};
