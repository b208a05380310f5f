pub mod models;
pub mod services;

pub use models::{ManualReviewEntry, ManualReviewReport, PipelineSummary, StageRecord};
pub use services::{FileReportSink, LogReportSink, RenderedReport, ReportSink};
