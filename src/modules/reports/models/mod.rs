pub mod run_summary;

pub use run_summary::{ManualReviewEntry, ManualReviewReport, PipelineSummary, StageRecord};
