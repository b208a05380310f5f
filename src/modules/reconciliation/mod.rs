pub mod models;
pub mod services;

pub use models::{
    Discrepancy, DiscrepancyReport, FinancingOutcome, FinancingResolution, FinancingSnapshot,
    RepairStage, StageReport,
};
pub use services::{
    DiscrepancyDetector, FullResetReconciler, MinorDifferenceRepairer, PipelineRun,
    PipelineSettings, ReconciliationPipeline, RepairPass, StageRun, SurplusRedistributor,
};
