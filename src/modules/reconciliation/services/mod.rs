pub mod allocator;
pub mod detector;
pub mod full_reset;
pub mod minor_repair;
pub mod pipeline;
pub mod repair_pass;
pub mod surplus_redistributor;

pub use allocator::{allocate, first_fit, Allocation};
pub use detector::DiscrepancyDetector;
pub use full_reset::FullResetReconciler;
pub use minor_repair::{MinorDifferenceRepairer, DEFAULT_MINOR_THRESHOLD};
pub use pipeline::{PipelineRun, PipelineSettings, ReconciliationPipeline, StageRun};
pub use repair_pass::{run_repair_pass, RepairPass};
pub use surplus_redistributor::SurplusRedistributor;
