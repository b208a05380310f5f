pub mod discrepancy;
pub mod resolution;
pub mod snapshot;

pub use discrepancy::{Discrepancy, DiscrepancyReport, DiscrepancySummary, UnreadableFinancing};
pub use resolution::{FinancingOutcome, FinancingResolution, RepairStage, StageReport};
pub use snapshot::FinancingSnapshot;
