pub mod financing;
pub mod reconciliation;
pub mod reports;
