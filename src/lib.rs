//! Financing installment reconciliation
//!
//! Detects financings whose installment projection (per-cuota paid/pending/status)
//! disagrees with the approved payment ledger, repairs them in staged passes and
//! reports whatever still needs a human.

pub mod config;
pub mod core;
pub mod modules;

// Re-export commonly used types
pub use modules::financing;
pub use modules::reconciliation;
pub use modules::reports;
