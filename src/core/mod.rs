pub mod error;
pub mod money;
pub mod traits;

pub use error::{AppError, Result};
pub use money::{format_amount, round2, sum_rounded, within_tolerance, TOLERANCE};
pub use traits::FinancingStore;
