pub mod models;
pub mod repositories;

pub use models::{
    AllocationIntent, Financing, Installment, InstallmentStatus, Payment, PaymentStatus,
};
pub use repositories::{Dataset, InMemoryFinancingStore, MySqlFinancingStore};
