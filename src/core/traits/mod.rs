pub mod repository;

pub use repository::FinancingStore;
