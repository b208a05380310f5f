pub mod financing_repository;
pub mod memory_store;

pub use financing_repository::MySqlFinancingStore;
pub use memory_store::{Dataset, InMemoryFinancingStore};
