use async_trait::async_trait;

use crate::core::Result;
use crate::modules::financing::models::{Financing, Installment, Payment};

/// Backing store for financings, their installments and the payment ledger
///
/// The reconciliation passes only need these primitives. Implementations
/// must make `save_installments` atomic: either every row is written or none is.
#[async_trait]
pub trait FinancingStore: Send + Sync {
    /// All financings with their installments, ordered by financing id
    async fn list_financings(&self) -> Result<Vec<Financing>>;

    /// A single financing with its installments
    async fn find_financing(&self, financing_id: i64) -> Result<Option<Financing>>;

    /// APPROVED/COMPLETED payments tagged `financingInstallments` for the
    /// financing, in ascending id (creation) order
    async fn ledger_payments(&self, financing_id: i64) -> Result<Vec<Payment>>;

    /// Persist the projection fields of the given installments in one transaction
    async fn save_installments(&self, financing_id: i64, installments: &[Installment])
        -> Result<()>;
}
