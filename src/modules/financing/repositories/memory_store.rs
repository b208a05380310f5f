use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::core::{AppError, FinancingStore, Result};
use crate::modules::financing::models::{Financing, Installment, Payment};

/// Financings and payments as exported from the backing system
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub financings: Vec<Financing>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

/// In-memory FinancingStore, loadable from a JSON dataset
///
/// Used for offline runs against an exported dataset and as the store behind
/// the integration tests. Writes are applied all-or-nothing per call.
pub struct InMemoryFinancingStore {
    state: RwLock<Dataset>,
    installments_written: AtomicUsize,
}

impl InMemoryFinancingStore {
    pub fn new(mut dataset: Dataset) -> Self {
        dataset.financings.sort_by_key(|f| f.id);
        for financing in &mut dataset.financings {
            financing.sort_installments();
        }
        dataset.payments.sort_by_key(|p| p.id);

        Self {
            state: RwLock::new(dataset),
            installments_written: AtomicUsize::new(0),
        }
    }

    /// Load a dataset exported as JSON
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let dataset: Dataset = serde_json::from_str(&raw)?;

        info!(
            path = %path.display(),
            financings = dataset.financings.len(),
            payments = dataset.payments.len(),
            "Loaded reconciliation dataset"
        );

        Ok(Self::new(dataset))
    }

    /// Write the current state back out as JSON
    pub async fn write_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let dataset = self.dataset().await;
        let raw = serde_json::to_string_pretty(&dataset)?;
        tokio::fs::write(path.as_ref(), raw).await?;
        Ok(())
    }

    /// Copy of the current state
    pub async fn dataset(&self) -> Dataset {
        self.state.read().await.clone()
    }

    /// Total installment rows written so far
    pub fn installments_written(&self) -> usize {
        self.installments_written.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FinancingStore for InMemoryFinancingStore {
    async fn list_financings(&self) -> Result<Vec<Financing>> {
        Ok(self.state.read().await.financings.clone())
    }

    async fn find_financing(&self, financing_id: i64) -> Result<Option<Financing>> {
        Ok(self
            .state
            .read()
            .await
            .financings
            .iter()
            .find(|f| f.id == financing_id)
            .cloned())
    }

    async fn ledger_payments(&self, financing_id: i64) -> Result<Vec<Payment>> {
        Ok(self
            .state
            .read()
            .await
            .payments
            .iter()
            .filter(|p| p.is_ledger_entry_for(financing_id))
            .cloned()
            .collect())
    }

    async fn save_installments(
        &self,
        financing_id: i64,
        installments: &[Installment],
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let financing = state
            .financings
            .iter_mut()
            .find(|f| f.id == financing_id)
            .ok_or_else(|| AppError::not_found(format!("Financing {}", financing_id)))?;

        // Validate every row before touching any of them
        let mut positions = Vec::with_capacity(installments.len());
        for installment in installments {
            let position = financing
                .installments
                .iter()
                .position(|existing| existing.id == installment.id)
                .ok_or_else(|| {
                    AppError::not_found(format!(
                        "Installment {} of financing {}",
                        installment.id, financing_id
                    ))
                })?;
            positions.push(position);
        }

        for (position, installment) in positions.into_iter().zip(installments) {
            financing.installments[position] = installment.clone();
        }
        self.installments_written
            .fetch_add(installments.len(), Ordering::SeqCst);

        Ok(())
    }
}
