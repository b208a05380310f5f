// MySQL-backed FinancingStore
//
// Implements:
// - Read all financings with their installments (two queries, grouped in memory)
// - Read a single financing with its installments
// - Read the approved/completed payment ledger of a financing in id order
// - Update installment projections for one financing inside a single transaction

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::MySqlPool;

use crate::core::{AppError, FinancingStore, Result};
use crate::modules::financing::models::{
    Financing, Installment, InstallmentStatus, Payment, PaymentStatus,
    FINANCING_INSTALLMENTS_ENTITY,
};

const INSTALLMENT_COLUMNS: &str = r#"
    id, financing_id, number_cuote, coute_amount, coute_paid, coute_pending,
    late_fee_amount, late_fee_amount_paid, late_fee_amount_pending,
    expected_payment_date, status
"#;

/// Repository over the `financings`, `financing_installments` and `payments` tables
pub struct MySqlFinancingStore {
    pool: MySqlPool,
}

impl MySqlFinancingStore {
    /// Create a new store
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Get the database connection pool
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn installments_for(&self, financing_id: i64) -> Result<Vec<Installment>> {
        let rows = sqlx::query_as::<_, InstallmentRow>(&format!(
            "SELECT {} FROM financing_installments WHERE financing_id = ? \
             ORDER BY number_cuote ASC, id ASC",
            INSTALLMENT_COLUMNS
        ))
        .bind(financing_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch installments: {}", e)))?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }
}

#[async_trait]
impl FinancingStore for MySqlFinancingStore {
    async fn list_financings(&self) -> Result<Vec<Financing>> {
        let financing_rows = sqlx::query_as::<_, FinancingRow>(
            r#"
            SELECT id, sale_id
            FROM financings
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch financings: {}", e)))?;

        let installment_rows = sqlx::query_as::<_, InstallmentRow>(&format!(
            "SELECT {} FROM financing_installments \
             ORDER BY financing_id ASC, number_cuote ASC, id ASC",
            INSTALLMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch installments: {}", e)))?;

        let mut by_financing: BTreeMap<i64, Vec<Installment>> = BTreeMap::new();
        for row in installment_rows {
            let installment: Installment = row.try_into()?;
            by_financing
                .entry(installment.financing_id)
                .or_default()
                .push(installment);
        }

        Ok(financing_rows
            .into_iter()
            .map(|row| {
                let installments = by_financing.remove(&row.id).unwrap_or_default();
                Financing::new(row.id, row.sale_id, installments)
            })
            .collect())
    }

    async fn find_financing(&self, financing_id: i64) -> Result<Option<Financing>> {
        let row = sqlx::query_as::<_, FinancingRow>(
            r#"
            SELECT id, sale_id
            FROM financings
            WHERE id = ?
            "#,
        )
        .bind(financing_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch financing: {}", e)))?;

        match row {
            Some(row) => {
                let installments = self.installments_for(row.id).await?;
                Ok(Some(Financing::new(row.id, row.sale_id, installments)))
            }
            None => Ok(None),
        }
    }

    async fn ledger_payments(&self, financing_id: i64) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT
                id, amount, status, related_entity_type, related_entity_id,
                CAST(metadata AS CHAR) AS metadata, created_at
            FROM payments
            WHERE related_entity_type = ?
              AND related_entity_id = ?
              AND UPPER(status) IN ('APPROVED', 'COMPLETED')
            ORDER BY id ASC
            "#,
        )
        .bind(FINANCING_INSTALLMENTS_ENTITY)
        .bind(financing_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch ledger payments: {}", e)))?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }

    async fn save_installments(
        &self,
        financing_id: i64,
        installments: &[Installment],
    ) -> Result<()> {
        if installments.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::storage(format!("Failed to start transaction: {}", e)))?;

        for installment in installments {
            if installment.financing_id != financing_id {
                return Err(AppError::validation(format!(
                    "Installment {} belongs to financing {}, not {}",
                    installment.id, installment.financing_id, financing_id
                )));
            }

            // Only changed rows reach this point, so MySQL's "changed rows" count is not checked
            sqlx::query(
                r#"
                UPDATE financing_installments
                SET
                    coute_paid = ?,
                    coute_pending = ?,
                    late_fee_amount_paid = ?,
                    late_fee_amount_pending = ?,
                    status = ?
                WHERE id = ? AND financing_id = ?
                "#,
            )
            .bind(installment.paid)
            .bind(installment.pending)
            .bind(installment.late_fee_paid)
            .bind(installment.late_fee_pending)
            .bind(installment.status.as_str())
            .bind(installment.id)
            .bind(financing_id)
            .execute(tx.as_mut())
            .await
            .map_err(|e| AppError::storage(format!("Failed to update installment: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::storage(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }
}

/// Database row for the financings table
#[derive(sqlx::FromRow)]
struct FinancingRow {
    id: i64,
    sale_id: Option<i64>,
}

/// Database row for the financing_installments table
#[derive(sqlx::FromRow)]
struct InstallmentRow {
    id: i64,
    financing_id: i64,
    number_cuote: Option<i32>,
    coute_amount: Decimal,
    coute_paid: Decimal,
    coute_pending: Decimal,
    late_fee_amount: Option<Decimal>,
    late_fee_amount_paid: Option<Decimal>,
    late_fee_amount_pending: Option<Decimal>,
    expected_payment_date: Option<chrono::NaiveDate>,
    status: String,
}

impl TryFrom<InstallmentRow> for Installment {
    type Error = AppError;

    fn try_from(row: InstallmentRow) -> Result<Self> {
        let status = InstallmentStatus::try_from(row.status).map_err(AppError::Internal)?;

        Ok(Installment {
            id: row.id,
            financing_id: row.financing_id,
            number: row.number_cuote,
            amount: row.coute_amount,
            paid: row.coute_paid,
            pending: row.coute_pending,
            late_fee_amount: row.late_fee_amount.unwrap_or_default(),
            late_fee_paid: row.late_fee_amount_paid.unwrap_or_default(),
            late_fee_pending: row.late_fee_amount_pending.unwrap_or_default(),
            expected_payment_date: row.expected_payment_date,
            status,
        })
    }
}

/// Database row for the payments table
#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    amount: Decimal,
    status: String,
    related_entity_type: String,
    related_entity_id: i64,
    metadata: Option<String>,
    created_at: Option<chrono::NaiveDateTime>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> Result<Self> {
        let status: PaymentStatus = row.status.parse().map_err(AppError::Internal)?;

        // Undecodable metadata is kept as a raw string so the intent parser can quarantine it
        let metadata = row.metadata.map(|raw| {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        });

        Ok(Payment {
            id: row.id,
            amount: row.amount,
            status,
            related_entity_type: row.related_entity_type,
            related_entity_id: row.related_entity_id,
            metadata,
            created_at: row.created_at,
        })
    }
}
