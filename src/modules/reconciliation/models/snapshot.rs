use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::core::{round2, sum_rounded, within_tolerance, AppError, FinancingStore, Result};
use crate::modules::financing::models::{Financing, Installment, Payment};

/// Working copy of one financing's ledger and projection for a repair pass
///
/// Every read during a pass goes through this object, so each value is a
/// deterministic function of the writes made earlier in the same pass. Only
/// installments whose projection changed are written back.
#[derive(Debug, Clone)]
pub struct FinancingSnapshot {
    financing_id: i64,
    sale_id: Option<i64>,
    installments: Vec<Installment>,
    original: Vec<Installment>,
    payments: Vec<Payment>,
}

impl FinancingSnapshot {
    /// Build from a financing and its payments; out-of-scope payments are dropped
    pub fn new(mut financing: Financing, payments: Vec<Payment>) -> Self {
        financing.sort_installments();

        let mut payments: Vec<Payment> = payments
            .into_iter()
            .filter(|p| p.is_ledger_entry_for(financing.id))
            .collect();
        payments.sort_by_key(|p| p.id);

        Self {
            financing_id: financing.id,
            sale_id: financing.sale_id,
            original: financing.installments.clone(),
            installments: financing.installments,
            payments,
        }
    }

    /// Fresh read from the store
    pub async fn load(store: &dyn FinancingStore, financing_id: i64) -> Result<Self> {
        let financing = store
            .find_financing(financing_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Financing {}", financing_id)))?;
        let payments = store.ledger_payments(financing_id).await?;

        Ok(Self::new(financing, payments))
    }

    pub fn financing_id(&self) -> i64 {
        self.financing_id
    }

    pub fn sale_id(&self) -> Option<i64> {
        self.sale_id
    }

    /// Installments in ascending cuota order
    pub fn installments(&self) -> &[Installment] {
        &self.installments
    }

    /// Ledger payments in ascending id order
    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn installment(&self, installment_id: i64) -> Option<&Installment> {
        self.installments.iter().find(|i| i.id == installment_id)
    }

    /// First installment carrying the given cuota number
    pub fn find_by_number(&self, number: i32) -> Option<&Installment> {
        self.installments.iter().find(|i| i.number == Some(number))
    }

    pub fn ledger_total(&self) -> Decimal {
        sum_rounded(self.payments.iter().map(|p| p.amount))
    }

    pub fn projection_total(&self) -> Decimal {
        sum_rounded(self.installments.iter().map(|i| i.paid))
    }

    /// `ledger - projection`, rounded
    pub fn difference(&self) -> Decimal {
        round2(self.ledger_total() - self.projection_total())
    }

    pub fn is_reconciled(&self) -> bool {
        within_tolerance(self.ledger_total(), self.projection_total())
    }

    /// Reset every installment, regular or not; returns how many were reset
    pub fn reset_all(&mut self, as_of: NaiveDate) -> usize {
        for installment in &mut self.installments {
            installment.reset(as_of);
        }
        self.installments.len()
    }

    /// Add to an installment's paid balance
    pub fn apply(&mut self, installment_id: i64, amount: Decimal) -> Option<&Installment> {
        let installment = self.installment_mut(installment_id)?;
        installment.apply(amount);
        Some(installment)
    }

    /// Overwrite an installment's paid balance
    pub fn set_paid(&mut self, installment_id: i64, paid: Decimal) -> Option<&Installment> {
        let installment = self.installment_mut(installment_id)?;
        installment.set_paid(paid);
        Some(installment)
    }

    fn installment_mut(&mut self, installment_id: i64) -> Option<&mut Installment> {
        self.installments.iter_mut().find(|i| i.id == installment_id)
    }

    /// Installments with money on them, most recent cuota first
    pub fn paid_most_recent_first(&self) -> Vec<&Installment> {
        let mut paid: Vec<&Installment> = self
            .installments
            .iter()
            .filter(|i| i.paid > Decimal::ZERO)
            .collect();
        paid.sort_by(|a, b| (b.number, b.id).cmp(&(a.number, a.id)));
        paid
    }

    /// Cuotas whose pending balance went negative
    pub fn overpaid_installments(&self) -> Vec<&Installment> {
        self.installments.iter().filter(|i| i.is_overpaid()).collect()
    }

    /// Installments whose projection differs from what was loaded
    pub fn changed_installments(&self) -> Vec<Installment> {
        self.installments
            .iter()
            .filter(|current| {
                self.original
                    .iter()
                    .find(|o| o.id == current.id)
                    .map_or(true, |original| current.projection_differs(original))
            })
            .cloned()
            .collect()
    }

    /// Persist changed installments in one write; returns how many rows were written
    pub async fn commit(&self, store: &dyn FinancingStore) -> Result<usize> {
        let changed = self.changed_installments();
        if changed.is_empty() {
            return Ok(0);
        }

        store.save_installments(self.financing_id, &changed).await?;
        Ok(changed.len())
    }
}
