use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::installment::Installment;
use crate::core::sum_rounded;

/// Debt of a sale, split into installments it owns exclusively
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Financing {
    pub id: i64,
    /// Owning sale; report labelling only
    #[serde(default)]
    pub sale_id: Option<i64>,
    #[serde(default)]
    pub installments: Vec<Installment>,
}

impl Financing {
    pub fn new(id: i64, sale_id: Option<i64>, installments: Vec<Installment>) -> Self {
        let mut financing = Self {
            id,
            sale_id,
            installments,
        };
        financing.sort_installments();
        financing
    }

    /// Ascending cuota number; non-regular cuotas (`None`, then `0`) first, ties by id
    pub fn sort_installments(&mut self) {
        self.installments.sort_by_key(|inst| (inst.number, inst.id));
    }

    /// Sum of `paid` over every installment, regular or not
    pub fn total_projection(&self) -> Decimal {
        sum_rounded(self.installments.iter().map(|inst| inst.paid))
    }
}
