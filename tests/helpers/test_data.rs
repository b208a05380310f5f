// Test Data Factory
//
// Builds financings, installments and ledger payments for scenario tests.

use chrono::NaiveDate;
use financing_reconciler::financing::{
    Dataset, Financing, InMemoryFinancingStore, Installment, Payment, PaymentStatus,
};
use financing_reconciler::financing::models::FINANCING_INSTALLMENTS_ENTITY;
use rust_decimal::Decimal;
use serde_json::{json, Value};

/// Reference date used by every scenario
pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

/// Installment ids are `financing_id * 100 + number`
pub fn installment_id(financing_id: i64, number: i32) -> i64 {
    financing_id * 100 + number as i64
}

/// Unpaid regular cuota
pub fn cuota(financing_id: i64, number: i32, amount: Decimal) -> Installment {
    Installment::new(
        installment_id(financing_id, number),
        financing_id,
        Some(number),
        amount,
        None,
    )
}

/// Regular cuota with a cached paid amount
pub fn paid_cuota(financing_id: i64, number: i32, amount: Decimal, paid: Decimal) -> Installment {
    let mut installment = cuota(financing_id, number, amount);
    installment.set_paid(paid);
    installment
}

pub fn financing(id: i64, installments: Vec<Installment>) -> Financing {
    Financing::new(id, Some(id + 1000), installments)
}

/// Approved ledger payment for a financing
pub fn payment(id: i64, financing_id: i64, amount: Decimal) -> Payment {
    Payment {
        id,
        amount,
        status: PaymentStatus::Approved,
        related_entity_type: FINANCING_INSTALLMENTS_ENTITY.to_string(),
        related_entity_id: financing_id,
        metadata: None,
        created_at: None,
    }
}

pub fn payment_with_metadata(
    id: i64,
    financing_id: i64,
    amount: Decimal,
    metadata: Value,
) -> Payment {
    Payment {
        metadata: Some(metadata),
        ..payment(id, financing_id, amount)
    }
}

/// `{"Cuotas afectadas": {"Cuota N": {"Monto aplicado": amount}, ...}}`
pub fn allocation_metadata(lines: &[(i32, Decimal)]) -> Value {
    let mut affected = serde_json::Map::new();
    for (number, amount) in lines {
        affected.insert(
            format!("Cuota {}", number),
            json!({ "Monto aplicado": amount.to_string() }),
        );
    }
    json!({ "Cuotas afectadas": affected })
}

pub fn store(financings: Vec<Financing>, payments: Vec<Payment>) -> InMemoryFinancingStore {
    InMemoryFinancingStore::new(Dataset {
        financings,
        payments,
    })
}
