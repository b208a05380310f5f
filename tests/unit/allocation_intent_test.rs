// Allocation intents as they arrive from exported payment rows
//
// Covers metadata decoded from dataset JSON (objects, JSON-encoded strings,
// legacy key names) and a property check over well-formed breakdowns.

use financing_reconciler::financing::{AllocationIntent, Payment, PaymentStatus};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

fn payment_from_export(metadata: serde_json::Value) -> Payment {
    serde_json::from_value(json!({
        "id": 41,
        "amount": "750.00",
        "status": "APPROVED",
        "related_entity_type": "financingInstallments",
        "related_entity_id": 7,
        "metadata": metadata,
    }))
    .unwrap()
}

#[test]
fn test_exported_payment_with_breakdown() {
    let payment = payment_from_export(json!({
        "Cuotas afectadas": {
            "Cuota 1": {"Monto aplicado": 500},
            "Cuota 2": {"Monto aplicado": "250.00"}
        },
        "Observaciones": "transferencia"
    }));

    assert_eq!(payment.status, PaymentStatus::Approved);
    assert!(payment.is_ledger_entry_for(7));

    let intent = payment.allocation_intent();
    assert_eq!(intent.total(), payment.amount);
    let AllocationIntent::Lines(lines) = intent else {
        panic!("expected a breakdown");
    };
    assert_eq!(lines[0].installment_number, 1);
    assert_eq!(lines[1].applied_amount, dec!(250));
}

#[test]
fn test_exported_payment_with_string_encoded_metadata() {
    let payment = payment_from_export(json!(
        "{\"Cuotas afectadas\": {\"Cuota 3\": {\"Aplicado a cuota\": 750}}}"
    ));

    assert_eq!(payment.allocation_intent().total(), dec!(750));
}

#[test]
fn test_exported_payment_without_metadata() {
    let payment: Payment = serde_json::from_value(json!({
        "id": 42,
        "amount": 100,
        "status": "COMPLETED",
        "related_entity_type": "financingInstallments",
        "related_entity_id": 7
    }))
    .unwrap();

    assert!(payment.metadata.is_none());
    assert_eq!(payment.allocation_intent(), AllocationIntent::Absent);
}

#[test]
fn test_breakdown_may_disagree_with_payment_amount() {
    // Intent is advisory: a breakdown short of the payment amount still parses
    let payment = payment_from_export(json!({
        "Cuotas afectadas": {"Cuota 1": {"Monto aplicado": 700}}
    }));

    assert_eq!(payment.allocation_intent().total(), dec!(700));
    assert_ne!(payment.allocation_intent().total(), payment.amount);
}

#[test]
fn test_cuota_zero_is_a_valid_target() {
    let payment = payment_from_export(json!({
        "Cuotas afectadas": {"Cuota 0": {"Monto aplicado": 750}}
    }));

    let AllocationIntent::Lines(lines) = payment.allocation_intent() else {
        panic!("expected a breakdown");
    };
    assert_eq!(lines[0].installment_number, 0);
}

proptest! {
    /// Property: a well-formed breakdown parses to one ordered line per cuota
    /// and sums to its amounts
    #[test]
    fn test_well_formed_breakdown_parses(
        lines in prop::collection::btree_map(1i32..60i32, 0i64..1_000_000i64, 1..10),
    ) {
        let mut affected = serde_json::Map::new();
        for (number, cents) in &lines {
            affected.insert(
                format!("Cuota {}", number),
                json!({"Monto aplicado": Decimal::new(*cents, 2).to_string()}),
            );
        }
        let metadata = json!({"Cuotas afectadas": affected});

        let intent = AllocationIntent::parse(Some(&metadata));
        let expected_total: Decimal = lines.values().map(|cents| Decimal::new(*cents, 2)).sum();

        prop_assert_eq!(intent.total(), expected_total);
        let AllocationIntent::Lines(parsed) = intent else {
            return Err(TestCaseError::fail("expected a breakdown"));
        };
        let numbers: Vec<i32> = parsed.iter().map(|l| l.installment_number).collect();
        let expected: Vec<i32> = lines.keys().copied().collect();
        prop_assert_eq!(numbers, expected);
    }
}
