// JSON dataset round trip through the in-memory store and the file report sink

#[path = "../helpers/mod.rs"]
mod helpers;

use std::path::PathBuf;

use financing_reconciler::core::{AppError, FinancingStore};
use financing_reconciler::financing::{InMemoryFinancingStore, InstallmentStatus};
use financing_reconciler::reconciliation::{PipelineSettings, ReconciliationPipeline};
use financing_reconciler::reports::FileReportSink;
use helpers::*;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("financing-reconciler-{}", Uuid::new_v4()))
}

fn exported_dataset() -> serde_json::Value {
    json!({
        "financings": [
            {
                "id": 7,
                "sale_id": 70,
                "installments": [
                    {
                        "id": 72, "financing_id": 7, "number": 2,
                        "amount": "500.00", "paid": "0.00", "pending": "500.00",
                        "expected_payment_date": "2026-02-01", "status": "PENDING"
                    },
                    {
                        "id": 71, "financing_id": 7, "number": 1,
                        "amount": "500.00", "paid": "0.00", "pending": "500.00",
                        "expected_payment_date": "2026-01-01", "status": "PENDING"
                    },
                    {
                        "id": 70, "financing_id": 7, "number": 0,
                        "amount": "200.00", "paid": "0.00", "pending": "200.00",
                        "expected_payment_date": null, "status": "PENDING"
                    }
                ]
            }
        ],
        "payments": [
            {
                "id": 1, "amount": "200.00", "status": "APPROVED",
                "related_entity_type": "financingInstallments", "related_entity_id": 7,
                "metadata": {"Cuotas afectadas": {"Cuota 0": {"Monto aplicado": 200}}}
            },
            {
                "id": 2, "amount": "650.00", "status": "COMPLETED",
                "related_entity_type": "financingInstallments", "related_entity_id": 7,
                "metadata": null
            },
            {
                "id": 3, "amount": "999.00", "status": "REJECTED",
                "related_entity_type": "financingInstallments", "related_entity_id": 7
            },
            {
                "id": 4, "amount": "50.00", "status": "APPROVED",
                "related_entity_type": "reservation", "related_entity_id": 7
            }
        ]
    })
}

#[tokio::test]
async fn test_dataset_file_is_repaired_and_written_back() {
    let dir = scratch_dir();
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let input = dir.join("dataset.json");
    let output = dir.join("repaired.json");
    tokio::fs::write(&input, exported_dataset().to_string())
        .await
        .unwrap();

    let store = InMemoryFinancingStore::from_json_file(&input).await.unwrap();
    let sink = FileReportSink::new(dir.join("reports"));
    let pipeline = ReconciliationPipeline::new(&store, &sink, PipelineSettings::new(as_of()));

    let run = pipeline.run_all().await.unwrap();
    assert_eq!(run.summary.initial_discrepancies, 1);
    assert_eq!(run.summary.final_discrepancies, 0);

    store.write_json_file(&output).await.unwrap();
    let reloaded = InMemoryFinancingStore::from_json_file(&output).await.unwrap();
    let financing = reloaded.find_financing(7).await.unwrap().unwrap();

    // Non-regular cuota first, then cuotas in number order
    let numbers: Vec<Option<i32>> = financing.installments.iter().map(|i| i.number).collect();
    assert_eq!(numbers, vec![Some(0), Some(1), Some(2)]);

    assert_eq!(financing.installments[0].paid, dec!(200));
    assert_eq!(financing.installments[0].status, InstallmentStatus::Paid);
    assert_eq!(financing.installments[1].paid, dec!(500));
    assert_eq!(financing.installments[2].paid, dec!(150));
    assert_eq!(financing.installments[2].pending, dec!(350));

    let run_dir = sink.run_dir(pipeline.run_id());
    assert!(run_dir.join("detect-initial.txt").exists());
    assert!(run_dir.join("stage-surplus-redistribute.json").exists());
    assert!(run_dir.join("summary.txt").exists());

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn test_out_of_scope_payments_are_not_ledger_entries() {
    let store = InMemoryFinancingStore::new(
        serde_json::from_value(exported_dataset()).unwrap(),
    );

    let ledger = store.ledger_payments(7).await.unwrap();
    let ids: Vec<i64> = ledger.iter().map(|p| p.id).collect();

    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn test_invalid_dataset_is_a_json_error() {
    let dir = scratch_dir();
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let input = dir.join("broken.json");
    tokio::fs::write(&input, "{\"financings\": [").await.unwrap();

    let err = InMemoryFinancingStore::from_json_file(&input)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, AppError::Json(_)));

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn test_missing_dataset_is_an_io_error() {
    let err = InMemoryFinancingStore::from_json_file(scratch_dir().join("absent.json"))
        .await
        .err()
        .unwrap();

    assert!(matches!(err, AppError::Io(_)));
}

#[tokio::test]
async fn test_exported_helpers_round_trip_through_json() {
    let original = store(
        vec![financing(1, vec![cuota(1, 1, dec!(100))])],
        vec![payment(1, 1, dec!(100))],
    );
    let dir = scratch_dir();
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let path = dir.join("dataset.json");

    original.write_json_file(&path).await.unwrap();
    let reloaded = InMemoryFinancingStore::from_json_file(&path).await.unwrap();

    assert_eq!(
        reloaded.dataset().await.financings,
        original.dataset().await.financings
    );
    tokio::fs::remove_dir_all(&dir).await.unwrap();
}
