// Full pipeline runs: Detect, then each repair stage followed by Detect
//
// Checks stage ordering, early termination, the manual-review report and
// that every financing ends reconciled or listed for review.

#[path = "../helpers/mod.rs"]
mod helpers;

use financing_reconciler::core::{within_tolerance, FinancingStore};
use financing_reconciler::reconciliation::{
    FinancingSnapshot, PipelineSettings, ReconciliationPipeline, RepairStage,
};
use financing_reconciler::financing::{InMemoryFinancingStore, InstallmentStatus};
use helpers::*;
use rust_decimal_macros::dec;

/// Scenario mix:
/// 1: off by 29.99 (minor)
/// 2: 500 recorded against cuota 2, projection empty (surplus)
/// 3: ledger 250 over two cuotas of 100 (capacity exceeded)
/// 4: projection 600 above the ledger (deficit, full reset)
/// 5: already reconciled
fn scenario_mix() -> InMemoryFinancingStore {
    store(
        vec![
            financing(
                1,
                vec![
                    paid_cuota(1, 1, dec!(2000), dec!(2000)),
                    paid_cuota(1, 2, dec!(2000), dec!(2000)),
                    paid_cuota(1, 3, dec!(2000), dec!(1414.60)),
                    cuota(1, 4, dec!(2000)),
                ],
            ),
            financing(
                2,
                vec![cuota(2, 1, dec!(500)), cuota(2, 2, dec!(500)), cuota(2, 3, dec!(500))],
            ),
            financing(3, vec![cuota(3, 1, dec!(100)), cuota(3, 2, dec!(100))]),
            financing(
                4,
                vec![
                    paid_cuota(4, 1, dec!(500), dec!(500)),
                    paid_cuota(4, 2, dec!(500), dec!(500)),
                ],
            ),
            financing(5, vec![paid_cuota(5, 1, dec!(300), dec!(300))]),
        ],
        vec![
            payment(1, 1, dec!(5444.59)),
            payment_with_metadata(2, 2, dec!(500), allocation_metadata(&[(2, dec!(500))])),
            payment(3, 3, dec!(250)),
            payment(4, 4, dec!(400)),
            payment(5, 5, dec!(300)),
        ],
    )
}

#[tokio::test]
async fn test_run_all_resolves_scenario_mix() {
    let store = scenario_mix();
    let sink = CapturingSink::new();
    let pipeline = ReconciliationPipeline::new(&store, &sink, PipelineSettings::new(as_of()));

    let run = pipeline.run_all().await.unwrap();
    let summary = &run.summary;

    assert_eq!(summary.initial_discrepancies, 4);
    assert_eq!(summary.final_discrepancies, 1);
    assert_eq!(summary.total_resolved(), 3);
    assert!(!summary.terminated_early);

    let stages: Vec<RepairStage> = summary.stages.iter().map(|s| s.stage).collect();
    assert_eq!(stages, RepairStage::ORDER.to_vec());

    let minor = summary.stage(RepairStage::MinorDifferenceRepair).unwrap();
    assert_eq!((minor.before, minor.after, minor.resolved), (4, 3, 1));
    let surplus = summary.stage(RepairStage::SurplusRedistribute).unwrap();
    assert_eq!((surplus.before, surplus.after, surplus.resolved), (3, 2, 1));
    let reset = summary.stage(RepairStage::FullResetReconcile).unwrap();
    assert_eq!((reset.before, reset.after, reset.resolved), (2, 1, 1));

    // Deficit financing rebuilt from the ledger total
    let fourth = store.find_financing(4).await.unwrap().unwrap();
    assert_eq!(fourth.installments[0].paid, dec!(400));
    assert_eq!(fourth.installments[1].paid, dec!(0));

    // Capacity-exceeded financing goes to manual review with its reason
    assert_eq!(run.manual_review.len(), 1);
    let entry = run.manual_review.entry(3).unwrap();
    assert_eq!(entry.difference, Some(dec!(50)));
    assert_eq!(
        entry.reason,
        "full-reset-reconcile: manual review: amount exceeds all cuotas"
    );
    assert_eq!(summary.manual_review.as_deref(), Some("memory:manual-review"));
}

#[tokio::test]
async fn test_every_financing_ends_reconciled_or_in_manual_review() {
    let store = scenario_mix();
    let sink = CapturingSink::new();
    let pipeline = ReconciliationPipeline::new(&store, &sink, PipelineSettings::new(as_of()));

    let run = pipeline.run_all().await.unwrap();

    for financing in store.list_financings().await.unwrap() {
        let snapshot = FinancingSnapshot::load(&store, financing.id).await.unwrap();
        let reconciled = within_tolerance(snapshot.ledger_total(), snapshot.projection_total());
        let in_review = run.manual_review.entry(financing.id).is_some();
        assert!(
            reconciled || in_review,
            "financing {} is neither reconciled nor listed for review",
            financing.id
        );
        assert!(!(reconciled && in_review));
    }
}

#[tokio::test]
async fn test_run_all_stops_once_nothing_is_left() {
    let store = store(
        vec![financing(1, vec![paid_cuota(1, 1, dec!(500), dec!(490))])],
        vec![payment(1, 1, dec!(500))],
    );
    let sink = CapturingSink::new();
    let pipeline = ReconciliationPipeline::new(&store, &sink, PipelineSettings::new(as_of()));

    let run = pipeline.run_all().await.unwrap();

    assert_eq!(run.summary.stages.len(), 1);
    assert!(run.summary.terminated_early);
    assert!(run.manual_review.is_empty());
    assert!(run.summary.manual_review.is_none());
    assert_eq!(
        sink.names(),
        vec![
            "detect-initial",
            "stage-minor-difference-repair",
            "detect-after-minor-difference-repair",
            "summary",
        ]
    );
}

/// 6: initial payment on cuota 0 cleared from the projection, ledger has no metadata
/// 7: cuota 0 tagged in metadata, a later untagged payment covers cuota 1
fn initial_payment_financings() -> InMemoryFinancingStore {
    store(
        vec![
            financing(
                6,
                vec![
                    paid_cuota(6, 0, dec!(1000), dec!(1000)),
                    cuota(6, 1, dec!(500)),
                    cuota(6, 2, dec!(500)),
                ],
            ),
            financing(
                7,
                vec![cuota(7, 0, dec!(800)), paid_cuota(7, 1, dec!(400), dec!(400))],
            ),
        ],
        vec![
            payment(1, 6, dec!(1500)),
            payment_with_metadata(2, 7, dec!(800), allocation_metadata(&[(0, dec!(800))])),
            payment(3, 7, dec!(400)),
        ],
    )
}

#[tokio::test]
async fn test_run_all_refills_initial_payment_cuotas() {
    let store = initial_payment_financings();
    let sink = CapturingSink::new();
    let pipeline = ReconciliationPipeline::new(&store, &sink, PipelineSettings::new(as_of()));

    let run = pipeline.run_all().await.unwrap();

    assert_eq!(run.summary.initial_discrepancies, 2);
    assert_eq!(run.summary.final_discrepancies, 0);
    assert!(run.summary.terminated_early);
    assert!(run.manual_review.is_empty());
    assert!(run.summary.manual_review.is_none());

    for financing_id in [6, 7] {
        let snapshot = FinancingSnapshot::load(&store, financing_id).await.unwrap();
        assert!(within_tolerance(snapshot.ledger_total(), snapshot.projection_total()));
    }

    let six = store.find_financing(6).await.unwrap().unwrap();
    assert_eq!(six.installments[0].number, Some(0));
    assert_eq!(six.installments[0].paid, dec!(1000));
    assert_eq!(six.installments[0].status, InstallmentStatus::Paid);
    assert_eq!(six.installments[1].paid, dec!(500));
    assert_eq!(six.installments[2].paid, dec!(0));

    let seven = store.find_financing(7).await.unwrap().unwrap();
    assert_eq!(seven.installments[0].paid, dec!(800));
    assert_eq!(seven.installments[0].status, InstallmentStatus::Paid);
    assert_eq!(seven.installments[1].paid, dec!(400));
}

#[tokio::test]
async fn test_run_all_on_clean_books_runs_no_stage() {
    let store = store(
        vec![financing(1, vec![paid_cuota(1, 1, dec!(500), dec!(500))])],
        vec![payment(1, 1, dec!(500.005))],
    );
    let sink = CapturingSink::new();
    let pipeline = ReconciliationPipeline::new(&store, &sink, PipelineSettings::new(as_of()));

    let run = pipeline.run_all().await.unwrap();

    assert_eq!(run.summary.initial_discrepancies, 0);
    assert!(run.summary.stages.is_empty());
    assert_eq!(store.installments_written(), 0);
}

#[tokio::test]
async fn test_second_run_finds_only_manual_review_cases() {
    let store = scenario_mix();
    let sink = CapturingSink::new();

    ReconciliationPipeline::new(&store, &sink, PipelineSettings::new(as_of()))
        .run_all()
        .await
        .unwrap();
    let second = ReconciliationPipeline::new(&store, &sink, PipelineSettings::new(as_of()))
        .run_all()
        .await
        .unwrap();

    assert_eq!(second.summary.initial_discrepancies, 1);
    assert_eq!(second.summary.final_discrepancies, 1);
    assert!(second.manual_review.entry(3).is_some());
}

#[tokio::test]
async fn test_storage_failure_is_reported_not_thrown() {
    let store = FaultyStore::new(scenario_mix());
    store.reject_saves_for(2).await;
    let sink = CapturingSink::new();
    let pipeline = ReconciliationPipeline::new(&store, &sink, PipelineSettings::new(as_of()));

    let run = pipeline.run_all().await.unwrap();

    let surplus = run.summary.stage(RepairStage::SurplusRedistribute).unwrap();
    assert_eq!(surplus.failed, 1);
    let entry = run.manual_review.entry(2).unwrap();
    assert!(entry.reason.starts_with("full-reset-reconcile: Storage error"));
}

#[tokio::test]
async fn test_unreadable_financing_goes_to_manual_review() {
    let store = FaultyStore::new(scenario_mix());
    store.break_ledger_for(5).await;
    let sink = CapturingSink::new();
    let pipeline = ReconciliationPipeline::new(&store, &sink, PipelineSettings::new(as_of()));

    let run = pipeline.run_all().await.unwrap();

    let entry = run.manual_review.entry(5).unwrap();
    assert!(entry.difference.is_none());
    assert!(entry.reason.starts_with("unreadable:"));
}

#[tokio::test]
async fn test_report_sink_failure_does_not_fail_the_run() {
    let store = scenario_mix();
    let sink = CapturingSink::failing();
    let pipeline = ReconciliationPipeline::new(&store, &sink, PipelineSettings::new(as_of()));

    let run = pipeline.run_all().await.unwrap();

    assert_eq!(run.summary.final_discrepancies, 1);
    assert!(sink.names().is_empty());
}

#[tokio::test]
async fn test_manual_review_report_text() {
    let store = scenario_mix();
    let sink = CapturingSink::new();
    let pipeline = ReconciliationPipeline::new(&store, &sink, PipelineSettings::new(as_of()));

    pipeline.run_all().await.unwrap();

    let report = sink.report("manual-review").unwrap();
    assert!(report.text.contains("financing 3 (sale 1003): difference 50.00"));
    assert!(report.text.contains("ledger 250.00 projection 200.00"));

    let summary = sink.report("summary").unwrap();
    assert!(summary.text.contains("initial 4 | resolved 3 | unresolved 1"));
}
