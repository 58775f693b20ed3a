//! Integration tests for the dual-engine delete coordinator.

mod common;

use common::*;
use flight_mirror::allocator::{FlightId, IdAllocator};
use flight_mirror::check;
use flight_mirror::coordinator::{
    sql, DeleteCoordinator, DeleteStrategy, WriteCoordinator, WriteStrategy, NOTHING_TO_DELETE,
};
use flight_mirror::engine::Engine;
use flight_mirror::schema::{DIM_FLIGHT, FACT_FLIGHT_METRICS};
use flight_mirror::synth::RowSynthesizer;
use flight_mirror::MirrorError;
use test_data_gen::Scale;

fn ids(list: &[FlightId]) -> Vec<String> {
    list.iter().map(|id| id.to_string()).collect()
}

/// Engines holding `count` committed flights starting at FL10000
fn pair_with_flights(count: u64) -> EnginePair {
    let pair = EnginePair::with_domain(Scale::Small);
    {
        let (a, b) = pair.sessions();
        let outcome = WriteCoordinator::new(&a, &b, RowSynthesizer::seeded(1))
            .write(count, WriteStrategy::RowLevel)
            .unwrap();
        assert_eq!(outcome.inserted.len() as u64, count);
    }
    pair
}

fn expected(range: std::ops::RangeInclusive<u64>) -> Vec<String> {
    range.map(|n| format!("FL{}", n)).collect()
}

// =============================================================================
// Row-level strategy
// =============================================================================

#[test]
fn test_delete_three_newest() {
    let pair = pair_with_flights(8);
    let (a, b) = pair.sessions();

    let outcome = DeleteCoordinator::new(&a, &b)
        .delete(Some(3), DeleteStrategy::RowLevel)
        .unwrap();

    assert_eq!(ids(&outcome.deleted), vec!["FL10005", "FL10006", "FL10007"]);
    assert!(outcome.note.is_none());
    assert!(outcome.failures.is_empty());
    for engine in [&a as &dyn Engine, &b] {
        assert_eq!(dim_ids(engine), expected(10000..=10004));
        assert_eq!(fact_ids(engine), expected(10000..=10004));
    }
}

#[test]
fn test_delete_all_when_no_count() {
    let pair = pair_with_flights(4);
    let (a, b) = pair.sessions();

    let outcome = DeleteCoordinator::new(&a, &b)
        .delete(None, DeleteStrategy::RowLevel)
        .unwrap();

    assert_eq!(ids(&outcome.deleted), expected(10000..=10003));
    assert!(dim_ids(&a).is_empty());
    assert!(fact_ids(&b).is_empty());
}

#[test]
fn test_count_larger_than_generated_is_clamped() {
    let pair = pair_with_flights(2);
    let (a, b) = pair.sessions();

    let outcome = DeleteCoordinator::new(&a, &b)
        .delete(Some(100), DeleteStrategy::RowLevel)
        .unwrap();
    assert_eq!(ids(&outcome.deleted), vec!["FL10000", "FL10001"]);
}

#[test]
fn test_nothing_generated_returns_note() {
    let pair = EnginePair::with_minimal_domain();
    let (a, b) = pair.sessions();
    insert_flight_id(&a, "KL1001");
    insert_flight_id(&b, "FL42");

    let outcome = DeleteCoordinator::new(&a, &b)
        .delete(Some(5), DeleteStrategy::RowLevel)
        .unwrap();

    assert!(outcome.deleted.is_empty());
    assert_eq!(outcome.note.as_deref(), Some(NOTHING_TO_DELETE));
    assert_eq!(dim_ids(&a), vec!["KL1001"]);
    assert_eq!(dim_ids(&b), vec!["FL42"]);
}

#[test]
fn test_max_spans_both_engines() {
    let pair = pair_with_flights(3);
    let (a, b) = pair.sessions();
    // a newer identifier that only reached engine B
    insert_flight_id(&b, "FL10003");

    let outcome = DeleteCoordinator::new(&a, &b)
        .delete(Some(2), DeleteStrategy::RowLevel)
        .unwrap();

    assert_eq!(ids(&outcome.deleted), vec!["FL10002", "FL10003"]);
    assert_eq!(dim_ids(&b), expected(10000..=10001));
}

#[test]
fn test_range_guard_refuses_implausible_max() {
    let pair = pair_with_flights(3);
    let (a, b) = pair.sessions();
    insert_flight_id(&a, "FL2010000");

    let err = DeleteCoordinator::new(&a, &b)
        .delete(Some(1), DeleteStrategy::RowLevel)
        .unwrap_err();

    assert!(matches!(
        err,
        MirrorError::IntegrityGuard {
            current_max: 2_010_000,
            limit: 1_010_000
        }
    ));
    assert!(err.is_client_error());
    // nothing touched
    assert_eq!(dim_ids(&a).len(), 4);
    assert_eq!(dim_ids(&b).len(), 3);
}

#[test]
fn test_range_guard_follows_configured_span() {
    let pair = pair_with_flights(3);
    let (a, b) = pair.sessions();

    let err = DeleteCoordinator::new(&a, &b)
        .with_max_span(1)
        .delete(None, DeleteStrategy::RowLevel)
        .unwrap_err();
    assert!(matches!(err, MirrorError::IntegrityGuard { limit: 10_001, .. }));
}

#[test]
fn test_delete_is_idempotent_for_missing_rows() {
    let pair = pair_with_flights(3);
    let (a, b) = pair.sessions();
    // FL10001 already gone from engine B
    b.execute(&sql::delete_metrics(FlightId::new(10001))).unwrap();
    b.execute(&sql::delete_flight(FlightId::new(10001))).unwrap();

    let outcome = DeleteCoordinator::new(&a, &b)
        .delete(None, DeleteStrategy::RowLevel)
        .unwrap();

    assert_eq!(ids(&outcome.deleted), expected(10000..=10002));
    assert!(outcome.failures.is_empty());
    assert!(dim_ids(&a).is_empty());
    assert!(dim_ids(&b).is_empty());

    let again = DeleteCoordinator::new(&a, &b)
        .delete(None, DeleteStrategy::RowLevel)
        .unwrap();
    assert!(again.deleted.is_empty());
    assert_eq!(again.note.as_deref(), Some(NOTHING_TO_DELETE));
}

#[test]
fn test_failed_delete_does_not_stop_the_loop() {
    let pair = pair_with_flights(4);
    let (a_inner, b) = pair.sessions();
    let a = FaultyEngine::new(&a_inner, |stmt| deletes(stmt, DIM_FLIGHT, "FL10002"));

    let outcome = DeleteCoordinator::new(&a, &b)
        .delete(None, DeleteStrategy::RowLevel)
        .unwrap();

    assert_eq!(ids(&outcome.deleted), expected(10000..=10003));
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].engine, "engine-a");
    assert_eq!(ids(&outcome.failures[0].flight_ids), vec!["FL10002"]);

    assert_eq!(dim_ids(&a_inner), vec!["FL10002"]);
    assert!(fact_ids(&a_inner).is_empty());
    assert!(dim_ids(&b).is_empty());
}

// =============================================================================
// Chunked strategy
// =============================================================================

#[test]
fn test_chunked_delete() {
    let pair = pair_with_flights(25);
    let (a, b) = pair.sessions();

    let outcome = DeleteCoordinator::new(&a, &b)
        .delete(Some(20), DeleteStrategy::Chunked { chunk_size: 7 })
        .unwrap();

    assert_eq!(ids(&outcome.deleted), expected(10005..=10024));
    for engine in [&a as &dyn Engine, &b] {
        assert_eq!(dim_ids(engine), expected(10000..=10004));
        assert_eq!(fact_ids(engine), expected(10000..=10004));
    }
}

#[test]
fn test_chunk_failure_rolls_back_that_chunk_on_that_engine() {
    let pair = pair_with_flights(6);
    let (a_inner, b) = pair.sessions();
    let a = FaultyEngine::new(&a_inner, |stmt| deletes(stmt, DIM_FLIGHT, "FL10001"));

    let outcome = DeleteCoordinator::new(&a, &b)
        .delete(None, DeleteStrategy::Chunked { chunk_size: 3 })
        .unwrap();

    assert_eq!(outcome.failures.len(), 1);
    let failure = &outcome.failures[0];
    assert_eq!(ids(&failure.flight_ids), vec!["FL10002", "FL10001", "FL10000"]);

    // the fact delete ran in the same transaction and was rolled back too
    assert_eq!(dim_ids(&a_inner), expected(10000..=10002));
    assert_eq!(fact_ids(&a_inner), expected(10000..=10002));
    assert!(dim_ids(&b).is_empty());

    let report = check::check(&a_inner, &b, &IdAllocator::default()).unwrap();
    assert_eq!(ids(&report.only_in_a), expected(10000..=10002));
}

#[test]
fn test_chunked_reports_progress() {
    let pair = pair_with_flights(5);
    let (a, b) = pair.sessions();
    let seen = std::cell::RefCell::new(Vec::new());

    DeleteCoordinator::new(&a, &b)
        .with_progress(|done| seen.borrow_mut().push(done))
        .delete(None, DeleteStrategy::Chunked { chunk_size: 2 })
        .unwrap();
    assert_eq!(*seen.borrow(), vec![2, 4, 5]);
}

#[test]
fn test_facts_removed_before_dimensions() {
    let pair = pair_with_flights(1);
    let (a_inner, b) = pair.sessions();
    // the fact delete fails; the dimension delete still runs
    let a = FaultyEngine::new(&a_inner, |stmt| deletes(stmt, FACT_FLIGHT_METRICS, "FL10000"));

    let outcome = DeleteCoordinator::new(&a, &b)
        .delete(None, DeleteStrategy::RowLevel)
        .unwrap();

    assert_eq!(outcome.failures.len(), 1);
    assert!(dim_ids(&a_inner).is_empty());
    assert_eq!(fact_ids(&a_inner), vec!["FL10000"]);
}
