//! Dual-Engine Write Coordinator.
//!
//! Allocates a block of identifiers and creates one dimension row plus one
//! fact row per identifier in both engines. Two strategies share the same
//! contract:
//!
//! - **Row-level**: the full saga per identifier, with read-back
//!   verification on Engine A and compensation on failure.
//! - **Batched**: one native transaction per engine per batch. No read-back.
//!   If Engine B's batch fails after Engine A's committed, the batch stays
//!   in Engine A only. There is no cross-engine rollback; such identifiers
//!   are reported in [`WriteOutcome::diverged`] and logged at error level.

use super::saga::{CompensationFailure, Saga, SagaState};
use super::sql;
use crate::allocator::{FlightId, IdAllocator};
use crate::domain::{DomainResolver, ReferenceDomain};
use crate::engine::{transaction, Engine, EngineError, Statement};
use crate::error::Result;
use crate::synth::{FlightMetricRow, FlightRow, RowSynthesizer};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Default rows per batch in batched mode
pub const DEFAULT_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteStrategy {
    #[default]
    RowLevel,
    Batched { batch_size: usize },
}

/// Why an identifier was not committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Engine A already holds the identifier (a concurrent writer won)
    IdentifierTaken,
    /// No foreign-key value available for the row
    DomainUnavailable,
    /// The row could not be read back after the retry
    VerificationFailed,
    EngineFailure,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFlight {
    pub flight_id: FlightId,
    /// Last durable step before the failure
    pub state: SagaState,
    pub reason: SkipReason,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WriteOutcome {
    /// Identifiers committed to both engines, ascending
    pub inserted: Vec<FlightId>,
    pub skipped: Vec<SkippedFlight>,
    /// Batched mode only: committed on Engine A, absent from Engine B
    pub diverged: Vec<FlightId>,
    pub compensation_failures: Vec<CompensationFailure>,
}

/// Failure inside one saga
struct Abort {
    reason: SkipReason,
    detail: String,
}

impl Abort {
    fn new(reason: SkipReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

/// Read-back result
enum Presence {
    Present,
    Absent,
    Unknown(EngineError),
}

fn read_back(engine: &dyn Engine, stmt: &Statement) -> Presence {
    match engine.execute(stmt) {
        Ok(result) if !result.is_empty() => Presence::Present,
        Ok(_) => Presence::Absent,
        Err(e) => Presence::Unknown(e),
    }
}

/// Outcome of an insert followed by read-back
enum Verified {
    Present,
    /// The first insert hit the uniqueness constraint
    Conflict(EngineError),
    /// Not seen after the retry; `insert_error` holds the last insert failure
    Absent { insert_error: Option<EngineError> },
    /// The read-back itself failed; the insert may have landed
    Unknown(EngineError),
}

/// Insert, read back, and retry the insert once if the row was confirmed
/// absent. A failed read-back ends the attempt immediately.
fn insert_verified(engine: &dyn Engine, insert: &Statement, check: &Statement) -> Verified {
    let mut insert_error = None;

    for attempt in 1..=2 {
        match engine.execute(insert) {
            Ok(_) => insert_error = None,
            Err(e) if e.is_conflict() && attempt == 1 => return Verified::Conflict(e),
            Err(e) => {
                warn!(engine = engine.label(), attempt, error = %e, "insert failed");
                insert_error = Some(e);
            }
        }

        match read_back(engine, check) {
            Presence::Present => return Verified::Present,
            Presence::Absent => {
                debug!(engine = engine.label(), attempt, "row not visible after insert");
            }
            Presence::Unknown(e) => {
                warn!(engine = engine.label(), attempt, error = %e, "read-back failed");
                return Verified::Unknown(e);
            }
        }
    }

    Verified::Absent { insert_error }
}

/// Creates mirrored rows in two engines
pub struct WriteCoordinator<'a, R: Rng> {
    a: &'a dyn Engine,
    b: &'a dyn Engine,
    allocator: IdAllocator,
    resolver: DomainResolver,
    synth: RowSynthesizer<R>,
    progress_fn: Option<Box<dyn Fn(u64) + 'a>>,
}

impl<'a, R: Rng> WriteCoordinator<'a, R> {
    pub fn new(a: &'a dyn Engine, b: &'a dyn Engine, synth: RowSynthesizer<R>) -> Self {
        Self {
            a,
            b,
            allocator: IdAllocator::default(),
            resolver: DomainResolver::default(),
            synth,
            progress_fn: None,
        }
    }

    pub fn with_allocator(mut self, allocator: IdAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn with_resolver(mut self, resolver: DomainResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Called with the number of identifiers processed so far
    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(u64) + 'a,
    {
        self.progress_fn = Some(Box::new(f));
        self
    }

    /// Write `count` new flights.
    ///
    /// Fails without writing anything if the reference domain is
    /// insufficient or `count` is zero. Otherwise every identifier is
    /// attempted and partial success is reported through the outcome.
    pub fn write(&mut self, count: u64, strategy: WriteStrategy) -> Result<WriteOutcome> {
        let resolved = self.resolver.resolve(self.a, self.b)?;
        let start = self.allocator.next_start(self.a, self.b);
        let block = self.allocator.block(start, count)?;
        let ids: Vec<FlightId> = block.map(FlightId::new).collect();

        info!(
            first = %ids[0],
            count,
            policy = %resolved.policy,
            ?strategy,
            "writing flights"
        );

        let outcome = match strategy {
            WriteStrategy::RowLevel => self.write_rows(&ids, &resolved.domain),
            WriteStrategy::Batched { batch_size } => {
                self.write_batches(&ids, &resolved.domain, batch_size.max(1))
            }
        };

        info!(
            inserted = outcome.inserted.len(),
            skipped = outcome.skipped.len(),
            diverged = outcome.diverged.len(),
            compensation_failures = outcome.compensation_failures.len(),
            "write finished"
        );
        Ok(outcome)
    }

    fn report_progress(&self, done: u64) {
        if let Some(ref f) = self.progress_fn {
            f(done);
        }
    }

    fn write_rows(&mut self, ids: &[FlightId], domain: &ReferenceDomain) -> WriteOutcome {
        let mut outcome = WriteOutcome::default();

        for (i, &id) in ids.iter().enumerate() {
            let mut saga = Saga::new(self.a, self.b, id);
            match self.run_saga(&mut saga, domain) {
                Ok(()) => {
                    debug!(flight_id = %id, "committed");
                    outcome.inserted.push(id);
                }
                Err(abort) => {
                    warn!(
                        flight_id = %id,
                        state = %saga.state(),
                        reason = ?abort.reason,
                        detail = %abort.detail,
                        "identifier skipped"
                    );
                    outcome.compensation_failures.extend(saga.compensate());
                    outcome.skipped.push(SkippedFlight {
                        flight_id: id,
                        state: saga.state(),
                        reason: abort.reason,
                        detail: abort.detail,
                    });
                }
            }
            self.report_progress(i as u64 + 1);
        }

        outcome
    }

    /// The create sequence for one identifier. On `Err` the saga's state is
    /// the last durable step, ready for compensation.
    fn run_saga(
        &mut self,
        saga: &mut Saga<'_>,
        domain: &ReferenceDomain,
    ) -> std::result::Result<(), Abort> {
        let id = saga.flight_id();
        let flight = self.synth.flight(id, domain).ok_or_else(|| {
            Abort::new(SkipReason::DomainUnavailable, "no airport or aircraft to reference")
        })?;

        // 1. Engine A dimension, verified
        match insert_verified(self.a, &sql::insert_flight(&flight, false), &sql::select_flight(id)) {
            Verified::Present => {}
            Verified::Conflict(e) => {
                return Err(Abort::new(SkipReason::IdentifierTaken, e.to_string()));
            }
            Verified::Absent { insert_error: Some(e) } => {
                return Err(Abort::new(SkipReason::EngineFailure, e.to_string()));
            }
            Verified::Absent { insert_error: None } => {
                return Err(Abort::new(
                    SkipReason::VerificationFailed,
                    "dimension row not visible on engine A after retry",
                ));
            }
            Verified::Unknown(e) => {
                // the insert may have landed; treat it as written so it is undone
                saga.advance();
                return Err(Abort::new(SkipReason::VerificationFailed, e.to_string()));
            }
        }
        saga.advance();

        // 2. Engine B dimension, duplicate is a no-op
        match self.b.execute(&sql::insert_flight(&flight, true)) {
            Ok(_) => {}
            Err(e) if e.is_conflict() => {
                debug!(flight_id = %id, "engine B already holds dimension row");
            }
            Err(e) => return Err(Abort::new(SkipReason::EngineFailure, e.to_string())),
        }
        saga.advance();

        // 3. Fact foreign keys
        let metric = self.synth.metric(&flight, domain).ok_or_else(|| {
            Abort::new(SkipReason::DomainUnavailable, "no passenger or date to reference")
        })?;

        // 4. Engine A fact, verified
        match insert_verified(self.a, &sql::insert_metric(&metric), &sql::select_metric(&metric)) {
            Verified::Present => {}
            Verified::Conflict(e) | Verified::Unknown(e) => {
                return Err(Abort::new(SkipReason::VerificationFailed, e.to_string()));
            }
            Verified::Absent { insert_error } => {
                let detail = insert_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "fact row not visible on engine A after retry".to_string());
                return Err(Abort::new(SkipReason::VerificationFailed, detail));
            }
        }
        saga.advance();

        // 5. Engine B fact
        self.b
            .execute(&sql::insert_metric(&metric))
            .map_err(|e| Abort::new(SkipReason::EngineFailure, e.to_string()))?;
        saga.advance();

        // 6. Committed
        saga.advance();
        Ok(())
    }

    fn write_batches(
        &mut self,
        ids: &[FlightId],
        domain: &ReferenceDomain,
        batch_size: usize,
    ) -> WriteOutcome {
        let mut outcome = WriteOutcome::default();
        let mut done = 0u64;

        for chunk in ids.chunks(batch_size) {
            let mut flights: Vec<FlightRow> = Vec::with_capacity(chunk.len());
            let mut metrics: Vec<FlightMetricRow> = Vec::with_capacity(chunk.len());

            for &id in chunk {
                let rows = self
                    .synth
                    .flight(id, domain)
                    .and_then(|f| self.synth.metric(&f, domain).map(|m| (f, m)));
                match rows {
                    Some((flight, metric)) => {
                        flights.push(flight);
                        metrics.push(metric);
                    }
                    None => outcome.skipped.push(SkippedFlight {
                        flight_id: id,
                        state: SagaState::Pending,
                        reason: SkipReason::DomainUnavailable,
                        detail: "incomplete reference domain".to_string(),
                    }),
                }
            }

            done += chunk.len() as u64;
            if flights.is_empty() {
                self.report_progress(done);
                continue;
            }
            let batch_ids: Vec<FlightId> = flights.iter().map(|f| f.flight_id).collect();

            if let Err(e) = write_batch(self.a, &flights, &metrics, false) {
                warn!(
                    first = %batch_ids[0],
                    rows = batch_ids.len(),
                    error = %e,
                    "engine A batch rolled back, batch skipped"
                );
                let reason = if e.is_conflict() {
                    SkipReason::IdentifierTaken
                } else {
                    SkipReason::EngineFailure
                };
                outcome
                    .skipped
                    .extend(batch_ids.iter().map(|&flight_id| SkippedFlight {
                        flight_id,
                        state: SagaState::Pending,
                        reason,
                        detail: e.to_string(),
                    }));
                self.report_progress(done);
                continue;
            }

            match write_batch(self.b, &flights, &metrics, true) {
                Ok(()) => {
                    debug!(first = %batch_ids[0], rows = batch_ids.len(), "batch committed");
                    outcome.inserted.extend(batch_ids);
                }
                Err(e) => {
                    error!(
                        first = %batch_ids[0],
                        last = %batch_ids[batch_ids.len() - 1],
                        rows = batch_ids.len(),
                        error = %e,
                        "batch diverged: committed on engine A, rolled back on engine B"
                    );
                    outcome.diverged.extend(batch_ids);
                }
            }
            self.report_progress(done);
        }

        outcome
    }
}

/// Dimension rows then fact rows in one native transaction
fn write_batch(
    engine: &dyn Engine,
    flights: &[FlightRow],
    metrics: &[FlightMetricRow],
    ignore_conflicts: bool,
) -> std::result::Result<(), EngineError> {
    transaction(engine, |tx| {
        tx.execute(&sql::insert_flights(flights, ignore_conflicts))?;
        tx.execute(&sql::insert_metrics(metrics))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_strategy_is_row_level() {
        assert_eq!(WriteStrategy::default(), WriteStrategy::RowLevel);
    }

    #[test]
    fn test_outcome_serializes_identifiers_as_strings() {
        let outcome = WriteOutcome {
            inserted: vec![FlightId::new(10000)],
            ..Default::default()
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["inserted"][0], "FL10000");
        assert!(json["skipped"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_skip_reason_serialization() {
        let json = serde_json::to_string(&SkipReason::IdentifierTaken).unwrap();
        assert_eq!(json, r#""identifier_taken""#);
    }
}
