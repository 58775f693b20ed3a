//! Dual-Engine Delete Coordinator.
//!
//! Removes the most recently generated identifiers from both engines, fact
//! rows before dimension rows, Engine A before Engine B. Deletes are
//! idempotent, so every per-engine delete is best-effort: a failure is
//! logged and recorded and the loop carries on.

use super::sql;
use crate::allocator::{FlightId, IdAllocator};
use crate::engine::{transaction, Engine, EngineError};
use crate::error::{MirrorError, Result};
use serde::Serialize;
use tracing::{info, warn};

/// Default identifiers per chunk in chunked mode
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Widest identifier span above the base a delete will touch
pub const DEFAULT_MAX_DELETE_SPAN: u64 = 1_000_000;

/// Note returned when there is nothing to delete
pub const NOTHING_TO_DELETE: &str = "No generated flights found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteStrategy {
    #[default]
    RowLevel,
    Chunked { chunk_size: usize },
}

/// A delete that failed on one engine
#[derive(Debug, Clone, Serialize)]
pub struct DeleteFailure {
    pub engine: String,
    pub flight_ids: Vec<FlightId>,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteOutcome {
    /// Identifiers in the deleted range, ascending
    pub deleted: Vec<FlightId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub failures: Vec<DeleteFailure>,
}

/// The identifier range a delete will cover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletePlan {
    pub current_max: u64,
    pub first: u64,
}

impl DeletePlan {
    /// Identifiers from `current_max` down to `first`
    pub fn descending(&self) -> impl Iterator<Item = FlightId> {
        (self.first..=self.current_max).rev().map(FlightId::new)
    }

    pub fn count(&self) -> u64 {
        self.current_max - self.first + 1
    }
}

/// Work out the range to delete.
///
/// `Ok(None)` means nothing above `base` exists.
pub fn plan_delete(
    current_max: Option<u64>,
    base: u64,
    max_span: u64,
    count: Option<u64>,
) -> Result<Option<DeletePlan>> {
    if count == Some(0) {
        return Err(MirrorError::InvalidCount(
            "count must be greater than 0".to_string(),
        ));
    }
    let current_max = match current_max {
        Some(max) if max >= base => max,
        _ => return Ok(None),
    };

    let limit = base.saturating_add(max_span);
    if current_max > limit {
        return Err(MirrorError::IntegrityGuard { current_max, limit });
    }

    let total = current_max - base + 1;
    let delete_count = count.map_or(total, |c| c.min(total));
    let first = (current_max + 1 - delete_count).max(base);
    Ok(Some(DeletePlan { current_max, first }))
}

/// Removes generated rows from two engines
pub struct DeleteCoordinator<'a> {
    a: &'a dyn Engine,
    b: &'a dyn Engine,
    allocator: IdAllocator,
    max_span: u64,
    progress_fn: Option<Box<dyn Fn(u64) + 'a>>,
}

impl<'a> DeleteCoordinator<'a> {
    pub fn new(a: &'a dyn Engine, b: &'a dyn Engine) -> Self {
        Self {
            a,
            b,
            allocator: IdAllocator::default(),
            max_span: DEFAULT_MAX_DELETE_SPAN,
            progress_fn: None,
        }
    }

    pub fn with_allocator(mut self, allocator: IdAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn with_max_span(mut self, max_span: u64) -> Self {
        self.max_span = max_span;
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

    /// The range `delete` would cover right now, without deleting
    pub fn plan(&self, count: Option<u64>) -> Result<Option<DeletePlan>> {
        let snapshot = self.allocator.snapshot(self.a, self.b);
        plan_delete(
            snapshot.combined(),
            self.allocator.base(),
            self.max_span,
            count,
        )
    }

    /// Delete the `count` highest identifiers, or all of them when `None`
    pub fn delete(&self, count: Option<u64>, strategy: DeleteStrategy) -> Result<DeleteOutcome> {
        let plan = match self.plan(count)? {
            Some(plan) => plan,
            None => {
                info!("no generated flights to delete");
                return Ok(DeleteOutcome {
                    note: Some(NOTHING_TO_DELETE.to_string()),
                    ..Default::default()
                });
            }
        };

        info!(
            from = %FlightId::new(plan.current_max),
            to = %FlightId::new(plan.first),
            count = plan.count(),
            ?strategy,
            "deleting flights"
        );

        let mut outcome = DeleteOutcome::default();
        let descending: Vec<FlightId> = plan.descending().collect();

        match strategy {
            DeleteStrategy::RowLevel => self.delete_rows(&descending, &mut outcome),
            DeleteStrategy::Chunked { chunk_size } => {
                self.delete_chunks(&descending, chunk_size.max(1), &mut outcome)
            }
        }

        outcome.deleted = descending;
        outcome.deleted.reverse();

        info!(
            deleted = outcome.deleted.len(),
            failures = outcome.failures.len(),
            "delete finished"
        );
        Ok(outcome)
    }

    fn report_progress(&self, done: u64) {
        if let Some(ref f) = self.progress_fn {
            f(done);
        }
    }

    fn delete_rows(&self, ids: &[FlightId], outcome: &mut DeleteOutcome) {
        for (i, &id) in ids.iter().enumerate() {
            for engine in [self.a, self.b] {
                for stmt in [sql::delete_metrics(id), sql::delete_flight(id)] {
                    if let Err(e) = engine.execute(&stmt) {
                        record_failure(engine, vec![id], e, outcome);
                    }
                }
            }
            self.report_progress(i as u64 + 1);
        }
    }

    fn delete_chunks(&self, ids: &[FlightId], chunk_size: usize, outcome: &mut DeleteOutcome) {
        let mut done = 0u64;
        for chunk in ids.chunks(chunk_size) {
            for engine in [self.a, self.b] {
                let result = transaction(engine, |tx| {
                    tx.execute(&sql::delete_metrics_in(chunk))?;
                    tx.execute(&sql::delete_flights_in(chunk))?;
                    Ok(())
                });
                if let Err(e) = result {
                    record_failure(engine, chunk.to_vec(), e, outcome);
                }
            }
            done += chunk.len() as u64;
            self.report_progress(done);
        }
    }
}

fn record_failure(
    engine: &dyn Engine,
    flight_ids: Vec<FlightId>,
    error: EngineError,
    outcome: &mut DeleteOutcome,
) {
    warn!(
        engine = engine.label(),
        first = %flight_ids[0],
        rows = flight_ids.len(),
        error = %error,
        "delete failed, continuing"
    );
    outcome.failures.push(DeleteFailure {
        engine: engine.label().to_string(),
        flight_ids,
        error: error.to_string(),
    });
}
