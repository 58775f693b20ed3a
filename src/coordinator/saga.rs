//! Per-identifier saga across the two engines.
//!
//! Writes always go Engine A then Engine B, dimension before fact. The saga
//! records the last durable step; when a later step fails, the compensation
//! table gives the exact deletes that unwind it, Engine B first.
//!
//! ```text
//! Pending -> DimAWritten -> DimBWritten -> FactAWritten -> FactBWritten -> Committed
//! ```

use super::sql;
use crate::allocator::FlightId;
use crate::engine::{Engine, Statement};
use serde::Serialize;
use std::fmt;
use tracing::{error, info};

/// Last durable step of one identifier's create sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaState {
    Pending,
    DimAWritten,
    DimBWritten,
    FactAWritten,
    FactBWritten,
    Committed,
}

impl SagaState {
    /// The state after the next step succeeds
    pub fn next(self) -> SagaState {
        match self {
            SagaState::Pending => SagaState::DimAWritten,
            SagaState::DimAWritten => SagaState::DimBWritten,
            SagaState::DimBWritten => SagaState::FactAWritten,
            SagaState::FactAWritten => SagaState::FactBWritten,
            SagaState::FactBWritten | SagaState::Committed => SagaState::Committed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SagaState::Pending => "pending",
            SagaState::DimAWritten => "dim_a_written",
            SagaState::DimBWritten => "dim_b_written",
            SagaState::FactAWritten => "fact_a_written",
            SagaState::FactBWritten => "fact_b_written",
            SagaState::Committed => "committed",
        }
    }
}

impl fmt::Display for SagaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which engine a compensating delete runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    A,
    B,
}

/// One compensating delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Compensation {
    DeleteFactA,
    DeleteDimA,
    DeleteDimB,
}

impl Compensation {
    pub fn side(self) -> Side {
        match self {
            Compensation::DeleteFactA | Compensation::DeleteDimA => Side::A,
            Compensation::DeleteDimB => Side::B,
        }
    }

    pub fn statement(self, flight_id: FlightId) -> Statement {
        match self {
            Compensation::DeleteFactA => sql::delete_metrics(flight_id),
            Compensation::DeleteDimA | Compensation::DeleteDimB => sql::delete_flight(flight_id),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Compensation::DeleteFactA => "delete_fact_a",
            Compensation::DeleteDimA => "delete_dim_a",
            Compensation::DeleteDimB => "delete_dim_b",
        }
    }
}

impl fmt::Display for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deletes that unwind a saga which failed after reaching `state`.
///
/// `DimBWritten` also removes Engine A's fact: a fact insert that failed
/// verification may still have landed. Once Engine B holds the fact the
/// identifier is complete and nothing is undone.
pub fn compensation_plan(state: SagaState) -> &'static [Compensation] {
    use Compensation::*;
    match state {
        SagaState::Pending => &[],
        SagaState::DimAWritten => &[DeleteDimA],
        SagaState::DimBWritten => &[DeleteDimB, DeleteFactA, DeleteDimA],
        SagaState::FactAWritten => &[DeleteDimB, DeleteFactA, DeleteDimA],
        SagaState::FactBWritten | SagaState::Committed => &[],
    }
}

/// A compensating delete that itself failed, leaving the engines divergent
#[derive(Debug, Clone, Serialize)]
pub struct CompensationFailure {
    pub flight_id: FlightId,
    pub action: Compensation,
    pub engine: String,
    pub error: String,
}

/// Tracks one identifier through the create sequence
pub struct Saga<'a> {
    a: &'a dyn Engine,
    b: &'a dyn Engine,
    flight_id: FlightId,
    state: SagaState,
}

impl<'a> Saga<'a> {
    pub fn new(a: &'a dyn Engine, b: &'a dyn Engine, flight_id: FlightId) -> Self {
        Self {
            a,
            b,
            flight_id,
            state: SagaState::Pending,
        }
    }

    pub fn flight_id(&self) -> FlightId {
        self.flight_id
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    /// Record that the next step is durable
    pub fn advance(&mut self) -> SagaState {
        self.state = self.state.next();
        self.state
    }

    /// Run the compensation plan for the current state.
    ///
    /// Every action is attempted even if an earlier one fails; failures are
    /// returned so the caller can surface them.
    pub fn compensate(&self) -> Vec<CompensationFailure> {
        let mut failures = Vec::new();

        for &action in compensation_plan(self.state) {
            let engine = match action.side() {
                Side::A => self.a,
                Side::B => self.b,
            };
            match engine.execute(&action.statement(self.flight_id)) {
                Ok(_) => {
                    info!(
                        flight_id = %self.flight_id,
                        %action,
                        engine = engine.label(),
                        "compensated"
                    );
                }
                Err(e) => {
                    error!(
                        flight_id = %self.flight_id,
                        %action,
                        engine = engine.label(),
                        error = %e,
                        "compensation failed, engines may diverge"
                    );
                    failures.push(CompensationFailure {
                        flight_id: self.flight_id,
                        action,
                        engine: engine.label().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_advance_in_order() {
        let mut state = SagaState::Pending;
        let mut seen = vec![state];
        while state != SagaState::Committed {
            state = state.next();
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![
                SagaState::Pending,
                SagaState::DimAWritten,
                SagaState::DimBWritten,
                SagaState::FactAWritten,
                SagaState::FactBWritten,
                SagaState::Committed,
            ]
        );
    }

    #[test]
    fn test_nothing_to_undo_before_first_write() {
        assert!(compensation_plan(SagaState::Pending).is_empty());
    }

    #[test]
    fn test_failed_engine_b_dimension_undoes_engine_a() {
        assert_eq!(
            compensation_plan(SagaState::DimAWritten),
            &[Compensation::DeleteDimA]
        );
    }

    #[test]
    fn test_failed_engine_b_fact_is_full_rollback() {
        let plan = compensation_plan(SagaState::FactAWritten);
        assert!(plan.contains(&Compensation::DeleteFactA));
        assert!(plan.contains(&Compensation::DeleteDimA));
        assert!(plan.contains(&Compensation::DeleteDimB));
    }

    #[test]
    fn test_plans_unwind_engine_b_first() {
        for state in [
            SagaState::DimAWritten,
            SagaState::DimBWritten,
            SagaState::FactAWritten,
        ] {
            let sides: Vec<Side> = compensation_plan(state).iter().map(|c| c.side()).collect();
            let first_a = sides.iter().position(|s| *s == Side::A);
            let last_b = sides.iter().rposition(|s| *s == Side::B);
            if let (Some(first_a), Some(last_b)) = (first_a, last_b) {
                assert!(last_b < first_a, "{} unwinds A before B", state);
            }
        }
    }

    #[test]
    fn test_fact_deleted_before_its_dimension() {
        let plan = compensation_plan(SagaState::FactAWritten);
        let fact = plan.iter().position(|c| *c == Compensation::DeleteFactA);
        let dim = plan.iter().position(|c| *c == Compensation::DeleteDimA);
        assert!(fact < dim);
    }

    #[test]
    fn test_committed_has_no_compensation() {
        assert!(compensation_plan(SagaState::FactBWritten).is_empty());
        assert!(compensation_plan(SagaState::Committed).is_empty());
    }

    #[test]
    fn test_compensation_statements() {
        let stmt = Compensation::DeleteDimB.statement(FlightId::new(10005));
        assert!(stmt.sql.contains("dim_flight"));
        assert!(stmt.binds_text("FL10005"));
        assert_eq!(Compensation::DeleteFactA.side(), Side::A);
    }
}
