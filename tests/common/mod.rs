//! Shared fixtures: two in-memory engines and a fault-injecting wrapper.

#![allow(dead_code)]

use flight_mirror::engine::{
    Dialect, DuckDatabase, DuckSession, Engine, EngineError, EngineErrorKind, QueryResult,
    SqlValue, Statement,
};
use flight_mirror::schema;
use std::cell::Cell;
use test_data_gen::{Generator, RenderConfig, Renderer, Scale};

/// Engine A (literal dialect) and Engine B (parameterized), schema created
pub struct EnginePair {
    pub db_a: DuckDatabase,
    pub db_b: DuckDatabase,
}

impl EnginePair {
    pub fn new() -> Self {
        let pair = Self::without_schema();
        let (a, b) = pair.sessions();
        schema::bootstrap(&a).unwrap();
        schema::bootstrap(&b).unwrap();
        pair
    }

    /// Engines with no tables at all; every warehouse query fails
    pub fn without_schema() -> Self {
        Self {
            db_a: DuckDatabase::open_in_memory().unwrap(),
            db_b: DuckDatabase::open_in_memory().unwrap(),
        }
    }

    pub fn sessions(&self) -> (DuckSession, DuckSession) {
        (
            self.db_a.session("engine-a", Dialect::Literal).unwrap(),
            self.db_b.session("engine-b", Dialect::Parameterized).unwrap(),
        )
    }

    /// Schema plus the same minimal domain in both engines
    pub fn with_minimal_domain() -> Self {
        let pair = Self::new();
        let (a, b) = pair.sessions();
        seed_minimal(&a);
        seed_minimal(&b);
        pair
    }

    /// Schema plus the same generated domain in both engines
    pub fn with_domain(scale: Scale) -> Self {
        let pair = Self::new();
        let (a, b) = pair.sessions();
        seed_generated(&a, scale, 42);
        seed_generated(&b, scale, 42);
        pair
    }
}

/// Airports AMS and CDG, aircraft AC1, passenger P1, date 20230101
pub fn seed_minimal(engine: &dyn Engine) {
    for code in ["AMS", "CDG"] {
        insert_airport(engine, code);
    }
    insert_aircraft(engine, "AC1");
    insert_passenger(engine, "P1");
    insert_date(engine, 20230101);
}

pub fn seed_generated(engine: &dyn Engine, scale: Scale, seed: u64) {
    let data = Generator::new(seed, scale).generate();
    for stmt in Renderer::new(RenderConfig::default()).statements(&data) {
        engine.run(&stmt).unwrap();
    }
}

pub fn insert_airport(engine: &dyn Engine, code: &str) {
    engine
        .execute(
            &Statement::new(format!(
                "INSERT INTO {} (airport_id, airport_name, city, country) VALUES ($1, $2, $3, $4)",
                schema::DIM_AIRPORT
            ))
            .bind(code)
            .bind(format!("{} Airport", code))
            .bind("Somewhere")
            .bind("Nowhere"),
        )
        .unwrap();
}

pub fn insert_aircraft(engine: &dyn Engine, id: &str) {
    engine
        .execute(
            &Statement::new(format!(
                "INSERT INTO {} (aircraft_id, model, capacity) VALUES ($1, $2, $3)",
                schema::DIM_AIRCRAFT
            ))
            .bind(id)
            .bind("Boeing 737-800")
            .bind(189i64),
        )
        .unwrap();
}

pub fn insert_passenger(engine: &dyn Engine, id: &str) {
    engine
        .execute(
            &Statement::new(format!(
                "INSERT INTO {} (passenger_id, full_name, nationality) VALUES ($1, $2, $3)",
                schema::DIM_PASSENGER
            ))
            .bind(id)
            .bind("Jan O'Neill")
            .bind("Irish"),
        )
        .unwrap();
}

pub fn insert_date(engine: &dyn Engine, date_id: i64) {
    engine
        .execute(
            &Statement::new(format!(
                "INSERT INTO {} (date_id, day_of_week) VALUES ($1, $2)",
                schema::DIM_DATE
            ))
            .bind(date_id)
            .bind("Sunday"),
        )
        .unwrap();
}

/// A bare dimension row, for setting up identifier scans
pub fn insert_flight_id(engine: &dyn Engine, flight_id: &str) {
    engine
        .execute(
            &Statement::new(format!(
                "INSERT INTO {} (flight_id, flight_duration_min) VALUES ($1, $2)",
                schema::DIM_FLIGHT
            ))
            .bind(flight_id)
            .bind(90i64),
        )
        .unwrap();
}

pub fn query(engine: &dyn Engine, sql: &str) -> QueryResult {
    engine.run(sql).unwrap()
}

/// Sorted `flight_id`s of a table
pub fn flight_ids(engine: &dyn Engine, table: &str) -> Vec<String> {
    let result = query(
        engine,
        &format!("SELECT flight_id FROM {} ORDER BY flight_id", table),
    );
    result
        .first_column()
        .filter_map(|v| v.as_text().map(str::to_string))
        .collect()
}

pub fn dim_ids(engine: &dyn Engine) -> Vec<String> {
    flight_ids(engine, schema::DIM_FLIGHT)
}

pub fn fact_ids(engine: &dyn Engine) -> Vec<String> {
    flight_ids(engine, schema::FACT_FLIGHT_METRICS)
}

/// Full dimension row for one identifier
pub fn dim_row(engine: &dyn Engine, flight_id: &str) -> Option<Vec<SqlValue>> {
    let result = engine
        .execute(
            &Statement::new(format!(
                "SELECT {} FROM {} WHERE flight_id = $1",
                schema::column_list(schema::DIM_FLIGHT_COLUMNS),
                schema::DIM_FLIGHT
            ))
            .bind(flight_id),
        )
        .unwrap();
    result.rows.into_iter().next()
}

/// Fact rows for one identifier
pub fn fact_rows(engine: &dyn Engine, flight_id: &str) -> Vec<Vec<SqlValue>> {
    engine
        .execute(
            &Statement::new(format!(
                "SELECT {} FROM {} WHERE flight_id = $1",
                schema::column_list(schema::FACT_FLIGHT_METRICS_COLUMNS),
                schema::FACT_FLIGHT_METRICS
            ))
            .bind(flight_id),
        )
        .unwrap()
        .rows
}

/// True for an INSERT into `table` that binds `flight_id`
pub fn inserts(stmt: &Statement, table: &str, flight_id: &str) -> bool {
    stmt.sql.starts_with(&format!("INSERT INTO {}", table)) && stmt.binds_text(flight_id)
}

/// True for a DELETE from `table` that binds `flight_id`
pub fn deletes(stmt: &Statement, table: &str, flight_id: &str) -> bool {
    stmt.sql.starts_with(&format!("DELETE FROM {}", table)) && stmt.binds_text(flight_id)
}

/// True for a SELECT from `table` that binds `flight_id`
pub fn reads(stmt: &Statement, table: &str, flight_id: &str) -> bool {
    stmt.sql.starts_with("SELECT")
        && stmt.sql.contains(&format!("FROM {}", table))
        && stmt.binds_text(flight_id)
}

type Predicate<'a> = Box<dyn Fn(&Statement) -> bool + 'a>;

/// Wraps an engine and fails the statements a predicate selects
pub struct FaultyEngine<'a> {
    inner: &'a dyn Engine,
    predicate: Predicate<'a>,
    /// Remaining failures; `None` fails every match
    budget: Cell<Option<usize>>,
    injected: Cell<usize>,
}

impl<'a> FaultyEngine<'a> {
    pub fn new<F>(inner: &'a dyn Engine, predicate: F) -> Self
    where
        F: Fn(&Statement) -> bool + 'a,
    {
        Self {
            inner,
            predicate: Box::new(predicate),
            budget: Cell::new(None),
            injected: Cell::new(0),
        }
    }

    /// Only the first `n` matching statements fail
    pub fn times(self, n: usize) -> Self {
        self.budget.set(Some(n));
        self
    }

    /// Number of failures injected so far
    pub fn injected(&self) -> usize {
        self.injected.get()
    }

    fn should_fail(&self, stmt: &Statement) -> bool {
        if !(self.predicate)(stmt) {
            return false;
        }
        match self.budget.get() {
            Some(0) => false,
            Some(n) => {
                self.budget.set(Some(n - 1));
                true
            }
            None => true,
        }
    }
}

impl Engine for FaultyEngine<'_> {
    fn label(&self) -> &str {
        self.inner.label()
    }

    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    fn execute(&self, stmt: &Statement) -> Result<QueryResult, EngineError> {
        if self.should_fail(stmt) {
            self.injected.set(self.injected.get() + 1);
            return Err(EngineError::new(
                self.label(),
                EngineErrorKind::Unavailable,
                "connection reset by peer (injected)",
            ));
        }
        self.inner.execute(stmt)
    }
}
