//! Engine execute primitive shared by every coordinator.
//!
//! Each warehouse is reached through an [`Engine`]: hand it a dialect-neutral
//! [`Statement`], get back rows or an [`EngineError`]. Parameter binding versus
//! literal interpolation, terminator tolerance and the transaction keyword are
//! the engine's business, so the orchestration logic above stays
//! dialect-agnostic.
//!
//! # Example
//!
//! ```ignore
//! use flight_mirror::engine::{Dialect, DuckDatabase, Engine, Statement};
//!
//! let db = DuckDatabase::open_in_memory()?;
//! let engine = db.session("engine-a", Dialect::Literal)?;
//! let result = engine.execute(&Statement::new("SELECT $1").bind(1i64))?;
//! ```

mod dialect;
mod duck;
mod value;

pub use dialect::{interpolate, strip_terminators, Dialect, RenderedStatement};
pub use duck::{DuckDatabase, DuckSession};
pub use value::{Money, QueryResult, SqlValue, Statement};

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Broad classification of an engine failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorKind {
    /// Uniqueness constraint rejected the write (row already present)
    Conflict,
    /// Connection-level failure, the engine could not be reached
    Unavailable,
    /// The statement itself failed
    Statement,
}

#[derive(Debug, Clone, Error)]
#[error("{engine}: {message}")]
pub struct EngineError {
    pub engine: String,
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(engine: &str, kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            engine: engine.to_string(),
            kind,
            message: message.into(),
        }
    }

    /// Classify a raw driver message
    pub fn classify(engine: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let kind = if lower.contains("duplicate key")
            || lower.contains("unique constraint")
            || lower.contains("primary key or unique constraint")
        {
            EngineErrorKind::Conflict
        } else if lower.contains("connection") || lower.contains("io error") {
            EngineErrorKind::Unavailable
        } else {
            EngineErrorKind::Statement
        };
        Self::new(engine, kind, message)
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == EngineErrorKind::Conflict
    }
}

/// One SQL engine, reached through a single execute primitive
pub trait Engine {
    /// Human-readable name used in logs and diagnostics
    fn label(&self) -> &str;

    fn dialect(&self) -> Dialect;

    fn execute(&self, stmt: &Statement) -> Result<QueryResult, EngineError>;

    /// Execute parameterless SQL text
    fn run(&self, sql: &str) -> Result<QueryResult, EngineError> {
        self.execute(&Statement::new(sql))
    }

    fn begin(&self) -> Result<(), EngineError> {
        self.run(self.dialect().begin_keyword()).map(|_| ())
    }

    fn commit(&self) -> Result<(), EngineError> {
        self.run("COMMIT").map(|_| ())
    }

    fn rollback(&self) -> Result<(), EngineError> {
        self.run("ROLLBACK").map(|_| ())
    }
}

/// Run `body` inside an explicit transaction on `engine`.
///
/// Commits on success. On failure the transaction is rolled back and the
/// original error returned; a failing rollback is logged, not raised.
pub fn transaction<T>(
    engine: &dyn Engine,
    body: impl FnOnce(&dyn Engine) -> Result<T, EngineError>,
) -> Result<T, EngineError> {
    engine.begin()?;
    match body(engine).and_then(|value| engine.commit().map(|_| value)) {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Err(rollback_err) = engine.rollback() {
                warn!(engine = engine.label(), error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_conflict() {
        let err = EngineError::classify(
            "b",
            "Constraint Error: Duplicate key \"flight_id: FL10000\" violates primary key constraint",
        );
        assert!(err.is_conflict());
    }

    #[test]
    fn test_classify_statement_error() {
        let err = EngineError::classify("a", "Parser Error: syntax error at or near \";\"");
        assert_eq!(err.kind, EngineErrorKind::Statement);
        assert_eq!(err.to_string(), "a: Parser Error: syntax error at or near \";\"");
    }
}
