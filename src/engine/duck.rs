//! DuckDB-backed engine.
//!
//! A [`DuckDatabase`] owns the database; coordinators never touch it
//! directly. Each invocation takes a [`DuckSession`] (its own connection to
//! the same database) and the session is released when it goes out of scope,
//! whichever way the invocation ends.

use super::value::{QueryResult, SqlValue, Statement};
use super::{Dialect, Engine, EngineError};
use anyhow::{Context, Result};
use duckdb::types::{Value, ValueRef};
use duckdb::Connection;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An embedded DuckDB database
pub struct DuckDatabase {
    conn: Connection,
    path: Option<PathBuf>,
}

impl DuckDatabase {
    /// Open (or create) a file-backed database
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB database: {}", path.display()))?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to create in-memory DuckDB database")?;
        Ok(Self { conn, path: None })
    }

    /// Hand out a session speaking `dialect`
    pub fn session(&self, label: &str, dialect: Dialect) -> Result<DuckSession> {
        let conn = self
            .conn
            .try_clone()
            .with_context(|| format!("Failed to open session for {}", label))?;
        debug!(engine = label, %dialect, "session acquired");
        Ok(DuckSession {
            conn,
            label: label.to_string(),
            dialect,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// A connection scoped to one coordinator invocation
pub struct DuckSession {
    conn: Connection,
    label: String,
    dialect: Dialect,
}

impl Engine for DuckSession {
    fn label(&self) -> &str {
        &self.label
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute(&self, stmt: &Statement) -> Result<QueryResult, EngineError> {
        let rendered = self.dialect.render(stmt);
        let params: Vec<Value> = rendered.params.iter().map(to_duck_value).collect();
        let err = |e: duckdb::Error| EngineError::classify(&self.label, e.to_string());

        let mut prepared = self.conn.prepare(&rendered.sql).map_err(err)?;

        if !returns_rows(&rendered.sql) {
            let affected = prepared
                .execute(duckdb::params_from_iter(params.iter()))
                .map_err(err)?;
            return Ok(QueryResult {
                affected,
                ..Default::default()
            });
        }

        let mut rows_result = prepared
            .query(duckdb::params_from_iter(params.iter()))
            .map_err(err)?;

        let mut rows: Vec<Vec<SqlValue>> = Vec::new();
        let mut column_count = 0;

        while let Some(row) = rows_result.next().map_err(err)? {
            if column_count == 0 {
                column_count = row.as_ref().column_count();
            }

            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value = row.get_ref(i).map_err(err)?;
                values.push(from_value_ref(value));
            }
            rows.push(values);
        }

        // Release the row iterator before asking the statement for columns
        drop(rows_result);

        let columns = (0..prepared.column_count())
            .map(|i| {
                prepared
                    .column_name(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| format!("col{}", i))
            })
            .collect();

        Ok(QueryResult {
            columns,
            rows,
            affected: 0,
        })
    }
}

impl Drop for DuckSession {
    fn drop(&mut self) {
        debug!(engine = %self.label, "session released");
    }
}

/// Whether a statement produces a result set
fn returns_rows(sql: &str) -> bool {
    let head = sql
        .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();
    matches!(
        head.as_str(),
        "SELECT" | "WITH" | "SHOW" | "DESCRIBE" | "FROM" | "VALUES"
    )
}

fn to_duck_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Int(n) => Value::BigInt(*n),
        SqlValue::Float(f) => Value::Double(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Money(m) => Value::Double(m.as_f64()),
    }
}

fn from_value_ref(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Boolean(b) => SqlValue::Int(b as i64),
        ValueRef::TinyInt(n) => SqlValue::Int(n as i64),
        ValueRef::SmallInt(n) => SqlValue::Int(n as i64),
        ValueRef::Int(n) => SqlValue::Int(n as i64),
        ValueRef::BigInt(n) => SqlValue::Int(n),
        ValueRef::HugeInt(n) => i64::try_from(n)
            .map(SqlValue::Int)
            .unwrap_or_else(|_| SqlValue::Text(n.to_string())),
        ValueRef::UTinyInt(n) => SqlValue::Int(n as i64),
        ValueRef::USmallInt(n) => SqlValue::Int(n as i64),
        ValueRef::UInt(n) => SqlValue::Int(n as i64),
        ValueRef::UBigInt(n) => i64::try_from(n)
            .map(SqlValue::Int)
            .unwrap_or_else(|_| SqlValue::Text(n.to_string())),
        ValueRef::Float(f) => SqlValue::Float(f as f64),
        ValueRef::Double(f) => SqlValue::Float(f),
        // Exact DECIMAL text; parsed back into Money by the caller
        ValueRef::Decimal(d) => SqlValue::Text(d.to_string()),
        ValueRef::Text(s) => SqlValue::Text(String::from_utf8_lossy(s).to_string()),
        ValueRef::Date32(days) => {
            // Days since epoch (1970-01-01)
            match chrono::NaiveDate::from_num_days_from_ce_opt(719163 + days) {
                Some(date) => SqlValue::Text(date.format("%Y-%m-%d").to_string()),
                None => SqlValue::Int(days as i64),
            }
        }
        other => SqlValue::Text(format!("{:?}", other)),
    }
}
