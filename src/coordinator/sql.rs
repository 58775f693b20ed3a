//! Dialect-neutral statements issued by the coordinators.

use crate::allocator::FlightId;
use crate::engine::{SqlValue, Statement};
use crate::schema::{self, DIM_FLIGHT_COLUMNS, FACT_FLIGHT_METRICS_COLUMNS};
use crate::synth::{FlightMetricRow, FlightRow};

/// Multi-row INSERT with `$n` placeholders for every value
fn insert_rows(
    table: &str,
    columns: &[&str],
    rows: impl IntoIterator<Item = Vec<SqlValue>>,
    ignore_conflicts: bool,
) -> Statement {
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ",
        table,
        schema::column_list(columns)
    );
    let mut params = Vec::new();

    for (i, row) in rows.into_iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for (j, value) in row.into_iter().enumerate() {
            if j > 0 {
                sql.push_str(", ");
            }
            params.push(value);
            sql.push('$');
            sql.push_str(&params.len().to_string());
        }
        sql.push(')');
    }

    if ignore_conflicts {
        sql.push_str(" ON CONFLICT DO NOTHING");
    }
    Statement::with_params(sql, params)
}

/// Insert one dimension row; `ignore_conflicts` turns a duplicate into a no-op
pub fn insert_flight(row: &FlightRow, ignore_conflicts: bool) -> Statement {
    insert_flights(std::slice::from_ref(row), ignore_conflicts)
}

pub fn insert_flights(rows: &[FlightRow], ignore_conflicts: bool) -> Statement {
    insert_rows(
        schema::DIM_FLIGHT,
        DIM_FLIGHT_COLUMNS,
        rows.iter().map(FlightRow::values),
        ignore_conflicts,
    )
}

pub fn insert_metric(row: &FlightMetricRow) -> Statement {
    insert_metrics(std::slice::from_ref(row))
}

pub fn insert_metrics(rows: &[FlightMetricRow]) -> Statement {
    insert_rows(
        schema::FACT_FLIGHT_METRICS,
        FACT_FLIGHT_METRICS_COLUMNS,
        rows.iter().map(FlightMetricRow::values),
        false,
    )
}

/// Read-back query for a dimension row
pub fn select_flight(id: FlightId) -> Statement {
    Statement::new(format!(
        "SELECT flight_id FROM {} WHERE flight_id = $1",
        schema::DIM_FLIGHT
    ))
    .bind(id.to_string())
}

/// Read-back query for a fact row: identifier + passenger + date
pub fn select_metric(row: &FlightMetricRow) -> Statement {
    Statement::new(format!(
        "SELECT flight_id FROM {} WHERE flight_id = $1 AND passenger_id = $2 AND date_id = $3",
        schema::FACT_FLIGHT_METRICS
    ))
    .bind(row.flight_id.to_string())
    .bind(&row.passenger_id)
    .bind(row.date_id)
}

pub fn delete_flight(id: FlightId) -> Statement {
    Statement::new(format!(
        "DELETE FROM {} WHERE flight_id = $1",
        schema::DIM_FLIGHT
    ))
    .bind(id.to_string())
}

pub fn delete_metrics(id: FlightId) -> Statement {
    Statement::new(format!(
        "DELETE FROM {} WHERE flight_id = $1",
        schema::FACT_FLIGHT_METRICS
    ))
    .bind(id.to_string())
}

fn delete_in(table: &str, ids: &[FlightId]) -> Statement {
    let placeholders = (1..=ids.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");
    Statement::with_params(
        format!("DELETE FROM {} WHERE flight_id IN ({})", table, placeholders),
        ids.iter().map(|id| SqlValue::Text(id.to_string())).collect(),
    )
}

pub fn delete_flights_in(ids: &[FlightId]) -> Statement {
    delete_in(schema::DIM_FLIGHT, ids)
}

pub fn delete_metrics_in(ids: &[FlightId]) -> Statement {
    delete_in(schema::FACT_FLIGHT_METRICS, ids)
}
