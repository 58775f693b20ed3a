//! Read-only divergence detection between the two engines.
//!
//! Compensation failures and diverged batches can leave an identifier in one
//! engine only, a dimension row without its fact row, or a fact row without
//! its dimension row. Fact rows are also compared by count and by content per
//! identifier, so duplicated or differing rows show up even when both engines
//! hold the identifier.

use crate::allocator::{FlightId, IdAllocator};
use crate::engine::{Engine, EngineError, SqlValue, Statement};
use crate::schema;
use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactCountMismatch {
    pub flight_id: FlightId,
    pub rows_a: usize,
    pub rows_b: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DivergenceReport {
    pub dimension_rows_a: usize,
    pub dimension_rows_b: usize,
    /// Dimension rows present in Engine A only
    pub only_in_a: Vec<FlightId>,
    pub only_in_b: Vec<FlightId>,
    pub facts_only_in_a: Vec<FlightId>,
    pub facts_only_in_b: Vec<FlightId>,
    /// Dimension rows with no fact row in the same engine
    pub orphans_a: Vec<FlightId>,
    pub orphans_b: Vec<FlightId>,
    /// Fact rows with no dimension row in the same engine
    pub fact_orphans_a: Vec<FlightId>,
    pub fact_orphans_b: Vec<FlightId>,
    /// Identifiers held by both engines with a different number of fact rows
    pub fact_count_mismatch: Vec<FactCountMismatch>,
    /// Same fact row count on both sides, different column values
    pub fact_value_mismatch: Vec<FlightId>,
}

impl DivergenceReport {
    pub fn is_consistent(&self) -> bool {
        self.only_in_a.is_empty()
            && self.only_in_b.is_empty()
            && self.facts_only_in_a.is_empty()
            && self.facts_only_in_b.is_empty()
            && self.orphans_a.is_empty()
            && self.orphans_b.is_empty()
            && self.fact_orphans_a.is_empty()
            && self.fact_orphans_b.is_empty()
            && self.fact_count_mismatch.is_empty()
            && self.fact_value_mismatch.is_empty()
    }
}

fn synthetic_pattern() -> String {
    format!("{}%", FlightId::PREFIX)
}

/// Synthetic identifiers (`FL<n>`, `n >= base`) in the dimension table
fn synthetic_dimension_ids(
    engine: &dyn Engine,
    allocator: &IdAllocator,
) -> Result<AHashSet<FlightId>, EngineError> {
    let stmt = Statement::new(format!(
        "SELECT DISTINCT flight_id FROM {} WHERE flight_id LIKE $1",
        schema::DIM_FLIGHT
    ))
    .bind(synthetic_pattern());

    let result = engine.execute(&stmt)?;
    Ok(result
        .first_column()
        .filter_map(|v| v.as_text().and_then(FlightId::parse))
        .filter(|id| id.number() >= allocator.base())
        .collect())
}

/// Synthetic fact rows grouped by identifier. Each row is reduced to its
/// rendered column values; the rows of one identifier are sorted.
fn synthetic_facts(
    engine: &dyn Engine,
    allocator: &IdAllocator,
) -> Result<AHashMap<FlightId, Vec<String>>, EngineError> {
    let stmt = Statement::new(format!(
        "SELECT flight_id, {} FROM {} WHERE flight_id LIKE $1",
        schema::column_list(schema::FACT_FLIGHT_METRICS_COLUMNS),
        schema::FACT_FLIGHT_METRICS
    ))
    .bind(synthetic_pattern());

    let result = engine.execute(&stmt)?;
    let mut facts: AHashMap<FlightId, Vec<String>> = AHashMap::new();
    for row in &result.rows {
        let id = match row.first().and_then(|v| v.as_text()).and_then(FlightId::parse) {
            Some(id) if id.number() >= allocator.base() => id,
            _ => continue,
        };
        let rendered: Vec<String> = row[1..].iter().map(SqlValue::to_literal).collect();
        facts.entry(id).or_default().push(rendered.join("|"));
    }
    for rows in facts.values_mut() {
        rows.sort_unstable();
    }
    Ok(facts)
}

fn sorted_difference(left: &AHashSet<FlightId>, right: &AHashSet<FlightId>) -> Vec<FlightId> {
    let mut ids: Vec<FlightId> = left.difference(right).copied().collect();
    ids.sort_unstable();
    ids
}

/// Compare both engines' generated rows
pub fn check(
    a: &dyn Engine,
    b: &dyn Engine,
    allocator: &IdAllocator,
) -> Result<DivergenceReport, EngineError> {
    let dims_a = synthetic_dimension_ids(a, allocator)?;
    let dims_b = synthetic_dimension_ids(b, allocator)?;
    let rows_a = synthetic_facts(a, allocator)?;
    let rows_b = synthetic_facts(b, allocator)?;
    let facts_a: AHashSet<FlightId> = rows_a.keys().copied().collect();
    let facts_b: AHashSet<FlightId> = rows_b.keys().copied().collect();

    let mut shared: Vec<FlightId> = facts_a.intersection(&facts_b).copied().collect();
    shared.sort_unstable();

    let mut fact_count_mismatch = Vec::new();
    let mut fact_value_mismatch = Vec::new();
    for id in shared {
        let (Some(left), Some(right)) = (rows_a.get(&id), rows_b.get(&id)) else {
            continue;
        };
        if left.len() != right.len() {
            fact_count_mismatch.push(FactCountMismatch {
                flight_id: id,
                rows_a: left.len(),
                rows_b: right.len(),
            });
        } else if left != right {
            fact_value_mismatch.push(id);
        }
    }

    let report = DivergenceReport {
        dimension_rows_a: dims_a.len(),
        dimension_rows_b: dims_b.len(),
        only_in_a: sorted_difference(&dims_a, &dims_b),
        only_in_b: sorted_difference(&dims_b, &dims_a),
        facts_only_in_a: sorted_difference(&facts_a, &facts_b),
        facts_only_in_b: sorted_difference(&facts_b, &facts_a),
        orphans_a: sorted_difference(&dims_a, &facts_a),
        orphans_b: sorted_difference(&dims_b, &facts_b),
        fact_orphans_a: sorted_difference(&facts_a, &dims_a),
        fact_orphans_b: sorted_difference(&facts_b, &dims_b),
        fact_count_mismatch,
        fact_value_mismatch,
    };

    info!(
        consistent = report.is_consistent(),
        only_in_a = report.only_in_a.len(),
        only_in_b = report.only_in_b.len(),
        orphans_a = report.orphans_a.len(),
        orphans_b = report.orphans_b.len(),
        fact_orphans_a = report.fact_orphans_a.len(),
        fact_orphans_b = report.fact_orphans_b.len(),
        fact_count_mismatch = report.fact_count_mismatch.len(),
        fact_value_mismatch = report.fact_value_mismatch.len(),
        "divergence check"
    );
    Ok(report)
}
