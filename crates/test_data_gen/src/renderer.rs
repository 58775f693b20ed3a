//! SQL renderer for generated reference data.
//!
//! Emits multi-row INSERT statements with inline literals, which every
//! engine accepts whatever its placeholder style.

use crate::generator::{ReferenceData, TableData};
use std::io::{self, Write};

/// Rendering options
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Rows per INSERT statement
    pub batch_size: usize,
    /// Append `ON CONFLICT DO NOTHING` so reseeding is harmless
    pub ignore_conflicts: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            ignore_conflicts: true,
        }
    }
}

pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// INSERT statements for one table, without terminators
    pub fn table_statements(&self, table: &TableData) -> Vec<String> {
        table
            .rows
            .chunks(self.config.batch_size.max(1))
            .map(|chunk| {
                let values = chunk
                    .iter()
                    .map(|row| {
                        let literals: Vec<String> = row.iter().map(|v| v.to_sql()).collect();
                        format!("({})", literals.join(", "))
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut sql = format!(
                    "INSERT INTO {} ({}) VALUES {}",
                    table.table_name,
                    table.columns.join(", "),
                    values
                );
                if self.config.ignore_conflicts {
                    sql.push_str(" ON CONFLICT DO NOTHING");
                }
                sql
            })
            .collect()
    }

    /// Statements for every reference table, in load order
    pub fn statements(&self, data: &ReferenceData) -> Vec<String> {
        data.tables()
            .iter()
            .flat_map(|t| self.table_statements(t))
            .collect()
    }

    pub fn render<W: Write>(&self, data: &ReferenceData, out: &mut W) -> io::Result<()> {
        writeln!(out, "-- reference dimensions: {} rows", data.total_rows())?;
        for stmt in self.statements(data) {
            writeln!(out, "{};", stmt)?;
        }
        Ok(())
    }

    pub fn render_to_string(&self, data: &ReferenceData) -> io::Result<String> {
        let mut buf = Vec::new();
        self.render(data, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
