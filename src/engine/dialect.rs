//! Per-engine statement rendering.
//!
//! The two warehouses disagree on statement grammar: one rejects trailing
//! terminators and has no parameter binding, the other wants terminated,
//! parameterized statements. Coordinators never see the difference.

use super::value::{SqlValue, Statement};
use serde::{Deserialize, Serialize};

/// Statement grammar spoken by an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Inline literals, no trailing `;` (MonetDB-style)
    Literal,
    /// Bound `$n` parameters, terminated statements (PostgreSQL-style)
    #[default]
    Parameterized,
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "literal" | "monetdb" | "monet" => Ok(Dialect::Literal),
            "parameterized" | "postgres" | "postgresql" | "pg" => Ok(Dialect::Parameterized),
            _ => Err(format!(
                "Unknown dialect: {}. Valid options: literal, parameterized",
                s
            )),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Literal => write!(f, "literal"),
            Dialect::Parameterized => write!(f, "parameterized"),
        }
    }
}

/// A statement in the exact form an engine will receive it
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedStatement {
    pub sql: String,
    /// Parameters still to bind (always empty for [`Dialect::Literal`])
    pub params: Vec<SqlValue>,
}

impl Dialect {
    pub fn render(self, stmt: &Statement) -> RenderedStatement {
        match self {
            Dialect::Literal => RenderedStatement {
                sql: strip_terminators(&interpolate(&stmt.sql, &stmt.params)).to_string(),
                params: Vec::new(),
            },
            Dialect::Parameterized => {
                let mut sql = strip_terminators(&stmt.sql).to_string();
                sql.push(';');
                RenderedStatement {
                    sql,
                    params: stmt.params.clone(),
                }
            }
        }
    }

    /// Keyword that opens an explicit transaction
    pub fn begin_keyword(self) -> &'static str {
        match self {
            Dialect::Literal => "START TRANSACTION",
            Dialect::Parameterized => "BEGIN",
        }
    }
}

/// Remove every trailing `;` and the whitespace around it
pub fn strip_terminators(sql: &str) -> &str {
    let mut rest = sql.trim_end();
    while let Some(stripped) = rest.strip_suffix(';') {
        rest = stripped.trim_end();
    }
    rest
}

/// Replace `$n` placeholders outside quoted regions with literals.
///
/// Placeholders without a matching parameter are left untouched.
pub fn interpolate(sql: &str, params: &[SqlValue]) -> String {
    if params.is_empty() {
        return sql.to_string();
    }

    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + params.len() * 8);
    let mut in_quote = false;
    let mut copied_to = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                in_quote = !in_quote;
                i += 1;
            }
            b'$' if !in_quote => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                let index = sql[start..end].parse::<usize>().ok();
                match index.and_then(|n| n.checked_sub(1)).and_then(|n| params.get(n)) {
                    Some(value) => {
                        out.push_str(&sql[copied_to..i]);
                        out.push_str(&value.to_literal());
                        copied_to = end;
                        i = end;
                    }
                    None => i = end.max(i + 1),
                }
            }
            _ => i += 1,
        }
    }

    out.push_str(&sql[copied_to..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_terminators() {
        assert_eq!(strip_terminators("SELECT 1;"), "SELECT 1");
        assert_eq!(strip_terminators("SELECT 1 ;; \n"), "SELECT 1");
        assert_eq!(strip_terminators("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_literal_dialect_interpolates_and_strips() {
        let stmt = Statement::new("DELETE FROM t WHERE id = $1 AND n = $2;")
            .bind("FL10001")
            .bind(7i64);
        let rendered = Dialect::Literal.render(&stmt);
        assert_eq!(rendered.sql, "DELETE FROM t WHERE id = 'FL10001' AND n = 7");
        assert!(rendered.params.is_empty());
    }

    #[test]
    fn test_parameterized_dialect_terminates_once() {
        let stmt = Statement::new("SELECT * FROM t WHERE id = $1;;").bind("FL1");
        let rendered = Dialect::Parameterized.render(&stmt);
        assert_eq!(rendered.sql, "SELECT * FROM t WHERE id = $1;");
        assert_eq!(rendered.params, vec![SqlValue::from("FL1")]);
    }

    #[test]
    fn test_interpolate_two_digit_placeholders() {
        let params: Vec<SqlValue> = (1..=11).map(SqlValue::Int).collect();
        let sql = interpolate("VALUES ($1, $10, $11)", &params);
        assert_eq!(sql, "VALUES (1, 10, 11)");
    }

    #[test]
    fn test_interpolate_ignores_quoted_dollars() {
        let sql = interpolate("SELECT '$1', $1", &[SqlValue::from("x")]);
        assert_eq!(sql, "SELECT '$1', 'x'");
    }

    #[test]
    fn test_interpolate_leaves_unknown_placeholders() {
        let sql = interpolate("SELECT $3, $", &[SqlValue::Int(1)]);
        assert_eq!(sql, "SELECT $3, $");
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("monetdb".parse::<Dialect>().unwrap(), Dialect::Literal);
        assert_eq!("PG".parse::<Dialect>().unwrap(), Dialect::Parameterized);
        assert!("oracle".parse::<Dialect>().is_err());
    }
}
