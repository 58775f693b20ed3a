//! Values, statements and result sets exchanged with an engine.

use std::fmt;
use std::str::FromStr;

/// A currency amount with exactly two decimals, stored as integer cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Round a floating point amount to the nearest cent
    pub fn from_f64(value: f64) -> Self {
        Self((value * 100.0).round() as i64)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        let invalid = || format!("Invalid money amount: {}", s);

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        // DECIMAL columns may render trailing zeros beyond two places
        let (kept, rest) = frac.split_at(frac.len().min(2));
        if rest.bytes().any(|b| b != b'0') {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let cents: i64 = match kept.len() {
            0 => 0,
            1 => kept.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => kept.parse().map_err(|_| invalid())?,
        };
        let total = whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(cents))
            .ok_or_else(invalid)?;
        Ok(Money(if negative { -total } else { total }))
    }
}

/// A single SQL value, either bound as a parameter or read back from a row
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Money(Money),
}

impl SqlValue {
    /// Render as an inline SQL literal (single quotes doubled)
    pub fn to_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Int(n) => n.to_string(),
            SqlValue::Float(f) if f.is_finite() => f.to_string(),
            SqlValue::Float(_) => "NULL".to_string(),
            SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            SqlValue::Money(m) => m.to_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(n) => Some(*n),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_money(&self) -> Option<Money> {
        match self {
            SqlValue::Money(m) => Some(*m),
            SqlValue::Int(n) => n.checked_mul(100).map(Money::from_cents),
            SqlValue::Float(f) if f.is_finite() => Some(Money::from_f64(*f)),
            SqlValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Textual form of a key column; `None` for NULL and empty strings
    pub fn to_key(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Int(n) => Some(n.to_string()),
            SqlValue::Float(f) => Some(f.to_string()),
            SqlValue::Text(s) if s.is_empty() => None,
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Money(m) => Some(m.to_string()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<&String> for SqlValue {
    fn from(s: &String) -> Self {
        SqlValue::Text(s.clone())
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Int(n)
    }
}

impl From<Money> for SqlValue {
    fn from(m: Money) -> Self {
        SqlValue::Money(m)
    }
}

/// SQL text with positional `$1..$n` placeholders and the values bound to them.
///
/// Statements are written once; each engine's dialect decides whether the
/// placeholders are bound or interpolated.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }

    /// True if any bound parameter equals the given text
    pub fn binds_text(&self, text: &str) -> bool {
        self.params.iter().any(|p| p.as_text() == Some(text))
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql.trim())
    }
}

/// Result of executing a statement
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Column names (empty for statements that return no rows)
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
    /// Rows affected by a data-modifying statement
    pub affected: usize,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Values of the first column, skipping rows without one
    pub fn first_column(&self) -> impl Iterator<Item = &SqlValue> {
        self.rows.iter().filter_map(|r| r.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(12345).to_string(), "123.45");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-250).to_string(), "-2.50");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_money_parse() {
        assert_eq!("123.45".parse::<Money>().unwrap(), Money::from_cents(12345));
        assert_eq!("7".parse::<Money>().unwrap(), Money::from_cents(700));
        assert_eq!("7.5".parse::<Money>().unwrap(), Money::from_cents(750));
        assert_eq!("-1.25".parse::<Money>().unwrap(), Money::from_cents(-125));
        assert_eq!("10.500".parse::<Money>().unwrap(), Money::from_cents(1050));
        assert!("10.505".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!(".5".parse::<Money>().is_err());
    }

    #[test]
    fn test_money_from_f64_rounds_to_cents() {
        assert_eq!(Money::from_f64(19.999), Money::from_cents(2000));
        assert_eq!(Money::from_f64(0.004), Money::ZERO);
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(SqlValue::from("O'Hare").to_literal(), "'O''Hare'");
        assert_eq!(SqlValue::Null.to_literal(), "NULL");
        assert_eq!(SqlValue::Int(42).to_literal(), "42");
        assert_eq!(SqlValue::Money(Money::from_cents(9901)).to_literal(), "99.01");
    }

    #[test]
    fn test_to_key_skips_null_and_empty() {
        assert_eq!(SqlValue::Null.to_key(), None);
        assert_eq!(SqlValue::from("").to_key(), None);
        assert_eq!(SqlValue::Int(20230101).to_key().as_deref(), Some("20230101"));
    }
}
