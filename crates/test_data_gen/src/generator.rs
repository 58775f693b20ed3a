//! Data generator for the reference dimensions.
//!
//! Produces deterministic rows for `dim_airport`, `dim_aircraft`,
//! `dim_passenger` and `dim_date` at various scales.

use crate::fake::FakeData;
use chrono::{Datelike, Duration, NaiveDate};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub const DIM_AIRPORT: &str = "airline_dw.dim_airport";
pub const DIM_AIRCRAFT: &str = "airline_dw.dim_aircraft";
pub const DIM_PASSENGER: &str = "airline_dw.dim_passenger";
pub const DIM_DATE: &str = "airline_dw.dim_date";

/// Generation scale presets
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    /// 2 airports, 1 aircraft, 1 passenger, 1 day
    Tiny,
    Small,
    Medium,
    Large,
}

impl Scale {
    pub fn airports(&self) -> usize {
        match self {
            Scale::Tiny => 2,
            Scale::Small => 6,
            Scale::Medium => 12,
            Scale::Large => 24,
        }
    }

    pub fn aircraft(&self) -> usize {
        match self {
            Scale::Tiny => 1,
            Scale::Small => 4,
            Scale::Medium => 20,
            Scale::Large => 100,
        }
    }

    pub fn passengers(&self) -> usize {
        match self {
            Scale::Tiny => 1,
            Scale::Small => 25,
            Scale::Medium => 500,
            Scale::Large => 10_000,
        }
    }

    pub fn days(&self) -> usize {
        match self {
            Scale::Tiny => 1,
            Scale::Small => 31,
            Scale::Medium => 365,
            Scale::Large => 730,
        }
    }
}

impl std::str::FromStr for Scale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tiny" | "t" => Ok(Scale::Tiny),
            "small" | "s" => Ok(Scale::Small),
            "medium" | "m" => Ok(Scale::Medium),
            "large" | "l" => Ok(Scale::Large),
            _ => Err(format!(
                "Unknown scale: {}. Use tiny, small, medium, or large",
                s
            )),
        }
    }
}

/// SQL value representation
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    String(String),
}

impl SqlValue {
    /// Inline literal, single quotes doubled
    pub fn to_sql(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Int(n) => n.to_string(),
            SqlValue::String(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::String(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::String(s)
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Int(n)
    }
}

/// Rows for one table
#[derive(Debug, Clone)]
pub struct TableData {
    pub table_name: &'static str,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl TableData {
    /// First-column values, the table's key
    pub fn keys(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|r| r.first())
            .map(|v| match v {
                SqlValue::String(s) => s.clone(),
                other => other.to_sql(),
            })
            .collect()
    }
}

/// The four reference tables, in load order
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub airports: TableData,
    pub aircraft: TableData,
    pub passengers: TableData,
    pub dates: TableData,
}

impl ReferenceData {
    pub fn tables(&self) -> [&TableData; 4] {
        [&self.airports, &self.aircraft, &self.passengers, &self.dates]
    }

    pub fn total_rows(&self) -> usize {
        self.tables().iter().map(|t| t.rows.len()).sum()
    }
}

/// First calendar day of generated dates
pub fn first_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()
}

/// `yyyymmdd` surrogate key of a date
pub fn date_id(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}

/// Main data generator
pub struct Generator {
    scale: Scale,
    fake: FakeData<ChaCha8Rng>,
}

impl Generator {
    pub fn new(seed: u64, scale: Scale) -> Self {
        Self {
            scale,
            fake: FakeData::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    pub fn generate(&mut self) -> ReferenceData {
        ReferenceData {
            airports: self.generate_airports(),
            aircraft: self.generate_aircraft(),
            passengers: self.generate_passengers(),
            dates: self.generate_dates(),
        }
    }

    fn generate_airports(&mut self) -> TableData {
        let rows = self
            .fake
            .airports(self.scale.airports())
            .into_iter()
            .map(|a| {
                vec![
                    a.code.into(),
                    a.name.into(),
                    a.city.into(),
                    a.country.into(),
                ]
            })
            .collect();
        TableData {
            table_name: DIM_AIRPORT,
            columns: vec!["airport_id", "airport_name", "city", "country"],
            rows,
        }
    }

    fn generate_aircraft(&mut self) -> TableData {
        let rows = (1..=self.scale.aircraft())
            .map(|i| {
                let (model, capacity) = self.fake.aircraft_model();
                vec![format!("AC{}", i).into(), model.into(), capacity.into()]
            })
            .collect();
        TableData {
            table_name: DIM_AIRCRAFT,
            columns: vec!["aircraft_id", "model", "capacity"],
            rows,
        }
    }

    fn generate_passengers(&mut self) -> TableData {
        let rows = (1..=self.scale.passengers())
            .map(|i| {
                vec![
                    format!("P{}", i).into(),
                    self.fake.full_name().into(),
                    self.fake.nationality().into(),
                ]
            })
            .collect();
        TableData {
            table_name: DIM_PASSENGER,
            columns: vec!["passenger_id", "full_name", "nationality"],
            rows,
        }
    }

    fn generate_dates(&mut self) -> TableData {
        let start = first_date();
        let rows = (0..self.scale.days())
            .map(|offset| {
                let date = start + Duration::days(offset as i64);
                vec![
                    date_id(date).into(),
                    date.format("%Y-%m-%d").to_string().into(),
                    date.format("%A").to_string().into(),
                ]
            })
            .collect();
        TableData {
            table_name: DIM_DATE,
            columns: vec!["date_id", "full_date", "day_of_week"],
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_data() {
        let a = Generator::new(42, Scale::Small).generate();
        let b = Generator::new(42, Scale::Small).generate();
        assert_eq!(a.passengers.rows, b.passengers.rows);
        assert_eq!(a.airports.rows, b.airports.rows);
    }

    #[test]
    fn test_scale_sizes() {
        let data = Generator::new(1, Scale::Tiny).generate();
        assert_eq!(data.airports.rows.len(), 2);
        assert_eq!(data.aircraft.keys(), vec!["AC1"]);
        assert_eq!(data.passengers.keys(), vec!["P1"]);
        assert_eq!(data.dates.keys(), vec!["20230101"]);
        assert_eq!(data.total_rows(), 5);
    }

    #[test]
    fn test_date_rows() {
        let data = Generator::new(1, Scale::Small).generate();
        let last = &data.dates.rows[30];
        assert_eq!(last[0], SqlValue::Int(20230131));
        assert_eq!(last[1].as_str(), Some("2023-01-31"));
        assert_eq!(last[2].as_str(), Some("Tuesday"));
    }

    #[test]
    fn test_scale_from_str() {
        assert_eq!("M".parse::<Scale>().unwrap(), Scale::Medium);
        assert!("huge".parse::<Scale>().is_err());
    }
}
