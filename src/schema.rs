//! Warehouse schema shared by both engines.
//!
//! Both engines carry the same logical `airline_dw` schema. `dim_flight`
//! has a primary key on `flight_id`; concurrent writers racing on the same
//! proposed identifier rely on it to reject the loser.

use crate::engine::{Engine, EngineError};
use tracing::info;

pub const SCHEMA: &str = "airline_dw";

pub const DIM_AIRPORT: &str = "airline_dw.dim_airport";
pub const DIM_AIRCRAFT: &str = "airline_dw.dim_aircraft";
pub const DIM_PASSENGER: &str = "airline_dw.dim_passenger";
pub const DIM_DATE: &str = "airline_dw.dim_date";
pub const DIM_FLIGHT: &str = "airline_dw.dim_flight";
pub const FACT_FLIGHT_METRICS: &str = "airline_dw.fact_flight_metrics";

/// Column list of `dim_flight`, in insert order
pub const DIM_FLIGHT_COLUMNS: &[&str] = &[
    "flight_id",
    "flight_duration_min",
    "departure_airport_id",
    "arrival_airport_id",
    "pilot_name",
    "aircraft_id",
    "delay_status",
];

/// Column list of `fact_flight_metrics`, in insert order
pub const FACT_FLIGHT_METRICS_COLUMNS: &[&str] = &[
    "passenger_id",
    "flight_id",
    "airport_id",
    "date_id",
    "seat_class",
    "ticket_price_usd",
    "tax_usd",
    "baggage_fee_usd",
    "discount_usd",
];

/// DDL creating the warehouse, idempotent
pub const DDL: &[&str] = &[
    "CREATE SCHEMA IF NOT EXISTS airline_dw",
    "CREATE TABLE IF NOT EXISTS airline_dw.dim_airport (
        airport_id VARCHAR(10) PRIMARY KEY,
        airport_name VARCHAR(100),
        city VARCHAR(100),
        country VARCHAR(100)
    )",
    "CREATE TABLE IF NOT EXISTS airline_dw.dim_aircraft (
        aircraft_id VARCHAR(20) PRIMARY KEY,
        model VARCHAR(100),
        capacity INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS airline_dw.dim_passenger (
        passenger_id VARCHAR(20) PRIMARY KEY,
        full_name VARCHAR(100),
        nationality VARCHAR(100)
    )",
    "CREATE TABLE IF NOT EXISTS airline_dw.dim_date (
        date_id INTEGER PRIMARY KEY,
        full_date DATE,
        day_of_week VARCHAR(10)
    )",
    "CREATE TABLE IF NOT EXISTS airline_dw.dim_flight (
        flight_id VARCHAR(20) PRIMARY KEY,
        flight_duration_min INTEGER,
        departure_airport_id VARCHAR(10),
        arrival_airport_id VARCHAR(10),
        pilot_name VARCHAR(100),
        aircraft_id VARCHAR(20),
        delay_status VARCHAR(20)
    )",
    "CREATE TABLE IF NOT EXISTS airline_dw.fact_flight_metrics (
        passenger_id VARCHAR(20),
        flight_id VARCHAR(20),
        airport_id VARCHAR(10),
        date_id INTEGER,
        seat_class VARCHAR(20),
        ticket_price_usd DECIMAL(10,2),
        tax_usd DECIMAL(10,2) DEFAULT 0,
        baggage_fee_usd DECIMAL(10,2) DEFAULT 0,
        discount_usd DECIMAL(10,2) DEFAULT 0
    )",
];

/// Create the warehouse schema on one engine
pub fn bootstrap(engine: &dyn Engine) -> Result<(), EngineError> {
    for ddl in DDL {
        engine.run(ddl)?;
    }
    info!(engine = engine.label(), "warehouse schema ready");
    Ok(())
}

/// Comma-separated column list for an INSERT
pub fn column_list(columns: &[&str]) -> String {
    columns.join(", ")
}
