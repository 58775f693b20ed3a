//! Row synthesis for generated flights.
//!
//! Pure functions of the random source: seed it and every row is
//! reproducible.

use crate::allocator::FlightId;
use crate::domain::ReferenceDomain;
use crate::engine::{Money, SqlValue};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Pilot roster generated flights draw from
pub const PILOTS: &[&str] = &[
    "Luis Garcia",
    "Anna Rodriguez",
    "Maria Khan",
    "Luis Lee",
    "Luis Khan",
    "Ali Rodriguez",
    "John Smith",
    "Anna Smith",
    "Maria Smith",
    "Luis Smith",
    "Chen Khan",
    "Luis Rodriguez",
    "Maria Lee",
];

pub const MIN_DURATION_MIN: i64 = 60;
pub const MAX_DURATION_MIN: i64 = 720;
pub const DELAY_PROBABILITY: f64 = 0.3;
pub const MIN_TICKET_PRICE: f64 = 50.0;
pub const MAX_TICKET_PRICE: f64 = 1500.0;
pub const MAX_TAX_RATE: f64 = 0.15;
pub const MAX_BAGGAGE_FEE: f64 = 100.0;
pub const MAX_DISCOUNT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayStatus {
    Delayed,
    OnTime,
}

impl DelayStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DelayStatus::Delayed => "Delayed",
            DelayStatus::OnTime => "On Time",
        }
    }
}

impl std::str::FromStr for DelayStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Delayed" => Ok(DelayStatus::Delayed),
            "On Time" => Ok(DelayStatus::OnTime),
            _ => Err(format!("Unknown delay status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatClass {
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl SeatClass {
    pub const ALL: [SeatClass; 4] = [
        SeatClass::Economy,
        SeatClass::PremiumEconomy,
        SeatClass::Business,
        SeatClass::First,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SeatClass::Economy => "Economy",
            SeatClass::PremiumEconomy => "Premium Economy",
            SeatClass::Business => "Business",
            SeatClass::First => "First",
        }
    }
}

impl std::str::FromStr for SeatClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SeatClass::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown seat class: {}", s))
    }
}

/// A `dim_flight` row
#[derive(Debug, Clone, PartialEq)]
pub struct FlightRow {
    pub flight_id: FlightId,
    pub duration_min: i64,
    pub departure_airport_id: String,
    pub arrival_airport_id: String,
    pub pilot_name: String,
    pub aircraft_id: String,
    pub delay_status: DelayStatus,
}

impl FlightRow {
    /// Values in `dim_flight` column order
    pub fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.flight_id.to_string()),
            SqlValue::Int(self.duration_min),
            SqlValue::from(&self.departure_airport_id),
            SqlValue::from(&self.arrival_airport_id),
            SqlValue::from(&self.pilot_name),
            SqlValue::from(&self.aircraft_id),
            SqlValue::from(self.delay_status.as_str()),
        ]
    }
}

/// A `fact_flight_metrics` row
#[derive(Debug, Clone, PartialEq)]
pub struct FlightMetricRow {
    pub passenger_id: String,
    pub flight_id: FlightId,
    pub airport_id: String,
    pub date_id: i64,
    pub seat_class: SeatClass,
    pub ticket_price: Money,
    pub tax: Money,
    pub baggage_fee: Money,
    pub discount: Money,
}

impl FlightMetricRow {
    /// Values in `fact_flight_metrics` column order
    pub fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::from(&self.passenger_id),
            SqlValue::Text(self.flight_id.to_string()),
            SqlValue::from(&self.airport_id),
            SqlValue::Int(self.date_id),
            SqlValue::from(self.seat_class.as_str()),
            SqlValue::Money(self.ticket_price),
            SqlValue::Money(self.tax),
            SqlValue::Money(self.baggage_fee),
            SqlValue::Money(self.discount),
        ]
    }
}

/// Generates plausible flight rows from a resolved domain
pub struct RowSynthesizer<R: Rng> {
    rng: R,
}

impl RowSynthesizer<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> RowSynthesizer<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Flight duration in minutes, uniform in [60, 720]
    pub fn duration(&mut self) -> i64 {
        self.rng.gen_range(MIN_DURATION_MIN..=MAX_DURATION_MIN)
    }

    pub fn delay_status(&mut self) -> DelayStatus {
        if self.rng.gen_bool(DELAY_PROBABILITY) {
            DelayStatus::Delayed
        } else {
            DelayStatus::OnTime
        }
    }

    pub fn pilot(&mut self) -> &'static str {
        PILOTS[self.rng.gen_range(0..PILOTS.len())]
    }

    pub fn seat_class(&mut self) -> SeatClass {
        SeatClass::ALL[self.rng.gen_range(0..SeatClass::ALL.len())]
    }

    pub fn ticket_price(&mut self) -> Money {
        Money::from_f64(self.rng.gen_range(MIN_TICKET_PRICE..=MAX_TICKET_PRICE))
    }

    /// Tax of up to 15% of the ticket price
    pub fn tax(&mut self, price: Money) -> Money {
        Money::from_f64(self.rng.gen_range(0.0..=MAX_TAX_RATE) * price.as_f64())
    }

    pub fn baggage_fee(&mut self) -> Money {
        Money::from_f64(self.rng.gen_range(0.0..=MAX_BAGGAGE_FEE))
    }

    pub fn discount(&mut self) -> Money {
        Money::from_f64(self.rng.gen_range(0.0..=MAX_DISCOUNT))
    }

    /// Departure and arrival airports.
    ///
    /// On a collision any other airport replaces the arrival; a
    /// single-airport domain keeps the collision.
    pub fn route(&mut self, airports: &[String]) -> Option<(String, String)> {
        let departure = airports.choose(&mut self.rng)?.clone();
        let mut arrival = airports.choose(&mut self.rng)?.clone();
        if arrival == departure {
            let alternatives: Vec<&String> =
                airports.iter().filter(|a| **a != departure).collect();
            if let Some(alt) = alternatives.choose(&mut self.rng) {
                arrival = (*alt).clone();
            }
        }
        Some((departure, arrival))
    }

    /// A dimension row, or `None` without airports or aircraft to reference
    pub fn flight(&mut self, flight_id: FlightId, domain: &ReferenceDomain) -> Option<FlightRow> {
        let duration_min = self.duration();
        let pilot_name = self.pilot().to_string();
        let delay_status = self.delay_status();
        let (departure_airport_id, arrival_airport_id) = self.route(&domain.airports)?;
        let aircraft_id = domain.aircraft.choose(&mut self.rng)?.clone();

        Some(FlightRow {
            flight_id,
            duration_min,
            departure_airport_id,
            arrival_airport_id,
            pilot_name,
            aircraft_id,
            delay_status,
        })
    }

    /// The fact row for `flight`, or `None` without passengers or dates
    pub fn metric(&mut self, flight: &FlightRow, domain: &ReferenceDomain) -> Option<FlightMetricRow> {
        let passenger_id = domain.passengers.choose(&mut self.rng)?.clone();
        let date_id = *domain.dates.choose(&mut self.rng)?;
        let ticket_price = self.ticket_price();
        let tax = self.tax(ticket_price);

        Some(FlightMetricRow {
            passenger_id,
            flight_id: flight.flight_id,
            airport_id: flight.departure_airport_id.clone(),
            date_id,
            seat_class: self.seat_class(),
            ticket_price,
            tax,
            baggage_fee: self.baggage_fee(),
            discount: self.discount(),
        })
    }
}
