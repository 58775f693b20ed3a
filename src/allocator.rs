//! Synthetic flight identifiers and their allocation.
//!
//! Identifiers are `FL<n>` with `n >= base`. The allocator scans both
//! engines for the highest `n` in use and proposes the next contiguous
//! block. It holds no lock: two writers can be handed the same block, and
//! the `dim_flight` primary key decides who wins.

use crate::engine::{Engine, EngineError, Statement};
use crate::error::{MirrorError, Result};
use crate::schema;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::RangeInclusive;
use tracing::{debug, warn};

/// Lowest synthetic identifier number
pub const DEFAULT_ID_BASE: u64 = 10_000;

static FLIGHT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^FL([0-9]+)$").unwrap());

/// A synthetic flight identifier, rendered as `FL<n>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlightId(u64);

impl FlightId {
    pub const PREFIX: &'static str = "FL";

    pub fn new(number: u64) -> Self {
        Self(number)
    }

    pub fn number(self) -> u64 {
        self.0
    }

    /// Parse `FL<digits>`; anything else is not a synthetic identifier
    pub fn parse(s: &str) -> Option<Self> {
        FLIGHT_ID_RE
            .captures(s.trim())
            .and_then(|caps| caps[1].parse().ok())
            .map(Self)
    }
}

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

impl std::str::FromStr for FlightId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Not a flight identifier: {}", s))
    }
}

impl Serialize for FlightId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Highest allocated identifier number per engine, recomputed per call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineSnapshot {
    pub engine_a: Option<u64>,
    pub engine_b: Option<u64>,
}

impl EngineSnapshot {
    /// Maximum across both engines
    pub fn combined(&self) -> Option<u64> {
        self.engine_a.max(self.engine_b)
    }
}

/// Proposes identifier blocks from the engines' current maxima
#[derive(Debug, Clone, Copy)]
pub struct IdAllocator {
    base: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_BASE)
    }
}

impl IdAllocator {
    pub fn new(base: u64) -> Self {
        Self { base }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    /// Highest synthetic identifier number `>= base` in one engine
    pub fn scan_max(&self, engine: &dyn Engine) -> std::result::Result<Option<u64>, EngineError> {
        let stmt = Statement::new(format!(
            "SELECT flight_id FROM {} WHERE flight_id LIKE $1",
            schema::DIM_FLIGHT
        ))
        .bind(format!("{}%", FlightId::PREFIX));

        let result = engine.execute(&stmt)?;
        let max = result
            .first_column()
            .filter_map(|v| v.as_text().and_then(FlightId::parse))
            .map(FlightId::number)
            .filter(|n| *n >= self.base)
            .max();
        debug!(engine = engine.label(), max = ?max, "scanned identifiers");
        Ok(max)
    }

    /// Per-engine maxima; an engine whose scan fails contributes nothing
    pub fn snapshot(&self, a: &dyn Engine, b: &dyn Engine) -> EngineSnapshot {
        EngineSnapshot {
            engine_a: self.scan_or_skip(a),
            engine_b: self.scan_or_skip(b),
        }
    }

    fn scan_or_skip(&self, engine: &dyn Engine) -> Option<u64> {
        match self.scan_max(engine) {
            Ok(max) => max,
            Err(e) => {
                warn!(engine = engine.label(), error = %e, "identifier scan failed");
                None
            }
        }
    }

    /// First identifier number guaranteed unused in either engine right now
    pub fn next_start(&self, a: &dyn Engine, b: &dyn Engine) -> u64 {
        match self.snapshot(a, b).combined() {
            Some(max) => max.saturating_add(1).max(self.base),
            None => self.base,
        }
    }

    /// The contiguous block `start..start+count`, refusing empty or
    /// overflowing ranges
    pub fn block(&self, start: u64, count: u64) -> Result<RangeInclusive<u64>> {
        if count == 0 {
            return Err(MirrorError::InvalidCount(
                "count must be greater than 0".to_string(),
            ));
        }
        if start < self.base {
            return Err(MirrorError::InvalidCount(format!(
                "start {} is below identifier base {}",
                start, self.base
            )));
        }
        let end = start
            .checked_add(count - 1)
            .ok_or_else(|| MirrorError::InvalidCount(format!("range from {} overflows", start)))?;
        Ok(start..=end)
    }
}
