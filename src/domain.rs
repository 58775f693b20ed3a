//! Reference domain resolution.
//!
//! New rows may only reference airports, aircraft, passengers and dates that
//! exist as dimension keys. Both engines are asked independently; an engine
//! that cannot answer for a dimension contributes an empty set for it rather
//! than aborting the whole resolution.

use crate::engine::{Engine, Statement};
use crate::error::{MirrorError, Result};
use crate::schema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// A reference dimension rows are generated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Airports,
    Aircraft,
    Passengers,
    Dates,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Airports,
        Dimension::Aircraft,
        Dimension::Passengers,
        Dimension::Dates,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Dimension::Airports => schema::DIM_AIRPORT,
            Dimension::Aircraft => schema::DIM_AIRCRAFT,
            Dimension::Passengers => schema::DIM_PASSENGER,
            Dimension::Dates => schema::DIM_DATE,
        }
    }

    pub fn key_column(self) -> &'static str {
        match self {
            Dimension::Airports => "airport_id",
            Dimension::Aircraft => "aircraft_id",
            Dimension::Passengers => "passenger_id",
            Dimension::Dates => "date_id",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::Airports => write!(f, "airports"),
            Dimension::Aircraft => write!(f, "aircraft"),
            Dimension::Passengers => write!(f, "passengers"),
            Dimension::Dates => write!(f, "dates"),
        }
    }
}

/// How the per-engine key sets are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainPolicy {
    /// Keys present in either engine. Permissive: a generated foreign key
    /// may be missing from one engine.
    Union,
    /// Keys present in both engines. The only policy under which every
    /// generated foreign key is valid in both engines.
    #[default]
    Intersection,
}

impl std::str::FromStr for DomainPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "union" => Ok(DomainPolicy::Union),
            "intersection" | "strict" => Ok(DomainPolicy::Intersection),
            _ => Err(format!(
                "Unknown domain policy: {}. Valid options: union, intersection",
                s
            )),
        }
    }
}

impl std::fmt::Display for DomainPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainPolicy::Union => write!(f, "union"),
            DomainPolicy::Intersection => write!(f, "intersection"),
        }
    }
}

/// The foreign-key values usable when synthesizing rows.
///
/// Values are kept sorted so a seeded synthesizer is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReferenceDomain {
    pub airports: Vec<String>,
    pub aircraft: Vec<String>,
    pub passengers: Vec<String>,
    pub dates: Vec<i64>,
}

impl ReferenceDomain {
    pub fn len(&self, dimension: Dimension) -> usize {
        match dimension {
            Dimension::Airports => self.airports.len(),
            Dimension::Aircraft => self.aircraft.len(),
            Dimension::Passengers => self.passengers.len(),
            Dimension::Dates => self.dates.len(),
        }
    }

    /// Dimensions with no usable value
    pub fn missing(&self) -> Vec<Dimension> {
        Dimension::ALL
            .into_iter()
            .filter(|d| self.len(*d) == 0)
            .collect()
    }

    pub fn is_usable(&self) -> bool {
        self.missing().is_empty()
    }
}

/// A resolved domain together with how it was obtained
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedDomain {
    pub domain: ReferenceDomain,
    pub policy: DomainPolicy,
    /// True when every dimension has at least one key present in both
    /// engines, whatever the policy; a union caller learns whether the strict
    /// policy would have worked
    pub used_intersection_all: bool,
    /// Dimensions an engine failed to answer for, as `(engine, dimension)`
    pub unreadable: Vec<(String, Dimension)>,
}

/// Resolves the reference domain from both engines
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainResolver {
    policy: DomainPolicy,
}

impl DomainResolver {
    pub fn new(policy: DomainPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DomainPolicy {
        self.policy
    }

    /// Query both engines and combine their key sets.
    ///
    /// Fails with [`MirrorError::DomainInsufficient`] if any dimension ends
    /// up empty.
    pub fn resolve(&self, a: &dyn Engine, b: &dyn Engine) -> Result<ResolvedDomain> {
        let mut domain = ReferenceDomain::default();
        let mut unreadable = Vec::new();
        let mut shared_everywhere = true;

        for dimension in Dimension::ALL {
            let from_a = fetch_keys(a, dimension).unwrap_or_else(|| {
                unreadable.push((a.label().to_string(), dimension));
                BTreeSet::new()
            });
            let from_b = fetch_keys(b, dimension).unwrap_or_else(|| {
                unreadable.push((b.label().to_string(), dimension));
                BTreeSet::new()
            });

            shared_everywhere &= from_a.intersection(&from_b).next().is_some();

            let combined: Vec<String> = match self.policy {
                DomainPolicy::Union => from_a.union(&from_b).cloned().collect(),
                DomainPolicy::Intersection => from_a.intersection(&from_b).cloned().collect(),
            };
            debug!(
                %dimension,
                engine_a = from_a.len(),
                engine_b = from_b.len(),
                usable = combined.len(),
                policy = %self.policy,
                "resolved dimension"
            );

            match dimension {
                Dimension::Airports => domain.airports = combined,
                Dimension::Aircraft => domain.aircraft = combined,
                Dimension::Passengers => domain.passengers = combined,
                Dimension::Dates => domain.dates = parse_dates(combined),
            }
        }

        let missing = domain.missing();
        if !missing.is_empty() {
            return Err(MirrorError::DomainInsufficient {
                policy: self.policy,
                missing,
            });
        }

        Ok(ResolvedDomain {
            domain,
            policy: self.policy,
            used_intersection_all: shared_everywhere,
            unreadable,
        })
    }
}

/// Distinct non-empty keys of one dimension; `None` if the query failed
fn fetch_keys(engine: &dyn Engine, dimension: Dimension) -> Option<BTreeSet<String>> {
    let stmt = Statement::new(format!(
        "SELECT {} FROM {}",
        dimension.key_column(),
        dimension.table()
    ));
    match engine.execute(&stmt) {
        Ok(result) => Some(result.first_column().filter_map(|v| v.to_key()).collect()),
        Err(e) => {
            warn!(
                engine = engine.label(),
                %dimension,
                error = %e,
                "reference query failed, treating as empty"
            );
            None
        }
    }
}

/// Date keys are integers (`yyyymmdd`); anything else is dropped
fn parse_dates(keys: Vec<String>) -> Vec<i64> {
    let mut dates: Vec<i64> = keys.iter().filter_map(|k| k.trim().parse().ok()).collect();
    dates.sort_unstable();
    dates.dedup();
    dates
}
