//! Fake data generation helpers.
//!
//! Deterministic airports, aircraft, passenger names and nationalities.

use rand::Rng;

/// IATA code, name, city, country
const AIRPORTS: &[(&str, &str, &str, &str)] = &[
    ("AMS", "Schiphol", "Amsterdam", "Netherlands"),
    ("CDG", "Charles de Gaulle", "Paris", "France"),
    ("LHR", "Heathrow", "London", "United Kingdom"),
    ("FRA", "Frankfurt am Main", "Frankfurt", "Germany"),
    ("MAD", "Adolfo Suarez Barajas", "Madrid", "Spain"),
    ("FCO", "Leonardo da Vinci", "Rome", "Italy"),
    ("IST", "Istanbul Airport", "Istanbul", "Turkey"),
    ("DXB", "Dubai International", "Dubai", "United Arab Emirates"),
    ("DOH", "Hamad International", "Doha", "Qatar"),
    ("JFK", "John F. Kennedy", "New York", "United States"),
    ("LAX", "Los Angeles International", "Los Angeles", "United States"),
    ("ORD", "O'Hare International", "Chicago", "United States"),
    ("YYZ", "Toronto Pearson", "Toronto", "Canada"),
    ("GRU", "Guarulhos", "Sao Paulo", "Brazil"),
    ("NRT", "Narita International", "Tokyo", "Japan"),
    ("ICN", "Incheon International", "Seoul", "South Korea"),
    ("SIN", "Changi", "Singapore", "Singapore"),
    ("HKG", "Hong Kong International", "Hong Kong", "China"),
    ("SYD", "Kingsford Smith", "Sydney", "Australia"),
    ("JNB", "O. R. Tambo", "Johannesburg", "South Africa"),
    ("CAI", "Cairo International", "Cairo", "Egypt"),
    ("CMN", "Mohammed V", "Casablanca", "Morocco"),
    ("BCN", "El Prat", "Barcelona", "Spain"),
    ("MUC", "Franz Josef Strauss", "Munich", "Germany"),
];

/// Model and seat capacity
const AIRCRAFT_MODELS: &[(&str, i64)] = &[
    ("Airbus A220-300", 140),
    ("Airbus A320neo", 180),
    ("Airbus A321neo", 220),
    ("Airbus A330-300", 290),
    ("Airbus A350-900", 325),
    ("Airbus A380-800", 525),
    ("Boeing 737-800", 189),
    ("Boeing 737 MAX 8", 178),
    ("Boeing 777-300ER", 396),
    ("Boeing 787-9", 296),
    ("Embraer E190", 100),
    ("ATR 72-600", 70),
];

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bob", "Carol", "David", "Emma", "Frank", "Grace", "Henry", "Iris", "Jack", "Kate",
    "Leo", "Maya", "Noah", "Olivia", "Peter", "Quinn", "Rose", "Sam", "Tara", "Uma", "Victor",
    "Wendy", "Xavier", "Yara", "Zack", "Amina", "Bram", "Chen", "Dario",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Martinez",
    "Anderson", "Taylor", "Thomas", "Moore", "Jackson", "Martin", "Lee", "Thompson", "White",
    "Harris", "Clark", "de Vries", "Rossi", "Dubois", "Kowalski", "Nakamura", "O'Brien",
];

const NATIONALITIES: &[&str] = &[
    "Dutch",
    "French",
    "British",
    "German",
    "Spanish",
    "Italian",
    "Turkish",
    "American",
    "Canadian",
    "Brazilian",
    "Japanese",
    "Korean",
    "Indian",
    "Moroccan",
    "Egyptian",
    "Australian",
];

/// An airport row before it gets an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AirportInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub city: &'static str,
    pub country: &'static str,
}

/// Number of distinct airports available
pub fn airport_count() -> usize {
    AIRPORTS.len()
}

/// Fake data generator with deterministic RNG
pub struct FakeData<R: Rng> {
    rng: R,
}

impl<R: Rng> FakeData<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// `count` distinct airports in random order, capped at the known list
    pub fn airports(&mut self, count: usize) -> Vec<AirportInfo> {
        let picked = rand::seq::index::sample(&mut self.rng, AIRPORTS.len(), count.min(AIRPORTS.len()));
        picked
            .into_iter()
            .map(|i| {
                let (code, name, city, country) = AIRPORTS[i];
                AirportInfo {
                    code,
                    name,
                    city,
                    country,
                }
            })
            .collect()
    }

    /// An aircraft model and its seat capacity
    pub fn aircraft_model(&mut self) -> (&'static str, i64) {
        AIRCRAFT_MODELS[self.rng.gen_range(0..AIRCRAFT_MODELS.len())]
    }

    pub fn first_name(&mut self) -> &'static str {
        FIRST_NAMES[self.rng.gen_range(0..FIRST_NAMES.len())]
    }

    pub fn last_name(&mut self) -> &'static str {
        LAST_NAMES[self.rng.gen_range(0..LAST_NAMES.len())]
    }

    pub fn full_name(&mut self) -> String {
        format!("{} {}", self.first_name(), self.last_name())
    }

    pub fn nationality(&mut self) -> &'static str {
        NATIONALITIES[self.rng.gen_range(0..NATIONALITIES.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_deterministic_generation() {
        let mut fake1 = FakeData::new(ChaCha8Rng::seed_from_u64(42));
        let mut fake2 = FakeData::new(ChaCha8Rng::seed_from_u64(42));

        assert_eq!(fake1.full_name(), fake2.full_name());
        assert_eq!(fake1.airports(5), fake2.airports(5));
        assert_eq!(fake1.aircraft_model(), fake2.aircraft_model());
    }

    #[test]
    fn test_airports_are_distinct() {
        let mut fake = FakeData::new(ChaCha8Rng::seed_from_u64(7));
        let mut codes: Vec<&str> = fake.airports(10).iter().map(|a| a.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 10);
    }

    #[test]
    fn test_airports_capped_at_known_list() {
        let mut fake = FakeData::new(ChaCha8Rng::seed_from_u64(7));
        assert_eq!(fake.airports(1000).len(), airport_count());
    }
}
