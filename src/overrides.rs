//! Curated overrides for place names the provider search handles poorly
//!
//! Keys are already in normalized form (see [`crate::normalize::normalize_key`]).
//! Multi-airport metro areas resolve to their city code so a fare search
//! covers every airport serving the city.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;

/// A fixed resolution for a known-tricky place name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverrideRecord {
    /// Three-letter IATA airport or city code
    pub code: &'static str,
    pub name: &'static str,
    pub city: &'static str,
    /// ISO 3166-1 alpha-2 country code
    pub country: &'static str,
}

const DUBLIN: OverrideRecord = OverrideRecord {
    code: "DUB",
    name: "Dublin",
    city: "Dublin",
    country: "IE",
};

const LISBON: OverrideRecord = OverrideRecord {
    code: "LIS",
    name: "Lisbon",
    city: "Lisbon",
    country: "PT",
};

const LAS_PALMAS: OverrideRecord = OverrideRecord {
    code: "LPA",
    name: "Las Palmas de Gran Canaria",
    city: "Las Palmas",
    country: "ES",
};

// TCI covers both TFN and TFS
const TENERIFE: OverrideRecord = OverrideRecord {
    code: "TCI",
    name: "Tenerife",
    city: "Tenerife",
    country: "ES",
};

const TENERIFE_NORTH: OverrideRecord = OverrideRecord {
    code: "TFN",
    name: "Tenerife Norte",
    city: "Tenerife",
    country: "ES",
};

const TENERIFE_SOUTH: OverrideRecord = OverrideRecord {
    code: "TFS",
    name: "Tenerife Sur",
    city: "Tenerife",
    country: "ES",
};

const BARCELONA: OverrideRecord = OverrideRecord {
    code: "BCN",
    name: "Barcelona",
    city: "Barcelona",
    country: "ES",
};

const MADRID: OverrideRecord = OverrideRecord {
    code: "MAD",
    name: "Madrid",
    city: "Madrid",
    country: "ES",
};

// CDG + ORY
const PARIS: OverrideRecord = OverrideRecord {
    code: "PAR",
    name: "Paris",
    city: "Paris",
    country: "FR",
};

// FCO + CIA
const ROME: OverrideRecord = OverrideRecord {
    code: "ROM",
    name: "Rome",
    city: "Rome",
    country: "IT",
};

// LHR, LGW, STN, LTN, LCY, SEN
const LONDON: OverrideRecord = OverrideRecord {
    code: "LON",
    name: "London",
    city: "London",
    country: "GB",
};

// JFK, EWR, LGA
const NEW_YORK: OverrideRecord = OverrideRecord {
    code: "NYC",
    name: "New York",
    city: "New York",
    country: "US",
};

// GRU, CGH, VCP
const SAO_PAULO: OverrideRecord = OverrideRecord {
    code: "SAO",
    name: "São Paulo",
    city: "São Paulo",
    country: "BR",
};

// GIG + SDU
const RIO_DE_JANEIRO: OverrideRecord = OverrideRecord {
    code: "RIO",
    name: "Rio de Janeiro",
    city: "Rio de Janeiro",
    country: "BR",
};

static LOCATION_OVERRIDES: LazyLock<HashMap<&'static str, OverrideRecord>> = LazyLock::new(|| {
    HashMap::from([
        // Ireland
        ("dublin", DUBLIN),
        ("dublin, ireland", DUBLIN),
        // Portugal
        ("lisbon", LISBON),
        ("lisbon, portugal", LISBON),
        ("lisboa", LISBON),
        ("lisboa, portugal", LISBON),
        // Canary Islands
        ("las palmas", LAS_PALMAS),
        ("las palmas, gran canaria", LAS_PALMAS),
        ("gran canaria", LAS_PALMAS),
        ("las palmas de gran canaria", LAS_PALMAS),
        ("tenerife", TENERIFE),
        ("tenerife, spain", TENERIFE),
        ("tenerife north", TENERIFE_NORTH),
        ("tenerife south", TENERIFE_SOUTH),
        // Spain mainland
        ("barcelona", BARCELONA),
        ("barcelona, spain", BARCELONA),
        ("madrid", MADRID),
        ("madrid, spain", MADRID),
        // France / Italy
        ("paris", PARIS),
        ("paris, france", PARIS),
        ("rome", ROME),
        ("rome, italy", ROME),
        // UK / US
        ("london", LONDON),
        ("london, uk", LONDON),
        ("new york", NEW_YORK),
        ("new york city", NEW_YORK),
        ("nyc", NEW_YORK),
        // Brazil
        ("sao paulo", SAO_PAULO),
        ("rio de janeiro", RIO_DE_JANEIRO),
    ])
});

/// Look up a normalized key in the override table
pub fn lookup_override(key: &str) -> Option<&'static OverrideRecord> {
    LOCATION_OVERRIDES.get(key)
}

/// All override keys, sorted
pub fn override_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = LOCATION_OVERRIDES.keys().copied().collect();
    keys.sort_unstable();
    keys
}
