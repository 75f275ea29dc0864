//! Recommended inflation pressure by tire size code.
//!
//! Codes are matched after normalization (trimmed, uppercased, all whitespace
//! removed), so `" 205/55 r16 "` and `"205/55R16"` are the same tire, as are
//! the bicycle spellings `700x25c` and `700X25C`.

use crate::config::CustomTireCode;
use crate::{Error, Result, TirePosition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Recommended pressure for the front and rear axle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsiPair {
    pub front: u32,
    pub rear: u32,
}

impl PsiPair {
    #[must_use]
    pub const fn new(front: u32, rear: u32) -> Self {
        Self { front, rear }
    }

    /// Same pressure on both axles.
    #[must_use]
    pub const fn uniform(psi: u32) -> Self {
        Self::new(psi, psi)
    }

    #[must_use]
    pub fn for_position(&self, position: TirePosition) -> u32 {
        match position {
            TirePosition::Front => self.front,
            TirePosition::Rear => self.rear,
        }
    }
}

/// Normalize a tire code for lookup.
///
/// # Examples
///
/// ```
/// use airpump_core::tire::normalize_code;
///
/// assert_eq!(normalize_code(" 205/55 r16 "), "205/55R16");
/// assert_eq!(normalize_code("27.5x2.25"), "27.5X2.25");
/// ```
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

const PASSENGER_CAR: PsiPair = PsiPair::new(32, 34);
const SUV_CROSSOVER: PsiPair = PsiPair::new(35, 38);
const PICKUP_VAN: PsiPair = PsiPair::new(40, 45);
const MOTORCYCLE_NARROW: PsiPair = PsiPair::new(30, 32);
const MOTORCYCLE_STANDARD: PsiPair = PsiPair::new(32, 36);
const MOTORCYCLE_WIDE: PsiPair = PsiPair::new(36, 40);

const PASSENGER_CAR_CODES: &[&str] = &[
    "165/65R14", "175/65R14", "175/70R14", "185/60R14", "185/65R15", "185/70R14", "195/55R15",
    "195/60R15", "195/65R15", "195/50R16", "205/55R16", "205/60R15", "205/60R16", "205/65R15",
    "215/45R17", "215/50R17", "215/55R16", "215/55R17", "215/60R16", "225/45R17",
];

const SUV_CROSSOVER_CODES: &[&str] = &[
    "215/65R16", "215/70R16", "225/55R18", "225/60R17", "225/65R17", "225/70R16", "235/50R18",
    "235/55R18", "235/60R16", "235/60R18", "235/65R17", "235/70R16", "245/45R19", "245/50R20",
    "245/60R18", "245/65R17", "255/45R20", "255/50R19", "255/55R18", "255/60R18",
];

const PICKUP_VAN_CODES: &[&str] = &[
    "265/60R18", "265/65R17", "265/70R16", "265/70R17", "275/55R20", "275/60R20", "275/65R18",
    "285/60R18", "285/65R17", "285/70R17",
];

const MOTORCYCLE_NARROW_CODES: &[&str] = &[
    "2.50-17", "2.75-17", "2.75-18", "3.00-17", "3.00-18", "3.25-17", "3.25-18", "3.50-16",
    "3.50-17", "3.50-18", "3.75-16",
];

const MOTORCYCLE_STANDARD_CODES: &[&str] = &[
    "90/90-18", "100/90-17", "110/70-17", "110/80-17", "110/90-17", "120/60-17", "120/70-17",
    "120/80-17", "120/90-17", "130/70-17", "130/80-17", "140/60-17", "140/70-17",
];

const MOTORCYCLE_WIDE_CODES: &[&str] = &[
    "130/90-17", "140/90-15", "150/60-17", "150/70-17", "160/60-17", "160/70-17",
];

/// Road, mountain and gravel bicycle sizes; pressure varies per size.
const BICYCLE_CODES: &[(&str, PsiPair)] = &[
    ("700x23C", PsiPair::new(95, 100)),
    ("700x25C", PsiPair::new(90, 95)),
    ("700x28C", PsiPair::new(85, 90)),
    ("700x30C", PsiPair::new(80, 85)),
    ("700x32C", PsiPair::new(75, 80)),
    ("700x35C", PsiPair::new(70, 75)),
    ("700x38C", PsiPair::new(65, 70)),
    ("700x40C", PsiPair::new(60, 65)),
    ("700x42C", PsiPair::new(55, 60)),
    ("650x20C", PsiPair::new(100, 105)),
    ("650x23C", PsiPair::new(95, 100)),
    ("650x25C", PsiPair::new(90, 95)),
    ("650x28C", PsiPair::new(85, 90)),
    ("26x1.95", PsiPair::new(44, 46)),
    ("26x2.0", PsiPair::new(41, 43)),
    ("26x2.1", PsiPair::new(39, 41)),
    ("26x2.2", PsiPair::new(37, 39)),
    ("26x2.3", PsiPair::new(35, 37)),
    ("27.5x2.1", PsiPair::new(39, 41)),
    ("27.5x2.2", PsiPair::new(37, 39)),
    ("27.5x2.25", PsiPair::new(36, 38)),
    ("27.5x2.3", PsiPair::new(35, 37)),
    ("27.5x2.4", PsiPair::new(34, 36)),
    ("27.5x2.5", PsiPair::new(33, 35)),
    ("29x2.0", PsiPair::new(41, 43)),
    ("29x2.1", PsiPair::new(39, 41)),
    ("29x2.2", PsiPair::new(37, 39)),
    ("29x2.25", PsiPair::new(36, 38)),
    ("29x2.3", PsiPair::new(35, 37)),
    ("29x2.35", PsiPair::new(34, 36)),
    ("29x2.4", PsiPair::new(33, 35)),
    ("29x2.5", PsiPair::new(32, 34)),
];

/// Lookup table from normalized tire code to recommended pressure.
#[derive(Debug, Clone)]
pub struct PsiTable {
    entries: HashMap<String, PsiPair>,
}

impl Default for PsiTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PsiTable {
    /// Table with the factory tire sizes for cars, SUVs, pickups,
    /// motorcycles and bicycles.
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self {
            entries: HashMap::new(),
        };

        let groups: [(&[&str], PsiPair); 6] = [
            (PASSENGER_CAR_CODES, PASSENGER_CAR),
            (SUV_CROSSOVER_CODES, SUV_CROSSOVER),
            (PICKUP_VAN_CODES, PICKUP_VAN),
            (MOTORCYCLE_NARROW_CODES, MOTORCYCLE_NARROW),
            (MOTORCYCLE_STANDARD_CODES, MOTORCYCLE_STANDARD),
            (MOTORCYCLE_WIDE_CODES, MOTORCYCLE_WIDE),
        ];
        for (codes, pair) in groups {
            for code in codes {
                table.insert(code, pair);
            }
        }
        for (code, pair) in BICYCLE_CODES {
            table.insert(code, *pair);
        }

        table
    }

    /// Built-in table extended with operator-defined codes.
    ///
    /// A custom code replaces a built-in entry with the same normalized code.
    #[must_use]
    pub fn with_custom(custom: &[CustomTireCode]) -> Self {
        let mut table = Self::builtin();
        for tire in custom {
            table.insert(&tire.code, PsiPair::uniform(tire.psi));
        }
        table
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, code: &str, pair: PsiPair) {
        self.entries.insert(normalize_code(code), pair);
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<PsiPair> {
        self.entries.get(&normalize_code(code)).copied()
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(&normalize_code(code))
    }

    /// Recommended pressure for a tire code at the given axle.
    ///
    /// # Errors
    /// Returns `Error::UnknownTireCode` when the code is not in the table.
    pub fn recommended_psi(&self, code: &str, position: TirePosition) -> Result<u32> {
        self.get(code)
            .map(|pair| pair.for_position(position))
            .ok_or_else(|| Error::UnknownTireCode(code.trim().to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
