//! DOT date code age check.
//!
//! The last four digits of a tire's DOT code give the manufacture week and
//! year (`WWYY`), e.g. `0718` is week 7 of 2018. Rubber ages regardless of
//! tread wear, so the kiosk flags tires from six years on and recommends
//! replacement from ten.

use crate::constants::{DOT_CAUTION_AGE_YEARS, DOT_REPLACE_AGE_YEARS, WEEKS_PER_YEAR};
use crate::{Error, Result};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Safety verdict for a tire age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DotStatus {
    Safe,
    Caution,
    Replace,
}

impl DotStatus {
    /// Classify an age in years.
    #[must_use]
    pub fn from_age(age_years: f64) -> Self {
        if age_years >= DOT_REPLACE_AGE_YEARS {
            DotStatus::Replace
        } else if age_years >= DOT_CAUTION_AGE_YEARS {
            DotStatus::Caution
        } else {
            DotStatus::Safe
        }
    }
}

impl fmt::Display for DotStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DotStatus::Safe => write!(f, "SAFE"),
            DotStatus::Caution => write!(f, "CAUTION"),
            DotStatus::Replace => write!(f, "REPLACE"),
        }
    }
}

/// Manufacture date decoded from a `WWYY` DOT code.
///
/// # Examples
///
/// ```
/// use airpump_core::dot::{DotCode, DotStatus};
/// use chrono::NaiveDate;
///
/// let code = DotCode::parse("0718").unwrap();
/// assert_eq!((code.week(), code.year()), (7, 2018));
///
/// let today = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();
/// assert_eq!(code.status_on(today), DotStatus::Replace);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DotCode {
    week: u32,
    year: i32,
}

impl DotCode {
    /// Parse the four-digit week/year suffix of a DOT code.
    ///
    /// # Errors
    /// Returns `Error::InvalidDotCode` unless the input is exactly four digits
    /// with a week between 1 and 53.
    pub fn parse(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.len() != 4 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidDotCode(code.to_string()));
        }

        let (week, year) = code.split_at(2);
        let week: u32 = week
            .parse()
            .map_err(|_| Error::InvalidDotCode(code.to_string()))?;
        let year: i32 = year
            .parse()
            .map_err(|_| Error::InvalidDotCode(code.to_string()))?;

        if !(1..=53).contains(&week) {
            return Err(Error::InvalidDotCode(code.to_string()));
        }

        Ok(Self {
            week,
            year: 2000 + year,
        })
    }

    #[must_use]
    pub fn week(&self) -> u32 {
        self.week
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Age in years on `today`, rounded to one decimal.
    ///
    /// Negative when the code lies in the future, which usually means the
    /// customer misread the sidewall.
    #[must_use]
    pub fn age_on(&self, today: NaiveDate) -> f64 {
        let years = f64::from(today.year() - self.year);
        let weeks = f64::from(today.iso_week().week()) - f64::from(self.week);
        let age = years + weeks / WEEKS_PER_YEAR;
        (age * 10.0).round() / 10.0
    }

    #[must_use]
    pub fn status_on(&self, today: NaiveDate) -> DotStatus {
        DotStatus::from_age(self.age_on(today))
    }

    #[must_use]
    pub fn is_future(&self, today: NaiveDate) -> bool {
        self.age_on(today) < 0.0
    }

    /// Full report relative to the current UTC date.
    #[must_use]
    pub fn report(&self) -> DotReport {
        self.report_on(Utc::now().date_naive())
    }

    #[must_use]
    pub fn report_on(&self, today: NaiveDate) -> DotReport {
        let age = self.age_on(today);
        DotReport {
            week: self.week,
            year: self.year,
            age_years: age.max(0.0),
            status: DotStatus::from_age(age),
            future: age < 0.0,
        }
    }
}

impl fmt::Display for DotCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02}{:02}", self.week, self.year % 100)
    }
}

impl std::str::FromStr for DotCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Result of a DOT check as shown to the customer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DotReport {
    pub week: u32,
    pub year: i32,
    pub age_years: f64,
    pub status: DotStatus,
    pub future: bool,
}
