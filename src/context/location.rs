//! Location, currency and money types

use super::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ISO 4217 codes the engine knows how to price in
pub const SUPPORTED_CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "NZD", "CNY", "HKD", "SGD", "SEK", "NOK",
    "DKK", "PLN", "INR", "MXN", "BRL", "ZAR", "KRW", "AED", "TRY", "THB", "IDR", "PHP", "NGN",
    "KES",
];

/// Currencies treated as majors for conversion fee purposes
pub const MAJOR_CURRENCIES: &[&str] = &["USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD"];

/// A validated ISO 4217 currency code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parse and validate a currency code (case-insensitive)
    pub fn new(code: &str) -> Result<Self, ValidationError> {
        let upper = code.trim().to_ascii_uppercase();
        if !SUPPORTED_CURRENCIES.contains(&upper.as_str()) {
            return Err(ValidationError::new(
                "currency",
                format!("unknown currency code '{}'", code),
            ));
        }
        Ok(Self(upper))
    }

    /// US dollar
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    /// Euro
    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    /// The three-letter code
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the major currencies
    pub fn is_major(&self) -> bool {
        MAJOR_CURRENCIES.contains(&self.0.as_str())
    }

    /// Number of minor-unit digits used when rounding amounts
    pub fn minor_units(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" | "IDR" => 0,
            _ => 2,
        }
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An amount in a specific currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// A resolved service location, supplied by the geolocation resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
    /// Local currency quotes are converted into
    pub currency: Currency,
    /// ISO 3166-1 alpha-2 country code
    pub country_code: String,
}

impl Location {
    pub fn new(lat: f64, lng: f64, currency: Currency, country_code: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            currency,
            country_code: country_code.into().to_ascii_uppercase(),
        }
    }

    /// Grid cell (~1km) this location falls into
    pub fn cell(&self) -> LocationCell {
        LocationCell::from_coordinates(self.lat, self.lng)
    }

    /// Whether the location is south of the equator
    pub fn is_southern_hemisphere(&self) -> bool {
        self.lat < 0.0
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(ValidationError::new(
                "location.lat",
                format!("latitude {} outside [-90, 90]", self.lat),
            ));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(ValidationError::new(
                "location.lng",
                format!("longitude {} outside [-180, 180]", self.lng),
            ));
        }
        if self.country_code.len() != 2
            || !self.country_code.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(ValidationError::new(
                "location.country_code",
                format!("'{}' is not a two-letter country code", self.country_code),
            ));
        }
        Ok(())
    }
}

/// A rounded location used to key surge state and cached prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationCell {
    /// Latitude in hundredths of a degree
    pub lat_e2: i32,
    /// Longitude in hundredths of a degree
    pub lng_e2: i32,
}

impl LocationCell {
    pub fn from_coordinates(lat: f64, lng: f64) -> Self {
        Self {
            lat_e2: (lat * 100.0).round() as i32,
            lng_e2: (lng * 100.0).round() as i32,
        }
    }
}

impl fmt::Display for LocationCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2},{:.2}",
            self.lat_e2 as f64 / 100.0,
            self.lng_e2 as f64 / 100.0
        )
    }
}
