//! Context snapshot and request option types

use super::Location;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid caller input, naming the offending field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Observed demand for a service category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandLevel {
    Low,
    Medium,
    High,
    Surge,
}

impl DemandLevel {
    /// Relative demand weight used when history is unavailable
    pub fn weight(&self) -> Decimal {
        match self {
            DemandLevel::Low => Decimal::new(6, 1),
            DemandLevel::Medium => Decimal::ONE,
            DemandLevel::High => Decimal::new(17, 1),
            DemandLevel::Surge => Decimal::new(26, 1),
        }
    }

    /// Classify a demand/supply ratio
    pub fn from_ratio(ratio: Decimal) -> Self {
        if ratio < Decimal::new(8, 1) {
            DemandLevel::Low
        } else if ratio <= Decimal::new(12, 1) {
            DemandLevel::Medium
        } else if ratio <= Decimal::TWO {
            DemandLevel::High
        } else {
            DemandLevel::Surge
        }
    }
}

/// Available provider supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplyLevel {
    Low,
    Medium,
    High,
    Oversupply,
}

impl SupplyLevel {
    /// Relative supply weight used when history is unavailable
    pub fn weight(&self) -> Decimal {
        match self {
            SupplyLevel::Low => Decimal::new(6, 1),
            SupplyLevel::Medium => Decimal::ONE,
            SupplyLevel::High => Decimal::new(14, 1),
            SupplyLevel::Oversupply => Decimal::TWO,
        }
    }
}

/// Calendar season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Season for a month, flipped for the southern hemisphere
    pub fn from_month(month: u32, southern_hemisphere: bool) -> Self {
        let northern = match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        };
        if !southern_hemisphere {
            return northern;
        }
        match northern {
            Season::Spring => Season::Autumn,
            Season::Summer => Season::Winter,
            Season::Autumn => Season::Spring,
            Season::Winter => Season::Summer,
        }
    }
}

/// Weather condition at the service location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    Cloudy,
    Rain,
    Snow,
    Storm,
    ExtremeHeat,
}

/// A weather observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub condition: WeatherCondition,
    /// When the observation was taken
    pub observed_at: DateTime<Utc>,
}

/// A nearby event that may drive demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalEvent {
    pub name: String,
    pub expected_attendance: u32,
    /// Distance from the service location
    pub distance_km: Decimal,
}

/// How soon the customer needs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
    Emergency,
}

/// Requested service quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Budget,
    #[default]
    Standard,
    Premium,
}

/// Immutable snapshot of the world at quote time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingContext {
    pub location: Location,
    /// Instant the quote is computed for
    pub timestamp: DateTime<Utc>,
    /// Hour of day, 0-23
    pub time_of_day: u32,
    pub day_of_week: Weekday,
    pub season: Season,
    pub weather: Option<Weather>,
    #[serde(default)]
    pub local_events: Vec<LocalEvent>,
    pub demand_level: DemandLevel,
    pub supply_level: SupplyLevel,
    /// Competition intensity, 0 (none) to 1 (saturated)
    pub competition_level: Decimal,
}

impl PricingContext {
    /// Build a neutral context for a location, deriving the time fields
    pub fn new(location: Location, timestamp: DateTime<Utc>) -> Self {
        let season = Season::from_month(timestamp.month(), location.is_southern_hemisphere());
        Self {
            location,
            timestamp,
            time_of_day: timestamp.hour(),
            day_of_week: timestamp.weekday(),
            season,
            weather: None,
            local_events: vec![],
            demand_level: DemandLevel::Medium,
            supply_level: SupplyLevel::Medium,
            competition_level: Decimal::new(5, 1),
        }
    }

    pub fn with_weather(mut self, weather: Weather) -> Self {
        self.weather = Some(weather);
        self
    }

    pub fn with_event(mut self, event: LocalEvent) -> Self {
        self.local_events.push(event);
        self
    }

    pub fn with_market(mut self, demand: DemandLevel, supply: SupplyLevel) -> Self {
        self.demand_level = demand;
        self.supply_level = supply;
        self
    }

    pub fn with_competition(mut self, level: Decimal) -> Self {
        self.competition_level = level;
        self
    }

    /// Demand/supply ratio implied by the snapshot levels
    pub fn snapshot_ratio(&self) -> Decimal {
        self.demand_level.weight() / self.supply_level.weight()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.location.validate()?;
        if self.time_of_day > 23 {
            return Err(ValidationError::new(
                "context.time_of_day",
                format!("hour {} outside 0-23", self.time_of_day),
            ));
        }
        if self.competition_level < Decimal::ZERO || self.competition_level > Decimal::ONE {
            return Err(ValidationError::new(
                "context.competition_level",
                format!("{} outside [0, 1]", self.competition_level),
            ));
        }
        if let Some(event) = self
            .local_events
            .iter()
            .find(|e| e.distance_km < Decimal::ZERO)
        {
            return Err(ValidationError::new(
                "context.local_events",
                format!("event '{}' has negative distance", event.name),
            ));
        }
        Ok(())
    }
}

/// Per-request pricing options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingOptions {
    /// Service category, keys surge state together with the location cell
    pub category: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub quality_tier: QualityTier,
    /// Customer segment used for experiment targeting
    pub customer_segment: Option<String>,
    /// Stable key used to bucket the request into an experiment variant
    pub request_key: Option<String>,
    /// Suggest cheaper times when surge is active
    #[serde(default = "default_true")]
    pub include_alternatives: bool,
}

fn default_true() -> bool {
    true
}

impl PricingOptions {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Self::default()
        }
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn with_quality(mut self, tier: QualityTier) -> Self {
        self.quality_tier = tier;
        self
    }

    pub fn with_segment(
        mut self,
        segment: impl Into<String>,
        request_key: impl Into<String>,
    ) -> Self {
        self.customer_segment = Some(segment.into());
        self.request_key = Some(request_key.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.category.trim().is_empty() {
            return Err(ValidationError::new("options.category", "must not be empty"));
        }
        Ok(())
    }
}

impl Default for PricingOptions {
    fn default() -> Self {
        Self {
            category: "general".to_string(),
            urgency: Urgency::Medium,
            quality_tier: QualityTier::Standard,
            customer_segment: None,
            request_key: None,
            include_alternatives: true,
        }
    }
}
