//! Itinerary domain types
//!
//! An itinerary is the ordered per-day schedule produced by the generation pipeline.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check that both components are finite and inside the WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A single scheduled activity within a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Free-form display time (e.g. "9:00 AM")
    pub time: String,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl Activity {
    pub fn new(time: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            description: description.into(),
            location: None,
            coordinates: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }
}

/// One day of an itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryDay {
    /// 1-based day number, unique within a plan
    pub day: u32,

    pub title: String,

    pub description: String,

    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl ItineraryDay {
    pub fn new(day: u32, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            day,
            title: title.into(),
            description: description.into(),
            activities: Vec::new(),
        }
    }

    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }
}

/// Check that `days` holds exactly `expected` entries numbered 1..=expected
///
/// Order is not checked; callers that need ordered output sort first.
/// Returns a description of the first violation found.
pub fn check_day_sequence(days: &[ItineraryDay], expected: u32) -> Result<(), String> {
    debug!(count = days.len(), %expected, "check_day_sequence: called");
    if days.len() != expected as usize {
        return Err(format!("expected {} days, got {}", expected, days.len()));
    }

    let mut seen = vec![false; days.len()];
    for day in days {
        if day.day == 0 || day.day > expected {
            return Err(format!("day {} is outside 1..={}", day.day, expected));
        }
        let slot = &mut seen[(day.day - 1) as usize];
        if *slot {
            return Err(format!("day {} appears more than once", day.day));
        }
        *slot = true;
    }

    Ok(())
}
