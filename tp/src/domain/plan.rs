//! TripPlan domain type
//!
//! A TripPlan is the user's trip details plus the optional generated itinerary.
//! It is only ever changed through a [`TripPlanPatch`] merge.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::itinerary::{Coordinates, ItineraryDay, check_day_sequence};

/// Trip budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub per_day: f64,
    pub total: f64,
    /// ISO currency code; blank means "use the configured default"
    #[serde(default)]
    pub currency: String,
}

impl Budget {
    pub fn new(per_day: f64, total: f64, currency: impl Into<String>) -> Self {
        Self {
            per_day,
            total,
            currency: currency.into(),
        }
    }

    /// Build a budget from a total, spreading it evenly over `days`
    pub fn from_total(total: f64, days: u32, currency: impl Into<String>) -> Self {
        let per_day = if days == 0 { total } else { total / days as f64 };
        Self::new(per_day, total, currency)
    }

    /// Build a budget from a daily amount over `days`
    pub fn from_per_day(per_day: f64, days: u32, currency: impl Into<String>) -> Self {
        Self::new(per_day, per_day * days.max(1) as f64, currency)
    }
}

/// The trip details and their generated itinerary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPlan {
    #[serde(default)]
    pub destination: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Trip length; 0 means "not set yet"
    #[serde(default)]
    pub number_of_days: u32,

    /// Distinct interests in display order
    #[serde(default)]
    pub interests: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itinerary: Option<Vec<ItineraryDay>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_coordinates: Option<Coordinates>,
}

/// What a successful [`TripPlan::apply`] changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchEffect {
    /// A field that feeds prompt generation changed value
    pub inputs_changed: bool,
    /// The existing itinerary no longer matched the day count and was removed
    pub itinerary_dropped: bool,
}

impl TripPlan {
    /// The explicit empty state a plan starts from
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_destination(&self) -> bool {
        !self.destination.trim().is_empty()
    }

    pub fn has_days(&self) -> bool {
        self.number_of_days > 0
    }

    /// Destination with the country appended when one is set
    pub fn display_destination(&self) -> String {
        match self.country.as_deref().map(str::trim) {
            Some(country) if !country.is_empty() => format!("{}, {}", self.destination.trim(), country),
            _ => self.destination.trim().to_string(),
        }
    }

    /// Merge `patch` into this plan
    ///
    /// Fields present in the patch replace the current value; absent fields are kept.
    /// An itinerary in the patch must match the resulting day count, otherwise nothing
    /// is changed. A new itinerary always brings its own center: the patch's center,
    /// or none. When the day count changes and the kept itinerary no longer fits,
    /// the itinerary and its center coordinates are removed.
    pub fn apply(&mut self, patch: TripPlanPatch) -> Result<PatchEffect, String> {
        debug!(?patch, "TripPlan::apply: called");
        let days = patch.number_of_days.unwrap_or(self.number_of_days);

        if let Some(itinerary) = &patch.itinerary {
            check_day_sequence(itinerary, days)?;
        }

        let mut effect = PatchEffect::default();

        if let Some(destination) = patch.destination {
            effect.inputs_changed |= destination != self.destination;
            self.destination = destination;
        }
        if let Some(country) = patch.country {
            effect.inputs_changed |= self.country.as_ref() != Some(&country);
            self.country = Some(country);
        }
        if let Some(number_of_days) = patch.number_of_days {
            effect.inputs_changed |= number_of_days != self.number_of_days;
            self.number_of_days = number_of_days;
        }
        if let Some(interests) = patch.interests {
            let interests = normalize_interests(interests);
            effect.inputs_changed |= interests != self.interests;
            self.interests = interests;
        }
        if let Some(budget) = patch.budget {
            effect.inputs_changed |= self.budget.as_ref() != Some(&budget);
            self.budget = Some(budget);
        }

        match patch.itinerary {
            Some(mut itinerary) => {
                itinerary.sort_by_key(|d| d.day);
                self.itinerary = Some(itinerary);
                self.center_coordinates = patch.center_coordinates;
            }
            None => {
                let stale = self
                    .itinerary
                    .as_deref()
                    .is_some_and(|it| check_day_sequence(it, self.number_of_days).is_err());
                if stale {
                    debug!("TripPlan::apply: day count changed, dropping itinerary");
                    self.itinerary = None;
                    self.center_coordinates = None;
                    effect.itinerary_dropped = true;
                }
                if let Some(center) = patch.center_coordinates {
                    self.center_coordinates = Some(center);
                }
            }
        }

        Ok(effect)
    }
}

/// Trim, drop blanks and remove duplicates, keeping the first occurrence
pub fn normalize_interests(interests: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(interests.len());
    for interest in interests {
        let interest = interest.trim();
        if !interest.is_empty() && !out.iter().any(|i| i == interest) {
            out.push(interest.to_string());
        }
    }
    out
}

/// A partial TripPlan; present fields replace, absent fields are kept
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TripPlanPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itinerary: Option<Vec<ItineraryDay>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_coordinates: Option<Coordinates>,
}

impl TripPlanPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn days(mut self, number_of_days: u32) -> Self {
        self.number_of_days = Some(number_of_days);
        self
    }

    pub fn interests<I, S>(mut self, interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interests = Some(interests.into_iter().map(Into::into).collect());
        self
    }

    pub fn budget(mut self, budget: Budget) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn itinerary(mut self, itinerary: Vec<ItineraryDay>) -> Self {
        self.itinerary = Some(itinerary);
        self
    }

    pub fn center_coordinates(mut self, center: Coordinates) -> Self {
        self.center_coordinates = Some(center);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay `other` on top of this patch; fields set in `other` win
    pub fn merge(mut self, other: TripPlanPatch) -> Self {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        overlay!(
            destination,
            country,
            number_of_days,
            interests,
            budget,
            itinerary,
            center_coordinates
        );
        self
    }
}
