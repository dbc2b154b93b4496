//! Itinerary prompt builder
//!
//! Turns a TripPlan into the text sent to the model. The template restates the
//! trip facts and pins down the exact JSON shape the parser expects back.

use serde::Serialize;
use tracing::debug;

use super::{PromptError, PromptLoader};
use crate::domain::TripPlan;

/// Template name for itinerary generation
pub const ITINERARY_TEMPLATE: &str = "itinerary";

/// Values available to the itinerary template
#[derive(Debug, Clone, Serialize)]
pub struct ItineraryPromptContext {
    /// Destination with the country appended when known
    pub destination: String,
    pub number_of_days: u32,
    /// Interests joined with ", "; empty when none were given
    pub interests: String,
    /// Formatted total, absent when the plan has no budget
    pub budget_total: Option<String>,
    /// Formatted daily amount, absent when the plan has no budget
    pub budget_per_day: Option<String>,
    pub currency: String,
}

impl ItineraryPromptContext {
    /// Build the template context, failing if the plan cannot be generated from
    pub fn from_plan(plan: &TripPlan, default_currency: &str) -> Result<Self, PromptError> {
        debug!(destination = %plan.destination, days = %plan.number_of_days, "ItineraryPromptContext::from_plan: called");
        if !plan.has_destination() {
            return Err(PromptError::MissingDestination);
        }
        if !plan.has_days() {
            return Err(PromptError::MissingDays);
        }

        let budget = plan.budget.as_ref();
        let currency = budget
            .map(|b| b.currency.trim())
            .filter(|c| !c.is_empty())
            .unwrap_or(default_currency)
            .to_string();

        Ok(Self {
            destination: plan.display_destination(),
            number_of_days: plan.number_of_days,
            interests: plan.interests.join(", "),
            budget_total: budget.filter(|b| b.total > 0.0).map(|b| format_amount(b.total)),
            budget_per_day: budget.filter(|b| b.per_day > 0.0).map(|b| format_amount(b.per_day)),
            currency,
        })
    }
}

/// Render the itinerary generation prompt for `plan`
pub fn build_itinerary_prompt(
    loader: &PromptLoader,
    plan: &TripPlan,
    default_currency: &str,
) -> Result<String, PromptError> {
    let context = ItineraryPromptContext::from_plan(plan, default_currency)?;
    loader.render(ITINERARY_TEMPLATE, &context)
}

/// Format a money amount with thousands separators
///
/// Whole amounts print without decimals ("50,000"); others keep two ("1,234.50").
pub fn format_amount(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let (whole, frac) = (cents / 100, cents % 100);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    if frac == 0 {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{:02}", sign, grouped, frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Budget, TripPlanPatch};
    use proptest::prelude::*;

    fn plan(patch: TripPlanPatch) -> TripPlan {
        let mut plan = TripPlan::empty();
        plan.apply(patch).unwrap();
        plan
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.0), "999");
        assert_eq!(format_amount(50000.0), "50,000");
        assert_eq!(format_amount(1234567.5), "1,234,567.50");
        assert_eq!(format_amount(-1500.0), "-1,500");
    }

    #[test]
    fn test_missing_destination_fails_fast() {
        let loader = PromptLoader::embedded_only();
        let result = build_itinerary_prompt(&loader, &plan(TripPlanPatch::new().days(3)), "INR");
        assert!(matches!(result, Err(PromptError::MissingDestination)));

        let result = build_itinerary_prompt(&loader, &plan(TripPlanPatch::new().destination("  ").days(3)), "INR");
        assert!(matches!(result, Err(PromptError::MissingDestination)));
    }

    #[test]
    fn test_missing_days_fails_fast() {
        let loader = PromptLoader::embedded_only();
        let result = build_itinerary_prompt(&loader, &plan(TripPlanPatch::new().destination("Goa")), "INR");
        assert!(matches!(result, Err(PromptError::MissingDays)));
    }

    #[test]
    fn test_prompt_restates_trip_facts() {
        let loader = PromptLoader::embedded_only();
        let trip = plan(
            TripPlanPatch::new()
                .destination("Jaipur")
                .country("India")
                .days(4)
                .interests(["history", "food"])
                .budget(Budget::new(12500.0, 50000.0, "INR")),
        );
        let prompt = build_itinerary_prompt(&loader, &trip, "USD").unwrap();

        assert!(prompt.contains("4-day travel itinerary for a trip to Jaipur, India"));
        assert!(prompt.contains("interested in: history, food"));
        assert!(prompt.contains("approximately 50,000 INR"));
        assert!(prompt.contains("about 12,500 INR per day"));
        assert!(prompt.contains("Respond with only the JSON object"));
        assert!(prompt.contains("\"centerCoordinates\""));
        assert!(prompt.contains("Return exactly 4 day objects"));
    }

    #[test]
    fn test_prompt_without_budget_or_interests() {
        let loader = PromptLoader::embedded_only();
        let prompt = build_itinerary_prompt(&loader, &plan(TripPlanPatch::new().destination("Goa").days(2)), "INR")
            .unwrap();

        assert!(!prompt.contains("budget for the trip"));
        assert!(prompt.contains("has not listed specific interests"));
    }

    #[test]
    fn test_blank_budget_currency_uses_default() {
        let trip = plan(
            TripPlanPatch::new()
                .destination("Lisbon")
                .days(3)
                .budget(Budget::new(0.0, 900.0, "")),
        );
        let ctx = ItineraryPromptContext::from_plan(&trip, "EUR").unwrap();

        assert_eq!(ctx.currency, "EUR");
        assert_eq!(ctx.budget_total.as_deref(), Some("900"));
        assert!(ctx.budget_per_day.is_none());
    }

    proptest! {
        #[test]
        fn prop_prompt_contains_destination_and_day_count(
            destination in "[A-Za-z][A-Za-z '.-]{0,30}",
            days in 1u32..60,
        ) {
            let loader = PromptLoader::embedded_only();
            let trip = plan(TripPlanPatch::new().destination(destination.clone()).days(days));
            let prompt = build_itinerary_prompt(&loader, &trip, "INR").unwrap();

            prop_assert!(prompt.contains(destination.trim()));
            let day_phrase = format!("{}-day", days);
            prop_assert!(prompt.contains(&day_phrase));
        }
    }
}
