//! Terminal rendering of trips and itineraries

use colored::Colorize;

use crate::domain::{Coordinates, ItineraryDay, TripPlan};
use crate::prompts::format_amount;

/// Header line plus every day of the itinerary
pub fn render_plan(plan: &TripPlan) -> String {
    let mut out = String::new();
    out.push_str(&render_header(plan));

    match plan.itinerary.as_deref() {
        Some(days) if !days.is_empty() => {
            for day in days {
                out.push('\n');
                out.push_str(&render_day(day));
            }
        }
        _ => {
            out.push('\n');
            out.push_str(&format!("{}\n", "No itinerary generated yet.".dimmed()));
        }
    }
    out
}

/// Trip summary: destination, length, interests, budget
pub fn render_header(plan: &TripPlan) -> String {
    let mut out = format!(
        "{} {}\n",
        plan.display_destination().bright_cyan().bold(),
        format!("({} days)", plan.number_of_days).dimmed()
    );

    if !plan.interests.is_empty() {
        out.push_str(&format!("Interests: {}\n", plan.interests.join(", ")));
    }
    if let Some(budget) = &plan.budget {
        out.push_str(&format!(
            "Budget: {} {} ({} per day)\n",
            format_amount(budget.total),
            budget.currency,
            format_amount(budget.per_day)
        ));
    }
    if let Some(center) = &plan.center_coordinates {
        out.push_str(&format!("Center: {}\n", format_coordinates(center).dimmed()));
    }
    out
}

pub fn render_day(day: &ItineraryDay) -> String {
    let mut out = format!("{} {}\n", format!("Day {}:", day.day).green().bold(), day.title.bold());
    if !day.description.is_empty() {
        out.push_str(&format!("  {}\n", day.description));
    }

    for activity in &day.activities {
        let time = if activity.time.is_empty() { "--" } else { activity.time.as_str() };
        out.push_str(&format!("  {} {}", format!("{:>8}", time).cyan(), activity.description));
        if let Some(location) = &activity.location {
            out.push_str(&format!(" {}", format!("@ {}", location).yellow()));
        }
        if let Some(coords) = &activity.coordinates {
            out.push_str(&format!(" {}", format!("[{}]", format_coordinates(coords)).dimmed()));
        }
        out.push('\n');
    }
    out
}

fn format_coordinates(coords: &Coordinates) -> String {
    format!("{:.4}, {:.4}", coords.lat, coords.lng)
}
