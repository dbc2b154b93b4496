//! Model reply parser
//!
//! Extracts the JSON document from raw model text and validates it into typed
//! itinerary days. Validation walks a `serde_json::Value` by hand so every
//! failure can name the offending path (`itinerary[1].activities[0].time`).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::domain::{Activity, Coordinates, ItineraryDay};

/// A fenced block: everything between a pair of triple backticks
static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").unwrap());

/// How forgiving validation is about optional detail in the reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Every field the prompt asks for must be present and well-formed
    #[default]
    Strict,
    /// Missing descriptions and times become empty, malformed optional fields are dropped
    Lenient,
}

/// Parser failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    /// No parseable JSON in the reply
    #[error("reply is not valid JSON: {0}")]
    Format(String),

    /// JSON present but not itinerary-shaped
    #[error("{path} {reason}")]
    Validation { path: String, reason: String },
}

impl ParseError {
    fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Validated model output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedItinerary {
    /// Days in the order the model returned them
    pub itinerary: Vec<ItineraryDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_coordinates: Option<Coordinates>,
}

/// Parse a raw model reply into a validated itinerary
pub fn parse_response(text: &str, strictness: Strictness) -> Result<GeneratedItinerary, ParseError> {
    debug!(len = text.len(), ?strictness, "parse_response: called");
    let value = extract_json(text)?;
    validate(&value, strictness)
}

/// Extract the JSON document from a reply
///
/// The first complete fence tagged `json` (any case) or untagged wins. Without
/// such a fence, or when the fenced body is not JSON, the whole trimmed text is
/// parsed; a bare document may carry backticks inside its strings.
pub fn extract_json(text: &str) -> Result<Value, ParseError> {
    let whole = text.trim();
    let Some(body) = fenced_json(text) else {
        return serde_json::from_str(whole).map_err(|e| ParseError::Format(e.to_string()));
    };

    debug!("extract_json: using fenced block");
    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(fence_err) => serde_json::from_str(whole).map_err(|_| {
            debug!(error = %fence_err, "extract_json: fenced block and whole text both failed");
            ParseError::Format(fence_err.to_string())
        }),
    }
}

fn fenced_json(text: &str) -> Option<&str> {
    for caps in FENCE.captures_iter(text) {
        let Some(inner) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        // The info string runs to the first newline, or to the document start
        // when a fence is written on one line (```json{...}```)
        let split = inner.find(['\n', '{', '[']).unwrap_or(inner.len());
        let (tag, body) = inner.split_at(split);
        let tag = tag.trim();
        if tag.is_empty() || tag.eq_ignore_ascii_case("json") {
            return Some(body.trim());
        }
        debug!(%tag, "fenced_json: skipping non-json fence");
    }
    None
}

fn validate(value: &Value, strictness: Strictness) -> Result<GeneratedItinerary, ParseError> {
    let root = value
        .as_object()
        .ok_or_else(|| ParseError::invalid("$", "must be a JSON object"))?;

    let days = root
        .get("itinerary")
        .ok_or_else(|| ParseError::invalid("itinerary", "is missing"))?
        .as_array()
        .ok_or_else(|| ParseError::invalid("itinerary", "must be an array"))?;

    let itinerary = days
        .iter()
        .enumerate()
        .map(|(i, day)| parse_day(day, &format!("itinerary[{}]", i), strictness))
        .collect::<Result<Vec<_>, _>>()?;

    let center_coordinates = match root.get("centerCoordinates") {
        None | Some(Value::Null) => None,
        Some(raw) => match parse_coordinates(raw) {
            Ok(coords) => Some(coords),
            Err(reason) if strictness == Strictness::Strict => {
                return Err(ParseError::invalid("centerCoordinates", reason));
            }
            Err(reason) => {
                debug!(%reason, "validate: dropping malformed centerCoordinates");
                None
            }
        },
    };

    Ok(GeneratedItinerary {
        itinerary,
        center_coordinates,
    })
}

fn parse_day(value: &Value, path: &str, strictness: Strictness) -> Result<ItineraryDay, ParseError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ParseError::invalid(path, "must be an object"))?;

    let day = obj
        .get("day")
        .and_then(day_number)
        .ok_or_else(|| ParseError::invalid(format!("{}.day", path), "must be a positive integer"))?;

    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ParseError::invalid(format!("{}.title", path), "must be a non-empty string"))?;

    let description = required_text(obj, "description", path, strictness)?;

    let activities = match obj.get("activities") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, a)| parse_activity(a, &format!("{}.activities[{}]", path, i), strictness))
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(ParseError::invalid(format!("{}.activities", path), "must be an array")),
    };

    Ok(ItineraryDay {
        day,
        title: title.to_string(),
        description,
        activities,
    })
}

fn parse_activity(value: &Value, path: &str, strictness: Strictness) -> Result<Activity, ParseError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ParseError::invalid(path, "must be an object"))?;

    let time = required_text(obj, "time", path, strictness)?;
    let description = required_text(obj, "description", path, strictness)?;

    let location = match obj.get("location") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) if strictness == Strictness::Strict => {
            return Err(ParseError::invalid(format!("{}.location", path), "must be a string"));
        }
        Some(_) => None,
    };

    let coordinates = match obj.get("coordinates") {
        None | Some(Value::Null) => None,
        Some(raw) => match parse_coordinates(raw) {
            Ok(coords) => Some(coords),
            Err(reason) if strictness == Strictness::Strict => {
                return Err(ParseError::invalid(format!("{}.coordinates", path), reason));
            }
            Err(_) => None,
        },
    };

    Ok(Activity {
        time,
        description,
        location,
        coordinates,
    })
}

/// A string field the prompt always asks for; lenient mode tolerates its absence
fn required_text(obj: &Map<String, Value>, key: &str, path: &str, strictness: Strictness) -> Result<String, ParseError> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        _ if strictness == Strictness::Lenient => Ok(String::new()),
        _ => Err(ParseError::invalid(format!("{}.{}", path, key), "must be a string")),
    }
}

/// Integral, positive JSON number (`2` and `2.0` both count)
fn day_number(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok().filter(|n| *n > 0);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f >= 1.0 && f <= u32::MAX as f64).then_some(f as u32)
}

fn parse_coordinates(value: &Value) -> Result<Coordinates, &'static str> {
    let obj = value.as_object().ok_or("must be an object with lat and lng")?;
    let lat = obj.get("lat").and_then(Value::as_f64).ok_or("lat must be a number")?;
    let lng = obj.get("lng").and_then(Value::as_f64).ok_or("lng must be a number")?;

    let coords = Coordinates::new(lat, lng);
    if coords.is_valid() {
        Ok(coords)
    } else {
        Err("are out of range")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_DAYS: &str = r#"{
        "centerCoordinates": {"lat": 15.29, "lng": 74.12},
        "itinerary": [
            {"day": 1, "title": "Arrival", "description": "Settle in",
             "activities": [{"time": "09:00", "description": "Check in", "location": "Panjim",
                             "coordinates": {"lat": 15.49, "lng": 73.82}}]},
            {"day": 2, "title": "Beaches", "description": "Sun and sand", "activities": []}
        ]
    }"#;

    #[test]
    fn test_bare_json() {
        let parsed = parse_response(TWO_DAYS, Strictness::Strict).unwrap();
        assert_eq!(parsed.itinerary.len(), 2);
        assert_eq!(parsed.itinerary[0].activities[0].location.as_deref(), Some("Panjim"));
        assert_eq!(parsed.center_coordinates, Some(Coordinates::new(15.29, 74.12)));
    }

    #[test]
    fn test_json_fence() {
        let text = format!("Here is your plan:\n```json\n{}\n```\nEnjoy!", TWO_DAYS);
        let parsed = parse_response(&text, Strictness::Strict).unwrap();
        assert_eq!(parsed.itinerary.len(), 2);
    }

    #[test]
    fn test_untagged_and_uppercase_fences() {
        let parsed = parse_response("```\n{\"itinerary\":[]}\n```", Strictness::Strict).unwrap();
        assert!(parsed.itinerary.is_empty());

        let parsed = parse_response("```JSON\n{\"itinerary\":[]}\n```", Strictness::Strict).unwrap();
        assert!(parsed.itinerary.is_empty());

        let parsed = parse_response("```json{\"itinerary\":[]}```", Strictness::Strict).unwrap();
        assert!(parsed.itinerary.is_empty());
    }

    #[test]
    fn test_non_json_fence_is_skipped() {
        let text = "```text\nnotes\n```\n```json\n{\"itinerary\":[]}\n```";
        assert!(parse_response(text, Strictness::Strict).is_ok());
    }

    #[test]
    fn test_unterminated_fence_falls_back_to_whole_text() {
        let result = parse_response("```json\n{\"itinerary\":[]}", Strictness::Strict);
        assert!(matches!(result, Err(ParseError::Format(_))));
    }

    #[test]
    fn test_backticks_inside_bare_json_strings() {
        let text = r#"{"itinerary":[{"day":1,"title":"Code camp","description":"Learn ``` {x} ``` syntax","activities":[]}]}"#;
        let parsed = parse_response(text, Strictness::Strict).unwrap();
        assert_eq!(parsed.itinerary[0].description, "Learn ``` {x} ``` syntax");
    }

    #[test]
    fn test_broken_fence_and_prose_reports_fence_error() {
        let text = "Here it is:\n```json\n{\"itinerary\": [\n```";
        assert!(matches!(parse_response(text, Strictness::Strict), Err(ParseError::Format(_))));
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(
            parse_response("not json at all", Strictness::Lenient),
            Err(ParseError::Format(_))
        ));
        assert!(matches!(parse_response("", Strictness::Strict), Err(ParseError::Format(_))));
    }

    #[test]
    fn test_missing_itinerary_is_validation() {
        match parse_response(r#"{"days": []}"#, Strictness::Strict) {
            Err(ParseError::Validation { path, .. }) => assert_eq!(path, "itinerary"),
            other => panic!("Expected Validation, got {:?}", other),
        }
        assert!(matches!(
            parse_response("[1, 2]", Strictness::Strict),
            Err(ParseError::Validation { .. })
        ));
    }

    #[test]
    fn test_bad_day_numbers() {
        for day in ["0", "-1", "1.5", "\"1\"", "null"] {
            let text = format!(r#"{{"itinerary":[{{"day":{},"title":"T","description":"","activities":[]}}]}}"#, day);
            match parse_response(&text, Strictness::Lenient) {
                Err(ParseError::Validation { path, .. }) => assert_eq!(path, "itinerary[0].day"),
                other => panic!("day {} should be rejected, got {:?}", day, other),
            }
        }

        let text = r#"{"itinerary":[{"day":2.0,"title":"T","description":"","activities":[]}]}"#;
        assert_eq!(parse_response(text, Strictness::Strict).unwrap().itinerary[0].day, 2);
    }

    #[test]
    fn test_blank_title_rejected_in_both_modes() {
        let text = r#"{"itinerary":[{"day":1,"title":"  ","description":"","activities":[]}]}"#;
        for mode in [Strictness::Strict, Strictness::Lenient] {
            assert!(matches!(parse_response(text, mode), Err(ParseError::Validation { .. })));
        }
    }

    #[test]
    fn test_missing_description_strict_vs_lenient() {
        let text = r#"{"itinerary":[{"day":1,"title":"Arrival","activities":[{"time":"09:00"}]}]}"#;

        match parse_response(text, Strictness::Strict) {
            Err(ParseError::Validation { path, .. }) => assert_eq!(path, "itinerary[0].description"),
            other => panic!("Expected Validation, got {:?}", other),
        }

        let parsed = parse_response(text, Strictness::Lenient).unwrap();
        assert_eq!(parsed.itinerary[0].description, "");
        assert_eq!(parsed.itinerary[0].activities[0].description, "");
        assert_eq!(parsed.itinerary[0].activities[0].time, "09:00");
    }

    #[test]
    fn test_activities_must_be_array() {
        let text = r#"{"itinerary":[{"day":1,"title":"A","description":"","activities":"none"}]}"#;
        match parse_response(text, Strictness::Lenient) {
            Err(ParseError::Validation { path, .. }) => assert_eq!(path, "itinerary[0].activities"),
            other => panic!("Expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_coordinates_strict_vs_lenient() {
        let text = r#"{"centerCoordinates":{"lat":"north"},"itinerary":[{"day":1,"title":"A","description":"",
            "activities":[{"time":"x","description":"y","coordinates":{"lat":120,"lng":0}}]}]}"#;

        match parse_response(text, Strictness::Strict) {
            Err(ParseError::Validation { path, .. }) => assert_eq!(path, "itinerary[0].activities[0].coordinates"),
            other => panic!("Expected Validation, got {:?}", other),
        }

        let parsed = parse_response(text, Strictness::Lenient).unwrap();
        assert!(parsed.center_coordinates.is_none());
        assert!(parsed.itinerary[0].activities[0].coordinates.is_none());
    }

    #[test]
    fn test_day_order_is_preserved() {
        let text = r#"{"itinerary":[
            {"day":2,"title":"B","description":"","activities":[]},
            {"day":1,"title":"A","description":"","activities":[]}]}"#;
        let days: Vec<u32> = parse_response(text, Strictness::Strict)
            .unwrap()
            .itinerary
            .iter()
            .map(|d| d.day)
            .collect();
        assert_eq!(days, vec![2, 1]);
    }

    #[test]
    fn test_strictness_serde() {
        assert_eq!(serde_yaml::from_str::<Strictness>("lenient").unwrap(), Strictness::Lenient);
        assert_eq!(serde_json::to_value(Strictness::Strict).unwrap(), "strict");
    }
}
