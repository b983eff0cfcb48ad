//! Loosely typed view of an itinerary as a language model returns it.
//!
//! Models routinely return numbers as strings ("₹4,000"), labels as nested
//! objects, and coordinates as `0.0` placeholders. These types accept all of
//! that so one malformed field never discards an otherwise usable draft.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::base::Coordinates;

#[derive(Debug, Default, Deserialize)]
pub struct DraftItinerary {
    #[serde(default, deserialize_with = "lenient_text")]
    pub trip_summary: String,
    #[serde(default)]
    pub budget_breakdown: Option<DraftBreakdown>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub daily_plans: Vec<DraftDay>,
    /// The model's judgement that source and destination share a country
    /// and are connected overland.
    #[serde(default, deserialize_with = "lenient_flag")]
    pub land_route: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DraftBreakdown {
    #[serde(default)]
    pub main_travel: Option<DraftBudgetItem>,
    #[serde(default)]
    pub stay: Option<DraftBudgetItem>,
    #[serde(default)]
    pub transport: Option<DraftBudgetItem>,
    #[serde(default)]
    pub attractions: Option<DraftBudgetItem>,
    #[serde(default)]
    pub food: Option<DraftBudgetItem>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct DraftBudgetItem {
    pub label: String,
    pub estimate: Option<f64>,
    pub note: String,
}

impl From<Value> for DraftBudgetItem {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => DraftBudgetItem {
                label: map.get("label").map(value_to_text).unwrap_or_default(),
                estimate: map
                    .get("estimate")
                    .or_else(|| map.get("amount"))
                    .or_else(|| map.get("cost"))
                    .and_then(value_to_amount),
                note: map.get("note").map(value_to_text).unwrap_or_default(),
            },
            other => DraftBudgetItem {
                estimate: value_to_amount(&other),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DraftDay {
    #[serde(default, deserialize_with = "lenient_day")]
    pub day: Option<u32>,
    #[serde(default, deserialize_with = "lenient_optional_text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub activities: Vec<DraftActivity>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DraftActivity {
    #[serde(default, deserialize_with = "lenient_text")]
    pub time: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: String,
    #[serde(default, deserialize_with = "lenient_coordinates")]
    pub coordinates: Option<Coordinates>,
}

/// Flattens any JSON value into display text.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .values()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" - "),
    }
}

/// Reads the first number out of values like `4000`, `"₹4,000"` or
/// `"3000-4000 INR"`. Negative numbers are kept so callers can clamp them.
pub fn value_to_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',' && *c != '_').collect();
    let start = cleaned.find(|c: char| c.is_ascii_digit())?;
    let negative = cleaned[..start].trim_end().ends_with('-')
        && !cleaned[..start].trim_end().trim_end_matches('-').ends_with(|c: char| c.is_ascii_digit());
    let number: String = cleaned[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let amount: f64 = number.trim_end_matches('.').parse().ok()?;

    let rest = cleaned[start + number.len()..].trim_start().to_lowercase();
    let amount = if rest.starts_with('k') && !rest.starts_with("km") {
        amount * 1000.0
    } else if rest.starts_with("lakh") {
        amount * 100_000.0
    } else {
        amount
    };

    Some(if negative { -amount } else { amount })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let text = value_to_text(&value);
    Ok(if text.is_empty() { None } else { Some(text) })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// `1`, `"1"` and `"Day 1"` all read as day one. A grouped range such as
/// `"Day 2-7"` reads as its first day; the normaliser then sees the gap.
fn lenient_day<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().and_then(|d| u32::try_from(d).ok()),
        Value::String(s) => {
            let digits: String = s
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().ok()
        }
        _ => None,
    })
}

/// Skips list members that do not deserialize instead of failing the list.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_coordinates<'de, D>(deserializer: D) -> Result<Option<Coordinates>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Object(map) = value else {
        return Ok(None);
    };

    let lat = map
        .get("lat")
        .or_else(|| map.get("latitude"))
        .and_then(value_to_amount);
    let lng = map
        .get("lng")
        .or_else(|| map.get("lon"))
        .or_else(|| map.get("longitude"))
        .and_then(value_to_amount);

    Ok(match (lat, lng) {
        (Some(lat), Some(lng))
            if (-90.0..=90.0).contains(&lat)
                && (-180.0..=180.0).contains(&lng)
                && !(lat == 0.0 && lng == 0.0) =>
        {
            Some(Coordinates { lat, lng })
        }
        _ => None,
    })
}
