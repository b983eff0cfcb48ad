use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum BudgetTier {
    Cheap,
    Mid,
    Luxury,
}

impl BudgetTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetTier::Cheap => "Cheap",
            BudgetTier::Mid => "Mid",
            BudgetTier::Luxury => "Luxury",
        }
    }

    /// Factor applied to a confirmed economy fare to price `main_travel`.
    pub fn main_travel_multiplier(&self) -> f64 {
        match self {
            BudgetTier::Luxury => 2.5,
            _ => 1.0,
        }
    }

    pub fn main_travel_label(&self) -> &'static str {
        if self.main_travel_multiplier() > 1.0 {
            "Business Class Flight"
        } else {
            "Economy Class Flight"
        }
    }
}

impl fmt::Display for BudgetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_lowercase();
        if value.is_empty() {
            return Err("Budget must not be empty".to_string());
        }

        match value.as_str() {
            "cheap" => return Ok(BudgetTier::Cheap),
            "mid" => return Ok(BudgetTier::Mid),
            "luxury" => return Ok(BudgetTier::Luxury),
            _ => {}
        }

        // Tier words outrank "budget" and "economy", which qualify any tier.
        let words: Vec<&str> = value
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let has = |terms: &[&str]| words.iter().any(|w| terms.contains(w));

        if has(&LUXURY_TERMS) {
            Ok(BudgetTier::Luxury)
        } else if has(&MID_TERMS) {
            Ok(BudgetTier::Mid)
        } else if has(&CHEAP_TERMS) {
            Ok(BudgetTier::Cheap)
        } else {
            Err(format!("Unknown budget tier: {}", s.trim()))
        }
    }
}

const LUXURY_TERMS: [&str; 8] = [
    "luxury", "luxurious", "lux", "premium", "high", "splurge", "deluxe", "expensive",
];
const MID_TERMS: [&str; 6] = ["mid", "midrange", "moderate", "medium", "standard", "comfort"];
const CHEAP_TERMS: [&str; 8] = [
    "cheap", "budget", "economy", "low", "backpack", "backpacking", "backpacker", "affordable",
];

impl TryFrom<String> for BudgetTier {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A fully specified trip, ready for generation.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRequest {
    pub source_city: String,
    pub destination: String,
    pub days: u32,
    pub budget: BudgetTier,
    pub travelers: u32,
    pub vibe: Option<String>,
}

/// Body of `POST /api/generate`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub source_city: Option<String>,
    pub destination: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub days: Option<i64>,
    pub budget: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub travelers: Option<i64>,
    pub query: Option<String>,
    pub vibe: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TripInput {
    Structured(TripRequest),
    Query(String),
}

impl GenerateRequest {
    /// Structured fields win when all four are present; otherwise a free-text
    /// query is required.
    pub fn into_trip_input(self) -> Result<TripInput, String> {
        let source_city = non_empty(self.source_city);
        let destination = non_empty(self.destination);
        let budget = non_empty(self.budget);

        match (source_city, destination, self.days, budget) {
            (Some(source_city), Some(destination), Some(days), Some(budget)) => {
                if days <= 0 {
                    return Err("Days must be a positive number".to_string());
                }
                let travelers = match self.travelers {
                    None => 1,
                    Some(n) if n > 0 => n,
                    Some(_) => return Err("Travelers must be a positive number".to_string()),
                };
                let budget: BudgetTier = budget.parse()?;

                Ok(TripInput::Structured(TripRequest {
                    source_city,
                    destination,
                    days: u32::try_from(days).map_err(|_| "Days is too large".to_string())?,
                    budget,
                    travelers: u32::try_from(travelers)
                        .map_err(|_| "Travelers is too large".to_string())?,
                    vibe: non_empty(self.vibe),
                }))
            }
            _ => match non_empty(self.query) {
                Some(query) => Ok(TripInput::Query(query)),
                None => Err("Missing required fields".to_string()),
            },
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts `3`, `3.0` or `"3"`; anything else is treated as absent.
pub fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_budget_tier_parsing() {
        assert_eq!("Cheap".parse::<BudgetTier>().unwrap(), BudgetTier::Cheap);
        assert_eq!("  luxury ".parse::<BudgetTier>().unwrap(), BudgetTier::Luxury);
        assert_eq!("mid-range".parse::<BudgetTier>().unwrap(), BudgetTier::Mid);
        assert_eq!("Budget".parse::<BudgetTier>().unwrap(), BudgetTier::Cheap);
        assert_eq!("low budget".parse::<BudgetTier>().unwrap(), BudgetTier::Cheap);
        assert_eq!("backpacking".parse::<BudgetTier>().unwrap(), BudgetTier::Cheap);
        assert!("whatever".parse::<BudgetTier>().is_err());
        assert!("".parse::<BudgetTier>().is_err());
    }

    #[test]
    fn test_qualified_budget_keeps_its_tier() {
        assert_eq!("Luxury budget".parse::<BudgetTier>().unwrap(), BudgetTier::Luxury);
        assert_eq!("High budget".parse::<BudgetTier>().unwrap(), BudgetTier::Luxury);
        assert_eq!("premium economy".parse::<BudgetTier>().unwrap(), BudgetTier::Luxury);
        assert_eq!("Mid budget".parse::<BudgetTier>().unwrap(), BudgetTier::Mid);
        // Whole words only: "flow" is not "low".
        assert!("flowing".parse::<BudgetTier>().is_err());
    }

    #[test]
    fn test_main_travel_multiplier() {
        assert_eq!(BudgetTier::Luxury.main_travel_multiplier(), 2.5);
        assert_eq!(BudgetTier::Mid.main_travel_multiplier(), 1.0);
        assert_eq!(BudgetTier::Cheap.main_travel_multiplier(), 1.0);
        assert_eq!(BudgetTier::Luxury.main_travel_label(), "Business Class Flight");
        assert_eq!(BudgetTier::Cheap.main_travel_label(), "Economy Class Flight");
    }

    #[test]
    fn test_structured_request_defaults_travelers() {
        let request: GenerateRequest = serde_json::from_value(json!({
            "sourceCity": "Mumbai",
            "destination": "Jaipur",
            "days": "3",
            "budget": "Cheap"
        }))
        .unwrap();

        match request.into_trip_input().unwrap() {
            TripInput::Structured(trip) => {
                assert_eq!(trip.days, 3);
                assert_eq!(trip.travelers, 1);
                assert_eq!(trip.budget, BudgetTier::Cheap);
                assert_eq!(trip.vibe, None);
            }
            other => panic!("Expected structured input, got {:?}", other),
        }
    }

    #[test]
    fn test_query_used_when_structured_fields_incomplete() {
        let request: GenerateRequest = serde_json::from_value(json!({
            "destination": "Goa",
            "query": "a relaxed beach week in Goa for two"
        }))
        .unwrap();

        assert_eq!(
            request.into_trip_input().unwrap(),
            TripInput::Query("a relaxed beach week in Goa for two".to_string())
        );
    }

    #[test]
    fn test_missing_fields_rejected() {
        let request: GenerateRequest =
            serde_json::from_value(json!({ "destination": "Goa", "days": 4 })).unwrap();
        assert_eq!(
            request.into_trip_input().unwrap_err(),
            "Missing required fields"
        );

        let request: GenerateRequest = serde_json::from_value(json!({
            "sourceCity": "Delhi",
            "destination": "Goa",
            "days": 0,
            "budget": "Mid"
        }))
        .unwrap();
        assert!(request.into_trip_input().is_err());
    }

    #[test]
    fn test_unknown_budget_rejected() {
        let request: GenerateRequest = serde_json::from_value(json!({
            "sourceCity": "Delhi",
            "destination": "Goa",
            "days": 2,
            "budget": "space tourism"
        }))
        .unwrap();
        assert!(request.into_trip_input().unwrap_err().contains("Unknown budget tier"));
    }
}
