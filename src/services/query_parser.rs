use log::{info, warn};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

use crate::models::chat::ChatRequest;
use crate::models::trip::{lenient_count, BudgetTier, TripRequest};
use crate::services::groq_transport::{ChatError, ChatTransport};

const DEFAULT_REJECTION: &str = "I can only help with travel-related queries. Please ask me about trips, destinations, or itineraries!";

const PARSER_PROMPT: &str = r#"You are a travel query parser.
First, evaluate if the user's query is related to travel, tourism, vacation planning, or exploring places.
If the query is IRRELEVANT (e.g., medical advice, toxic content, or random non-travel facts), set 'isTravelRelated' to false.

If it IS travel-related:
1. Extract travel details.
2. If a detail is missing, guess a reasonable default.
3. For 'budget', map it to 'Cheap', 'Mid', or 'Luxury'.
4. For 'destination', if it's a mood, pick a specific famous city.

Return ONLY valid JSON in this format:
{
  "isTravelRelated": boolean,
  "rejectionMessage": "string (only if isTravelRelated is false, explain politely why)",
  "sourceCity": "string",
  "destination": "string",
  "days": number,
  "budget": "Cheap" | "Mid" | "Luxury",
  "travelers": number,
  "vibe": "string"
}"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParsedQuery {
    #[serde(default)]
    is_travel_related: Option<bool>,
    #[serde(default)]
    rejection_message: Option<String>,
    #[serde(default)]
    source_city: Option<String>,
    #[serde(default)]
    destination: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    days: Option<i64>,
    #[serde(default)]
    budget: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    travelers: Option<i64>,
    #[serde(default)]
    vibe: Option<String>,
}

#[derive(Debug)]
pub enum QueryError {
    /// The query is not about travel; carries the message for the user.
    NotTravelRelated(String),
    Malformed(String),
    Transport(ChatError),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::NotTravelRelated(msg) => write!(f, "{}", msg),
            QueryError::Malformed(msg) => write!(f, "Could not understand the trip request: {}", msg),
            QueryError::Transport(err) => write!(f, "Query parsing failed: {}", err),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<ChatError> for QueryError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::InvalidJson(msg) => QueryError::Malformed(msg),
            other => QueryError::Transport(other),
        }
    }
}

pub struct QueryParser {
    transport: Arc<dyn ChatTransport>,
}

impl QueryParser {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    pub async fn parse_user_query(&self, query: &str) -> Result<TripRequest, QueryError> {
        let request = ChatRequest::new(PARSER_PROMPT, query)
            .json()
            .with_temperature(0.1);
        let value = self.transport.complete_json(&request).await?;

        let parsed: ParsedQuery = serde_json::from_value(value)
            .map_err(|e| QueryError::Malformed(format!("unexpected shape: {}", e)))?;

        if parsed.is_travel_related == Some(false) {
            let message = non_empty(parsed.rejection_message)
                .unwrap_or_else(|| DEFAULT_REJECTION.to_string());
            warn!("Rejected non-travel query: {}", message);
            return Err(QueryError::NotTravelRelated(message));
        }

        let trip = parsed.into_trip()?;
        info!(
            "Parsed query into {} -> {}, {} days, {}, {} travelers",
            trip.source_city, trip.destination, trip.days, trip.budget, trip.travelers
        );
        Ok(trip)
    }
}

impl ParsedQuery {
    fn into_trip(self) -> Result<TripRequest, QueryError> {
        let source_city = non_empty(self.source_city)
            .ok_or_else(|| QueryError::Malformed("missing source city".to_string()))?;
        let destination = non_empty(self.destination)
            .ok_or_else(|| QueryError::Malformed("missing destination".to_string()))?;

        let days = self
            .days
            .filter(|d| *d > 0)
            .and_then(|d| u32::try_from(d).ok())
            .ok_or_else(|| QueryError::Malformed("missing or invalid day count".to_string()))?;

        let budget: BudgetTier = non_empty(self.budget)
            .ok_or_else(|| QueryError::Malformed("missing budget".to_string()))?
            .parse()
            .map_err(QueryError::Malformed)?;

        let travelers = match self.travelers {
            None => 1,
            Some(n) => u32::try_from(n)
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| QueryError::Malformed("invalid traveler count".to_string()))?,
        };

        Ok(TripRequest {
            source_city,
            destination,
            days,
            budget,
            travelers,
            vibe: non_empty(self.vibe),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::{ChatResponse, Choice, ResponseMessage};
    use async_trait::async_trait;

    struct Canned(&'static str);

    #[async_trait]
    impl ChatTransport for Canned {
        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, ChatError> {
            Ok(ChatResponse {
                choices: vec![Choice {
                    message: ResponseMessage {
                        content: Some(self.0.to_string()),
                    },
                    finish_reason: Some("stop".to_string()),
                }],
            })
        }
    }

    fn parser(content: &'static str) -> QueryParser {
        QueryParser::new(Arc::new(Canned(content)))
    }

    #[tokio::test]
    async fn test_travel_query_is_extracted() {
        let trip = parser(
            r#"{"isTravelRelated":true,"sourceCity":"Delhi","destination":"Goa","days":"5","budget":"cheap","travelers":2,"vibe":"beach"}"#,
        )
        .parse_user_query("5 days in Goa on a shoestring for two")
        .await
        .unwrap();

        assert_eq!(trip.source_city, "Delhi");
        assert_eq!(trip.destination, "Goa");
        assert_eq!(trip.days, 5);
        assert_eq!(trip.budget, BudgetTier::Cheap);
        assert_eq!(trip.travelers, 2);
        assert_eq!(trip.vibe.as_deref(), Some("beach"));
    }

    #[tokio::test]
    async fn test_rejection_message_is_kept() {
        let result = parser(
            r#"{"isTravelRelated":false,"rejectionMessage":"Sorry, I can only plan trips on Earth."}"#,
        )
        .parse_user_query("plan a 2-day trip to the moon")
        .await;

        match result {
            Err(QueryError::NotTravelRelated(msg)) => {
                assert_eq!(msg, "Sorry, I can only plan trips on Earth.")
            }
            other => panic!("Expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejection_without_message_uses_default() {
        let result = parser(r#"{"isTravelRelated":false}"#)
            .parse_user_query("how do I bake bread")
            .await;
        assert!(matches!(result, Err(QueryError::NotTravelRelated(msg)) if msg == DEFAULT_REJECTION));
    }

    #[tokio::test]
    async fn test_malformed_output_is_fatal() {
        let result = parser("not json at all").parse_user_query("trip").await;
        assert!(matches!(result, Err(QueryError::Malformed(_))));

        let result = parser(r#"{"isTravelRelated":true,"destination":"Goa","days":3,"budget":"Mid"}"#)
            .parse_user_query("trip to Goa")
            .await;
        assert!(matches!(result, Err(QueryError::Malformed(msg)) if msg.contains("source")));
    }
}
