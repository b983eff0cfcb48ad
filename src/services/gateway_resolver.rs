use log::{debug, warn};
use std::sync::Arc;

use crate::models::chat::ChatRequest;
use crate::services::groq_transport::ChatTransport;

const RESOLVER_PROMPT: &str = "You are a travel expert. Convert the given location into the name of its SINGLE most important international airport hub city. If it is already a city, return it as is. Respond with ONLY the city name.";

// A city name never needs more than this.
const MAX_CITY_CHARS: usize = 60;

/// Maps a country, state or region to its main gateway city. Best effort:
/// any failure leaves the input unchanged.
pub struct GatewayResolver {
    transport: Arc<dyn ChatTransport>,
}

impl GatewayResolver {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    pub async fn resolve_gateway(&self, location: &str) -> String {
        let request = ChatRequest::new(RESOLVER_PROMPT, location)
            .with_temperature(0.0)
            .with_max_tokens(20);

        match self.transport.complete(&request).await {
            Ok(answer) => match clean_city(&answer) {
                Some(city) => {
                    debug!("Resolved '{}' to gateway '{}'", location, city);
                    city
                }
                None => {
                    warn!("Unusable gateway answer for '{}': {:?}", location, answer);
                    location.to_string()
                }
            },
            Err(e) => {
                warn!("Gateway resolution failed for '{}': {}", location, e);
                location.to_string()
            }
        }
    }
}

fn clean_city(answer: &str) -> Option<String> {
    let line = answer.lines().map(str::trim).find(|l| !l.is_empty())?;
    let city = line
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '.')
        .trim();
    if city.is_empty() || city.chars().count() > MAX_CITY_CHARS {
        None
    } else {
        Some(city.to_string())
    }
}
