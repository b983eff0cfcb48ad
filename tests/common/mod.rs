#![allow(dead_code)]

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wayfarer_api::config::{
    AmadeusConfig, AppConfig, ExchangeConfig, GroqConfig, TavilyConfig, WeatherConfig,
};
use wayfarer_api::models::chat::{ChatRequest, ChatResponse, Choice, ResponseMessage};
use wayfarer_api::services::cache::SystemClock;
use wayfarer_api::services::groq_transport::{ChatError, ChatTransport};
use wayfarer_api::state::AppState;

/// Stands in for the model API. Each stage is recognised by its system
/// prompt; a `None` reply simulates an upstream failure. Gateway lookups
/// echo the place name back.
#[derive(Default)]
pub struct ScriptedTransport {
    parser: Option<String>,
    draft: Option<String>,
    sanitizer: Option<String>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parser(mut self, reply: Value) -> Self {
        self.parser = Some(reply.to_string());
        self
    }

    pub fn with_draft(mut self, reply: Value) -> Self {
        self.draft = Some(reply.to_string());
        self
    }

    pub fn with_raw_draft(mut self, reply: &str) -> Self {
        self.draft = Some(reply.to_string());
        self
    }

    pub fn with_sanitizer(mut self, reply: Value) -> Self {
        self.sanitizer = Some(reply.to_string());
        self
    }

    pub fn calls_matching(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.system_prompt().contains(needle))
            .count()
    }

    /// User prompts sent to the stage whose system prompt contains `needle`.
    pub fn user_prompts_for(&self, needle: &str) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.system_prompt().contains(needle))
            .map(|r| r.user_prompt().to_string())
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        self.requests.lock().unwrap().push(request.clone());

        let system = request.system_prompt();
        let reply = if system.contains("travel query parser") {
            self.parser.clone()
        } else if system.contains("airport hub city") {
            Some(request.user_prompt().to_string())
        } else if system.contains("Sanitizer") {
            self.sanitizer.clone()
        } else if system.contains("professional travel planner") {
            self.draft.clone()
        } else {
            None
        };

        match reply {
            Some(content) => Ok(ChatResponse {
                choices: vec![Choice {
                    message: ResponseMessage {
                        content: Some(content),
                    },
                    finish_reason: Some("stop".to_string()),
                }],
            }),
            None => Err(ChatError::ResponseError(
                "Chat completion failed with status 503 Service Unavailable".to_string(),
            )),
        }
    }
}

pub struct TestApp {
    pub server: mockito::ServerGuard,
    pub transport: Arc<ScriptedTransport>,
    pub state: web::Data<AppState>,
}

impl TestApp {
    /// Every upstream points at one local mock server; credentials are set.
    pub async fn new(transport: ScriptedTransport) -> Self {
        let server = mockito::Server::new_async().await;
        let config = test_config(&server.url(), true);
        Self::from_parts(server, config, transport)
    }

    pub async fn without_credentials(transport: ScriptedTransport) -> Self {
        let server = mockito::Server::new_async().await;
        let config = test_config(&server.url(), false);
        Self::from_parts(server, config, transport)
    }

    fn from_parts(server: mockito::ServerGuard, config: AppConfig, transport: ScriptedTransport) -> Self {
        let transport = Arc::new(transport);
        let state = web::Data::new(AppState::with_parts(
            config,
            transport.clone(),
            Arc::new(SystemClock),
        ));
        Self {
            server,
            transport,
            state,
        }
    }

    pub fn create_app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(self.state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(wayfarer_api::configure)
    }

    /// Token, location, offer, research and rate endpoints all fail.
    pub async fn fail_all_enrichment(&mut self) {
        self.server
            .mock("POST", "/v1/security/oauth2/token")
            .with_status(500)
            .create_async()
            .await;
        self.server
            .mock("POST", "/search")
            .with_status(500)
            .create_async()
            .await;
        self.server
            .mock("GET", "/v6/latest/USD")
            .with_status(500)
            .create_async()
            .await;
    }

    pub async fn mock_token(&mut self) -> mockito::Mock {
        self.server
            .mock("POST", "/v1/security/oauth2/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"type":"amadeusOAuth2Token","access_token":"test-token","token_type":"Bearer","expires_in":1799}"#,
            )
            .create_async()
            .await
    }

    pub async fn mock_location(&mut self, keyword: &str, code: &str, country: &str) -> mockito::Mock {
        self.server
            .mock("GET", "/v1/reference-data/locations")
            .match_query(mockito::Matcher::UrlEncoded(
                "keyword".into(),
                keyword.into(),
            ))
            .with_status(200)
            .with_body(
                json!({
                    "data": [{ "name": keyword.to_uppercase(), "iataCode": code, "address": { "countryCode": country } }]
                })
                .to_string(),
            )
            .create_async()
            .await
    }

    pub async fn mock_rate(&mut self, rate: f64) -> mockito::Mock {
        self.server
            .mock("GET", "/v6/latest/USD")
            .with_status(200)
            .with_body(json!({ "result": "success", "rates": { "USD": 1, "INR": rate } }).to_string())
            .create_async()
            .await
    }
}

pub fn test_config(base_url: &str, with_credentials: bool) -> AppConfig {
    let key = |value: &str| with_credentials.then(|| value.to_string());
    let timeout = Duration::from_secs(5);

    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        groq: GroqConfig {
            api_key: key("gsk_test_key_1234"),
            base_url: base_url.to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            timeout,
        },
        amadeus: AmadeusConfig {
            client_id: key("amadeus-client-id"),
            client_secret: key("amadeus-secret"),
            base_url: base_url.to_string(),
            timeout,
        },
        tavily: TavilyConfig {
            api_key: key("tvly-test-key-5678"),
            base_url: base_url.to_string(),
            timeout,
        },
        exchange: ExchangeConfig {
            base_url: base_url.to_string(),
            currency: "INR".to_string(),
            fallback_rate: 90.0,
            timeout,
        },
        weather: WeatherConfig {
            geocoding_url: base_url.to_string(),
            forecast_url: base_url.to_string(),
            timeout,
        },
    }
}

/// A well-formed model itinerary for `days` days in `city`.
pub fn itinerary_json(days: u32, city: &str, main_label: &str, main_estimate: u64) -> Value {
    let plans: Vec<Value> = (1..=days)
        .map(|day| {
            json!({
                "day": day,
                "city": city,
                "activities": [
                    { "time": "Morning", "description": "Climb up to Amber Fort before the crowds", "location": "Amber Fort",
                      "coordinates": { "lat": 26.9855, "lng": 75.8513 } },
                    { "time": "Afternoon", "description": "Street food crawl through the old bazaar", "location": "Johari Bazaar" },
                    { "time": "Evening", "description": "Watch the sunset over the lake", "location": "Jal Mahal" }
                ]
            })
        })
        .collect();

    json!({
        "trip_summary": format!("{} days exploring {}", days, city),
        "budget_breakdown": {
            "main_travel": { "label": main_label, "estimate": main_estimate, "note": "For all travelers" },
            "stay": { "label": "Hostel dorms", "estimate": 2400, "note": "Zostel" },
            "transport": { "label": "Local buses", "estimate": 600, "note": "" },
            "attractions": { "label": "Entry tickets", "estimate": 0, "note": "" },
            "food": { "label": "Street food", "estimate": 3600, "note": "" }
        },
        "daily_plans": plans
    })
}
