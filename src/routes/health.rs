use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use std::collections::HashMap;
use std::env;

use crate::config::{mask, AppConfig};
use crate::state::AppState;

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let config = &state.config;
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    health.services.insert("model".to_string(), check_model(config));
    health.services.insert("pricing".to_string(), check_pricing(config));
    health.services.insert("research".to_string(), check_research(config));
    health.services.insert(
        "exchange_rate".to_string(),
        ServiceStatus {
            status: "ok".to_string(),
            details: Some(format!(
                "USD/{} from {}, fallback {}",
                config.exchange.currency, config.exchange.base_url, config.exchange.fallback_rate
            )),
        },
    );

    // Any missing integration marks the whole service degraded.
    if health.services.values().any(|s| s.status != "ok") {
        health.status = "degraded".to_string();
    }

    HttpResponse::Ok().json(health)
}

fn check_model(config: &AppConfig) -> ServiceStatus {
    match &config.groq.api_key {
        Some(key) => ServiceStatus {
            status: "ok".to_string(),
            details: Some(format!(
                "Model {} configured ({})",
                config.groq.model,
                mask(key)
            )),
        },
        None => missing(&["GROQ_API_KEY"]),
    }
}

fn check_pricing(config: &AppConfig) -> ServiceStatus {
    match (&config.amadeus.client_id, &config.amadeus.client_secret) {
        (Some(id), Some(_)) => ServiceStatus {
            status: "ok".to_string(),
            details: Some(format!(
                "Pricing API configured at {}, Client ID: {}",
                config.amadeus.base_url,
                mask(id)
            )),
        },
        (id, secret) => {
            let mut names = Vec::new();
            if id.is_none() {
                names.push("AMADEUS_CLIENT_ID");
            }
            if secret.is_none() {
                names.push("AMADEUS_CLIENT_SECRET");
            }
            missing(&names)
        }
    }
}

fn check_research(config: &AppConfig) -> ServiceStatus {
    match &config.tavily.api_key {
        Some(key) => ServiceStatus {
            status: "ok".to_string(),
            details: Some(format!("Research API key configured ({})", mask(key))),
        },
        None => missing(&["TAVILY_API_KEY"]),
    }
}

fn missing(names: &[&str]) -> ServiceStatus {
    ServiceStatus {
        status: "error".to_string(),
        details: Some(format!("Missing configuration: {}", names.join(", "))),
    }
}
