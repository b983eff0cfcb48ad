use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde::Deserialize;
use serde_json::json;

use crate::services::weather_service::WeatherError;
use crate::state::AppState;

const DEFAULT_FORECAST_DAYS: u32 = 7;

#[derive(Debug, Deserialize)]
pub struct WeatherParams {
    destination: Option<String>,
    days: Option<u32>,
}

pub async fn get_weather(
    state: web::Data<AppState>,
    params: web::Query<WeatherParams>,
) -> impl Responder {
    let destination = match params.destination.as_deref().map(str::trim) {
        Some(d) if !d.is_empty() => d,
        _ => {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "destination is required" }))
        }
    };

    match state
        .weather
        .forecast(destination, params.days.unwrap_or(DEFAULT_FORECAST_DAYS))
        .await
    {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(WeatherError::NotFound(place)) => HttpResponse::NotFound()
            .json(json!({ "error": format!("Destination not found: {}", place) })),
        Err(err) => {
            error!("Weather lookup failed for '{}': {}", destination, err);
            HttpResponse::InternalServerError().json(json!({ "error": err.to_string() }))
        }
    }
}
