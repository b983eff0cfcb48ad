use actix_web::{web, HttpResponse, Responder};
use log::{error, warn};
use serde_json::json;

use crate::models::trip::GenerateRequest;
use crate::state::AppState;

pub async fn generate_trip(
    state: web::Data<AppState>,
    body: web::Json<GenerateRequest>,
) -> impl Responder {
    let input = match body.into_inner().into_trip_input() {
        Ok(input) => input,
        Err(message) => {
            warn!("Rejected generate request: {}", message);
            return HttpResponse::BadRequest().json(json!({ "error": message }));
        }
    };

    match state.planner.plan(input).await {
        Ok(trip) => HttpResponse::Ok().json(trip),
        Err(err) => {
            let status = err.status_code();
            if status.is_server_error() {
                error!("Trip generation failed: {}", err);
            } else {
                warn!("Trip request refused: {}", err);
            }
            HttpResponse::build(status).json(json!({ "error": err.to_string() }))
        }
    }
}
