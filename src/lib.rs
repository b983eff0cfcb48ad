pub mod config;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use actix_web::{error, web, HttpResponse};
use serde_json::json;

/// Registers every route. Shared by the binary and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Malformed bodies get the same `{ "error": ... }` shape as other 400s.
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let body = json!({ "error": format!("Invalid request body: {}", err) });
        error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    });

    cfg.route("/health", web::get().to(routes::health::health_check))
        .service(
            web::scope("/api")
                .app_data(json_config)
                .route("/generate", web::post().to(routes::generate::generate_trip))
                .route("/weather", web::get().to(routes::weather::get_weather)),
        );
}
