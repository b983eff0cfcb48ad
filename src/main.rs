use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{info, warn};

use wayfarer_api::config::AppConfig;
use wayfarer_api::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    env_logger::init_from_env(Env::default().default_filter_or("info"));
    info!("Application starting...");

    let config = AppConfig::from_env();
    if config.groq.api_key.is_none() {
        warn!("GROQ_API_KEY is not set; itinerary generation will fail");
    }

    let host = config.host.clone();
    let port = config.port;
    let state = web::Data::new(AppState::new(config));

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(wayfarer_api::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
