use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::amadeus_service::AmadeusService;
use crate::services::cache::{Clock, SystemClock};
use crate::services::exchange_rate_service::ExchangeRateProvider;
use crate::services::gateway_resolver::GatewayResolver;
use crate::services::groq_transport::{ChatTransport, GroqTransport};
use crate::services::itinerary_generator::ItineraryGenerator;
use crate::services::query_parser::QueryParser;
use crate::services::research_service::ResearchService;
use crate::services::trip_planner::TripPlanner;
use crate::services::weather_service::WeatherService;

/// Shared by every worker. The caches inside live as long as the server.
pub struct AppState {
    pub config: AppConfig,
    pub planner: TripPlanner,
    pub weather: WeatherService,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let transport: Arc<dyn ChatTransport> = Arc::new(GroqTransport::new(&config.groq));
        Self::with_parts(config, transport, Arc::new(SystemClock))
    }

    /// Builds the state around a given model transport and clock.
    pub fn with_parts(
        config: AppConfig,
        transport: Arc<dyn ChatTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let amadeus = Arc::new(AmadeusService::new(&config.amadeus, clock.clone()));
        let research = Arc::new(ResearchService::new(&config.tavily, clock.clone()));
        let exchange = Arc::new(ExchangeRateProvider::new(&config.exchange, clock.clone()));

        let planner = TripPlanner::new(
            QueryParser::new(transport.clone()),
            GatewayResolver::new(transport.clone()),
            ItineraryGenerator::new(transport),
            amadeus,
            research,
            exchange,
            clock,
        );
        let weather = WeatherService::new(&config.weather);

        Self {
            config,
            planner,
            weather,
        }
    }
}
