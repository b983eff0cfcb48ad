pub mod amadeus_service;
pub mod budget_policy;
pub mod cache;
pub mod exchange_rate_service;
pub mod gateway_resolver;
pub mod groq_transport;
pub mod itinerary_generator;
pub mod query_parser;
pub mod research_service;
pub mod trip_planner;
pub mod weather_service;
