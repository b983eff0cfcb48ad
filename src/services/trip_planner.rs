//! Request-level orchestration: parse, resolve, price, research, generate.
//!
//! Enrichment steps degrade to absent values; only query parsing and
//! itinerary generation can fail a request.

use actix_web::http::StatusCode;
use chrono::{Days, NaiveDate};
use futures::join;
use log::{info, warn};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::itinerary::GeneratedTrip;
use crate::models::pricing::{Geography, LocationCode, PriceAnchor};
use crate::models::trip::{TripInput, TripRequest};
use crate::services::amadeus_service::{AmadeusService, FlightQuery, HotelQuery, TravelClass};
use crate::services::budget_policy::hotel_ratings;
use crate::services::cache::Clock;
use crate::services::exchange_rate_service::ExchangeRateProvider;
use crate::services::gateway_resolver::GatewayResolver;
use crate::services::itinerary_generator::{GenerationContext, GenerationError, ItineraryGenerator};
use crate::services::query_parser::{QueryError, QueryParser};
use crate::services::research_service::ResearchService;

const DEPARTURE_LEAD_DAYS: u64 = 30;

#[derive(Debug)]
pub enum PlanError {
    InvalidRequest(String),
    Query(QueryError),
    Generation(GenerationError),
}

impl PlanError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PlanError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PlanError::Query(QueryError::NotTravelRelated(_)) => StatusCode::BAD_REQUEST,
            PlanError::Query(QueryError::Malformed(_)) => StatusCode::BAD_REQUEST,
            PlanError::Query(QueryError::Transport(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            PlanError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::InvalidRequest(msg) => write!(f, "{}", msg),
            PlanError::Query(err) => write!(f, "{}", err),
            PlanError::Generation(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for PlanError {}

impl From<QueryError> for PlanError {
    fn from(err: QueryError) -> Self {
        PlanError::Query(err)
    }
}

impl From<GenerationError> for PlanError {
    fn from(err: GenerationError) -> Self {
        PlanError::Generation(err)
    }
}

pub struct TripPlanner {
    parser: QueryParser,
    resolver: GatewayResolver,
    generator: ItineraryGenerator,
    amadeus: Arc<AmadeusService>,
    research: Arc<ResearchService>,
    exchange: Arc<ExchangeRateProvider>,
    clock: Arc<dyn Clock>,
}

impl TripPlanner {
    pub fn new(
        parser: QueryParser,
        resolver: GatewayResolver,
        generator: ItineraryGenerator,
        amadeus: Arc<AmadeusService>,
        research: Arc<ResearchService>,
        exchange: Arc<ExchangeRateProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            parser,
            resolver,
            generator,
            amadeus,
            research,
            exchange,
            clock,
        }
    }

    pub async fn plan(&self, input: TripInput) -> Result<GeneratedTrip, PlanError> {
        let request_id = Uuid::new_v4();

        let trip = match input {
            TripInput::Structured(trip) => trip,
            TripInput::Query(query) => {
                info!("[{}] Parsing free-text query", request_id);
                self.parser.parse_user_query(&query).await?
            }
        };
        if trip.source_city.is_empty() || trip.destination.is_empty() || trip.days == 0 {
            return Err(PlanError::InvalidRequest("Missing required fields".to_string()));
        }

        info!(
            "[{}] Planning {} -> {}, {} days, {}, {} travelers",
            request_id, trip.source_city, trip.destination, trip.days, trip.budget, trip.travelers
        );

        let (source_gateway, destination_gateway) = join!(
            self.resolver.resolve_gateway(&trip.source_city),
            self.resolver.resolve_gateway(&trip.destination)
        );

        let (source_code, destination_code, research) = join!(
            self.location_code(request_id, &source_gateway),
            self.location_code(request_id, &destination_gateway),
            self.research
                .research_travel_costs(&trip.source_city, &trip.destination, trip.budget)
        );
        if !research.is_available() {
            warn!("[{}] Continuing without research context", request_id);
        }

        let geography = Geography::classify(source_code.as_ref(), destination_code.as_ref());
        let departure = self.clock.now().date_naive() + Days::new(DEPARTURE_LEAD_DAYS);

        let (flight_usd, hotel_usd) = join!(
            self.flight_price(request_id, &trip, source_code.as_ref(), destination_code.as_ref(), departure),
            self.hotel_price(request_id, &trip, destination_code.as_ref(), departure)
        );

        let exchange_rate = self.exchange.get_exchange_rate().await;
        let anchor = PriceAnchor {
            flight_estimate: flight_usd.map(|usd| to_local(usd, exchange_rate)),
            hotel_estimate: hotel_usd.map(|usd| to_local(usd, exchange_rate)),
        };
        info!(
            "[{}] Geography {:?}, rate {}, anchors {:?}",
            request_id, geography, exchange_rate, anchor
        );

        let context = GenerationContext {
            trip: &trip,
            research: &research,
            anchor,
            exchange_rate,
            currency: self.exchange.currency(),
            geography,
        };
        let itinerary = self.generator.generate(&context).await.map_err(|e| {
            warn!("[{}] Generation failed: {}", request_id, e);
            e
        })?;

        Ok(GeneratedTrip {
            itinerary,
            destination: trip.destination,
            source_city: trip.source_city,
            travelers: trip.travelers,
        })
    }

    async fn location_code(&self, request_id: Uuid, name: &str) -> Option<LocationCode> {
        match self.amadeus.search_location_code(name).await {
            Ok(code) => code,
            Err(e) => {
                warn!("[{}] Location lookup failed for '{}': {}", request_id, name, e);
                None
            }
        }
    }

    /// Total of the first economy offer, in USD.
    async fn flight_price(
        &self,
        request_id: Uuid,
        trip: &TripRequest,
        origin: Option<&LocationCode>,
        destination: Option<&LocationCode>,
        departure: NaiveDate,
    ) -> Option<f64> {
        let (origin, destination) = (origin?, destination?);
        if origin.code == destination.code {
            return None;
        }

        let query = FlightQuery {
            origin: origin.code.clone(),
            destination: destination.code.clone(),
            departure_date: departure,
            return_date: departure.checked_add_days(Days::new(u64::from(trip.days))),
            adults: trip.travelers,
            travel_class: TravelClass::Economy,
        };

        match self.amadeus.flight_offers(&query).await {
            Ok(offers) => {
                let price = offers.first().and_then(|offer| offer.total());
                if price.is_none() {
                    warn!(
                        "[{}] No priced flight offers {} -> {}",
                        request_id, query.origin, query.destination
                    );
                }
                price
            }
            Err(e) => {
                warn!("[{}] Flight search failed: {}", request_id, e);
                None
            }
        }
    }

    /// Cheapest stay total across the returned properties, in USD.
    async fn hotel_price(
        &self,
        request_id: Uuid,
        trip: &TripRequest,
        destination: Option<&LocationCode>,
        check_in: NaiveDate,
    ) -> Option<f64> {
        let destination = destination?;
        let query = HotelQuery {
            city_code: destination.code.clone(),
            check_in,
            check_out: check_in.checked_add_days(Days::new(u64::from(trip.days)))?,
            adults: trip.travelers,
            ratings: hotel_ratings(trip.budget),
        };

        match self.amadeus.hotel_offers(&query).await {
            Ok(offers) => offers
                .iter()
                .filter_map(|offer| offer.best_total())
                .fold(None, |best: Option<f64>, total| Some(best.map_or(total, |b| b.min(total)))),
            Err(e) => {
                warn!("[{}] Hotel search failed in {}: {}", request_id, query.city_code, e);
                None
            }
        }
    }
}

fn to_local(usd: f64, rate: f64) -> u64 {
    (usd * rate).round().max(0.0) as u64
}
