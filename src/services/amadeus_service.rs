//! Flight, hotel and location lookups against an Amadeus-compatible API.
//!
//! Authentication uses the OAuth2 client-credentials grant; the bearer token
//! is cached until shortly before it expires. Every method reports failures
//! as a [`PricingError`] so the caller decides how to degrade.

use chrono::{Duration, NaiveDate};
use log::{debug, warn};
use oauth2::{
    basic::BasicClient, reqwest::async_http_client, AuthType, AuthUrl, ClientId, ClientSecret,
    TokenResponse, TokenUrl,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

use crate::config::AmadeusConfig;
use crate::models::pricing::LocationCode;
use crate::services::cache::{Clock, TtlCache};

// Refresh a little before the server-side expiry.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 30;
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 1799;
const MAX_HOTEL_CANDIDATES: usize = 3;

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationRecord {
    iata_code: Option<String>,
    name: Option<String>,
    address: Option<LocationAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationAddress {
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HotelRecord {
    hotel_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOffer {
    #[serde(default)]
    pub id: String,
    pub price: FlightPrice,
    #[serde(default)]
    pub number_of_bookable_seats: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlightPrice {
    pub total: String,
    #[serde(default)]
    pub currency: String,
}

impl FlightOffer {
    pub fn total(&self) -> Option<f64> {
        self.price.total.trim().parse().ok()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HotelOffer {
    pub hotel: HotelSummary,
    #[serde(default)]
    pub offers: Vec<RoomOffer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelSummary {
    pub hotel_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomOffer {
    pub price: RoomPrice,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomPrice {
    #[serde(default)]
    pub total: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl HotelOffer {
    /// Cheapest stay total across this property's offers.
    pub fn best_total(&self) -> Option<f64> {
        self.offers
            .iter()
            .filter_map(|offer| offer.price.total.as_deref())
            .filter_map(|total| total.trim().parse::<f64>().ok())
            .fold(None, |best: Option<f64>, total| {
                Some(best.map_or(total, |b| b.min(total)))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelClass {
    Economy,
    Business,
}

impl TravelClass {
    fn as_str(&self) -> &'static str {
        match self {
            TravelClass::Economy => "ECONOMY",
            TravelClass::Business => "BUSINESS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlightQuery {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub adults: u32,
    pub travel_class: TravelClass,
}

#[derive(Debug, Clone)]
pub struct HotelQuery {
    pub city_code: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: u32,
    pub ratings: &'static str,
}

#[derive(Debug)]
pub enum PricingError {
    EnvironmentError(String),
    AuthError(String),
    HttpError(reqwest::Error),
    ResponseError(String),
}

impl fmt::Display for PricingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingError::EnvironmentError(msg) => write!(f, "Environment error: {}", msg),
            PricingError::AuthError(msg) => write!(f, "Authentication error: {}", msg),
            PricingError::HttpError(err) => write!(f, "HTTP error: {}", err),
            PricingError::ResponseError(msg) => write!(f, "Response error: {}", msg),
        }
    }
}

impl std::error::Error for PricingError {}

impl From<reqwest::Error> for PricingError {
    fn from(err: reqwest::Error) -> Self {
        PricingError::HttpError(err)
    }
}

pub struct AmadeusService {
    client: Client,
    base_url: String,
    credentials: Option<(String, String)>,
    token_cache: TtlCache<(), String>,
    // The OAuth2 exchange runs on its own HTTP client, so it is bounded here.
    token_timeout: std::time::Duration,
}

impl AmadeusService {
    pub fn new(config: &AmadeusConfig, clock: Arc<dyn Clock>) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        let credentials = match (&config.client_id, &config.client_secret) {
            (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
            _ => None,
        };

        Self {
            client,
            base_url: config.base_url.clone(),
            credentials,
            token_cache: TtlCache::new(Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS as i64), clock),
            token_timeout: config.timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Bearer token, reused until it expires.
    pub async fn token(&self) -> Result<String, PricingError> {
        self.token_cache
            .get_or_fetch_with_ttl(&(), || self.fetch_token())
            .await
            .into_result()
    }

    async fn fetch_token(&self) -> Result<(String, Duration), PricingError> {
        let (client_id, client_secret) = self.credentials.clone().ok_or_else(|| {
            PricingError::EnvironmentError(
                "AMADEUS_CLIENT_ID and AMADEUS_CLIENT_SECRET must be set".to_string(),
            )
        })?;

        let auth_url = AuthUrl::new(format!("{}/v1/security/oauth2/authorize", self.base_url))
            .map_err(|e| PricingError::EnvironmentError(format!("Invalid auth URL: {}", e)))?;
        let token_url = TokenUrl::new(format!("{}/v1/security/oauth2/token", self.base_url))
            .map_err(|e| PricingError::EnvironmentError(format!("Invalid token URL: {}", e)))?;

        let oauth = BasicClient::new(
            ClientId::new(client_id),
            Some(ClientSecret::new(client_secret)),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::RequestBody);

        let exchange = oauth
            .exchange_client_credentials()
            .request_async(async_http_client);
        let token = tokio::time::timeout(self.token_timeout, exchange)
            .await
            .map_err(|_| {
                PricingError::AuthError(format!(
                    "Token request timed out after {}s",
                    self.token_timeout.as_secs_f32()
                ))
            })?
            .map_err(|e| PricingError::AuthError(format!("Token request failed: {}", e)))?;

        let lifetime = token
            .expires_in()
            .unwrap_or(std::time::Duration::from_secs(DEFAULT_TOKEN_LIFETIME_SECS));
        let ttl = Duration::from_std(lifetime)
            .unwrap_or_else(|_| Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS as i64))
            - Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS);

        debug!("Obtained pricing API token valid for {}s", ttl.num_seconds());
        Ok((token.access_token().secret().clone(), ttl.max(Duration::zero())))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PricingError> {
        let token = self.token().await?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PricingError::ResponseError(format!(
                "{} failed with status {}: {}",
                path, status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PricingError::ResponseError(format!("Failed to parse {}: {}", path, e)))
    }

    /// First city or airport matching `name` that carries an IATA code.
    pub async fn search_location_code(&self, name: &str) -> Result<Option<LocationCode>, PricingError> {
        let envelope: DataEnvelope<LocationRecord> = self
            .get_json(
                "/v1/reference-data/locations",
                &[
                    ("subType", "CITY,AIRPORT".to_string()),
                    ("keyword", name.to_string()),
                ],
            )
            .await?;

        let found = envelope.data.into_iter().find_map(|record| {
            let code = record.iata_code.filter(|c| !c.trim().is_empty())?;
            debug!(
                "Location '{}' resolved to {} ({})",
                name,
                code,
                record.name.as_deref().unwrap_or("unnamed")
            );
            Some(LocationCode {
                code,
                country_code: record.address.and_then(|a| a.country_code),
            })
        });

        if found.is_none() {
            warn!("No location code found for '{}'", name);
        }
        Ok(found)
    }

    pub async fn flight_offers(&self, query: &FlightQuery) -> Result<Vec<FlightOffer>, PricingError> {
        let mut params = vec![
            ("originLocationCode", query.origin.clone()),
            ("destinationLocationCode", query.destination.clone()),
            ("departureDate", query.departure_date.format("%Y-%m-%d").to_string()),
            ("adults", query.adults.max(1).to_string()),
            ("nonStop", "false".to_string()),
            ("max", "5".to_string()),
            ("currencyCode", "USD".to_string()),
            ("travelClass", query.travel_class.as_str().to_string()),
        ];
        if let Some(return_date) = query.return_date {
            params.push(("returnDate", return_date.format("%Y-%m-%d").to_string()));
        }

        let envelope: DataEnvelope<FlightOffer> =
            self.get_json("/v2/shopping/flight-offers", &params).await?;
        Ok(envelope.data)
    }

    /// Two steps: up to three hotels in the city with the requested ratings,
    /// then the best rate for each of them.
    pub async fn hotel_offers(&self, query: &HotelQuery) -> Result<Vec<HotelOffer>, PricingError> {
        let hotels: DataEnvelope<HotelRecord> = self
            .get_json(
                "/v1/reference-data/locations/hotels/by-city",
                &[
                    ("cityCode", query.city_code.clone()),
                    ("radius", "5".to_string()),
                    ("radiusUnit", "KM".to_string()),
                    ("hotelSource", "ALL".to_string()),
                    ("ratings", query.ratings.to_string()),
                ],
            )
            .await?;

        let hotel_ids: Vec<String> = hotels
            .data
            .into_iter()
            .take(MAX_HOTEL_CANDIDATES)
            .map(|h| h.hotel_id)
            .collect();
        if hotel_ids.is_empty() {
            return Ok(Vec::new());
        }

        let offers: DataEnvelope<HotelOffer> = self
            .get_json(
                "/v3/shopping/hotel-offers",
                &[
                    ("hotelIds", hotel_ids.join(",")),
                    ("adults", query.adults.max(1).to_string()),
                    ("checkInDate", query.check_in.format("%Y-%m-%d").to_string()),
                    ("checkOutDate", query.check_out.format("%Y-%m-%d").to_string()),
                    ("roomQuantity", "1".to_string()),
                    ("bestRateOnly", "true".to_string()),
                    ("currency", "USD".to_string()),
                ],
            )
            .await?;
        Ok(offers.data)
    }
}
