use chrono::Duration;
use futures::future::try_join_all;
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::TavilyConfig;
use crate::models::research::ResearchContext;
use crate::models::trip::BudgetTier;
use crate::services::cache::{Clock, Lookup, TtlCache};

const RESEARCH_CACHE_DAYS: i64 = 7;
const MAX_RESULTS: u32 = 3;

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    include_answer: bool,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    content: String,
}

#[derive(Debug)]
pub enum ResearchError {
    EnvironmentError(String),
    HttpError(reqwest::Error),
    ResponseError(String),
}

impl fmt::Display for ResearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResearchError::EnvironmentError(msg) => write!(f, "Environment error: {}", msg),
            ResearchError::HttpError(err) => write!(f, "HTTP error: {}", err),
            ResearchError::ResponseError(msg) => write!(f, "Response error: {}", msg),
        }
    }
}

impl std::error::Error for ResearchError {}

impl From<reqwest::Error> for ResearchError {
    fn from(err: reqwest::Error) -> Self {
        ResearchError::HttpError(err)
    }
}

type ResearchKey = (String, String, String);

/// Web research on what a trip will cost, one search per cost area.
pub struct ResearchService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    cache: TtlCache<ResearchKey, String>,
}

impl ResearchService {
    pub fn new(config: &TavilyConfig, clock: Arc<dyn Clock>) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            cache: TtlCache::new(Duration::days(RESEARCH_CACHE_DAYS), clock),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Inter-city transport, stay and attraction-fee searches for the tier.
    pub fn queries_for(source: &str, destination: &str, budget: BudgetTier) -> [String; 3] {
        let (transport, stay) = match budget {
            BudgetTier::Cheap => (
                format!(
                    "Sleeper Class Train OR Non-AC Bus fare from {} to {} 2026. If no direct, find to nearest city + Local Bus fare.",
                    source, destination
                ),
                format!("Price per night for Hostels or Guesthouses in {} 2026", destination),
            ),
            BudgetTier::Mid => (
                format!(
                    "3AC Train OR AC Volvo Bus fare from {} to {} 2026. If no direct, to nearest hub + Shared Cab fare.",
                    source, destination
                ),
                format!("Price per night for 3-Star Hotels in {} 2026", destination),
            ),
            BudgetTier::Luxury => (
                format!(
                    "Business Class Flight OR 1st AC Train fare from {} to {} 2026. If no direct, find Flight to nearest airport + Private Taxi fare to {}.",
                    source, destination, destination
                ),
                format!(
                    "Price per night for 5-Star Resorts or Luxury Hotels in {} 2026",
                    destination
                ),
            ),
        };

        [
            transport,
            stay,
            format!(
                "Entry ticket fees for top 10 tourist places in {} 2026",
                destination
            ),
        ]
    }

    pub async fn research_travel_costs(
        &self,
        source: &str,
        destination: &str,
        budget: BudgetTier,
    ) -> ResearchContext {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("Research skipped for {} -> {}: TAVILY_API_KEY not set", source, destination);
            return ResearchContext::Unavailable(
                "No research data available (API key missing).".to_string(),
            );
        };

        let key = (
            source.to_string(),
            destination.to_string(),
            budget.as_str().to_lowercase(),
        );

        match self
            .cache
            .get_or_fetch(&key, || self.search_all(api_key, source, destination, budget))
            .await
        {
            Lookup::Cached(text) => {
                info!("Using cached research for {} -> {} ({})", source, destination, budget);
                ResearchContext::Found(text)
            }
            Lookup::Fetched(text) => ResearchContext::Found(text),
            Lookup::Failed { error, .. } => {
                warn!("Research failed for {} -> {}: {}", source, destination, error);
                ResearchContext::Unavailable("Error fetching real-time research data.".to_string())
            }
        }
    }

    async fn search_all(
        &self,
        api_key: &str,
        source: &str,
        destination: &str,
        budget: BudgetTier,
    ) -> Result<String, ResearchError> {
        let queries = Self::queries_for(source, destination, budget);
        let responses = try_join_all(queries.iter().map(|q| self.search(api_key, q))).await?;

        let summary = queries
            .iter()
            .zip(responses)
            .map(|(query, response)| {
                let answer = response
                    .answer
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| "Check below.".to_string());
                let snippets = response
                    .results
                    .iter()
                    .map(|hit| hit.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("Q: {}\nA: {}\nSources: {}", query, answer, snippets)
            })
            .collect::<Vec<_>>()
            .join("\n---\n");

        Ok(summary)
    }

    async fn search(&self, api_key: &str, query: &str) -> Result<SearchResponse, ResearchError> {
        let url = format!("{}/search", self.base_url);
        let body = SearchRequest {
            api_key,
            query,
            search_depth: "basic",
            include_answer: true,
            max_results: MAX_RESULTS,
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ResearchError::ResponseError(format!(
                "Search failed with status {}: {}",
                status, error_text
            )));
        }

        Ok(response.json().await?)
    }
}
