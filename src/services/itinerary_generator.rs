//! Two model passes turn the trip context into an itinerary: a draft, then
//! an audit of that draft. The result is normalized, checked against the
//! budget policy, and finally pinned to the real flight price when one was
//! found.

use log::{debug, info, warn};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::models::chat::ChatRequest;
use crate::models::itinerary::{DraftItinerary, IncompletePlan, Itinerary};
use crate::models::pricing::{Geography, PriceAnchor};
use crate::models::research::ResearchContext;
use crate::models::trip::{BudgetTier, TripRequest};
use crate::services::budget_policy::{self, PolicyRow, TripFacts};
use crate::services::groq_transport::{ChatError, ChatTransport};

const RESEARCH_EXCERPT_CHARS: usize = 800;
const DRAFT_MAX_TOKENS: u32 = 6000;
const MULTI_CITY_MIN_DAYS: u32 = 7;

/// Everything known about a trip before the model is asked to plan it.
#[derive(Debug, Clone)]
pub struct GenerationContext<'a> {
    pub trip: &'a TripRequest,
    pub research: &'a ResearchContext,
    pub anchor: PriceAnchor,
    pub exchange_rate: f64,
    pub currency: &'a str,
    pub geography: Geography,
}

impl GenerationContext<'_> {
    fn money(&self, amount: u64) -> String {
        format!("{} {}", self.currency, group_thousands(amount))
    }

    fn local(&self, usd: f64) -> u64 {
        (usd * self.exchange_rate).round().max(0.0) as u64
    }

    fn flight_statement(&self) -> String {
        match self.anchor.flight_estimate {
            Some(price) => format!(
                "Confirmed real round-trip flight price for all {} travelers: {}.",
                self.trip.travelers,
                self.money(price)
            ),
            None => "No confirmed flight price. Estimate it yourself from typical 2026 rates."
                .to_string(),
        }
    }

    fn hotel_statement(&self) -> String {
        match self.anchor.hotel_estimate {
            Some(price) => format!(
                "Confirmed real hotel stay price (total for {} days): {}.",
                self.trip.days,
                self.money(price)
            ),
            None => "No confirmed hotel price. Estimate a realistic one yourself.".to_string(),
        }
    }

    fn facts(&self, land_route: Option<bool>) -> TripFacts {
        TripFacts {
            tier: self.trip.budget,
            geography: self.geography,
            days: self.trip.days,
            travelers: self.trip.travelers,
            exchange_rate: self.exchange_rate,
            has_flight_anchor: self.anchor.flight_estimate.is_some(),
            land_route,
        }
    }
}

#[derive(Debug)]
pub enum GenerationError {
    Transport(ChatError),
    Unparseable(String),
    Incomplete(IncompletePlan),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Transport(err) => write!(f, "Itinerary generation failed: {}", err),
            GenerationError::Unparseable(msg) => {
                write!(f, "Itinerary generation returned unusable output: {}", msg)
            }
            GenerationError::Incomplete(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for GenerationError {}

impl From<ChatError> for GenerationError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::InvalidJson(msg) => GenerationError::Unparseable(msg),
            other => GenerationError::Transport(other),
        }
    }
}

impl From<IncompletePlan> for GenerationError {
    fn from(err: IncompletePlan) -> Self {
        GenerationError::Incomplete(err)
    }
}

pub struct ItineraryGenerator {
    transport: Arc<dyn ChatTransport>,
}

impl ItineraryGenerator {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    pub async fn generate(&self, ctx: &GenerationContext<'_>) -> Result<Itinerary, GenerationError> {
        let trip = ctx.trip;
        let draft = self.draft(ctx).await?;

        let (mut itinerary, land_route) = match self.sanitize(ctx, &draft).await {
            Ok(sanitized) => match parse_itinerary(sanitized, trip) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Sanitized itinerary unusable ({}), using the draft", e);
                    parse_itinerary(draft, trip)?
                }
            },
            Err(e) => {
                warn!("Sanitizer pass failed ({}), using the draft", e);
                parse_itinerary(draft, trip)?
            }
        };

        budget_policy::validate(&mut itinerary, &ctx.facts(land_route));
        apply_flight_anchor(&mut itinerary, ctx.anchor, trip.budget);

        info!(
            "Generated {}-day itinerary for {} with total estimate {}",
            itinerary.daily_plans.len(),
            trip.destination,
            ctx.money(itinerary.budget_breakdown.total())
        );
        Ok(itinerary)
    }

    async fn draft(&self, ctx: &GenerationContext<'_>) -> Result<Value, GenerationError> {
        let days = ctx.trip.days;
        let system = format!(
            "You are a professional travel planner. You must generate an itinerary for EXACTLY {days} days. \
             If {days} is 30, generate a full 30-day plan. Do not stop early. Use realistic pricing."
        );
        let request = ChatRequest::new(system, draft_prompt(ctx))
            .json()
            .with_max_tokens(DRAFT_MAX_TOKENS);

        let value = self.transport.complete_json(&request).await?;
        debug!("Draft itinerary received for {}", ctx.trip.destination);
        Ok(value)
    }

    async fn sanitize(&self, ctx: &GenerationContext<'_>, draft: &Value) -> Result<Value, ChatError> {
        let request = ChatRequest::new(sanitizer_prompt(ctx), sanitizer_input(ctx, draft))
            .json()
            .with_temperature(0.1)
            .with_max_tokens(DRAFT_MAX_TOKENS);
        self.transport.complete_json(&request).await
    }
}

/// The normalized itinerary plus the model's overland verdict.
fn parse_itinerary(
    value: Value,
    trip: &TripRequest,
) -> Result<(Itinerary, Option<bool>), GenerationError> {
    let draft: DraftItinerary = serde_json::from_value(value)
        .map_err(|e| GenerationError::Unparseable(e.to_string()))?;
    let land_route = draft.land_route;
    Ok((draft.normalize(trip.days, &trip.destination)?, land_route))
}

/// A confirmed economy fare always replaces the model's main travel figure.
/// The stay figure has no such override.
pub fn apply_flight_anchor(itinerary: &mut Itinerary, anchor: PriceAnchor, tier: BudgetTier) {
    if let Some(fare) = anchor.flight_estimate {
        let main = &mut itinerary.budget_breakdown.main_travel;
        main.estimate = (fare as f64 * tier.main_travel_multiplier()).round() as u64;
        main.label = tier.main_travel_label().to_string();
    }
}

fn policy_lines(ctx: &GenerationContext<'_>, row: &PolicyRow) -> String {
    let region = if row.international {
        "OUTSIDE the home country"
    } else {
        "WITHIN the home country"
    };
    format!(
        "- {region}: food {food}/day per person; paid attractions at least {attr}/day per person; \
         stay fallback {stay}/night; local transport: {transport}.",
        food = ctx.money(ctx.local(row.food_per_person_day)),
        attr = ctx.money(ctx.local(row.attractions_per_person_day)),
        stay = ctx.money(ctx.local(row.stay_per_night)),
        transport = row.intra_city_transport,
    )
}

fn draft_prompt(ctx: &GenerationContext<'_>) -> String {
    let trip = ctx.trip;
    let tier = trip.budget;
    let travelers = trip.travelers;

    let vibe = trip
        .vibe
        .as_deref()
        .map(|v| format!("The trip should have a \"{}\" vibe.\n", v))
        .unwrap_or_default();

    let policy = match ctx.geography {
        Geography::Unknown => [Geography::Domestic, Geography::International]
            .iter()
            .map(|g| policy_lines(ctx, budget_policy::policy_for(tier, *g)))
            .collect::<Vec<_>>()
            .join("\n"),
        known => policy_lines(ctx, budget_policy::policy_for(tier, known)),
    };

    // The worked example uses the same fare the validator charges.
    let sample_fare = budget_policy::policy_for(BudgetTier::Cheap, Geography::Domestic)
        .land_fare_per_person
        .map(|usd| ctx.local(usd))
        .unwrap_or_default();
    let stays = match tier {
        BudgetTier::Cheap => "Hostels or 1-2 star budget hotels",
        BudgetTier::Mid => "3-4 star hotels with breakfast",
        BudgetTier::Luxury => "5-star luxury or heritage hotels",
    };
    let sights = match tier {
        BudgetTier::Cheap => "free landmarks, parks and street markets, at most one iconic paid ticket per city",
        BudgetTier::Mid => "popular paid attractions, guided group tours and one hands-on experience",
        BudgetTier::Luxury => "private guided tours and exclusive experiences with private transport",
    };

    format!(
        r#"TRIP SCOPE: From {source} to {destination} for {days} days for {travelers} travelers.
Budget tier: {tier}. Geography: {geography}.
{vibe}
MULTI-CITY RULE:
- If the trip is longer than {multi_city} days and the destination is a country or a large region, plan a multi-city tour and make every city change clear in daily_plans.

ACTIVITY RULES:
- Day 1 starts at {destination}, not {source}. The travelers have already arrived on Day 1.
- Exactly 3 activities per day: Morning, Afternoon, Evening. Descriptions of 15-20 words. Use specific place names for "location".

INTER-CITY TRANSPORT:
- Land journey possible: Cheap uses Sleeper Class trains or buses and NEVER flights; Mid uses 3AC trains or budget economy flights; Luxury uses business class flights or 2AC trains.
- Land journey impossible: Cheap and Mid use budget economy flights; Luxury uses business class.

TIER POLICY ({tier}):
{policy}
- Stay: {stays}.
- Sightseeing: {sights}.

DATA RULES:
- ALL PRICING IS THE TOTAL FOR {travelers} PEOPLE, in {currency}.
- "main_travel" is the TOTAL ROUND-TRIP cost for all {travelers} people, and its label says "Round-trip".
- Worked example: a {fare_one} one-way train ticket per person becomes {fare_total} for {travelers} people round-trip.

Research (context): {research}

PRIMARY SOURCES OF TRUTH:
1. FLIGHT ANCHOR: {flight}
2. STAY ANCHOR: {hotel}
When an anchor is confirmed, use it for the estimate. Do not invent your own number.

"land_route" is true only when {source} and {destination} are in the same country and connected by road or rail.

Return valid JSON only:
{{
  "trip_summary": "Short overview",
  "land_route": true,
  "budget_breakdown": {{
    "main_travel": {{ "label": "...", "estimate": 0, "note": "..." }},
    "stay": {{ "label": "...", "estimate": 0, "note": "..." }},
    "transport": {{ "label": "...", "estimate": 0, "note": "..." }},
    "attractions": {{ "label": "...", "estimate": 0, "note": "..." }},
    "food": {{ "label": "...", "estimate": 0, "note": "..." }}
  }},
  "daily_plans": [
    {{
      "day": 1,
      "city": "City Name",
      "activities": [
        {{ "time": "Morning", "description": "...", "location": "Spot Name", "coordinates": {{ "lat": 0.0, "lng": 0.0 }} }},
        {{ "time": "Afternoon", "description": "...", "location": "Spot Name", "coordinates": {{ "lat": 0.0, "lng": 0.0 }} }},
        {{ "time": "Evening", "description": "...", "location": "Spot Name", "coordinates": {{ "lat": 0.0, "lng": 0.0 }} }}
      ]
    }}
  ]
}}

NEVER group days like "Day 2-7". Return exactly {days} objects in daily_plans, each with a "city"."#,
        source = trip.source_city,
        destination = trip.destination,
        days = trip.days,
        geography = ctx.geography.describe(),
        multi_city = MULTI_CITY_MIN_DAYS,
        currency = ctx.currency,
        fare_one = ctx.money(sample_fare),
        fare_total = ctx.money(sample_fare * travelers as u64 * 2),
        research = ctx.research.prompt_excerpt(RESEARCH_EXCERPT_CHARS),
        flight = ctx.flight_statement(),
        hotel = ctx.hotel_statement(),
    )
}

fn sanitizer_prompt(ctx: &GenerationContext<'_>) -> String {
    let travelers = ctx.trip.travelers;
    let rate = ctx.exchange_rate;
    format!(
        r#"You are the Sanitizer. You take a draft travel itinerary JSON and return it corrected:
1. MATH AUDIT: verify every "estimate" in budget_breakdown with unit price (USD) x exchange rate ({rate}) x travelers ({travelers}) x duration. Fix any estimate that fails this check.
2. ROUND TRIP: "main_travel" covers the round trip for ALL {travelers} travelers.
3. LAND ROUTES: set "land_route" to true only if source and destination are in the same country and connected by road or rail. If the budget is Cheap and "land_route" is true, replace flights with a Sleeper Class train fare.
4. ATTRACTIONS: if daily_plans mention paid sites (museums, forts, palaces, monuments), the "attractions" estimate must be above 0.
5. Make sure coordinates (lat/lng) are accurate.
6. Every "label" and "note" is a plain string.
7. NO GROUPING: every day is its own object, with a "city" field.
8. Return ONLY the corrected JSON in the same shape."#
    )
}

fn sanitizer_input(ctx: &GenerationContext<'_>, draft: &Value) -> String {
    format!(
        "Draft JSON: {}. Source: {}, Destination: {}, Budget: {}, Travelers: {}, Exchange Rate: {}. \
         Flight anchor: {} Stay anchor: {}",
        draft,
        ctx.trip.source_city,
        ctx.trip.destination,
        ctx.trip.budget,
        ctx.trip.travelers,
        ctx.exchange_rate,
        ctx.flight_statement(),
        ctx.hotel_statement(),
    )
}

fn group_thousands(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
