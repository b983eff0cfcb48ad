//! Tier pricing rules as data, plus the validator that enforces them on a
//! normalized itinerary.
//!
//! All amounts in the table are USD and are converted with the request's
//! exchange rate. Per-person amounts are multiplied by the traveler count.

use log::info;

use crate::models::itinerary::{BudgetCategory, BudgetItem, Itinerary};
use crate::models::pricing::Geography;
use crate::models::trip::BudgetTier;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyRow {
    pub tier: BudgetTier,
    pub international: bool,
    pub food_per_person_day: f64,
    /// Minimum sightseeing spend once the plan includes paid sites.
    pub attractions_per_person_day: f64,
    /// Used only when the model left the stay at zero.
    pub stay_per_night: f64,
    /// One-way land fare for routes that must not fly.
    pub land_fare_per_person: Option<f64>,
    pub intra_city_transport: &'static str,
}

pub const POLICY_TABLE: [PolicyRow; 6] = [
    PolicyRow {
        tier: BudgetTier::Cheap,
        international: false,
        food_per_person_day: 6.0,
        attractions_per_person_day: 2.5,
        stay_per_night: 12.0,
        land_fare_per_person: Some(11.0),
        intra_city_transport: "Metro, shared taxis, local buses",
    },
    PolicyRow {
        tier: BudgetTier::Mid,
        international: false,
        food_per_person_day: 10.0,
        attractions_per_person_day: 12.0,
        stay_per_night: 60.0,
        land_fare_per_person: None,
        intra_city_transport: "Scooter rentals or app-based cabs",
    },
    PolicyRow {
        tier: BudgetTier::Luxury,
        international: false,
        food_per_person_day: 18.0,
        attractions_per_person_day: 36.0,
        stay_per_night: 180.0,
        land_fare_per_person: None,
        intra_city_transport: "Full-day private car or chauffeured cab",
    },
    PolicyRow {
        tier: BudgetTier::Cheap,
        international: true,
        food_per_person_day: 15.0,
        attractions_per_person_day: 6.0,
        stay_per_night: 36.0,
        land_fare_per_person: None,
        intra_city_transport: "Metro, shared taxis, local buses",
    },
    PolicyRow {
        tier: BudgetTier::Mid,
        international: true,
        food_per_person_day: 35.0,
        attractions_per_person_day: 30.0,
        stay_per_night: 120.0,
        land_fare_per_person: None,
        intra_city_transport: "Scooter rentals or app-based cabs",
    },
    PolicyRow {
        tier: BudgetTier::Luxury,
        international: true,
        food_per_person_day: 80.0,
        attractions_per_person_day: 120.0,
        stay_per_night: 360.0,
        land_fare_per_person: None,
        intra_city_transport: "Full-day private car or chauffeured cab",
    },
];

const PAID_SITE_KEYWORDS: [&str; 16] = [
    "museum", "fort", "palace", "gallery", "monument", "statue", "castle", "zoo",
    "aquarium", "safari", "cruise", "ticket", "entry", "guided tour", "observatory",
    "theme park",
];

const FLIGHT_KEYWORDS: [&str; 7] = [
    "flight", "plane", "fly", "airfare", "airline", "airplane", "aeroplane",
];

/// Hotel star ratings to search for each tier.
pub fn hotel_ratings(tier: BudgetTier) -> &'static str {
    match tier {
        BudgetTier::Cheap => "1,2",
        BudgetTier::Mid => "3,4",
        BudgetTier::Luxury => "5",
    }
}

/// Row for the tier. An unknown geography uses the domestic row, whose
/// floors are the lower of the two.
pub fn policy_for(tier: BudgetTier, geography: Geography) -> &'static PolicyRow {
    let international = geography == Geography::International;
    POLICY_TABLE
        .iter()
        .find(|row| row.tier == tier && row.international == international)
        .unwrap_or(&POLICY_TABLE[0])
}

/// Everything the validator needs to know about the request.
#[derive(Debug, Clone, Copy)]
pub struct TripFacts {
    pub tier: BudgetTier,
    pub geography: Geography,
    pub days: u32,
    pub travelers: u32,
    pub exchange_rate: f64,
    pub has_flight_anchor: bool,
    /// Overland verdict from the model, when it gave one.
    pub land_route: Option<bool>,
}

impl TripFacts {
    fn local(&self, usd: f64) -> u64 {
        let amount = usd * self.exchange_rate;
        if amount.is_finite() && amount > 0.0 {
            amount.round() as u64
        } else {
            0
        }
    }

    /// Whether the trip can go by land. Known domestic trips do unless the
    /// model says otherwise; with no country codes the model has to say so.
    fn overland(&self) -> bool {
        match self.geography {
            Geography::Domestic => self.land_route != Some(false),
            Geography::Unknown => self.land_route == Some(true),
            Geography::International => false,
        }
    }

    fn rooms(&self) -> u32 {
        self.travelers.max(1).div_ceil(2)
    }
}

/// What the validator changed, for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub category: BudgetCategory,
    pub from: u64,
    pub to: u64,
    pub reason: &'static str,
}

/// Enforces the numeric rules of the policy table on an already
/// normalized itinerary and returns what it changed.
pub fn validate(itinerary: &mut Itinerary, facts: &TripFacts) -> Vec<Adjustment> {
    let row = policy_for(facts.tier, facts.geography);
    let travelers = facts.travelers.max(1) as f64;
    let days = facts.days.max(1) as f64;
    let mut adjustments = Vec::new();

    let paid_sites = mentions_any(&itinerary.activity_text(), &PAID_SITE_KEYWORDS);
    let breakdown = &mut itinerary.budget_breakdown;

    // Cheap trips inside one country go by land.
    if facts.tier == BudgetTier::Cheap
        && facts.overland()
        && !facts.has_flight_anchor
        && mentions_any(&breakdown.main_travel.label.to_lowercase(), &FLIGHT_KEYWORDS)
    {
        if let Some(fare) = row.land_fare_per_person {
            let to = facts.local(fare * travelers * 2.0);
            adjustments.push(Adjustment {
                category: BudgetCategory::MainTravel,
                from: breakdown.main_travel.estimate,
                to,
                reason: "cheap domestic route replaced by sleeper train",
            });
            breakdown.main_travel.label = "Round-trip Sleeper Class Train Fare".to_string();
            breakdown.main_travel.estimate = to;
            breakdown.main_travel.note = format!(
                "Sleeper class, both directions, for {} traveler(s)",
                facts.travelers
            );
        }
    }

    if paid_sites {
        let floor = facts.local(row.attractions_per_person_day * travelers * days);
        if let Some((from, to)) = raise_to(breakdown.get_mut(BudgetCategory::Attractions), floor) {
            adjustments.push(Adjustment {
                category: BudgetCategory::Attractions,
                from,
                to,
                reason: "paid sites in the plan need an entry-fee budget",
            });
        }
    }

    let food_floor = facts.local(row.food_per_person_day * travelers * days);
    if let Some((from, to)) = raise_to(breakdown.get_mut(BudgetCategory::Food), food_floor) {
        adjustments.push(Adjustment {
            category: BudgetCategory::Food,
            from,
            to,
            reason: "food below the daily minimum",
        });
    }

    if facts.days > 1 && breakdown.stay.estimate == 0 {
        let nights = (facts.days - 1) as f64;
        let to = facts.local(row.stay_per_night * nights * facts.rooms() as f64);
        adjustments.push(Adjustment {
            category: BudgetCategory::Stay,
            from: 0,
            to,
            reason: "stay missing for a multi-day trip",
        });
        breakdown.stay.estimate = to;
    }

    if breakdown.transport.note.is_empty() {
        breakdown.transport.note = row.intra_city_transport.to_string();
    }

    for adjustment in &adjustments {
        info!(
            "Adjusted {} from {} to {}: {}",
            adjustment.category.key(),
            adjustment.from,
            adjustment.to,
            adjustment.reason
        );
    }
    adjustments
}

fn raise_to(item: &mut BudgetItem, floor: u64) -> Option<(u64, u64)> {
    if item.estimate < floor {
        let from = item.estimate;
        item.estimate = floor;
        Some((from, floor))
    } else {
        None
    }
}

// Whole words only, plurals included; two-word keywords match adjacent words.
fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();

    let single = words
        .iter()
        .any(|word| keywords.contains(word) || keywords.contains(&word.trim_end_matches('s')));
    single
        || words
            .windows(2)
            .any(|pair| keywords.contains(&format!("{} {}", pair[0], pair[1]).as_str()))
}
