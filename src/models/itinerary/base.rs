use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 3] = [TimeOfDay::Morning, TimeOfDay::Afternoon, TimeOfDay::Evening];

    /// Maps loose labels such as "Late morning" or "Night" onto a slot.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.to_lowercase();
        if label.contains("morning") || label.contains("breakfast") || label.contains("sunrise") {
            Some(TimeOfDay::Morning)
        } else if label.contains("afternoon") || label.contains("noon") || label.contains("lunch") {
            Some(TimeOfDay::Afternoon)
        } else if label.contains("evening")
            || label.contains("night")
            || label.contains("dinner")
            || label.contains("sunset")
        {
            Some(TimeOfDay::Evening)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub time: TimeOfDay,
    pub description: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub day: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetItem {
    pub label: String,
    pub estimate: u64,
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BudgetCategory {
    MainTravel,
    Stay,
    Transport,
    Attractions,
    Food,
}

impl BudgetCategory {
    pub const ALL: [BudgetCategory; 5] = [
        BudgetCategory::MainTravel,
        BudgetCategory::Stay,
        BudgetCategory::Transport,
        BudgetCategory::Attractions,
        BudgetCategory::Food,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            BudgetCategory::MainTravel => "main_travel",
            BudgetCategory::Stay => "stay",
            BudgetCategory::Transport => "transport",
            BudgetCategory::Attractions => "attractions",
            BudgetCategory::Food => "food",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetBreakdown {
    pub main_travel: BudgetItem,
    pub stay: BudgetItem,
    pub transport: BudgetItem,
    pub attractions: BudgetItem,
    pub food: BudgetItem,
}

impl BudgetBreakdown {
    pub fn get(&self, category: BudgetCategory) -> &BudgetItem {
        match category {
            BudgetCategory::MainTravel => &self.main_travel,
            BudgetCategory::Stay => &self.stay,
            BudgetCategory::Transport => &self.transport,
            BudgetCategory::Attractions => &self.attractions,
            BudgetCategory::Food => &self.food,
        }
    }

    pub fn get_mut(&mut self, category: BudgetCategory) -> &mut BudgetItem {
        match category {
            BudgetCategory::MainTravel => &mut self.main_travel,
            BudgetCategory::Stay => &mut self.stay,
            BudgetCategory::Transport => &mut self.transport,
            BudgetCategory::Attractions => &mut self.attractions,
            BudgetCategory::Food => &mut self.food,
        }
    }

    pub fn total(&self) -> u64 {
        BudgetCategory::ALL
            .iter()
            .map(|category| self.get(*category).estimate)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub trip_summary: String,
    pub budget_breakdown: BudgetBreakdown,
    pub daily_plans: Vec<DailyPlan>,
}

impl Itinerary {
    /// Every activity description and location, lowercased, for keyword checks.
    pub fn activity_text(&self) -> String {
        self.daily_plans
            .iter()
            .flat_map(|plan| plan.activities.iter())
            .map(|activity| format!("{} {}", activity.description, activity.location))
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

/// The response body of `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTrip {
    #[serde(flatten)]
    pub itinerary: Itinerary,
    pub destination: String,
    #[serde(rename = "sourceCity")]
    pub source_city: String,
    pub travelers: u32,
}
