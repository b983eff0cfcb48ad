use log::warn;
use std::fmt;

use super::{
    base::{Activity, BudgetBreakdown, BudgetItem, DailyPlan, Itinerary, TimeOfDay},
    draft::{DraftActivity, DraftBudgetItem, DraftDay, DraftItinerary},
};

/// The model produced fewer day objects than were requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompletePlan {
    pub expected: u32,
    pub produced: u32,
}

impl fmt::Display for IncompletePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Itinerary covers {} of {} requested days; the trip is too long for a single generation pass",
            self.produced, self.expected
        )
    }
}

impl std::error::Error for IncompletePlan {}

impl DraftItinerary {
    /// Converts a loosely typed draft into a strict itinerary with exactly
    /// `days` plans, each carrying a city and one activity per time slot.
    pub fn normalize(self, days: u32, destination: &str) -> Result<Itinerary, IncompletePlan> {
        let produced = self.daily_plans.len() as u32;
        if produced < days {
            return Err(IncompletePlan {
                expected: days,
                produced,
            });
        }
        if produced > days {
            warn!("Draft returned {} days for a {}-day trip, dropping the extras", produced, days);
        }

        let mut drafts = self.daily_plans;
        // Stable: unnumbered days keep their relative order at the end.
        drafts.sort_by_key(|d| d.day.unwrap_or(u32::MAX));
        drafts.truncate(days as usize);

        let mut previous_city = destination.to_string();
        let daily_plans = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| {
                let city = draft.city.clone().unwrap_or_else(|| previous_city.clone());
                previous_city = city.clone();
                draft.into_plan(index as u32 + 1, city)
            })
            .collect();

        let breakdown = self.budget_breakdown.unwrap_or_default();
        let budget_breakdown = BudgetBreakdown {
            main_travel: into_budget_item(breakdown.main_travel, "Round-trip travel"),
            stay: into_budget_item(breakdown.stay, "Accommodation"),
            transport: into_budget_item(breakdown.transport, "Local transport"),
            attractions: into_budget_item(breakdown.attractions, "Sightseeing & entry fees"),
            food: into_budget_item(breakdown.food, "Food & dining"),
        };

        Ok(Itinerary {
            trip_summary: self.trip_summary,
            budget_breakdown,
            daily_plans,
        })
    }
}

impl DraftDay {
    fn into_plan(self, day: u32, city: String) -> DailyPlan {
        let mut slots: [Option<DraftActivity>; 3] = [None, None, None];
        let mut unplaced = Vec::new();

        for activity in self.activities {
            match TimeOfDay::from_label(&activity.time) {
                Some(time) if slots[slot_index(time)].is_none() => {
                    slots[slot_index(time)] = Some(activity);
                }
                _ => unplaced.push(activity),
            }
        }

        // Untagged or duplicate-slot activities fill whatever is still empty.
        let mut unplaced = unplaced.into_iter();
        for slot in slots.iter_mut().filter(|s| s.is_none()) {
            *slot = unplaced.next();
        }

        let activities = TimeOfDay::ALL
            .iter()
            .zip(slots)
            .map(|(time, slot)| match slot {
                Some(draft) => Activity {
                    time: *time,
                    description: if draft.description.is_empty() {
                        draft.location.clone()
                    } else {
                        draft.description
                    },
                    location: if draft.location.is_empty() {
                        city.clone()
                    } else {
                        draft.location
                    },
                    coordinates: draft.coordinates,
                },
                None => Activity {
                    time: *time,
                    description: format!("Free time to explore {} at your own pace.", city),
                    location: city.clone(),
                    coordinates: None,
                },
            })
            .collect();

        DailyPlan {
            day,
            city: Some(city),
            activities,
        }
    }
}

fn slot_index(time: TimeOfDay) -> usize {
    match time {
        TimeOfDay::Morning => 0,
        TimeOfDay::Afternoon => 1,
        TimeOfDay::Evening => 2,
    }
}

fn into_budget_item(draft: Option<DraftBudgetItem>, default_label: &str) -> BudgetItem {
    let draft = draft.unwrap_or_default();
    BudgetItem {
        label: if draft.label.is_empty() {
            default_label.to_string()
        } else {
            draft.label
        },
        estimate: draft
            .estimate
            .filter(|e| e.is_finite() && *e > 0.0)
            .map(|e| e.round() as u64)
            .unwrap_or(0),
        note: draft.note,
    }
}
