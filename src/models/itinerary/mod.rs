pub mod base;
pub mod draft;
pub mod transforms;

pub use base::{
    Activity, BudgetBreakdown, BudgetCategory, BudgetItem, Coordinates, DailyPlan,
    GeneratedTrip, Itinerary, TimeOfDay,
};
pub use draft::DraftItinerary;
pub use transforms::IncompletePlan;
