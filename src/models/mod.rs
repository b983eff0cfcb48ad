pub mod chat;
pub mod itinerary;
pub mod pricing;
pub mod research;
pub mod trip;
pub mod weather;
