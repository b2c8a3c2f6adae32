pub mod completion_api;
pub mod itinerary_generator;
