//! Data models representing database entities and API bodies.

/// API key authentication model
pub mod api_key;
/// Dashboard read models
pub mod dashboard;
/// Client events and prediction events
pub mod prediction;
