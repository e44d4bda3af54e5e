//! HTTP authentication components.
//!
//! The ingestion endpoint authenticates with API keys (middleware); dashboard
//! and key-management endpoints authenticate with JWTs (extractor).

/// API key authentication middleware
pub mod api_key;
/// JWT issuing, validation and the `AuthUser` extractor
pub mod jwt;
