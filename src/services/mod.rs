//! Business logic services.
//!
//! Services contain the ingestion pipeline and the read side, separated from
//! HTTP handlers. They own database transactions and external calls.

pub mod analytics_service;
pub mod api_key_service;
pub mod model_client;
pub mod notifier;
pub mod ownership;
pub mod prediction_service;
pub mod unit_of_work;
