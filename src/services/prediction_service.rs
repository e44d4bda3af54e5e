//! Prediction event writer - the ingestion pipeline.
//!
//! This service handles:
//! - Verifying the API key → user ownership chain
//! - Recording the inbound client event
//! - Invoking the model under a bounded deadline
//! - Recording the prediction event
//! - Publishing a notification once the write is durable
//!
//! # Atomicity Guarantees
//!
//! Steps 1-4 run in one PostgreSQL transaction ([`UnitOfWork`]). Any failure
//! rolls the client event back together with everything else, so the store
//! never holds an inbound event without its prediction, nor a prediction
//! attributed to a user that does not own the key.

use std::time::Duration;

use serde_json::Value;

use crate::db::{DbId, DbPool};
use crate::error::AppError;
use crate::models::prediction::{ClientEvent, PredictionEvent, PredictionSummary};
use crate::services::model_client::ModelClient;
use crate::services::notifier::PredictionNotifier;
use crate::services::ownership::verify_key_ownership;
use crate::services::unit_of_work::UnitOfWork;

/// One inbound ingestion request, as received.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub payload: Value,
    pub source_ip: Option<String>,
    pub endpoint: Option<String>,
}

impl InboundRequest {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            source_ip: None,
            endpoint: None,
        }
    }
}

/// Writes prediction events. Cheap to clone; shared through `AppState`.
#[derive(Clone)]
pub struct PredictionWriter {
    pool: DbPool,
    model: ModelClient,
    notifier: PredictionNotifier,
    model_timeout: Duration,
    default_model_version: String,
}

impl PredictionWriter {
    pub fn new(
        pool: DbPool,
        model: ModelClient,
        notifier: PredictionNotifier,
        model_timeout: Duration,
        default_model_version: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            model,
            notifier,
            model_timeout,
            default_model_version: default_model_version.into(),
        }
    }

    /// Run the ingestion pipeline for one request.
    ///
    /// # Process
    ///
    /// 1. Verify `api_key_id` belongs to `user_id`
    /// 2. Insert the client event
    /// 3. Classify the payload with the model (bounded by the model timeout)
    /// 4. Insert the prediction event linked to the client event
    /// 5. Commit
    /// 6. Notify `user_id`'s channel (after commit, never fails the request)
    ///
    /// # Errors
    ///
    /// - `OwnershipViolation`: the key does not belong to `user_id` (including a
    ///   `user_id` with no account); nothing is written
    /// - `ModelValidation` / `ModelUnavailable` / `ModelInvalidResponse`: nothing is written
    /// - `Database`: the transaction is rolled back
    pub async fn create_prediction_event(
        &self,
        user_id: DbId,
        api_key_id: DbId,
        inbound: InboundRequest,
    ) -> Result<PredictionEvent, AppError> {
        let mut uow = UnitOfWork::begin(&self.pool, self.model_timeout).await?;

        // Step 1: the ownership chain must hold before anything is written
        let check = verify_key_ownership(uow.conn(), api_key_id, user_id).await?;
        if let Err(violation) = check.into_result(api_key_id, user_id) {
            tracing::error!(
                user_id,
                api_key_id,
                actual_user_id = ?check.actual_user_id,
                reason = ?check.reason,
                "SECURITY: API key does not belong to user, rolling back"
            );
            return uow.abort(violation).await;
        }

        // Step 2: record the attempt
        let client_event = sqlx::query_as::<_, ClientEvent>(
            r#"
            INSERT INTO client_events (user_id, api_key_id, payload, source_ip, endpoint)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, api_key_id, payload, source_ip, endpoint, received_at
            "#,
        )
        .bind(user_id)
        .bind(api_key_id)
        .bind(&inbound.payload)
        .bind(&inbound.source_ip)
        .bind(&inbound.endpoint)
        .fetch_one(uow.conn())
        .await?;

        // Step 3: classify
        let verdict = match uow.run_external(self.model.classify(&inbound.payload)).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(
                    user_id,
                    api_key_id,
                    event_id = client_event.id,
                    error = %e,
                    "model call failed, rolling back"
                );
                return uow.abort(e).await;
            }
        };

        let model_version = verdict
            .model_version
            .clone()
            .unwrap_or_else(|| self.default_model_version.clone());

        // Step 4: record the prediction
        let event = sqlx::query_as::<_, PredictionEvent>(
            r#"
            INSERT INTO prediction_events (
                user_id,
                api_key_id,
                client_event_id,
                request_payload,
                prediction_label,
                confidence_score,
                risk_score,
                response_payload,
                model_version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(api_key_id)
        .bind(client_event.id)
        .bind(&inbound.payload)
        .bind(verdict.label.as_str())
        .bind(verdict.confidence)
        .bind(verdict.risk_score)
        .bind(&verdict.raw)
        .bind(model_version)
        .fetch_one(uow.conn())
        .await?;

        // Step 5: commit both rows atomically
        uow.commit().await?;

        tracing::info!(
            user_id,
            api_key_id,
            event_id = client_event.id,
            prediction_id = event.id,
            label = %event.prediction_label,
            confidence = event.confidence_score,
            "prediction event stored"
        );

        // Step 6: the row is durable; fan out
        self.notifier
            .notify(user_id, &PredictionSummary::from(&event))
            .await;

        Ok(event)
    }
}
