//! Client for the external inference service.
//!
//! Sends the caller's payload untouched to `POST {MODEL_SERVICE_URL}/predict`
//! and normalizes whatever shape comes back into a [`ModelVerdict`].
//!
//! # Error kinds
//!
//! - `422` from the model → [`ModelError::Validation`] (caller must fix the payload)
//! - any other non-2xx, a transport failure, or a timeout → [`ModelError::Unreachable`]
//! - a 2xx whose body carries no prediction indicator → [`ModelError::InvalidResponse`]
//!
//! There is no retry and no caching: one call, one bounded network request.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use crate::models::prediction::PredictionLabel;

/// Fields that may carry the attack/safe indicator, in precedence order.
/// The first field that is present and interpretable decides the label.
const INDICATOR_FIELDS: [&str; 3] = ["prediction", "attack_detected", "label"];

/// Fields that may carry the risk score, in precedence order.
const RISK_FIELDS: [&str; 2] = ["risk_score", "score"];

const DEFAULT_CONFIDENCE: f64 = 0.5;
const DEFAULT_ATTACK_RISK: f64 = 0.8;
const DEFAULT_SAFE_RISK: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("payload rejected by model schema: {0}")]
    Validation(String),

    #[error("model service unreachable: {0}")]
    Unreachable(String),

    #[error("unusable model response: {0}")]
    InvalidResponse(String),
}

/// Canonical result of one classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVerdict {
    pub label: PredictionLabel,
    /// Always within `[0.0, 1.0]`.
    pub confidence: f64,
    pub risk_score: f64,
    /// Version tag reported by the model, if any.
    pub model_version: Option<String>,
    /// The full, unmodified response body.
    pub raw: Value,
}

/// HTTP client for the inference service.
///
/// Cheap to clone; the underlying `reqwest::Client` shares its connection pool.
#[derive(Debug, Clone)]
pub struct ModelClient {
    http: reqwest::Client,
    predict_url: String,
}

impl ModelClient {
    /// Build a client for `base_url` whose requests give up after `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            predict_url: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }

    /// Classify one payload.
    ///
    /// The payload is forwarded as-is; its schema is the model's business.
    pub async fn classify(&self, payload: &Value) -> Result<ModelVerdict, ModelError> {
        let response = self
            .http
            .post(&self.predict_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();

        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let body: Value = response
                .json()
                .await
                .unwrap_or_else(|_| Value::String("Unknown validation error".into()));
            let detail = body.get("detail").cloned().unwrap_or(body);
            return Err(ModelError::Validation(detail.to_string()));
        }

        if !status.is_success() {
            return Err(ModelError::Unreachable(format!(
                "model service answered {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(format!("body is not JSON: {e}")))?;

        normalize_response(body)
    }
}

fn transport_error(err: &reqwest::Error) -> ModelError {
    if err.is_timeout() {
        ModelError::Unreachable("request timed out".into())
    } else if err.is_connect() {
        ModelError::Unreachable(format!("connection failed: {err}"))
    } else {
        ModelError::Unreachable(err.to_string())
    }
}

/// Collapse the known response shapes into a [`ModelVerdict`].
///
/// Label: first interpretable field of [`INDICATOR_FIELDS`]. Accepted values are
/// `1`/`0`, `"1"`/`"0"`, booleans, `"true"`/`"false"` and `"attack"`/`"safe"`.
/// Confidence defaults to 0.5 and is clamped into `[0, 1]`. Risk comes from
/// [`RISK_FIELDS`] and defaults to 0.8 for attacks, 0.2 otherwise.
pub fn normalize_response(raw: Value) -> Result<ModelVerdict, ModelError> {
    let object = raw
        .as_object()
        .ok_or_else(|| ModelError::InvalidResponse("response is not a JSON object".into()))?;

    let label = INDICATOR_FIELDS
        .iter()
        .find_map(|field| object.get(*field).and_then(indicator_label))
        .ok_or_else(|| {
            ModelError::InvalidResponse("response carries no prediction indicator".into())
        })?;

    let confidence = object
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE);

    let risk_score = RISK_FIELDS
        .iter()
        .find_map(|field| object.get(*field).and_then(Value::as_f64))
        .filter(|r| r.is_finite())
        .unwrap_or(match label {
            PredictionLabel::Attack => DEFAULT_ATTACK_RISK,
            PredictionLabel::Safe => DEFAULT_SAFE_RISK,
        });

    let model_version = object
        .get("model_version")
        .and_then(Value::as_str)
        .map(str::to_owned);

    Ok(ModelVerdict {
        label,
        confidence,
        risk_score,
        model_version,
        raw,
    })
}

fn indicator_label(value: &Value) -> Option<PredictionLabel> {
    match value {
        Value::Bool(true) => Some(PredictionLabel::Attack),
        Value::Bool(false) => Some(PredictionLabel::Safe),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v == 1.0 => Some(PredictionLabel::Attack),
            Some(v) if v == 0.0 => Some(PredictionLabel::Safe),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "attack" => Some(PredictionLabel::Attack),
            "0" | "false" | "safe" => Some(PredictionLabel::Safe),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_and_string_indicators_agree() {
        let numeric = normalize_response(json!({"prediction": 1})).unwrap();
        let string = normalize_response(json!({"prediction": "1"})).unwrap();
        let flag = normalize_response(json!({"attack_detected": true})).unwrap();

        assert_eq!(numeric.label, PredictionLabel::Attack);
        assert_eq!(string.label, PredictionLabel::Attack);
        assert_eq!(flag.label, PredictionLabel::Attack);
    }

    #[test]
    fn prediction_field_takes_precedence_over_attack_detected() {
        let verdict =
            normalize_response(json!({"prediction": 0, "attack_detected": true})).unwrap();
        assert_eq!(verdict.label, PredictionLabel::Safe);
    }

    #[test]
    fn uninterpretable_prediction_falls_through_to_next_field() {
        let verdict =
            normalize_response(json!({"prediction": "maybe", "attack_detected": "true"})).unwrap();
        assert_eq!(verdict.label, PredictionLabel::Attack);
    }

    #[test]
    fn defaults_applied_when_fields_missing() {
        let attack = normalize_response(json!({"prediction": 1})).unwrap();
        assert_eq!(attack.confidence, 0.5);
        assert_eq!(attack.risk_score, 0.8);

        let safe = normalize_response(json!({"prediction": 0})).unwrap();
        assert_eq!(safe.risk_score, 0.2);
    }

    #[test]
    fn explicit_scores_are_kept() {
        let verdict = normalize_response(
            json!({"prediction": 1, "confidence": 0.93, "score": 0.61, "model_version": "2.3"}),
        )
        .unwrap();
        assert_eq!(verdict.confidence, 0.93);
        assert_eq!(verdict.risk_score, 0.61);
        assert_eq!(verdict.model_version.as_deref(), Some("2.3"));
    }

    #[test]
    fn risk_score_wins_over_score() {
        let verdict =
            normalize_response(json!({"prediction": 1, "risk_score": 0.9, "score": 0.1})).unwrap();
        assert_eq!(verdict.risk_score, 0.9);
    }

    #[test]
    fn confidence_is_clamped() {
        let verdict = normalize_response(json!({"prediction": 1, "confidence": 1.7})).unwrap();
        assert_eq!(verdict.confidence, 1.0);
    }

    #[test]
    fn missing_indicator_is_invalid() {
        let err = normalize_response(json!({"confidence": 0.4})).unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));

        let err = normalize_response(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));
    }

    #[test]
    fn raw_response_is_preserved() {
        let raw = json!({"prediction": 1, "extra": {"nested": true}});
        let verdict = normalize_response(raw.clone()).unwrap();
        assert_eq!(verdict.raw, raw);
    }

    #[test]
    fn long_model_version_is_kept_verbatim() {
        let version = "v".repeat(300);
        let verdict =
            normalize_response(json!({"prediction": 1, "model_version": version.clone()})).unwrap();
        assert_eq!(verdict.model_version.as_deref(), Some(version.as_str()));
    }

    #[test]
    fn predict_url_joins_base() {
        let client = ModelClient::new("http://model:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.predict_url(), "http://model:8000/predict");
    }
}
