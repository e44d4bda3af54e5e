//! Read-side queries behind the dashboard.
//!
//! Every query takes the caller's `user_id` and filters on it; nothing here
//! writes. Time windows are computed in Rust and bound as parameters.

use chrono::{DateTime, Duration, Utc};

use crate::db::{DbId, DbPool};
use crate::error::AppError;
use crate::models::dashboard::{
    ChartBucketRow, ChartPoint, ChartResponse, HourlyBucket, LogRow, LogsQuery, LogsResponse,
    MonitoringMetrics, MonitoringResponse, OverviewResponse, Pagination, PredictionRow,
    PredictionsQuery, PredictionsResponse,
};
use crate::models::prediction::PredictionLabel;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;
pub const RECENT_PREDICTIONS: i64 = 10;

/// Attack rate (percent, trailing 24h) above which monitoring reports `warning`.
pub const WARNING_ATTACK_RATE: f64 = 50.0;

/// Columns shared by the overview and predictions listings.
const PREDICTION_ROW_SELECT: &str = r#"
    SELECT
        pe.id,
        pe.prediction_label,
        pe.confidence_score,
        pe.risk_score,
        pe.response_payload,
        pe.created_at,
        ak.label AS api_key_label,
        ce.payload AS client_event_payload
    FROM prediction_events pe
    LEFT JOIN api_keys ak ON ak.id = pe.api_key_id AND ak.user_id = pe.user_id
    LEFT JOIN client_events ce ON ce.id = pe.client_event_id AND ce.user_id = pe.user_id
    WHERE pe.user_id = $1
"#;

/// Lookback window selectable on the chart page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartRange {
    Day,
    Week,
    Month,
    Quarter,
}

impl ChartRange {
    /// Parse `1d|7d|30d|90d`; anything else falls back to `7d`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("1d") => ChartRange::Day,
            Some("30d") => ChartRange::Month,
            Some("90d") => ChartRange::Quarter,
            _ => ChartRange::Week,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChartRange::Day => "1d",
            ChartRange::Week => "7d",
            ChartRange::Month => "30d",
            ChartRange::Quarter => "90d",
        }
    }

    pub fn lookback(self) -> Duration {
        match self {
            ChartRange::Day => Duration::days(1),
            ChartRange::Week => Duration::days(7),
            ChartRange::Month => Duration::days(30),
            ChartRange::Quarter => Duration::days(90),
        }
    }

    /// `date_trunc` unit: hourly for one day, daily otherwise.
    pub fn bucket(self) -> &'static str {
        match self {
            ChartRange::Day => "hour",
            _ => "day",
        }
    }
}

/// Attack percentage (two decimals) and derived health status.
pub fn health_status(attacks: i64, safe: i64) -> (f64, &'static str) {
    let total = attacks + safe;
    let rate = if total > 0 {
        (attacks as f64 / total as f64) * 100.0
    } else {
        0.0
    };
    let rate = (rate * 100.0).round() / 100.0;
    let status = if rate > WARNING_ATTACK_RATE {
        "warning"
    } else {
        "healthy"
    };
    (rate, status)
}

fn page_size(limit: Option<i64>) -> i64 {
    limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(MAX_PAGE_SIZE)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Totals, average confidence, latest and recent predictions.
pub async fn overview(pool: &DbPool, user_id: DbId) -> Result<OverviewResponse, AppError> {
    let (total_predictions, total_attacks, avg_confidence): (i64, i64, Option<f64>) =
        sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE prediction_label = 'attack'),
                AVG(confidence_score)
            FROM prediction_events
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let recent_predictions = sqlx::query_as::<_, PredictionRow>(&format!(
        "{PREDICTION_ROW_SELECT} ORDER BY pe.created_at DESC, pe.id DESC LIMIT $2"
    ))
    .bind(user_id)
    .bind(RECENT_PREDICTIONS)
    .fetch_all(pool)
    .await?;

    tracing::debug!(user_id, total_predictions, total_attacks, "overview loaded");

    Ok(OverviewResponse {
        total_predictions,
        total_attacks,
        avg_confidence: avg_confidence.unwrap_or(0.0),
        latest_prediction: recent_predictions.first().cloned(),
        recent_predictions,
    })
}

/// Paginated log rows, newest first, optionally bounded by `since`.
pub async fn logs(
    pool: &DbPool,
    user_id: DbId,
    query: LogsQuery,
) -> Result<LogsResponse, AppError> {
    let limit = page_size(query.limit);
    let offset = query.offset.unwrap_or(0).max(0);

    let logs = sqlx::query_as::<_, LogRow>(
        r#"
        SELECT
            pe.id,
            pe.prediction_label AS status,
            pe.confidence_score AS probability,
            pe.risk_score,
            pe.response_payload AS prediction,
            pe.created_at AS timestamp,
            ak.label AS api_key
        FROM prediction_events pe
        LEFT JOIN api_keys ak ON ak.id = pe.api_key_id AND ak.user_id = pe.user_id
        WHERE pe.user_id = $1
          AND ($2::timestamptz IS NULL OR pe.created_at >= $2)
        ORDER BY pe.created_at DESC, pe.id DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user_id)
    .bind(query.since)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(LogsResponse {
        total: logs.len(),
        logs,
        limit,
        offset,
    })
}

/// Trailing-24h counts, health status and the 7-day hourly distribution.
pub async fn monitoring(pool: &DbPool, user_id: DbId) -> Result<MonitoringResponse, AppError> {
    let now = Utc::now();

    let (attacks_24h, safe_24h, avg_confidence): (i64, i64, Option<f64>) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE prediction_label = 'attack'),
            COUNT(*) FILTER (WHERE prediction_label = 'safe'),
            AVG(confidence_score)
        FROM prediction_events
        WHERE user_id = $1 AND created_at > $2
        "#,
    )
    .bind(user_id)
    .bind(now - Duration::hours(24))
    .fetch_one(pool)
    .await?;

    let hourly_distribution = sqlx::query_as::<_, HourlyBucket>(
        r#"
        SELECT
            date_trunc('hour', created_at) AS hour,
            prediction_label,
            COUNT(*) AS count
        FROM prediction_events
        WHERE user_id = $1 AND created_at > $2
        GROUP BY 1, 2
        ORDER BY 1 DESC
        LIMIT 168
        "#,
    )
    .bind(user_id)
    .bind(now - Duration::days(7))
    .fetch_all(pool)
    .await?;

    let (attack_rate, status) = health_status(attacks_24h, safe_24h);

    Ok(MonitoringResponse {
        status: status.to_string(),
        metrics: MonitoringMetrics {
            attacks_24h,
            safe_24h,
            attack_rate,
            avg_confidence: round2(avg_confidence.unwrap_or(0.0)),
        },
        hourly_distribution,
    })
}

/// Time-bucketed counts split by label.
pub async fn chart_data(
    pool: &DbPool,
    user_id: DbId,
    range: ChartRange,
) -> Result<ChartResponse, AppError> {
    let since: DateTime<Utc> = Utc::now() - range.lookback();

    let rows = sqlx::query_as::<_, ChartBucketRow>(
        r#"
        SELECT
            date_trunc($2, created_at) AS time_bucket,
            prediction_label,
            COUNT(*) AS count,
            AVG(confidence_score) AS avg_confidence
        FROM prediction_events
        WHERE user_id = $1 AND created_at > $3
        GROUP BY 1, 2
        ORDER BY 1 ASC
        "#,
    )
    .bind(user_id)
    .bind(range.bucket())
    .bind(since)
    .fetch_all(pool)
    .await?;

    let (attacks, safe): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .partition(|row| row.prediction_label == PredictionLabel::Attack);

    let to_points = |rows: Vec<ChartBucketRow>| -> Vec<ChartPoint> {
        rows.into_iter()
            .map(|row| ChartPoint {
                time: row.time_bucket,
                count: row.count,
                confidence: round2(row.avg_confidence),
            })
            .collect()
    };

    Ok(ChartResponse {
        range: range.as_str().to_string(),
        bucket: range.bucket().to_string(),
        attacks_over_time: to_points(attacks),
        safe_over_time: to_points(safe),
    })
}

/// Page of predictions with the total page count.
pub async fn predictions(
    pool: &DbPool,
    user_id: DbId,
    query: PredictionsQuery,
) -> Result<PredictionsResponse, AppError> {
    let limit = page_size(query.limit);
    let page = query.page.filter(|p| *p > 0).unwrap_or(1);
    let offset = (page - 1).saturating_mul(limit);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prediction_events WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let predictions = sqlx::query_as::<_, PredictionRow>(&format!(
        "{PREDICTION_ROW_SELECT} ORDER BY pe.created_at DESC, pe.id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(PredictionsResponse {
        predictions,
        pagination: Pagination {
            total,
            page,
            limit,
            pages: (total + limit - 1) / limit,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_range_parsing_defaults_to_week() {
        assert_eq!(ChartRange::parse(Some("1d")), ChartRange::Day);
        assert_eq!(ChartRange::parse(Some("90d")), ChartRange::Quarter);
        assert_eq!(ChartRange::parse(Some("1y")), ChartRange::Week);
        assert_eq!(ChartRange::parse(None), ChartRange::Week);
    }

    #[test]
    fn only_single_day_is_bucketed_hourly() {
        assert_eq!(ChartRange::Day.bucket(), "hour");
        assert_eq!(ChartRange::Week.bucket(), "day");
        assert_eq!(ChartRange::Quarter.lookback(), Duration::days(90));
    }

    #[test]
    fn health_status_uses_fifty_percent_threshold() {
        assert_eq!(health_status(0, 0), (0.0, "healthy"));
        assert_eq!(health_status(1, 1), (50.0, "healthy"));
        assert_eq!(health_status(2, 1), (66.67, "warning"));
    }

    #[test]
    fn page_size_is_bounded() {
        assert_eq!(page_size(None), DEFAULT_PAGE_SIZE);
        assert_eq!(page_size(Some(0)), DEFAULT_PAGE_SIZE);
        assert_eq!(page_size(Some(10_000)), MAX_PAGE_SIZE);
        assert_eq!(page_size(Some(20)), 20);
    }
}
