//! A database transaction that may span one bounded external call.
//!
//! Holding a connection across a network round trip is the price of
//! all-or-nothing consistency between the inbound event and its prediction.
//! The deadline is a required constructor argument so the cost is explicit:
//! an external call that outlives it fails the whole unit of work.

use std::future::Future;
use std::time::Duration;

use sqlx::{PgConnection, Postgres, Transaction};

use crate::db::DbPool;
use crate::error::AppError;

pub struct UnitOfWork {
    tx: Transaction<'static, Postgres>,
    external_timeout: Duration,
}

impl UnitOfWork {
    /// Open a transaction whose external calls must finish within `external_timeout`.
    pub async fn begin(pool: &DbPool, external_timeout: Duration) -> Result<Self, AppError> {
        let tx = pool.begin().await?;
        Ok(Self {
            tx,
            external_timeout,
        })
    }

    /// Connection to run statements on inside the transaction.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    pub fn external_timeout(&self) -> Duration {
        self.external_timeout
    }

    /// Await an external call under the unit-of-work deadline.
    ///
    /// Expiry is reported as model unavailability.
    pub async fn run_external<F, T, E>(&self, call: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<AppError>,
    {
        match tokio::time::timeout(self.external_timeout, call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(AppError::ModelUnavailable(format!(
                "external call exceeded {}s deadline",
                self.external_timeout.as_secs_f32()
            ))),
        }
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Roll back and return `cause`.
    ///
    /// A failing rollback is logged; the connection is discarded by the pool
    /// either way, so the original error is what the caller needs to see.
    pub async fn abort<T>(self, cause: AppError) -> Result<T, AppError> {
        if let Err(e) = self.tx.rollback().await {
            tracing::error!(error = %e, "rollback failed");
        }
        Err(cause)
    }
}
