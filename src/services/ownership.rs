//! Ownership chain validation: API key → user.
//!
//! Runs inside the prediction unit of work, before any prediction row is
//! written, so a forged or stale user id can never produce a write attributed
//! to the wrong tenant. Key expiry and the active flag are the authentication
//! layer's concern and are not re-checked here.

use sqlx::PgExecutor;

use crate::db::DbId;
use crate::error::AppError;

/// Why an ownership check came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipReason {
    Confirmed,
    KeyNotFound,
    OwnerMismatch,
}

/// Result of [`verify_key_ownership`].
///
/// `actual_user_id` is audit data: it must not reach an external caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipCheck {
    pub valid: bool,
    pub actual_user_id: Option<DbId>,
    pub reason: OwnershipReason,
}

impl OwnershipCheck {
    pub fn evaluate(actual_user_id: Option<DbId>, claimed_user_id: DbId) -> Self {
        match actual_user_id {
            None => Self {
                valid: false,
                actual_user_id: None,
                reason: OwnershipReason::KeyNotFound,
            },
            Some(owner) if owner == claimed_user_id => Self {
                valid: true,
                actual_user_id: Some(owner),
                reason: OwnershipReason::Confirmed,
            },
            Some(owner) => Self {
                valid: false,
                actual_user_id: Some(owner),
                reason: OwnershipReason::OwnerMismatch,
            },
        }
    }

    /// Turn a failed check into the pipeline's security error.
    pub fn into_result(self, api_key_id: DbId, claimed_user_id: DbId) -> Result<(), AppError> {
        if self.valid {
            Ok(())
        } else {
            Err(AppError::OwnershipViolation {
                api_key_id,
                claimed_user_id,
                actual_user_id: self.actual_user_id,
            })
        }
    }
}

/// Look up the owner of `api_key_id` and compare it with `claimed_user_id`.
///
/// The key row is share-locked so it cannot be deleted while the surrounding
/// transaction is still open.
pub async fn verify_key_ownership<'e, E>(
    executor: E,
    api_key_id: DbId,
    claimed_user_id: DbId,
) -> Result<OwnershipCheck, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let actual_user_id: Option<DbId> =
        sqlx::query_scalar("SELECT user_id FROM api_keys WHERE id = $1 FOR SHARE")
            .bind(api_key_id)
            .fetch_optional(executor)
            .await?;

    Ok(OwnershipCheck::evaluate(actual_user_id, claimed_user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn matching_owner_is_valid() {
        let check = OwnershipCheck::evaluate(Some(7), 7);
        assert!(check.valid);
        assert_eq!(check.reason, OwnershipReason::Confirmed);
        assert!(check.into_result(1, 7).is_ok());
    }

    #[test]
    fn mismatch_reports_actual_owner_for_audit() {
        let check = OwnershipCheck::evaluate(Some(7), 9);
        assert!(!check.valid);
        assert_eq!(check.actual_user_id, Some(7));
        assert_eq!(check.reason, OwnershipReason::OwnerMismatch);
        assert_matches!(
            check.into_result(1, 9),
            Err(AppError::OwnershipViolation {
                api_key_id: 1,
                claimed_user_id: 9,
                actual_user_id: Some(7),
            })
        );
    }

    #[test]
    fn missing_key_is_invalid() {
        let check = OwnershipCheck::evaluate(None, 7);
        assert!(!check.valid);
        assert_eq!(check.reason, OwnershipReason::KeyNotFound);
    }
}
