//! Usage ledger and rate governor.
//!
//! Decides whether a user may issue another AI request today and records that
//! they did. The daily counter is logically reset at day rollover: the check
//! compares the stored day to the current day instead of relying on any
//! background reset job.
//!
//! The check and the increment are two separate store operations with no
//! transaction around them, so two concurrent requests from the same user can
//! both pass the check before either increments. The daily limit is a soft
//! cap. Hardening it would need a single decrement-and-check statement, which
//! the product has so far not asked for.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use crate::store::models::UsageCounter;
use crate::store::{Result, Store};
use crate::types::UserId;

pub mod cache;

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct RateLimitStatus {
    /// Whether one more request is permitted right now
    pub allowed: bool,
    /// Requests left today (never negative)
    pub remaining: i64,
    /// Configured daily limit
    pub limit: i64,
}

/// Compute the quota state for a counter as of `today`.
///
/// A missing counter or one stamped with a different day counts as zero used:
/// the reset is inferred, not written.
pub fn quota_for(counter: Option<&UsageCounter>, today: NaiveDate, limit: i64) -> RateLimitStatus {
    let used = match counter {
        Some(counter) if counter.day == today => counter.count,
        _ => 0,
    };

    RateLimitStatus {
        allowed: used < limit,
        remaining: (limit - used).max(0),
        limit,
    }
}

/// Read the user's counter and decide whether another request is allowed
/// today. Performs no writes.
#[instrument(skip(store), err)]
pub async fn check_rate_limit(store: &dyn Store, user_id: UserId, limit: i64) -> Result<RateLimitStatus> {
    let counter = store.get_usage_counter(user_id).await?;
    Ok(quota_for(counter.as_ref(), Utc::now().date_naive(), limit))
}

/// Record one AI request for the user on the current day.
#[instrument(skip(store), err)]
pub async fn record_usage(store: &dyn Store, user_id: UserId) -> Result<()> {
    store.increment_usage_counter(user_id, Utc::now().date_naive()).await
}
