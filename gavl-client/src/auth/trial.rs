//! Trial account bookkeeping.

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config::TrialPolicy;

/// Table holding one trial row per user.
pub const TRIAL_TABLE: &str = "trial_accounts";

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Stored trial row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialAccount {
    pub user_id: Uuid,
    #[serde(deserialize_with = "start_date")]
    pub trial_start_date: DateTime<Utc>,
    #[serde(default)]
    pub cases_used: Option<i64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_active() -> bool {
    true
}

/// RFC 3339, or an offset-less `timestamp` column read as UTC.
fn start_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc()))
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f").map(|n| n.and_utc()))
        .map_err(|e| serde::de::Error::custom(format!("invalid trial_start_date {:?}: {}", raw, e)))
}

impl TrialAccount {
    /// Row inserted for a user's first trial read.
    pub fn new_row(user_id: Uuid, now: DateTime<Utc>) -> Value {
        json!({
            "user_id": user_id,
            "trial_start_date": now.to_rfc3339_opts(SecondsFormat::Millis, true),
            "cases_used": 0,
            "is_active": true,
        })
    }
}

/// Trial row plus usage and time derived at read time.
///
/// The derived fields are never written back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialStatus {
    #[serde(flatten)]
    pub account: TrialAccount,
    pub days_remaining: i64,
    pub is_active: bool,
    pub cases_used: i64,
    pub cases_remaining: i64,
}

impl TrialStatus {
    /// Derive status from a stored row as of `now`.
    pub fn compute(account: TrialAccount, policy: &TrialPolicy, now: DateTime<Utc>) -> Self {
        let trial_end = account.trial_start_date + Duration::days(policy.days);
        let remaining_ms = (trial_end - now).num_milliseconds();
        let days_remaining = if remaining_ms > 0 {
            (remaining_ms + DAY_MS - 1) / DAY_MS
        } else {
            0
        };

        let cases_used = account.cases_used.unwrap_or(0);

        Self {
            days_remaining,
            is_active: now < trial_end,
            cases_used,
            cases_remaining: (policy.cases_limit - cases_used).max(0),
            account,
        }
    }

    /// Status of a trial that has just been created.
    pub fn fresh(account: TrialAccount, policy: &TrialPolicy) -> Self {
        let cases_used = account.cases_used.unwrap_or(0);
        Self {
            days_remaining: policy.days,
            is_active: true,
            cases_used,
            cases_remaining: (policy.cases_limit - cases_used).max(0),
            account,
        }
    }
}
