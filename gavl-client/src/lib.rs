//! Client library for TheGAVL.
//!
//! Submits cases to the remote verdict service (with a deterministic local
//! fallback when it is unreachable), renders verdict reports, and wraps the
//! hosted identity/database service for accounts, trials and analytics.

pub mod auth;
pub mod config;
pub mod display;
pub mod error;
pub mod fallback;
pub mod health;
pub mod ip;
pub mod models;
pub mod storage;
pub mod token;
pub mod validation;
pub mod verdict;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthClient, IdentityService, Session, SupabaseClient, TrialStatus, User};
pub use config::{Config, RedirectUrls, TrialPolicy};
pub use display::{format_verdict, format_verdict_in};
pub use error::{Error, Result};
pub use fallback::{simulated_verdict, simulated_verdict_at};
pub use health::{check_health, report_health, HealthStatus};
pub use ip::{IpLookup, IpifyLookup};
pub use models::{AuditTrail, AuthResult, CaseData, QuantumAnalysis, VerdictResult};
pub use storage::{KeyValueStore, MemoryStore};
pub use token::{make_token, make_token_at};
pub use validation::{validate_email, validate_password, PasswordCheck};
pub use verdict::{OrFallback, VerdictClient};
