//! The identity/database service seam.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::auth::session::{Session, User};
use crate::Result;

/// Equality filter on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }
}

/// Sign-up payload.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    /// Stored as the user's metadata
    pub data: Value,
    #[serde(skip)]
    pub email_redirect_to: Option<String>,
}

/// Outcome of sign-up. `session` is only present when no email
/// confirmation is required.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignUpResponse {
    pub user: User,
    pub session: Option<Session>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResendType {
    Signup,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResendRequest {
    #[serde(rename = "type")]
    pub kind: ResendType,
    pub email: String,
    #[serde(skip)]
    pub email_redirect_to: Option<String>,
}

/// Attributes changeable on the signed-in user.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Hosted authentication plus simple table storage.
///
/// Implementations own the current session. Errors carry the upstream
/// message verbatim (see [`crate::Error::Identity`]).
#[async_trait]
pub trait IdentityService: Send + Sync {
    // ── Authentication ───────────────────────────────────────────────────────

    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpResponse>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    async fn get_session(&self) -> Result<Option<Session>>;

    async fn sign_out(&self) -> Result<()>;

    async fn reset_password_for_email(&self, email: &str, redirect_to: Option<&str>) -> Result<()>;

    /// Requires a signed-in session.
    async fn update_user(&self, attributes: UserAttributes) -> Result<User>;

    async fn resend(&self, request: ResendRequest) -> Result<()>;

    // ── Tables ───────────────────────────────────────────────────────────────

    /// Exactly one row matching `filter`, otherwise an error.
    async fn select_single(&self, table: &str, filter: &Filter) -> Result<Value>;

    /// Insert one row and return it as stored.
    async fn insert_single(&self, table: &str, row: Value) -> Result<Value>;

    /// Update the single row matching `filter` and return it.
    async fn update_single(&self, table: &str, filter: &Filter, updates: Value) -> Result<Value>;

    /// Insert rows without reading them back.
    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<()>;
}
