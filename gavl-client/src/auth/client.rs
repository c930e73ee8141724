//! Account operations on top of an [`IdentityService`].

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::identity::{
    Filter, IdentityService, ResendRequest, ResendType, SignUpRequest, SignUpResponse,
    UserAttributes,
};
use crate::auth::session::Session;
use crate::auth::supabase::SupabaseClient;
use crate::auth::trial::{TrialAccount, TrialStatus, TRIAL_TABLE};
use crate::config::Config;
use crate::ip::{ip_or_unknown, IpLookup, IpifyLookup};
use crate::models::AuthResult;
use crate::storage::{KeyValueStore, MemoryStore, LAST_RESEND_TIME_KEY, SIGNUP_EMAIL_KEY};
use crate::Error;

pub const PROFILES_TABLE: &str = "profiles";
pub const ANALYTICS_TABLE: &str = "analytics";

/// Map known sign-in failures to user-facing text; anything else passes through.
pub fn login_error_message(error: &str) -> String {
    if error.contains("Invalid login credentials") {
        "Invalid email or password. Please check your credentials.".to_string()
    } else if error.contains("Email not confirmed") {
        "Please verify your email address before logging in. Check your inbox.".to_string()
    } else if error.contains("User not found") {
        "No account found with this email address.".to_string()
    } else {
        error.to_string()
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Log and convert an identity failure.
fn failed<T>(operation: &'static str, e: Error) -> AuthResult<T> {
    warn!(operation, error = %e, "Auth operation failed");
    AuthResult::failure(e.to_string())
}

/// Authentication, profile, trial and analytics operations.
///
/// Every operation is a single round trip whose failure is reported as
/// [`AuthResult::Failure`]; nothing is retried. Analytics for register and
/// login run as background tasks; [`AuthClient::flush`] waits for them.
pub struct AuthClient {
    config: Config,
    identity: Arc<dyn IdentityService>,
    session_storage: Arc<dyn KeyValueStore>,
    local_storage: Arc<dyn KeyValueStore>,
    ip_lookup: Arc<dyn IpLookup>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl AuthClient {
    /// Client over `identity` with in-memory storage and the configured IP lookup.
    pub fn new(config: Config, identity: Arc<dyn IdentityService>) -> Self {
        let ip_lookup = Arc::new(IpifyLookup::new(
            reqwest::Client::new(),
            config.ip_lookup_url.clone(),
        ));
        Self {
            config,
            identity,
            session_storage: Arc::new(MemoryStore::new()),
            local_storage: Arc::new(MemoryStore::new()),
            ip_lookup,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Client for the configured Supabase project.
    pub fn connect(config: Config) -> Self {
        let http = reqwest::Client::new();
        let identity = Arc::new(SupabaseClient::new(
            http.clone(),
            config.supabase_url.clone(),
            config.supabase_anon_key.clone(),
        ));
        let ip_lookup = Arc::new(IpifyLookup::new(http, config.ip_lookup_url.clone()));
        Self::new(config, identity).with_ip_lookup(ip_lookup)
    }

    pub fn with_session_storage(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.session_storage = store;
        self
    }

    pub fn with_local_storage(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.local_storage = store;
        self
    }

    pub fn with_ip_lookup(mut self, lookup: Arc<dyn IpLookup>) -> Self {
        self.ip_lookup = lookup;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create an account and trigger the verification email.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        profile: Map<String, Value>,
    ) -> AuthResult<SignUpResponse> {
        let mut metadata = profile.clone();
        metadata.insert("registration_date".to_string(), Value::String(now_iso()));
        metadata.insert(
            "ip_address".to_string(),
            Value::String(ip_or_unknown(self.ip_lookup.as_ref()).await),
        );

        let request = SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            data: Value::Object(metadata),
            email_redirect_to: Some(self.config.verify_redirect()),
        };

        let response = match self.identity.sign_up(request).await {
            Ok(response) => response,
            Err(e) => return failed("register", e),
        };

        self.session_storage.set(SIGNUP_EMAIL_KEY, email.to_string());

        let mut event = Map::new();
        event.insert("email".to_string(), Value::String(email.to_string()));
        event.extend(profile);
        self.log_best_effort("user_registration", Value::Object(event));

        info!(user_id = %response.user.id, "Account registered");
        AuthResult::success_with(response, "Account created! Check your email to verify.")
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<Session> {
        let session = match self.identity.sign_in_with_password(email, password).await {
            Ok(session) => session,
            Err(e) => {
                let error = e.to_string();
                debug!(error = %error, "Login rejected");
                let message = login_error_message(&error);
                return AuthResult::failure_with(error, message);
            }
        };

        self.log_best_effort(
            "user_login",
            json!({ "user_id": session.user.id, "email": session.user.email }),
        );

        info!(user_id = %session.user.id, "Login successful");
        AuthResult::success_with(session, "Login successful")
    }

    /// Current session, if any. An expired access token reads as no session.
    pub async fn check_session(&self) -> AuthResult<Option<Session>> {
        match self.identity.get_session().await {
            Ok(Some(session)) if session.is_expired(Utc::now()) => {
                debug!(user_id = %session.user.id, "Session expired");
                AuthResult::success(None)
            }
            Ok(session) => AuthResult::success(session),
            Err(e) => {
                error!(error = %e, "Session check error");
                AuthResult::failure(e.to_string())
            }
        }
    }

    pub async fn logout(&self) -> AuthResult<()> {
        match self.identity.sign_out().await {
            Ok(()) => {
                self.session_storage.remove(SIGNUP_EMAIL_KEY);
                AuthResult::success_with((), "Logged out successfully")
            }
            Err(e) => failed("logout", e),
        }
    }

    pub async fn reset_password(&self, email: &str) -> AuthResult<()> {
        let redirect = self.config.reset_redirect();
        match self
            .identity
            .reset_password_for_email(email, Some(&redirect))
            .await
        {
            Ok(()) => AuthResult::success_with((), "Password reset email sent"),
            Err(e) => failed("reset_password", e),
        }
    }

    /// Set a new password for the signed-in user.
    pub async fn update_password(&self, new_password: &str) -> AuthResult<()> {
        let attributes = UserAttributes {
            password: Some(new_password.to_string()),
            ..UserAttributes::default()
        };
        match self.identity.update_user(attributes).await {
            Ok(_) => AuthResult::success_with((), "Password updated successfully"),
            Err(e) => failed("update_password", e),
        }
    }

    pub async fn resend_verification_email(&self, email: &str) -> AuthResult<()> {
        let request = ResendRequest {
            kind: ResendType::Signup,
            email: email.to_string(),
            email_redirect_to: Some(self.config.verify_redirect()),
        };
        match self.identity.resend(request).await {
            Ok(()) => {
                self.local_storage.set(
                    LAST_RESEND_TIME_KEY,
                    Utc::now().timestamp_millis().to_string(),
                );
                AuthResult::success_with((), "Verification email sent")
            }
            Err(e) => failed("resend_verification_email", e),
        }
    }

    pub async fn get_user_profile(&self, user_id: Uuid) -> AuthResult<Value> {
        match self
            .identity
            .select_single(PROFILES_TABLE, &Filter::eq("id", user_id))
            .await
        {
            Ok(profile) => AuthResult::success(profile),
            Err(e) => failed("get_user_profile", e),
        }
    }

    pub async fn update_user_profile(&self, user_id: Uuid, updates: Value) -> AuthResult<Value> {
        match self
            .identity
            .update_single(PROFILES_TABLE, &Filter::eq("id", user_id), updates)
            .await
        {
            Ok(profile) => AuthResult::success(profile),
            Err(e) => failed("update_user_profile", e),
        }
    }

    /// Read the user's trial, creating it on first access.
    pub async fn get_trial_status(&self, user_id: Uuid) -> AuthResult<TrialStatus> {
        let row = match self
            .identity
            .select_single(TRIAL_TABLE, &Filter::eq("user_id", user_id))
            .await
        {
            Ok(row) => row,
            Err(e) => {
                debug!(%user_id, error = %e, "No trial found, creating one");
                return self.create_trial(user_id).await;
            }
        };

        match serde_json::from_value::<TrialAccount>(row) {
            Ok(account) => {
                AuthResult::success(TrialStatus::compute(account, &self.config.trial, Utc::now()))
            }
            Err(e) => failed("get_trial_status", Error::from(e)),
        }
    }

    pub async fn create_trial(&self, user_id: Uuid) -> AuthResult<TrialStatus> {
        let row = TrialAccount::new_row(user_id, Utc::now());
        let stored = match self.identity.insert_single(TRIAL_TABLE, row).await {
            Ok(stored) => stored,
            Err(e) => return failed("create_trial", e),
        };

        match serde_json::from_value::<TrialAccount>(stored) {
            Ok(account) => {
                info!(%user_id, "Trial created");
                AuthResult::success(TrialStatus::fresh(account, &self.config.trial))
            }
            Err(e) => failed("create_trial", Error::from(e)),
        }
    }

    /// Record an analytics event. Failures are logged and reported, never raised.
    pub async fn log_event(&self, event_name: &str, event_data: Value) -> AuthResult<()> {
        let result = record_event(
            self.identity.as_ref(),
            self.ip_lookup.as_ref(),
            &self.config.user_agent,
            event_name,
            event_data,
        )
        .await;

        match result {
            Ok(()) => AuthResult::success(()),
            Err(e) => {
                warn!(event = event_name, error = %e, "Analytics logging failed");
                AuthResult::failure(e.to_string())
            }
        }
    }

    /// Wait for analytics events still in flight.
    pub async fn flush(&self) {
        let pending = std::mem::take(&mut *self.lock_pending());
        for task in pending {
            if let Err(e) = task.await {
                warn!(error = %e, "Analytics task panicked");
            }
        }
    }

    /// Record an event in the background; the caller never sees the outcome.
    fn log_best_effort(&self, event_name: &'static str, event_data: Value) {
        let identity = Arc::clone(&self.identity);
        let ip_lookup = Arc::clone(&self.ip_lookup);
        let user_agent = self.config.user_agent.clone();

        let task = tokio::spawn(async move {
            let result = record_event(
                identity.as_ref(),
                ip_lookup.as_ref(),
                &user_agent,
                event_name,
                event_data,
            )
            .await;
            if let Err(e) = result {
                debug!(event = event_name, error = %e, "Logging failed");
            }
        });

        let mut pending = self.lock_pending();
        pending.retain(|task| !task.is_finished());
        pending.push(task);
    }

    fn lock_pending(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

async fn record_event(
    identity: &dyn IdentityService,
    ip_lookup: &dyn IpLookup,
    user_agent: &str,
    event_name: &str,
    event_data: Value,
) -> crate::Result<()> {
    let row = json!({
        "event_name": event_name,
        "event_data": event_data,
        "ip_address": ip_or_unknown(ip_lookup).await,
        "user_agent": user_agent,
        "timestamp": now_iso(),
    });
    identity.insert(ANALYTICS_TABLE, vec![row]).await
}
