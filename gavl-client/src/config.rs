//! Configuration for the verdict and identity clients.

use std::env;

use crate::{Error, Result};

/// Default verdict service base URL.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8888";
/// Default origin used to build email redirect links.
pub const DEFAULT_SITE_ORIGIN: &str = "http://localhost:8000";
/// Default IP lookup endpoint.
pub const DEFAULT_IP_LOOKUP_URL: &str = "https://api.ipify.org?format=json";

/// Pages the identity provider sends users back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectUrls {
    pub verify: String,
    pub reset: String,
}

impl Default for RedirectUrls {
    fn default() -> Self {
        Self {
            verify: "/verify-email.html".to_string(),
            reset: "/reset-password.html".to_string(),
        }
    }
}

/// Free-tier limits applied to every trial account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialPolicy {
    /// Trial length in days
    pub days: i64,
    /// Maximum number of cases during the trial
    pub cases_limit: i64,
}

impl Default for TrialPolicy {
    fn default() -> Self {
        Self {
            days: 14,
            cases_limit: 1000,
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Verdict service base URL (without the `/api/v1` suffix)
    pub api_base_url: String,
    /// Identity/database project URL
    pub supabase_url: String,
    /// Public API key, passed through untouched
    pub supabase_anon_key: String,
    /// Origin prepended to redirect paths
    pub site_origin: String,
    pub redirects: RedirectUrls,
    pub trial: TrialPolicy,
    /// Best-effort IP lookup endpoint
    pub ip_lookup_url: String,
    /// User agent recorded on analytics rows
    pub user_agent: String,
}

impl Config {
    /// Build a configuration with default redirects, trial policy and lookup endpoint.
    pub fn new(
        api_base_url: impl Into<String>,
        supabase_url: impl Into<String>,
        supabase_anon_key: impl Into<String>,
    ) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            supabase_url: supabase_url.into(),
            supabase_anon_key: supabase_anon_key.into(),
            site_origin: DEFAULT_SITE_ORIGIN.to_string(),
            redirects: RedirectUrls::default(),
            trial: TrialPolicy::default(),
            ip_lookup_url: DEFAULT_IP_LOOKUP_URL.to_string(),
            user_agent: default_user_agent(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let supabase_url = required("SUPABASE_URL")?;
        let supabase_anon_key = required("SUPABASE_ANON_KEY")?;

        let mut config = Self::new(
            env::var("GAVL_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            supabase_url,
            supabase_anon_key,
        );
        if let Ok(origin) = env::var("GAVL_SITE_ORIGIN") {
            config.site_origin = origin;
        }
        if let Ok(url) = env::var("GAVL_IP_LOOKUP_URL") {
            config.ip_lookup_url = url;
        }
        if let Ok(agent) = env::var("GAVL_USER_AGENT") {
            config.user_agent = agent;
        }
        Ok(config)
    }

    /// `POST` target for case submission.
    pub fn verdict_url(&self) -> String {
        format!("{}/api/v1/verdict", self.api_base_url.trim_end_matches('/'))
    }

    /// `GET` target for the health probe.
    pub fn health_url(&self) -> String {
        format!("{}/api/v1/health", self.api_base_url.trim_end_matches('/'))
    }

    /// Absolute redirect link for email verification.
    pub fn verify_redirect(&self) -> String {
        self.redirect(&self.redirects.verify)
    }

    /// Absolute redirect link for password reset.
    pub fn reset_redirect(&self) -> String {
        self.redirect(&self.redirects.reset)
    }

    fn redirect(&self, path: &str) -> String {
        format!("{}{}", self.site_origin.trim_end_matches('/'), path)
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("{} not set", name)))
}

fn default_user_agent() -> String {
    format!("gavl-client/{}", env!("CARGO_PKG_VERSION"))
}
