//! Best-effort public IP lookup.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::Result;

/// Placeholder recorded when the lookup fails.
pub const UNKNOWN_IP: &str = "unknown";

#[async_trait]
pub trait IpLookup: Send + Sync {
    async fn lookup(&self) -> Result<String>;
}

/// Resolve the caller's IP, or [`UNKNOWN_IP`].
pub async fn ip_or_unknown(lookup: &dyn IpLookup) -> String {
    match lookup.lookup().await {
        Ok(ip) => ip,
        Err(e) => {
            debug!(error = %e, "IP lookup failed");
            UNKNOWN_IP.to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: String,
}

/// Lookup against an ipify-compatible endpoint returning `{"ip": ..}`.
#[derive(Debug, Clone)]
pub struct IpifyLookup {
    http: reqwest::Client,
    url: String,
}

impl IpifyLookup {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl IpLookup for IpifyLookup {
    async fn lookup(&self) -> Result<String> {
        let response = self.http.get(&self.url).send().await?.error_for_status()?;
        let body: IpResponse = response.json().await?;
        Ok(body.ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serve_once;

    #[tokio::test]
    async fn test_lookup_success() {
        let base = serve_once(200, r#"{"ip":"203.0.113.7"}"#).await;
        let lookup = IpifyLookup::new(reqwest::Client::new(), base);
        assert_eq!(ip_or_unknown(&lookup).await, "203.0.113.7");
    }

    #[tokio::test]
    async fn test_lookup_failure_is_unknown() {
        let lookup = IpifyLookup::new(reqwest::Client::new(), "http://127.0.0.1:1");
        assert_eq!(ip_or_unknown(&lookup).await, UNKNOWN_IP);

        let base = serve_once(429, r#"{"ip":"203.0.113.7"}"#).await;
        let lookup = IpifyLookup::new(reqwest::Client::new(), base);
        assert_eq!(ip_or_unknown(&lookup).await, UNKNOWN_IP);
    }
}
