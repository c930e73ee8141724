//! Case submission against the remote verdict service.

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::fallback::simulated_verdict;
use crate::health::{check_health, HealthStatus};
use crate::models::{CaseData, VerdictResult};
use crate::{Error, Result};

/// Converts a failed submission into the local fallback verdict.
pub trait OrFallback {
    fn or_fallback(self, case: &CaseData) -> VerdictResult;
}

impl OrFallback for Result<VerdictResult> {
    fn or_fallback(self, case: &CaseData) -> VerdictResult {
        self.unwrap_or_else(|e| {
            error!(case_id = %case.case_id, error = %e, "Error submitting case");
            warn!("Backend unavailable, using simulated response");
            simulated_verdict(case)
        })
    }
}

/// Client for the verdict service.
#[derive(Debug, Clone)]
pub struct VerdictClient {
    http: reqwest::Client,
    verdict_url: String,
    health_url: String,
}

impl VerdictClient {
    pub fn new(config: &Config) -> Self {
        Self::with_http(reqwest::Client::new(), config)
    }

    /// Reuse an existing connection pool.
    pub fn with_http(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            verdict_url: config.verdict_url(),
            health_url: config.health_url(),
        }
    }

    /// Submit a case. Never fails: any error yields the fallback verdict.
    pub async fn submit(&self, case: &CaseData) -> VerdictResult {
        self.try_submit(case).await.or_fallback(case)
    }

    /// Submit a case once, reporting transport, status and parse failures.
    pub async fn try_submit(&self, case: &CaseData) -> Result<VerdictResult> {
        debug!(
            case_id = %case.case_id,
            evidence_items = case.evidence_count(),
            "Submitting case for analysis"
        );

        let response = self.http.post(&self.verdict_url).json(case).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let verdict: VerdictResult = response.json().await?;
        info!(
            case_id = %verdict.case_id,
            confidence = verdict.confidence_score,
            token = %verdict.verdict_token,
            "Verdict received"
        );
        Ok(verdict)
    }

    pub async fn check_health(&self) -> HealthStatus {
        check_health(&self.http, &self.health_url).await
    }
}
