//! Verdict service health probe.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::Result;

/// Status reported by the health endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub quantum_available: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HealthStatus {
    pub fn unavailable() -> Self {
        Self {
            status: "unavailable".to_string(),
            quantum_available: false,
            extra: Map::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Probe `url` once. Any failure reads as [`HealthStatus::unavailable`].
pub async fn check_health(http: &reqwest::Client, url: &str) -> HealthStatus {
    match fetch_health(http, url).await {
        Ok(health) => {
            info!(status = %health.status, quantum_available = health.quantum_available, "Backend health");
            health
        }
        Err(e) => {
            warn!(error = %e, "Backend health check failed");
            HealthStatus::unavailable()
        }
    }
}

async fn fetch_health(http: &reqwest::Client, url: &str) -> Result<HealthStatus> {
    let response = http.get(url).send().await?;
    Ok(response.json::<HealthStatus>().await?)
}

/// Log connectivity and feature status.
pub fn report_health(health: &HealthStatus) {
    if !health.is_ok() {
        warn!("Backend unavailable - will use simulated responses");
        return;
    }

    info!("Backend connected successfully");
    if health.quantum_available {
        info!("Quantum ML enabled");
    } else {
        warn!("Quantum ML disabled - using classical fallback");
    }
}
