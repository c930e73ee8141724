//! GAVL connector - probes the verdict service at startup and optionally
//! submits a case.
//!
//! Usage: `gavl-connect [case.json]`

use std::env;

use anyhow::Context;
use gavl_client::config::DEFAULT_API_BASE_URL;
use gavl_client::{format_verdict, report_health, CaseData, Config, VerdictClient};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn load_config() -> Config {
    match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            // The verdict path needs no identity backend.
            warn!(error = %e, "Identity configuration missing; verdict service only");
            Config::new(
                env::var("GAVL_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
                "",
                "",
            )
        }
    }
}

fn read_case(path: &str) -> anyhow::Result<CaseData> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing case data in {}", path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = load_config();
    let client = VerdictClient::new(&config);

    let health = client.check_health().await;
    report_health(&health);

    if let Some(path) = env::args().nth(1) {
        let case = read_case(&path)?;
        let verdict = client.submit(&case).await;
        println!("{}", format_verdict(&verdict));
    }

    Ok(())
}
