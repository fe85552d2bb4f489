//! `health` サブコマンド

use std::time::Duration;

use bgrelay_types::HealthResponse;

use super::relay_endpoint;

pub async fn run(relay_url: &str) -> anyhow::Result<()> {
    let url = relay_endpoint(relay_url, "/health");
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let response = client.get(&url).send().await.map_err(|e| {
        anyhow::anyhow!("cannot reach relay at {url}: {e}")
    })?;
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("relay health check failed: HTTP {status}");
    }

    let body: HealthResponse = response.json().await?;
    println!("{url}: {}", body.status);
    Ok(())
}
