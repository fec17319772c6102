use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use tracing::{info, warn};

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("bio_page/", env!("CARGO_PKG_VERSION"));

/// Download a page's HTML so it can be stored as the bio page content.
/// Rate limits and 5xx responses are retried with exponential backoff.
pub async fn fetch_page(url: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    for attempt in 0..MAX_RETRIES {
        let start = Instant::now();
        let response = send(&client, url).await?;
        let status = response.status();
        if !is_retryable(status) {
            return read_body(response, url, start).await;
        }

        let backoff = backoff(attempt);
        warn!(
            "{} from {} (attempt {}/{}), backing off {:.1}s",
            status,
            url,
            attempt + 1,
            MAX_RETRIES,
            backoff.as_secs_f64()
        );
        tokio::time::sleep(backoff).await;
    }

    let start = Instant::now();
    let response = send(&client, url).await?;
    read_body(response, url, start).await
}

async fn send(client: &reqwest::Client, url: &str) -> Result<reqwest::Response> {
    client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))
}

async fn read_body(response: reqwest::Response, url: &str, start: Instant) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        bail!("GET {} returned {}", url, status);
    }
    let body = response.text().await.context("Failed to read response body")?;
    info!(
        "Fetched {} ({} bytes, {} ms)",
        url,
        body.len(),
        start.elapsed().as_millis()
    );
    Ok(body)
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt))
}
