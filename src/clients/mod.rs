// =============================================================================
// Downstream HTTP collaborators — ticker universe + data service
// =============================================================================
//
// Thin reqwest-based clients for the two external collaborators this binary
// actually calls over HTTP (the ticker-list fetcher and the data service
// backing price/financials/breadth). Both share the retry policy from §7:
// three attempts, exponential backoff (factor 1, doubling per attempt),
// retried on 429/500/502/503/504 — matching `leadership-service/data_fetcher.py`'s
// `urllib3.util.retry.Retry(total=3, backoff_factor=1, ...)`, whose wait is
// `backoff_factor * 2^(attempt - 1)`. The screening/analysis/leadership URLs
// in `Config` are vestigial: in this deployment C3/C2/C4 run in-process (§2),
// so no client exists for them.
// =============================================================================

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::AppError;

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_FACTOR: f64 = 1.0;

/// `backoff_factor * 2^(attempt - 1)`, matching urllib3's `Retry` policy:
/// attempt 1's failure waits 1s before attempt 2, attempt 2's failure waits
/// 2s before attempt 3.
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_secs_f64(RETRY_BACKOFF_FACTOR * 2f64.powi(attempt as i32 - 1))
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Issue a GET, retrying up to `RETRY_ATTEMPTS` times with exponential
/// backoff (`retry_delay`) on the retryable status classes from §7. A
/// connection-level failure (DNS, refused, reset) is retried the same way
/// and surfaces as `UpstreamUnavailable` if every attempt fails; a timeout
/// surfaces as `UpstreamTimeout`; a non-retryable 4xx/5xx or an unparsable
/// body surfaces as `UpstreamContract`.
pub async fn get_with_retry<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    provider: &str,
) -> Result<T, AppError> {
    let mut last_err: Option<AppError> = None;

    for attempt in 1..=RETRY_ATTEMPTS {
        match client.get(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return resp
                        .json::<T>()
                        .await
                        .map_err(|e| AppError::UpstreamContract(format!("{provider}: malformed response body: {e}")));
                }
                if is_retryable(status) && attempt < RETRY_ATTEMPTS {
                    warn!(provider = %provider, status = %status, attempt, "retryable upstream status, backing off");
                    tokio::time::sleep(retry_delay(attempt)).await;
                    last_err = Some(AppError::UpstreamUnavailable(format!("{provider} returned {status}")));
                    continue;
                }
                return Err(AppError::UpstreamContract(format!("{provider} returned {status}")));
            }
            Err(e) if e.is_timeout() => {
                last_err = Some(AppError::UpstreamTimeout(format!("{provider}: {e}")));
                if attempt < RETRY_ATTEMPTS {
                    warn!(provider = %provider, attempt, "upstream timeout, retrying");
                    tokio::time::sleep(retry_delay(attempt)).await;
                    continue;
                }
            }
            Err(e) => {
                last_err = Some(AppError::UpstreamUnavailable(format!("{provider}: {e}")));
                if attempt < RETRY_ATTEMPTS {
                    warn!(provider = %provider, attempt, error = %e, "upstream call failed, retrying");
                    tokio::time::sleep(retry_delay(attempt)).await;
                    continue;
                }
            }
        }
    }

    Err(last_err.unwrap_or_else(|| AppError::UpstreamUnavailable(format!("{provider}: exhausted retries"))))
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct TickerUniverseResponse {
    pub tickers: Vec<String>,
}

pub struct TickerServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl TickerServiceClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        TickerServiceClient { client, base_url }
    }

    pub async fn fetch_universe(&self) -> Result<Vec<String>, AppError> {
        let url = format!("{}/tickers", self.base_url.trim_end_matches('/'));
        let resp: TickerUniverseResponse = get_with_retry(&self.client, &url, "ticker-service").await?;
        Ok(resp.tickers)
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct BreadthResponse {
    #[serde(default)]
    pub new_highs: u64,
    #[serde(default)]
    pub new_lows: u64,
}

pub struct DataServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl DataServiceClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        DataServiceClient { client, base_url }
    }

    pub async fn fetch_price_series(&self, ticker: &str, period: &str) -> Result<Vec<crate::models::PriceBar>, AppError> {
        let url = format!("{}/prices/{ticker}?period={period}", self.base_url.trim_end_matches('/'));
        get_with_retry(&self.client, &url, "data-service").await
    }

    pub async fn fetch_financials(&self, ticker: &str) -> Result<serde_json::Value, AppError> {
        let url = format!("{}/financials/{ticker}", self.base_url.trim_end_matches('/'));
        get_with_retry(&self.client, &url, "data-service").await
    }

    /// The canonical breadth source (§9 Open Question): never reimplement a
    /// local new-highs/new-lows calculator, always delegate here. Missing
    /// fields default to zero rather than failing the caller.
    pub async fn fetch_breadth(&self) -> Result<BreadthResponse, AppError> {
        let url = format!("{}/market/breadth", self.base_url.trim_end_matches('/'));
        match get_with_retry(&self.client, &url, "data-service").await {
            Ok(resp) => Ok(resp),
            Err(_) => Ok(BreadthResponse::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_per_attempt() {
        assert_eq!(retry_delay(1), Duration::from_secs_f64(1.0));
        assert_eq!(retry_delay(2), Duration::from_secs_f64(2.0));
        assert_eq!(retry_delay(3), Duration::from_secs_f64(4.0));
    }
}
