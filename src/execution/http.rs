use async_trait::async_trait;
use chrono::Utc;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

use super::{validate_price, ExecutionProvider, MarketDataProvider, ProviderError};
use crate::config::ProviderConfig;
use crate::models::{ExecutionResult, PriceSample, Side};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

type MarketRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: f64,
}

#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    market: &'a str,
    side: Side,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    profit: f64,
}

/// REST client for the prediction-market price and order endpoints
///
/// Cloneable; clones share the rate limiter.
#[derive(Clone)]
pub struct HttpMarketClient {
    client: Client,
    base_url: String,
    api_key: String,
    market: String,
    rate_limiter: Arc<MarketRateLimiter>,
}

impl HttpMarketClient {
    /// `request_timeout` bounds each HTTP attempt
    pub fn new(config: &ProviderConfig, request_timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(request_timeout).build()?;

        let rpm = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            market: config.market.clone(),
            rate_limiter,
        })
    }

    /// Retry transient failures with exponential backoff
    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 1;
        loop {
            self.rate_limiter.until_ready().await;

            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!("✓ {} succeeded after {} attempts", what, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if attempt < MAX_RETRIES && is_retryable(&e) => {
                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt - 1);
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}. Retrying in {}ms...",
                        attempt,
                        MAX_RETRIES,
                        what,
                        e,
                        backoff_ms
                    );
                    sleep(Duration::from_millis(backoff_ms)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_price_once(&self) -> Result<PriceSample, ProviderError> {
        let url = format!("{}/v1/markets/{}", self.base_url, self.market);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: PriceResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(PriceSample {
            timestamp: Utc::now().timestamp(),
            price: validate_price(body.price)?,
        })
    }

    async fn submit_order_once(&self, side: Side) -> Result<ExecutionResult, ProviderError> {
        let url = format!("{}/v1/orders", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&OrderRequest {
                market: &self.market,
                side,
            })
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: OrderResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if !body.profit.is_finite() {
            return Err(ProviderError::InvalidResponse(format!(
                "non-finite profit {}",
                body.profit
            )));
        }
        Ok(ExecutionResult {
            profit: body.profit,
        })
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body,
    })
}

fn is_retryable(error: &ProviderError) -> bool {
    match error {
        ProviderError::Http(_) => true,
        ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

#[async_trait]
impl MarketDataProvider for HttpMarketClient {
    async fn fetch_price(&self) -> Result<PriceSample, ProviderError> {
        self.with_retry("price fetch", || self.fetch_price_once())
            .await
    }
}

#[async_trait]
impl ExecutionProvider for HttpMarketClient {
    /// Orders are not retried: a resubmission could double-fill
    async fn execute(&self, side: Side) -> Result<ExecutionResult, ProviderError> {
        self.rate_limiter.until_ready().await;
        tracing::info!(market = %self.market, side = %side, "Submitting order");
        self.submit_order_once(side).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    fn config_for(server: &mockito::ServerGuard) -> ProviderConfig {
        ProviderConfig {
            base_url: server.url(),
            api_key: "test-key".to_string(),
            market: "btc-price".to_string(),
            requests_per_minute: 600,
            ..ProviderConfig::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_price() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/markets/btc-price")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"price": 101.5}"#)
            .create_async()
            .await;

        let client = HttpMarketClient::new(&config_for(&server), TEST_TIMEOUT).unwrap();
        let sample = client.fetch_price().await.unwrap();

        assert_eq!(sample.price, 101.5);
        assert!(sample.timestamp > 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_price_rejects_non_positive() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/markets/btc-price")
            .with_status(200)
            .with_body(r#"{"price": 0}"#)
            .create_async()
            .await;

        let client = HttpMarketClient::new(&config_for(&server), TEST_TIMEOUT).unwrap();
        let result = client.fetch_price().await;

        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_fetch_price_does_not_retry_client_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/markets/btc-price")
            .with_status(404)
            .with_body("unknown market")
            .expect(1)
            .create_async()
            .await;

        let client = HttpMarketClient::new(&config_for(&server), TEST_TIMEOUT).unwrap();
        let result = client.fetch_price().await;

        match result {
            Err(ProviderError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "unknown market");
            }
            other => panic!("expected status error, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_price_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/markets/btc-price")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = HttpMarketClient::new(&config_for(&server), TEST_TIMEOUT).unwrap();
        let result = client.fetch_price().await;

        assert!(matches!(
            result,
            Err(ProviderError::Status { status: 503, .. })
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_execute_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/orders")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "market": "btc-price",
                "side": "LONG"
            })))
            .with_status(200)
            .with_body(r#"{"profit": -0.25}"#)
            .create_async()
            .await;

        let client = HttpMarketClient::new(&config_for(&server), TEST_TIMEOUT).unwrap();
        let result = client.execute(Side::Long).await.unwrap();

        assert_eq!(result.profit, -0.25);
        mock.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_order_times_out_at_request_timeout() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/orders")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body_from_request(|_| {
                std::thread::sleep(std::time::Duration::from_millis(500));
                br#"{"profit": 1.0}"#.to_vec()
            })
            .create_async()
            .await;

        let client =
            HttpMarketClient::new(&config_for(&server), Duration::from_millis(100)).unwrap();
        let result = client.execute(Side::Short).await;

        match result {
            Err(ProviderError::Http(e)) => assert!(e.is_timeout()),
            other => panic!("expected a timeout, got {:?}", other),
        }
    }
}
