//! Low-level HTTP client: `BinanceHttp`.
//!
//! One method per REST endpoint. Returns wire types; conversion to domain
//! types happens in the `MarketDataSource` impl.

use crate::domain::candle::wire::RestKline;
use crate::domain::ticker::wire::Ticker24hrResponse;
use crate::error::HttpError;
use crate::http::retry::RetryPolicy;
use crate::shared::{Interval, Symbol};

use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Request timeout applied to every call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Low-level HTTP client for the public market-data REST API.
#[derive(Clone)]
pub struct BinanceHttp {
    base_url: String,
    client: Client,
    retry: RetryPolicy,
}

impl BinanceHttp {
    pub fn new(base_url: &str) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry: RetryPolicy::default(),
        })
    }

    /// Override the retry policy used for every GET.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── Market data ──────────────────────────────────────────────────────

    pub async fn get_klines(
        &self,
        symbol: &Symbol,
        interval: Interval,
        limit: u32,
    ) -> Result<Vec<RestKline>, HttpError> {
        let url = format!(
            "{}/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            urlencoding::encode(symbol.as_str()),
            interval.as_str(),
            limit
        );
        self.get(&url).await
    }

    pub async fn get_ticker_24hr(&self, symbol: &Symbol) -> Result<Ticker24hrResponse, HttpError> {
        let url = format!(
            "{}/ticker/24hr?symbol={}",
            self.base_url,
            urlencoding::encode(symbol.as_str())
        );
        self.get(&url).await
    }

    // ── Internal HTTP methods ────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        let Some(config) = self.retry.config() else {
            return self.do_get(url).await;
        };

        let mut last_error = None;

        for attempt in 0..=config.max_retries {
            let e = match self.do_get::<T>(url).await {
                Ok(resp) => return Ok(resp),
                Err(e) => e,
            };
            if !config.should_retry(&e) {
                return Err(e);
            }

            if attempt < config.max_retries {
                let delay = match &e {
                    HttpError::RateLimited {
                        retry_after_ms: Some(ms),
                    } => Duration::from_millis(*ms),
                    _ => config.delay_for_attempt(attempt),
                };
                tracing::debug!(
                    attempt = attempt + 1,
                    max = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying request to {}",
                    url
                );
                futures_timer::Delay::new(delay).await;
            }
            last_error = Some(e);
        }

        Err(HttpError::MaxRetriesExceeded {
            attempts: config.max_retries + 1,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    async fn do_get<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout
            } else {
                HttpError::Reqwest(e)
            }
        })?;
        let status = resp.status().as_u16();

        if resp.status().is_success() {
            let bytes = resp.bytes().await?;
            return decode_body(&bytes);
        }

        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await.unwrap_or_default();
        Err(status_error(status, body, retry_after.as_deref()))
    }
}

/// Decode a 2xx body; malformed JSON is a decode error, never a status error.
pub(crate) fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, HttpError> {
    serde_json::from_slice(bytes).map_err(|e| HttpError::Decode(e.to_string()))
}

/// Map a non-2xx response onto an `HttpError`.
pub(crate) fn status_error(status: u16, body: String, retry_after: Option<&str>) -> HttpError {
    match status {
        404 => HttpError::NotFound(body),
        // 418 is the exchange's escalation of an ignored 429.
        418 | 429 => HttpError::RateLimited {
            retry_after_ms: retry_after
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(|secs| secs * 1000),
        },
        400..=499 => HttpError::BadRequest(body),
        _ => HttpError::ServerError { status, body },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::retry::RetryConfig;

    #[test]
    fn test_new_trims_trailing_slash() {
        let http = BinanceHttp::new("https://api.binance.com/api/v3/").unwrap();
        assert_eq!(http.base_url(), "https://api.binance.com/api/v3");
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(404, "missing".into(), None),
            HttpError::NotFound(b) if b == "missing"
        ));
        assert!(matches!(
            status_error(400, r#"{"code":-1121,"msg":"Invalid symbol."}"#.into(), None),
            HttpError::BadRequest(_)
        ));
        assert!(matches!(
            status_error(503, String::new(), None),
            HttpError::ServerError { status: 503, .. }
        ));
    }

    #[test]
    fn test_rate_limit_reads_retry_after_seconds() {
        assert!(matches!(
            status_error(429, String::new(), Some("3")),
            HttpError::RateLimited {
                retry_after_ms: Some(3000)
            }
        ));
        assert!(matches!(
            status_error(418, String::new(), Some("soon")),
            HttpError::RateLimited {
                retry_after_ms: None
            }
        ));
    }

    #[tokio::test]
    async fn test_retryable_failures_exhaust_into_max_retries() {
        let http = BinanceHttp::new("http://127.0.0.1:1")
            .unwrap()
            .with_retry(RetryPolicy::Custom(
                RetryConfig {
                    max_retries: 1,
                    initial_delay: Duration::from_millis(1),
                    ..RetryConfig::idempotent()
                }
                .without_jitter(),
            ));

        let err = http.get_ticker_24hr(&Symbol::new("BTCUSDT")).await.unwrap_err();
        assert!(matches!(
            err,
            HttpError::MaxRetriesExceeded { attempts: 2, .. }
        ));
    }

    #[test]
    fn test_decode_body_distinguishes_malformed_json() {
        let err = decode_body::<Ticker24hrResponse>(b"{\"symbol\":").unwrap_err();
        assert!(matches!(err, HttpError::Decode(_)));
        assert_eq!(err.status(), None);
    }
}
