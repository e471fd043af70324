// src/lookup.rs
use crate::error::Result;
use crate::types::{LookupConfig, ScanError, WhoisResponse};
use crate::utils::truncate_body;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use log::{debug, warn};
use reqwest::Client;
use std::num::NonZeroU32;
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 512;

/// Anything that can answer a WHOIS question for one domain.
#[async_trait]
pub trait WhoisLookup: Send + Sync {
    async fn lookup(&self, domain: &str) -> Result<WhoisResponse>;
}

/// HTTP client for the WHOIS JSON API.
pub struct WhoisClient {
    client: Client,
    endpoint: String,
    api_token: String,
    max_retries: u32,
    rate_limiter: Option<DefaultDirectRateLimiter>,
}

impl WhoisClient {
    pub fn new(config: &LookupConfig) -> Result<Self> {
        let mut client_builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| ScanError::ConfigError(format!("Invalid proxy URL: {}", e)))?;
            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder
            .build()
            .map_err(|e| ScanError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let rate_limiter = config
            .requests_per_second
            .and_then(NonZeroU32::new)
            .map(|limit| {
                RateLimiter::direct(Quota::per_second(limit).allow_burst(NonZeroU32::MIN))
            });

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            max_retries: config.max_retries,
            rate_limiter,
        })
    }

    pub fn request_url(&self, domain: &str) -> String {
        format!("{}/v1/www.{}", self.endpoint, domain)
    }

    async fn send_with_retry(&self, domain: &str, url: &str) -> Result<reqwest::Response> {
        let mut retries = 0;
        loop {
            if let Some(limiter) = &self.rate_limiter {
                limiter.until_ready().await;
            }

            let result = self
                .client
                .get(url)
                .header("Authorization", &self.api_token)
                .header("Accept", "application/json")
                .send()
                .await;

            match result {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if retries >= self.max_retries {
                        return Err(ScanError::Transport {
                            domain: domain.to_string(),
                            source: e,
                        });
                    }
                    retries += 1;

                    // Exponential backoff
                    let delay =
                        Duration::from_millis(100u64.saturating_mul(2u64.saturating_pow(retries)));
                    warn!(
                        "Lookup for {} failed ({}), retry {}/{} in {:?}",
                        domain, e, retries, self.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl WhoisLookup for WhoisClient {
    async fn lookup(&self, domain: &str) -> Result<WhoisResponse> {
        let url = self.request_url(domain);
        debug!("GET {}", url);

        let response = self.send_with_retry(domain, &url).await?;
        let status = response.status();

        let text = response.text().await.map_err(|e| ScanError::Transport {
            domain: domain.to_string(),
            source: e,
        })?;

        if !status.is_success() {
            return Err(ScanError::LookupStatus {
                domain: domain.to_string(),
                status: status.as_u16(),
                body: truncate_body(&text, MAX_ERROR_BODY_CHARS),
            });
        }

        serde_json::from_str(&text).map_err(|e| ScanError::Decode {
            domain: domain.to_string(),
            message: e.to_string(),
            body: truncate_body(&text, MAX_ERROR_BODY_CHARS),
        })
    }
}
