//! Rate-limited single-URL fetch-and-convert.
//!
//! [`Fetcher::fetch_one`] never fails: converter errors and timeouts are
//! folded into a failed [`ProcessedDocument`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use docfetch_shared::{DocFetchError, ProcessedDocument};

use crate::converter::Converter;
use crate::rate_limiter::SlidingWindowRateLimiter;

/// A converter behind a shared, process-wide rate limiter.
pub struct Fetcher<C> {
    converter: C,
    limiter: Arc<SlidingWindowRateLimiter>,
}

impl<C: Converter> Fetcher<C> {
    /// Create a fetcher. Share `limiter` between fetchers to share the quota.
    pub fn new(converter: C, limiter: Arc<SlidingWindowRateLimiter>) -> Self {
        Self { converter, limiter }
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowRateLimiter> {
        &self.limiter
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// Fetch and convert `url`, waiting on the rate limiter first.
    #[instrument(skip(self))]
    pub async fn fetch_one(&self, url: &str) -> ProcessedDocument {
        self.limiter.acquire().await;
        info!("processing URL");
        let outcome = self.converter.convert(url).await;
        into_document(url, outcome)
    }

    /// Like [`fetch_one`](Self::fetch_one), but the conversion step is bounded
    /// by `timeout`. Time spent waiting on the rate limiter does not count.
    #[instrument(skip(self), fields(timeout_ms = timeout.as_millis() as u64))]
    pub async fn fetch_one_with_timeout(&self, url: &str, timeout: Duration) -> ProcessedDocument {
        self.limiter.acquire().await;
        info!("processing URL");
        let outcome = match tokio::time::timeout(timeout, self.converter.convert(url)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(DocFetchError::Timeout {
                url: url.to_string(),
                after: timeout,
            }),
        };
        into_document(url, outcome)
    }
}

fn into_document(
    url: &str,
    outcome: docfetch_shared::Result<docfetch_shared::ConvertedPage>,
) -> ProcessedDocument {
    match outcome {
        Ok(page) => {
            let title = page
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| url.to_string());
            ProcessedDocument::success(url, title, page.text_content)
        }
        Err(e) => {
            warn!(url, error = %e, "failed to process URL");
            ProcessedDocument::failure(url, e.to_string())
        }
    }
}
