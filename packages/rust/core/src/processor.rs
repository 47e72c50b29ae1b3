//! Concurrent batch orchestration: URLs in, one document per valid URL out.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use docfetch_fetcher::{Converter, Fetcher, HttpConverter, SlidingWindowRateLimiter, partition_urls};
use docfetch_shared::{
    AppConfig, BatchOptions, BatchResult, DocFetchError, Partition, ProcessedDocument, Result,
    UrlInput,
};

use crate::pool::WorkerPool;

/// Progress callback for reporting batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called once the input is validated, before any fetch starts.
    fn batch_started(&self, total: usize, invalid: usize);
    /// Called as each document completes (in completion order).
    fn document_finished(&self, document: &ProcessedDocument, completed: usize, total: usize);
    /// Called when every dispatched fetch has been collected.
    fn batch_finished(&self, result: &BatchResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn batch_started(&self, _total: usize, _invalid: usize) {}
    fn document_finished(&self, _document: &ProcessedDocument, _completed: usize, _total: usize) {}
    fn batch_finished(&self, _result: &BatchResult) {}
}

/// Fans validated URLs out over a bounded worker pool and aggregates the
/// per-URL documents.
///
/// Cheap to share: the fetcher (and its rate limiter) sit behind an `Arc`, so
/// every batch run through one processor draws on the same quota.
pub struct BatchProcessor<C> {
    fetcher: Arc<Fetcher<C>>,
    progress: Arc<dyn ProgressReporter>,
}

impl BatchProcessor<HttpConverter> {
    /// An HTTP-backed processor built from the application config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let converter = HttpConverter::from_config(config)?;
        let limiter = Arc::new(SlidingWindowRateLimiter::from_config(&config.rate_limit));
        Ok(Self::new(Fetcher::new(converter, limiter)))
    }
}

impl<C: Converter> BatchProcessor<C> {
    pub fn new(fetcher: Fetcher<C>) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            progress: Arc::new(SilentProgress),
        }
    }

    /// Report batch progress to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn fetcher(&self) -> &Fetcher<C> {
        &self.fetcher
    }

    /// Validate `urls`, fetch every valid one concurrently, and aggregate.
    ///
    /// Fails only when there is nothing to fetch: [`DocFetchError::EmptyInput`]
    /// for an empty list, [`DocFetchError::NoValidUrls`] when every entry is
    /// malformed. Individual fetch failures and timeouts are reported as
    /// failed documents.
    #[instrument(
        skip_all,
        fields(batch_id = %Uuid::now_v7(), max_workers = options.max_workers, timeout_s = options.timeout.as_secs_f64())
    )]
    pub async fn process(
        &self,
        urls: impl Into<UrlInput>,
        options: &BatchOptions,
    ) -> Result<BatchResult> {
        let start = Instant::now();
        let urls: UrlInput = urls.into();
        let urls = urls.into_list();

        if urls.is_empty() {
            return Err(DocFetchError::EmptyInput);
        }

        let Partition { valid, invalid } = partition_urls(urls);

        if !invalid.is_empty() {
            warn!(count = invalid.len(), invalid = ?invalid, "found invalid URLs");
        }
        if valid.is_empty() {
            return Err(DocFetchError::NoValidUrls { invalid });
        }

        info!(valid = valid.len(), invalid = invalid.len(), "starting batch");
        self.progress.batch_started(valid.len(), invalid.len());

        let mut pool = WorkerPool::new(options.max_workers);
        for (index, url) in valid.iter().enumerate() {
            let fetcher = self.fetcher.clone();
            let url = url.clone();
            let timeout = options.timeout;
            pool.submit(index, async move {
                fetcher.fetch_one_with_timeout(&url, timeout).await
            });
        }

        let mut outstanding = vec![true; valid.len()];
        let mut documents = Vec::with_capacity(valid.len());

        while let Some((index, outcome)) = pool.next_completed().await {
            outstanding[index] = false;
            let document = outcome.unwrap_or_else(|reason| {
                error!(url = %valid[index], %reason, "unexpected error processing URL");
                ProcessedDocument::failure(&valid[index], format!("Unexpected error: {reason}"))
            });
            self.progress
                .document_finished(&document, documents.len() + 1, valid.len());
            documents.push(document);
        }
        drop(pool);

        // A task that never reported back still owes its URL a document.
        for (index, _) in outstanding.iter().enumerate().filter(|(_, open)| **open) {
            error!(url = %valid[index], "worker finished without a result");
            documents.push(ProcessedDocument::failure(
                &valid[index],
                "Unexpected error: worker task did not complete",
            ));
        }

        let result = BatchResult::from_documents(documents, invalid.len(), start.elapsed());

        info!(
            total = result.total_processed,
            successful = result.successful_count,
            failed = result.failed_count,
            success_rate = result.success_rate(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            "batch completed"
        );
        self.progress.batch_finished(&result);

        Ok(result)
    }
}
