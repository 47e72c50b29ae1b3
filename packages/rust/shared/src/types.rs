//! Core domain types for the fetch-and-convert pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ProcessedDocument
// ---------------------------------------------------------------------------

/// The outcome of attempting to fetch and convert one URL.
///
/// Only constructible through [`ProcessedDocument::success`] and
/// [`ProcessedDocument::failure`]: a successful document never carries an
/// error message, and a failed one always has empty content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedDocument {
    url: String,
    title: String,
    content: String,
    success: bool,
    error_message: Option<String>,
}

impl ProcessedDocument {
    /// A successfully converted document.
    pub fn success(url: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: content.into(),
            success: true,
            error_message: None,
        }
    }

    /// A failed fetch, with a human-readable reason.
    pub fn failure(url: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            content: String::new(),
            success: false,
            error_message: Some(error_message.into()),
        }
    }

    /// The original input URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Converted Markdown/plain-text body (empty on failure).
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

// ---------------------------------------------------------------------------
// BatchResult
// ---------------------------------------------------------------------------

/// Aggregate over one invocation of the pipeline.
///
/// `documents` is in completion order, not submission order.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub documents: Vec<ProcessedDocument>,
    /// Number of valid URLs handed to the fetcher.
    pub total_processed: usize,
    pub successful_count: usize,
    pub failed_count: usize,
    /// Inputs dropped by validation (diagnostics only, not in `documents`).
    pub invalid_count: usize,
    /// Wall-clock duration of the batch.
    pub elapsed: Duration,
}

impl BatchResult {
    /// Build a result from collected documents; counts are derived from them.
    pub fn from_documents(
        documents: Vec<ProcessedDocument>,
        invalid_count: usize,
        elapsed: Duration,
    ) -> Self {
        let successful_count = documents.iter().filter(|d| d.is_success()).count();
        let total_processed = documents.len();
        Self {
            documents,
            total_processed,
            successful_count,
            failed_count: total_processed - successful_count,
            invalid_count,
            elapsed,
        }
    }

    /// Percentage of processed URLs that succeeded, `0.0` for an empty batch.
    pub fn success_rate(&self) -> f64 {
        if self.total_processed == 0 {
            return 0.0;
        }
        self.successful_count as f64 / self.total_processed as f64 * 100.0
    }
}

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

/// Input URLs split by validity, each side in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
}

// ---------------------------------------------------------------------------
// ConvertedPage
// ---------------------------------------------------------------------------

/// What the conversion collaborator hands back for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPage {
    /// Title reported by the converter, if it found one.
    pub title: Option<String>,
    /// Converted body text (Markdown or plain text).
    pub text_content: String,
}

// ---------------------------------------------------------------------------
// UrlInput
// ---------------------------------------------------------------------------

/// One URL or a list of URLs, as accepted at the tool boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlInput {
    Single(String),
    Many(Vec<String>),
}

impl UrlInput {
    /// Normalize to a list: a single string becomes a one-element list.
    pub fn into_list(self) -> Vec<String> {
        match self {
            Self::Single(url) => vec![url],
            Self::Many(urls) => urls,
        }
    }

    /// Number of entries after normalization.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Many(urls) => urls.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for UrlInput {
    fn from(url: &str) -> Self {
        Self::Single(url.to_string())
    }
}

impl From<String> for UrlInput {
    fn from(url: String) -> Self {
        Self::Single(url)
    }
}

impl From<Vec<String>> for UrlInput {
    fn from(urls: Vec<String>) -> Self {
        Self::Many(urls)
    }
}

impl From<Vec<&str>> for UrlInput {
    fn from(urls: Vec<&str>) -> Self {
        Self::Many(urls.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for UrlInput {
    fn from(urls: &[&str]) -> Self {
        Self::Many(urls.iter().map(|u| u.to_string()).collect())
    }
}
