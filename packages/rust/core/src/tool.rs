//! Tool-facing adapter: the one entry point agent frameworks call.
//!
//! Nothing here returns a `Result`. Every failure, including bad arguments,
//! empty input, and all-invalid input, comes back as a [`ToolResponse`] with
//! `success == false` and an `error` description.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, instrument};

use docfetch_fetcher::Converter;
use docfetch_shared::{BatchOptions, BatchResult, DocFetchError, ProcessedDocument, UrlInput};

use crate::processor::BatchProcessor;

/// Name under which the tool is registered with agent frameworks.
pub const TOOL_NAME: &str = "process_multiple_urls";

const TOOL_DESCRIPTION: &str = "Fetch one or more web URLs and convert their content to Markdown. \
Returns per-URL documents (url, title, content, success, error_message) and a summary.";

// ---------------------------------------------------------------------------
// Response shape
// ---------------------------------------------------------------------------

/// Flat, serializable result handed back to the calling agent.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse {
    pub documents: Vec<ProcessedDocument>,
    pub summary: Summary,
    /// True iff at least one URL was converted.
    pub success: bool,
    /// Why the batch could not run at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch counters as exposed to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub total_processed: usize,
    pub successful_count: usize,
    pub failed_count: usize,
    pub success_rate: f64,
}

impl ToolResponse {
    /// Flatten a completed batch.
    pub fn from_batch(result: BatchResult) -> Self {
        let summary = Summary {
            total_processed: result.total_processed,
            successful_count: result.successful_count,
            failed_count: result.failed_count,
            success_rate: result.success_rate(),
        };
        Self {
            success: result.successful_count > 0,
            documents: result.documents,
            summary,
            error: None,
        }
    }

    /// A batch that never ran; every one of `input_len` inputs counts as failed.
    pub fn from_error(err: &DocFetchError, input_len: usize) -> Self {
        Self {
            documents: Vec::new(),
            summary: Summary {
                total_processed: 0,
                successful_count: 0,
                failed_count: input_len,
                success_rate: 0.0,
            },
            success: false,
            error: Some(err.to_string()),
        }
    }

    /// Serialize to a JSON value (the "plain mapping" agents consume).
    pub fn to_value(&self) -> Value {
        // Only strings, numbers, and bools inside; this cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Request shape
// ---------------------------------------------------------------------------

/// Arguments of a tool call, as produced by an LLM.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolRequest {
    /// A single URL or a list of URLs.
    pub urls: UrlInput,
    /// Worker pool size; falls back to the processor defaults.
    #[serde(default)]
    pub max_workers: Option<usize>,
    /// Per-URL timeout in seconds; falls back to the processor defaults.
    #[serde(default)]
    pub timeout: Option<f64>,
}

impl ToolRequest {
    /// Merge the request's overrides onto `defaults`.
    pub fn options(&self, defaults: &BatchOptions) -> Result<BatchOptions, DocFetchError> {
        let mut options = *defaults;
        if let Some(max_workers) = self.max_workers {
            options.max_workers = max_workers;
        }
        if let Some(secs) = self.timeout {
            options.timeout = Duration::try_from_secs_f64(secs).map_err(|_| {
                DocFetchError::validation(format!("timeout must be a non-negative number of seconds, got {secs}"))
            })?;
        }
        Ok(options)
    }
}

/// JSON-schema description of the tool for registration with an agent framework.
pub fn tool_definition() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": TOOL_DESCRIPTION,
        "parameters": {
            "type": "object",
            "properties": {
                "urls": {
                    "description": "A single URL or a list of URLs to fetch.",
                    "oneOf": [
                        { "type": "string" },
                        { "type": "array", "items": { "type": "string" } }
                    ]
                },
                "max_workers": {
                    "type": "integer",
                    "minimum": 1,
                    "default": 5,
                    "description": "Maximum number of concurrent fetches."
                },
                "timeout": {
                    "type": "number",
                    "minimum": 0,
                    "default": 30,
                    "description": "Per-URL timeout in seconds."
                }
            },
            "required": ["urls"]
        }
    })
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

impl<C: Converter> BatchProcessor<C> {
    /// Run a batch and flatten it for the calling agent. Never fails.
    #[instrument(skip_all)]
    pub async fn process_multiple_urls(
        &self,
        urls: impl Into<UrlInput>,
        options: &BatchOptions,
    ) -> ToolResponse {
        let urls: UrlInput = urls.into();
        let input_len = urls.len();

        match self.process(urls, options).await {
            Ok(result) => ToolResponse::from_batch(result),
            Err(e) => {
                error!(error = %e, "error in process_multiple_urls");
                ToolResponse::from_error(&e, input_len)
            }
        }
    }

    /// Decode raw tool-call arguments and run them. Never fails.
    pub async fn handle_tool_call(&self, args: &Value, defaults: &BatchOptions) -> ToolResponse {
        let request = match ToolRequest::deserialize(args) {
            Ok(request) => request,
            Err(e) => {
                let err = DocFetchError::validation(format!("invalid tool arguments: {e}"));
                error!(error = %err, "rejected tool call");
                return ToolResponse::from_error(&err, 0);
            }
        };

        match request.options(defaults) {
            Ok(options) => self.process_multiple_urls(request.urls, &options).await,
            Err(err) => {
                error!(error = %err, "rejected tool call");
                ToolResponse::from_error(&err, request.urls.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use docfetch_fetcher::{Fetcher, HttpConverter, SlidingWindowRateLimiter};
    use docfetch_shared::{ConvertedPage, HttpConfig, Result};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    /// Fails any URL containing "down", succeeds otherwise.
    struct StubConverter;

    impl Converter for StubConverter {
        async fn convert(&self, url: &str) -> Result<ConvertedPage> {
            if url.contains("down") {
                Err(DocFetchError::Network(format!("{url}: connection refused")))
            } else {
                Ok(ConvertedPage {
                    title: None,
                    text_content: format!("# {url}\n"),
                })
            }
        }
    }

    fn stub_processor() -> BatchProcessor<StubConverter> {
        let limiter = Arc::new(SlidingWindowRateLimiter::new(100, Duration::from_secs(60)));
        BatchProcessor::new(Fetcher::new(StubConverter, limiter))
    }

    #[tokio::test]
    async fn empty_list_reports_failure() {
        let response = stub_processor()
            .process_multiple_urls(Vec::<String>::new(), &BatchOptions::default())
            .await;

        assert!(!response.success);
        assert!(response.documents.is_empty());
        assert_eq!(response.summary.total_processed, 0);
        assert_eq!(response.summary.failed_count, 0);
        assert_eq!(response.error.as_deref(), Some("URLs list cannot be empty"));
    }

    #[tokio::test]
    async fn all_invalid_counts_every_input_as_failed() {
        let response = stub_processor()
            .process_multiple_urls(vec!["not a url", "also-bad"], &BatchOptions::default())
            .await;

        assert!(!response.success);
        assert!(response.documents.is_empty());
        assert_eq!(response.summary.failed_count, 2);
        assert_eq!(response.summary.success_rate, 0.0);
        assert_eq!(response.error.as_deref(), Some("No valid URLs provided"));
    }

    #[tokio::test]
    async fn good_and_bad_url_yield_one_document() {
        let response = stub_processor()
            .process_multiple_urls(vec!["https://example.com/a", "bad"], &BatchOptions::default())
            .await;

        assert!(response.success);
        assert_eq!(response.documents.len(), 1);
        assert_eq!(response.summary.total_processed, 1);
        assert_eq!(response.documents[0].url(), "https://example.com/a");
        assert_eq!(response.documents[0].title(), "https://example.com/a");
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn all_fetches_failing_is_not_success() {
        let response = stub_processor()
            .process_multiple_urls("https://down.example.com", &BatchOptions::default())
            .await;

        assert!(!response.success);
        assert_eq!(response.summary.failed_count, 1);
        assert_eq!(response.documents.len(), 1);
        // The batch ran, so there is no batch-level error.
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn response_serializes_to_flat_mapping() {
        let response = stub_processor()
            .process_multiple_urls(
                vec!["https://up.example.com", "https://down.example.com"],
                &BatchOptions::default(),
            )
            .await;
        let value = response.to_value();

        assert_eq!(value["success"], true);
        assert_eq!(value["summary"]["total_processed"], 2);
        assert_eq!(value["summary"]["successful_count"], 1);
        assert_eq!(value["summary"]["failed_count"], 1);
        assert_eq!(value["summary"]["success_rate"], 50.0);
        assert!(value.get("error").is_none());

        let docs = value["documents"].as_array().unwrap();
        assert_eq!(docs.len(), 2);
        for doc in docs {
            let keys: Vec<&str> = doc.as_object().unwrap().keys().map(String::as_str).collect();
            for key in ["url", "title", "content", "success", "error_message"] {
                assert!(keys.contains(&key), "missing {key}");
            }
        }
    }

    #[tokio::test]
    async fn error_response_serializes_error_field() {
        let value = stub_processor()
            .process_multiple_urls(Vec::<String>::new(), &BatchOptions::default())
            .await
            .to_value();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "URLs list cannot be empty");
        assert_eq!(value["documents"], json!([]));
    }

    #[tokio::test]
    async fn tool_call_with_single_string() {
        let args = json!({ "urls": "https://example.com/x", "max_workers": 2, "timeout": 5 });
        let response = stub_processor()
            .handle_tool_call(&args, &BatchOptions::default())
            .await;
        assert!(response.success);
        assert_eq!(response.summary.total_processed, 1);
    }

    #[tokio::test]
    async fn malformed_tool_call_is_data_not_error() {
        let p = stub_processor();

        let response = p
            .handle_tool_call(&json!({ "links": ["https://example.com"] }), &BatchOptions::default())
            .await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("invalid tool arguments"));

        let response = p
            .handle_tool_call(
                &json!({ "urls": ["https://example.com"], "timeout": -1 }),
                &BatchOptions::default(),
            )
            .await;
        assert!(!response.success);
        assert_eq!(response.summary.failed_count, 1);
        assert!(response.error.unwrap().contains("timeout"));
    }

    #[test]
    fn request_overrides_defaults() {
        let request: ToolRequest =
            serde_json::from_value(json!({ "urls": ["https://a.com"], "timeout": 2.5 })).unwrap();
        let options = request.options(&BatchOptions::default()).unwrap();
        assert_eq!(options.max_workers, 5);
        assert_eq!(options.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn definition_names_the_tool() {
        let def = tool_definition();
        assert_eq!(def["name"], TOOL_NAME);
        assert_eq!(def["parameters"]["required"], json!(["urls"]));
    }

    #[tokio::test]
    async fn end_to_end_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guide"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "<html><head><title>Guide</title></head><body><main><h1>Guide</h1><p>Step one.</p></main></body></html>",
                "text/html",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let converter = HttpConverter::new(&HttpConfig {
            block_private_hosts: false,
            ..HttpConfig::default()
        })
        .unwrap();
        let limiter = Arc::new(SlidingWindowRateLimiter::default());
        let processor = BatchProcessor::new(Fetcher::new(converter, limiter));

        let urls = vec![
            format!("{}/guide", server.uri()),
            format!("{}/gone", server.uri()),
            "nonsense".to_string(),
        ];
        let response = processor
            .process_multiple_urls(urls, &BatchOptions::default())
            .await;

        assert!(response.success);
        assert_eq!(response.summary.total_processed, 2);
        assert_eq!(response.summary.successful_count, 1);

        let guide = response
            .documents
            .iter()
            .find(|d| d.url().ends_with("/guide"))
            .unwrap();
        assert_eq!(guide.title(), "Guide");
        assert!(guide.content().contains("Step one."));

        let gone = response
            .documents
            .iter()
            .find(|d| d.url().ends_with("/gone"))
            .unwrap();
        assert!(gone.error_message().unwrap().contains("404"));
    }
}
