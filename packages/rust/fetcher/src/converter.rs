//! The conversion collaborator: given a URL, produce a title and a text body.
//!
//! [`Converter`] is the seam the fetcher is generic over; [`HttpConverter`]
//! is the production implementation (HTTP GET + content-type dispatch).

use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};
use url::Url;

use docfetch_markdown::ConvertOptions;
use docfetch_shared::{AppConfig, ConvertedPage, DocFetchError, HttpConfig, Result};

/// Turns the resource behind a URL into a title + text body.
pub trait Converter: Send + Sync + 'static {
    fn convert(&self, url: &str) -> impl Future<Output = Result<ConvertedPage>> + Send;
}

// ---------------------------------------------------------------------------
// HttpConverter
// ---------------------------------------------------------------------------

/// Fetches over HTTP(S) and converts the body by content type.
///
/// HTML goes through the Markdown converter, `text/*` is passed through,
/// JSON is pretty-printed into a fenced block. Anything else is rejected.
pub struct HttpConverter {
    client: Client,
    block_private_hosts: bool,
    frontmatter: bool,
}

impl HttpConverter {
    /// Create a converter with the given HTTP settings.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DocFetchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            block_private_hosts: config.block_private_hosts,
            frontmatter: false,
        })
    }

    /// Create a converter from the full application config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(&config.http)?.with_frontmatter(config.markdown.frontmatter))
    }

    /// Prepend YAML frontmatter to converted Markdown.
    pub fn with_frontmatter(mut self, frontmatter: bool) -> Self {
        self.frontmatter = frontmatter;
        self
    }

    async fn fetch_and_convert(&self, url: &str) -> Result<ConvertedPage> {
        let parsed = Url::parse(url).map_err(|e| DocFetchError::Network(format!("{url}: {e}")))?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(DocFetchError::UnsupportedContent {
                    url: url.to_string(),
                    content_type: format!("{other}: scheme"),
                });
            }
        }

        if self.block_private_hosts && is_private_target(&parsed) {
            return Err(DocFetchError::Blocked(format!(
                "{url}: loopback or private network address"
            )));
        }

        let response = self
            .client
            .get(parsed.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DocFetchError::Network(format!("{url}: request timed out"))
                } else {
                    DocFetchError::Network(format!("{url}: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocFetchError::Network(format!("{url}: HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
            .unwrap_or_else(|| "text/html".to_string());

        let kind = BodyKind::from_content_type(&content_type).ok_or_else(|| {
            DocFetchError::UnsupportedContent {
                url: url.to_string(),
                content_type: content_type.clone(),
            }
        })?;

        let body = response
            .text()
            .await
            .map_err(|e| DocFetchError::Network(format!("{url}: body read failed: {e}")))?;

        debug!(%content_type, body_len = body.len(), "response received");

        let opts = ConvertOptions {
            source_url: url.to_string(),
            title: None,
            fetched_at: Some(Utc::now().to_rfc3339()),
            frontmatter: self.frontmatter,
        };

        let converted = match kind {
            BodyKind::Html => docfetch_markdown::convert(&body, &opts)?,
            BodyKind::Text => docfetch_markdown::normalize_text(&body, &opts),
            BodyKind::Json => {
                let value: serde_json::Value = serde_json::from_str(&body)
                    .map_err(|e| DocFetchError::Conversion(format!("{url}: invalid JSON: {e}")))?;
                let pretty = serde_json::to_string_pretty(&value)
                    .map_err(|e| DocFetchError::Conversion(e.to_string()))?;
                docfetch_markdown::normalize_text(&format!("```json\n{pretty}\n```"), &opts)
            }
        };

        Ok(ConvertedPage {
            title: converted.title,
            text_content: converted.markdown,
        })
    }
}

impl Converter for HttpConverter {
    #[instrument(skip(self))]
    async fn convert(&self, url: &str) -> Result<ConvertedPage> {
        self.fetch_and_convert(url).await
    }
}

/// How a response body is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Html,
    Text,
    Json,
}

impl BodyKind {
    fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "text/html" | "application/xhtml+xml" => Some(Self::Html),
            "application/json" => Some(Self::Json),
            ct if ct.ends_with("+json") => Some(Self::Json),
            ct if ct.starts_with("text/") => Some(Self::Text),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Whether the URL points at a loopback, private or otherwise local host.
fn is_private_target(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost"
                || host.ends_with(".localhost")
                || host.ends_with(".local")
                || host.ends_with(".internal")
        }
        None => true,
    }
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local, fe80::/10 link local
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(&IpAddr::V4(v4)))
        }
    }
}
