//! Syntactic URL validation.
//!
//! A URL is accepted when it parses as an absolute URL with both a scheme and
//! a non-empty host. Nothing here touches the network.

use tracing::debug;
use url::Url;

use docfetch_shared::Partition;

/// Whether `url` has a scheme and a network location.
///
/// Unparseable input is simply invalid.
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => !parsed.scheme().is_empty() && parsed.host_str().is_some_and(|h| !h.is_empty()),
        Err(e) => {
            debug!(url, error = %e, "url failed to parse");
            false
        }
    }
}

/// Split `urls` into valid and invalid entries, preserving input order.
pub fn partition_urls<I, S>(urls: I) -> Partition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut partition = Partition::default();
    for url in urls {
        let url = url.into();
        if is_valid_url(&url) {
            partition.valid.push(url);
        } else {
            partition.invalid.push(url);
        }
    }
    partition
}
