use crate::feed::parser::{parse_feed, ParsedFeed};
use futures::stream::StreamExt;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

/// User agent sent with every feed request
pub const USER_AGENT: &str = "gator";
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching a feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, interrupted body)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response outside the 2xx range
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Body is not well-formed RSS
    #[error("Decode error: {0}")]
    Decode(String),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

/// Build the HTTP client shared by every fetch.
///
/// No request timeout is configured: the aggregator decides how long a tick
/// may take.
pub fn build_client() -> Result<reqwest::Client, FetchError> {
    let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
    Ok(client)
}

/// Fetch and parse one RSS feed.
///
/// Issues a single GET (no retries; retrying is the scheduler's business),
/// parses the body and HTML-unescapes channel and item text.
///
/// # Errors
///
/// - [`FetchError::Network`] - Connection, TLS or body read failure
/// - [`FetchError::HttpStatus`] - Status code outside 200-299
/// - [`FetchError::ResponseTooLarge`] - Body exceeded 10MB
/// - [`FetchError::Decode`] - Not well-formed XML, or no `<channel>`
pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<ParsedFeed, FetchError> {
    let response = client
        .get(url)
        .header(CONTENT_TYPE, "application/xml")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;

    let mut feed = parse_feed(&bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
    feed.unescape_html();

    tracing::debug!(
        url = %url,
        items = feed.items.len(),
        bytes = bytes.len(),
        "Fetched feed"
    );
    Ok(feed)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
