//! Feed retrieval and ingestion.
//!
//! - [`parser`] - Streaming RSS parser and HTML entity unescaping
//! - [`fetcher`] - Single-shot HTTP fetch of a feed URL
//! - [`ingest`] - Turning parsed items into stored posts
//!
//! # Example
//!
//! ```ignore
//! use gator::feed::{build_client, fetch_feed, ingest};
//!
//! let client = build_client()?;
//! let parsed = fetch_feed(&client, &feed.url).await?;
//! let inserted = ingest(&db, &feed, &parsed).await?;
//! ```

mod fetcher;
mod ingest;
mod parser;

pub use fetcher::{build_client, fetch_feed, FetchError, USER_AGENT};
pub use ingest::{ingest, parse_published_at, IngestError, PUB_DATE_FORMAT};
pub use parser::{parse_feed, unescape_html, ParseError, ParsedFeed, ParsedItem};
