use chrono::DateTime;
use thiserror::Error;

use crate::feed::parser::{ParsedFeed, ParsedItem};
use crate::storage::{Database, DatabaseError, Feed, NewPost};

/// `<pubDate>` layout after its `Mon, ` prefix: RFC 1123 with a numeric zone,
/// e.g. `Mon, 02 Jan 2006 15:04:05 -0700`
pub const PUB_DATE_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// A store failure that stopped ingestion part-way through a feed.
///
/// Posts stored before the failure stay committed; `inserted` counts them.
#[derive(Debug, Error)]
#[error("Failed to store post {url} after inserting {inserted} new posts: {source}")]
pub struct IngestError {
    pub inserted: usize,
    pub url: String,
    #[source]
    pub source: DatabaseError,
}

/// Parse a raw `<pubDate>` into Unix epoch milliseconds.
///
/// The day name must be one of `Mon`..`Sun` but need not agree with the
/// date. Anything else not matching [`PUB_DATE_FORMAT`] yields `None`;
/// malformed dates are common and never block a post.
pub fn parse_published_at(raw: &str) -> Option<i64> {
    let (day, rest) = raw.trim().split_once(", ")?;
    if !WEEKDAYS.iter().any(|name| name.eq_ignore_ascii_case(day)) {
        return None;
    }
    DateTime::parse_from_str(rest, PUB_DATE_FORMAT)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Normalize one item. Returns `None` for items without a link, which
/// cannot be keyed.
fn to_new_post(item: &ParsedItem, feed_id: i64) -> Option<NewPost> {
    let url = item.link.trim();
    if url.is_empty() {
        return None;
    }

    let title = match item.title.trim() {
        "" => "Untitled".to_string(),
        t => t.to_string(),
    };
    let description = match item.description.trim() {
        "" => None,
        d => Some(d.to_string()),
    };

    Some(NewPost {
        title,
        url: url.to_string(),
        description,
        published_at: parse_published_at(&item.pub_date),
        feed_id,
    })
}

/// Store the items of `parsed` as posts of `feed`, in source order.
///
/// A post whose URL is already stored is skipped silently, so re-ingesting
/// an unchanged feed inserts nothing. Any other store error stops the run.
///
/// # Returns
///
/// The number of newly inserted posts.
pub async fn ingest(db: &Database, feed: &Feed, parsed: &ParsedFeed) -> Result<usize, IngestError> {
    let mut inserted = 0;
    let mut duplicates = 0;
    let mut skipped = 0;

    for item in &parsed.items {
        let Some(post) = to_new_post(item, feed.id) else {
            skipped += 1;
            continue;
        };

        match db.create_post(&post).await {
            Ok(_) => inserted += 1,
            Err(e) if e.is_unique_violation() => duplicates += 1,
            Err(source) => {
                return Err(IngestError {
                    inserted,
                    url: post.url,
                    source,
                })
            }
        }
    }

    if skipped > 0 {
        tracing::warn!(
            feed = %feed.url,
            skipped = skipped,
            "Items without a link skipped"
        );
    }
    tracing::debug!(
        feed = %feed.url,
        inserted = inserted,
        duplicates = duplicates,
        "Ingested feed items"
    );

    Ok(inserted)
}
