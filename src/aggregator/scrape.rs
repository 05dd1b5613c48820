use thiserror::Error;

use crate::feed::{fetch_feed, ingest, FetchError, IngestError};
use crate::storage::{Database, DatabaseError};

/// Why a single aggregation tick failed.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The store holds no feeds at all
    #[error("Nothing to aggregate: the database has no feeds")]
    NoFeeds,
    /// Selecting or claiming the next feed failed
    #[error("Failed to claim the next feed: {0}")]
    Store(#[source] DatabaseError),
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

/// Outcome of a successful tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub feed_id: i64,
    pub feed_name: String,
    /// Items in the fetched document
    pub items: usize,
    /// Posts that were not already stored
    pub inserted: usize,
}

/// Run one aggregation step against the least recently fetched feed.
///
/// The feed is claimed (its `last_fetched_at` stamped) before the network
/// call, so a feed that keeps failing still rotates to the back of the queue.
pub async fn scrape_next_feed(
    db: &Database,
    client: &reqwest::Client,
) -> Result<TickReport, AggregateError> {
    let feed = match db.get_next_feed_to_fetch().await {
        Ok(feed) => feed,
        Err(DatabaseError::NotFound) => return Err(AggregateError::NoFeeds),
        Err(e) => return Err(AggregateError::Store(e)),
    };

    let now = chrono::Utc::now().timestamp_millis();
    let feed = db
        .mark_feed_fetched(feed.id, now)
        .await
        .map_err(AggregateError::Store)?;

    let parsed = fetch_feed(client, &feed.url)
        .await
        .map_err(|source| AggregateError::Fetch {
            url: feed.url.clone(),
            source,
        })?;

    let inserted = ingest(db, &feed, &parsed).await?;

    tracing::info!(
        feed = %feed.name,
        url = %feed.url,
        items = parsed.items.len(),
        inserted = inserted,
        "Aggregated feed"
    );

    Ok(TickReport {
        feed_id: feed.id,
        feed_name: feed.name,
        items: parsed.items.len(),
        inserted,
    })
}
