use super::follows::insert_follow;
use super::schema::{now_millis, Database};
use super::types::{DatabaseError, Feed, FeedFollow, FeedWithOwner};

const FEED_COLUMNS: &str = "id, created_at, updated_at, name, url, user_id, last_fetched_at";

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Insert a feed owned by `user_id`.
    ///
    /// Returns `DatabaseError::UniqueViolation` if the URL is already registered.
    pub async fn create_feed(
        &self,
        name: &str,
        url: &str,
        user_id: i64,
    ) -> Result<Feed, DatabaseError> {
        let now = now_millis();
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "INSERT INTO feeds (created_at, updated_at, name, url, user_id) VALUES (?, ?, ?, ?, ?)
             RETURNING {FEED_COLUMNS}"
        ))
        .bind(now)
        .bind(now)
        .bind(name)
        .bind(url)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(feed)
    }

    /// Insert a feed owned by `user_id` and subscribe the owner to it.
    ///
    /// Both rows commit together; if either insert fails neither is kept.
    pub async fn create_feed_and_follow(
        &self,
        name: &str,
        url: &str,
        user_id: i64,
    ) -> Result<(Feed, FeedFollow), DatabaseError> {
        let now = now_millis();
        let mut tx = self.pool.begin().await?;

        let feed = sqlx::query_as::<_, Feed>(&format!(
            "INSERT INTO feeds (created_at, updated_at, name, url, user_id) VALUES (?, ?, ?, ?, ?)
             RETURNING {FEED_COLUMNS}"
        ))
        .bind(now)
        .bind(now)
        .bind(name)
        .bind(url)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let follow = insert_follow(&mut tx, user_id, feed.id).await?;

        tx.commit().await?;
        Ok((feed, follow))
    }

    /// All feeds with the name of the user who added them
    pub async fn get_feeds(&self) -> Result<Vec<FeedWithOwner>, DatabaseError> {
        let feeds = sqlx::query_as::<_, FeedWithOwner>(
            r#"
                SELECT f.name, f.url, u.name AS user_name
                FROM feeds f
                JOIN users u ON u.id = f.user_id
                ORDER BY f.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(feeds)
    }

    pub async fn get_feed_by_url(&self, url: &str) -> Result<Feed, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?"
        ))
        .bind(url)
        .fetch_one(&self.pool)
        .await?;
        Ok(feed)
    }

    // ========================================================================
    // Aggregation Operations
    // ========================================================================

    /// The feed fetched longest ago. Never-fetched feeds sort first; ties
    /// fall back to insertion order.
    ///
    /// Returns `DatabaseError::NotFound` when the store has no feeds.
    pub async fn get_next_feed_to_fetch(&self) -> Result<Feed, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds
             ORDER BY last_fetched_at ASC NULLS FIRST, id ASC
             LIMIT 1"
        ))
        .fetch_one(&self.pool)
        .await?;
        Ok(feed)
    }

    /// Claim a feed by stamping `last_fetched_at`.
    ///
    /// The stored stamp never moves backwards: an older `fetched_at` than the
    /// current value leaves `last_fetched_at` unchanged.
    pub async fn mark_feed_fetched(
        &self,
        feed_id: i64,
        fetched_at: i64,
    ) -> Result<Feed, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "UPDATE feeds
             SET last_fetched_at = MAX(COALESCE(last_fetched_at, ?1), ?1),
                 updated_at = ?1
             WHERE id = ?2
             RETURNING {FEED_COLUMNS}"
        ))
        .bind(fetched_at)
        .bind(feed_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(feed)
    }
}
