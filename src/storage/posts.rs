use super::schema::{now_millis, Database};
use super::types::{DatabaseError, NewPost, Post};

/// Maximum number of posts returned by a single browse query
const MAX_POSTS: i64 = 500;

const POST_COLUMNS: &str =
    "id, created_at, updated_at, title, url, description, published_at, feed_id";

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Insert a single post.
    ///
    /// Returns `DatabaseError::UniqueViolation` when a post with the same URL
    /// already exists; callers aggregating feeds treat that as "already seen".
    pub async fn create_post(&self, post: &NewPost) -> Result<Post, DatabaseError> {
        let now = now_millis();
        let post = sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (created_at, updated_at, title, url, description, published_at, feed_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING {POST_COLUMNS}"
        ))
        .bind(now)
        .bind(now)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(post.published_at)
        .bind(post.feed_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    /// Newest posts from the feeds `user_id` follows.
    ///
    /// Posts without a publish date sort after dated ones, newest insert first.
    /// `limit` is clamped to [`MAX_POSTS`].
    pub async fn get_posts_for_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<Post>, DatabaseError> {
        let limit = limit.clamp(0, MAX_POSTS);
        let posts = sqlx::query_as::<_, Post>(
            r#"
                SELECT p.id, p.created_at, p.updated_at, p.title, p.url, p.description,
                       p.published_at, p.feed_id
                FROM posts p
                JOIN feed_follows ff ON ff.feed_id = p.feed_id
                WHERE ff.user_id = ?
                ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC, p.id DESC
                LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    /// Every post of a feed in insertion order
    pub async fn get_posts_for_feed(&self, feed_id: i64) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE feed_id = ? ORDER BY id"
        ))
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }
}
