use sqlx::SqliteConnection;

use super::schema::{now_millis, Database};
use super::types::{DatabaseError, FeedFollow};

impl Database {
    // ========================================================================
    // Feed Follow Operations
    // ========================================================================

    /// Subscribe `user_id` to `feed_id`.
    ///
    /// Returns `DatabaseError::UniqueViolation` if the user already follows it.
    pub async fn create_feed_follow(
        &self,
        user_id: i64,
        feed_id: i64,
    ) -> Result<FeedFollow, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let follow = insert_follow(&mut tx, user_id, feed_id).await?;
        tx.commit().await?;
        Ok(follow)
    }

    /// Every follow of `user_id`, ordered by feed name
    pub async fn get_feed_follows_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<FeedFollow>, DatabaseError> {
        let follows = sqlx::query_as::<_, FeedFollow>(
            r#"
                SELECT ff.id, ff.created_at, ff.updated_at, ff.user_id, ff.feed_id,
                       u.name AS user_name, f.name AS feed_name
                FROM feed_follows ff
                JOIN users u ON u.id = ff.user_id
                JOIN feeds f ON f.id = ff.feed_id
                WHERE ff.user_id = ?
                ORDER BY f.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(follows)
    }

    /// Remove a follow. Returns `false` if the user was not following the feed.
    pub async fn delete_feed_follow(&self, user_id: i64, feed_id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = ? AND feed_id = ?")
            .bind(user_id)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Insert a follow inside `conn` and read it back with both names joined.
pub(super) async fn insert_follow(
    conn: &mut SqliteConnection,
    user_id: i64,
    feed_id: i64,
) -> Result<FeedFollow, DatabaseError> {
    let now = now_millis();
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO feed_follows (created_at, updated_at, user_id, feed_id) VALUES (?, ?, ?, ?)
         RETURNING id",
    )
    .bind(now)
    .bind(now)
    .bind(user_id)
    .bind(feed_id)
    .fetch_one(&mut *conn)
    .await?;

    let follow = sqlx::query_as::<_, FeedFollow>(
        r#"
            SELECT ff.id, ff.created_at, ff.updated_at, ff.user_id, ff.feed_id,
                   u.name AS user_name, f.name AS feed_name
            FROM feed_follows ff
            JOIN users u ON u.id = ff.user_id
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.id = ?
        "#,
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(follow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_follow_lifecycle() {
        let db = Database::open(":memory:").await.unwrap();
        let alice = db.create_user("alice").await.unwrap();
        let bob = db.create_user("bob").await.unwrap();
        let feed = db
            .create_feed("Example", "https://example.com/rss", alice.id)
            .await
            .unwrap();

        let follow = db.create_feed_follow(bob.id, feed.id).await.unwrap();
        assert_eq!(follow.user_name, "bob");
        assert_eq!(follow.feed_name, "Example");

        let err = db.create_feed_follow(bob.id, feed.id).await.unwrap_err();
        assert!(err.is_unique_violation());

        assert_eq!(db.get_feed_follows_for_user(bob.id).await.unwrap().len(), 1);
        assert!(db.get_feed_follows_for_user(alice.id).await.unwrap().is_empty());

        assert!(db.delete_feed_follow(bob.id, feed.id).await.unwrap());
        assert!(!db.delete_feed_follow(bob.id, feed.id).await.unwrap());
        assert!(db.get_feed_follows_for_user(bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_follow_unknown_feed_fails() {
        let db = Database::open(":memory:").await.unwrap();
        let alice = db.create_user("alice").await.unwrap();

        let err = db.create_feed_follow(alice.id, 999).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Other(_)), "got {:?}", err);
    }
}
