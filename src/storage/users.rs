use super::schema::{now_millis, Database};
use super::types::{DatabaseError, User};

impl Database {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Register a new user.
    ///
    /// Returns `DatabaseError::UniqueViolation` if the name is taken.
    pub async fn create_user(&self, name: &str) -> Result<User, DatabaseError> {
        let now = now_millis();
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (created_at, updated_at, name) VALUES (?, ?, ?)
             RETURNING id, created_at, updated_at, name",
        )
        .bind(now)
        .bind(now)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// Look up a user by name, `DatabaseError::NotFound` if absent.
    pub async fn get_user(&self, name: &str) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, created_at, updated_at, name FROM users WHERE name = ?",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// All users ordered by name
    pub async fn get_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, created_at, updated_at, name FROM users ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Delete every user. Feeds, follows and posts go with them via
    /// `ON DELETE CASCADE`. Returns the number of users removed.
    pub async fn reset(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = test_db().await;

        let created = db.create_user("alice").await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.name, "alice");

        let fetched = db.get_user("alice").await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_duplicate_user_is_unique_violation() {
        let db = test_db().await;
        db.create_user("alice").await.unwrap();

        let err = db.create_user("alice").await.unwrap_err();
        assert!(err.is_unique_violation(), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let db = test_db().await;
        assert!(matches!(
            db.get_user("nobody").await,
            Err(DatabaseError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_get_users_sorted() {
        let db = test_db().await;
        db.create_user("carol").await.unwrap();
        db.create_user("alice").await.unwrap();

        let names: Vec<_> = db
            .get_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["alice", "carol"]);
    }

    #[tokio::test]
    async fn test_reset_removes_users() {
        let db = test_db().await;
        db.create_user("alice").await.unwrap();
        db.create_user("bob").await.unwrap();

        assert_eq!(db.reset().await.unwrap(), 2);
        assert!(db.get_users().await.unwrap().is_empty());
    }
}
