use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock
    #[error("The database is locked by another gator process. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// The requested record does not exist
    #[error("Record not found")]
    NotFound,

    /// An insert collided with a UNIQUE constraint
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(sqlx::Error),
}

impl DatabaseError {
    /// Convert a sqlx error, mapping lock and open failures to `InstanceLocked`.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        // SQLITE_CANTOPEN (14): unable to open database file
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::from(err)
    }

    /// True when the error is a uniqueness collision (already-known record).
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DatabaseError::UniqueViolation(_))
    }
}

/// Classifies driver errors by their structured kind, never by message text.
impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DatabaseError::UniqueViolation(db_err.message().to_string())
            }
            other => DatabaseError::Other(other),
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================
//
// All timestamps are Unix epoch milliseconds.

/// Registered user
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub name: String,
}

/// Subscribed RSS source, owned by the user who added it
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub name: String,
    pub url: String,
    pub user_id: i64,
    /// Set by the aggregator when it claims the feed; `None` until the first attempt
    pub last_fetched_at: Option<i64>,
}

/// Feed listing row joined with the owner's name (`feeds` command)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedWithOwner {
    pub name: String,
    pub url: String,
    pub user_name: String,
}

/// A user's subscription to a feed, with both names resolved for display
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedFollow {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub user_id: i64,
    pub feed_id: i64,
    pub user_name: String,
    pub feed_name: String,
}

/// One ingested item from a feed
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
    pub feed_id: i64,
}

/// Insert parameters for [`Post`]
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
    pub feed_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sqlx_maps_lock_messages_to_instance_locked() {
        let err = DatabaseError::from_sqlx(sqlx::Error::Protocol("database is locked".into()));
        assert!(matches!(err, DatabaseError::InstanceLocked));
    }

    #[test]
    fn test_from_sqlx_keeps_other_kinds() {
        assert!(matches!(
            DatabaseError::from_sqlx(sqlx::Error::RowNotFound),
            DatabaseError::NotFound
        ));
        assert!(matches!(
            DatabaseError::from_sqlx(sqlx::Error::PoolTimedOut),
            DatabaseError::Other(_)
        ));
    }
}
