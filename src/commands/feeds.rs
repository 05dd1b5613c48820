use anyhow::{Context, Result};
use url::Url;

use super::State;
use crate::storage::{DatabaseError, Feed, User};

/// Parse a feed URL, accepting only `http` and `https`.
pub fn validate_feed_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid feed URL '{}'", raw))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => anyhow::bail!("Unsupported scheme '{}' (only http/https allowed)", scheme),
    }
    if url.host_str().is_none() {
        anyhow::bail!("Feed URL '{}' has no host", raw);
    }
    Ok(url)
}

async fn feed_by_url(state: &State, url: &str) -> Result<Feed> {
    match state.db.get_feed_by_url(url).await {
        Ok(feed) => Ok(feed),
        Err(DatabaseError::NotFound) => {
            anyhow::bail!("No feed with URL '{}', add it with `gator addfeed`", url)
        }
        Err(e) => Err(e).context("Failed to look up feed"),
    }
}

pub(super) async fn add_feed(state: &State, user: &User, name: &str, url: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Feed name must not be empty");
    }
    validate_feed_url(url)?;
    let url = url.trim();

    let (feed, _) = match state.db.create_feed_and_follow(name, url, user.id).await {
        Ok(created) => created,
        Err(DatabaseError::UniqueViolation(_)) => {
            anyhow::bail!("Feed '{}' is already registered, follow it instead", url)
        }
        Err(e) => return Err(e).context("Failed to add feed"),
    };

    tracing::info!(feed = %feed.name, url = %feed.url, user = %user.name, "Added feed");
    println!("Feed added:");
    println!("  ID:   {}", feed.id);
    println!("  Name: {}", feed.name);
    println!("  URL:  {}", feed.url);
    Ok(())
}

pub(super) async fn list(state: &State) -> Result<()> {
    let feeds = state.db.get_feeds().await.context("Failed to list feeds")?;
    if feeds.is_empty() {
        println!("No feeds yet");
        return Ok(());
    }

    for feed in &feeds {
        println!("* {} ({}) added by {}", feed.name, feed.url, feed.user_name);
    }
    Ok(())
}

pub(super) async fn follow(state: &State, user: &User, url: &str) -> Result<()> {
    let feed = feed_by_url(state, url.trim()).await?;

    let follow = match state.db.create_feed_follow(user.id, feed.id).await {
        Ok(follow) => follow,
        Err(DatabaseError::UniqueViolation(_)) => {
            anyhow::bail!("'{}' already follows '{}'", user.name, feed.name)
        }
        Err(e) => return Err(e).context("Failed to follow feed"),
    };

    println!("'{}' now follows '{}'", follow.user_name, follow.feed_name);
    Ok(())
}

pub(super) async fn following(state: &State, user: &User) -> Result<()> {
    let follows = state
        .db
        .get_feed_follows_for_user(user.id)
        .await
        .context("Failed to list followed feeds")?;

    if follows.is_empty() {
        println!("'{}' follows no feeds", user.name);
        return Ok(());
    }

    for follow in &follows {
        println!("* {}", follow.feed_name);
    }
    Ok(())
}

pub(super) async fn unfollow(state: &State, user: &User, url: &str) -> Result<()> {
    let feed = feed_by_url(state, url.trim()).await?;

    let removed = state
        .db
        .delete_feed_follow(user.id, feed.id)
        .await
        .context("Failed to unfollow feed")?;
    if !removed {
        anyhow::bail!("'{}' does not follow '{}'", user.name, feed.name);
    }

    println!("'{}' unfollowed '{}'", user.name, feed.name);
    Ok(())
}
