use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use super::State;
use crate::storage::{Post, User};

pub(super) async fn browse(state: &State, user: &User, limit: i64) -> Result<()> {
    let posts = state
        .db
        .get_posts_for_user(user.id, limit)
        .await
        .context("Failed to load posts")?;

    if posts.is_empty() {
        println!("No posts yet, follow a feed and run `gator agg`");
        return Ok(());
    }

    println!("Found {} posts for '{}':", posts.len(), user.name);
    for post in &posts {
        println!();
        print!("{}", render_post(post));
    }
    Ok(())
}

fn render_post(post: &Post) -> String {
    let date = post
        .published_at
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.format("%a %b %d %Y").to_string())
        .unwrap_or_else(|| "unknown date".to_string());

    let mut out = format!("{} | {}\n--- {} ---\n", date, post.url, post.title);
    if let Some(description) = &post.description {
        out.push_str("    ");
        out.push_str(description);
        out.push('\n');
    }
    out.push_str("=====================================\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn post(published_at: Option<i64>, description: Option<&str>) -> Post {
        Post {
            id: 1,
            created_at: 0,
            updated_at: 0,
            title: "Hello".to_string(),
            url: "https://example.com/hello".to_string(),
            description: description.map(str::to_string),
            published_at,
            feed_id: 1,
        }
    }

    #[test]
    fn test_render_post_with_date_and_description() {
        let rendered = render_post(&post(Some(1_136_239_445_000), Some("Body")));
        assert_eq!(
            rendered,
            "Mon Jan 02 2006 | https://example.com/hello\n--- Hello ---\n    Body\n=====================================\n"
        );
    }

    #[test]
    fn test_render_post_without_date() {
        let rendered = render_post(&post(None, None));
        assert!(rendered.starts_with("unknown date | "));
        assert!(!rendered.contains("    "));
    }
}
