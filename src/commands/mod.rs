//! CLI commands and their dispatch.
//!
//! Every subcommand is a variant of [`Command`]; [`run`] matches it once and
//! calls the handler. Handlers that act on behalf of the current user get it
//! from [`require_user`] first.

mod agg;
mod browse;
mod feeds;
mod users;

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::storage::{Database, DatabaseError, User};

pub use agg::parse_interval;
pub use feeds::validate_feed_url;

/// Posts shown by `browse` when no limit is given
pub const DEFAULT_BROWSE_LIMIT: i64 = 2;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a user and log in as them
    Register { name: String },

    /// Switch the current user
    Login { name: String },

    /// List all users
    Users,

    /// Delete every user, feed, follow and post
    Reset,

    /// Add a feed and follow it
    #[command(name = "addfeed")]
    AddFeed { name: String, url: String },

    /// List all feeds
    Feeds,

    /// Follow an existing feed by URL
    Follow { url: String },

    /// List the feeds the current user follows
    Following,

    /// Stop following a feed
    Unfollow { url: String },

    /// Fetch feeds continuously, one per interval (e.g. `30s`, `1m`, `3m45s`)
    Agg {
        #[arg(default_value = "1m", value_parser = parse_interval)]
        interval: Duration,
    },

    /// Show the newest posts from followed feeds
    Browse {
        #[arg(default_value_t = DEFAULT_BROWSE_LIMIT, value_parser = clap::value_parser!(i64).range(1..))]
        limit: i64,
    },
}

/// Everything a command handler may touch.
pub struct State {
    pub db: Database,
    pub config: Config,
    pub config_path: PathBuf,
}

impl State {
    pub fn new(db: Database, config: Config, config_path: PathBuf) -> Self {
        Self {
            db,
            config,
            config_path,
        }
    }
}

/// Execute one command.
pub async fn run(state: &mut State, command: Command) -> Result<()> {
    tracing::debug!(command = ?command, "Running command");

    match command {
        Command::Register { name } => users::register(state, &name).await,
        Command::Login { name } => users::login(state, &name).await,
        Command::Users => users::list(state).await,
        Command::Reset => users::reset(state).await,
        Command::AddFeed { name, url } => {
            let user = require_user(state).await?;
            feeds::add_feed(state, &user, &name, &url).await
        }
        Command::Feeds => feeds::list(state).await,
        Command::Follow { url } => {
            let user = require_user(state).await?;
            feeds::follow(state, &user, &url).await
        }
        Command::Following => {
            let user = require_user(state).await?;
            feeds::following(state, &user).await
        }
        Command::Unfollow { url } => {
            let user = require_user(state).await?;
            feeds::unfollow(state, &user, &url).await
        }
        Command::Agg { interval } => agg::aggregate(state, interval).await,
        Command::Browse { limit } => {
            let user = require_user(state).await?;
            browse::browse(state, &user, limit).await
        }
    }
}

/// Resolve the logged-in user from the config.
pub async fn require_user(state: &State) -> Result<User> {
    let Some(name) = state.config.current_user_name.as_deref() else {
        anyhow::bail!("Not logged in: run `gator register <name>` or `gator login <name>` first");
    };

    match state.db.get_user(name).await {
        Ok(user) => Ok(user),
        Err(DatabaseError::NotFound) => {
            anyhow::bail!("Current user '{}' does not exist, log in again", name)
        }
        Err(e) => Err(e).context("Failed to load current user"),
    }
}
