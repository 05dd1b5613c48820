use anyhow::{Context, Result};

use super::State;
use crate::storage::DatabaseError;

pub(super) async fn register(state: &mut State, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("User name must not be empty");
    }

    let user = match state.db.create_user(name).await {
        Ok(user) => user,
        Err(DatabaseError::UniqueViolation(_)) => anyhow::bail!("User '{}' already exists", name),
        Err(e) => return Err(e).context("Failed to create user"),
    };

    state
        .config
        .set_user(&user.name, &state.config_path)
        .context("Failed to save config")?;

    tracing::info!(user = %user.name, id = user.id, "Registered user");
    println!("User '{}' created and logged in", user.name);
    Ok(())
}

pub(super) async fn login(state: &mut State, name: &str) -> Result<()> {
    let user = match state.db.get_user(name).await {
        Ok(user) => user,
        Err(DatabaseError::NotFound) => anyhow::bail!("User '{}' does not exist", name),
        Err(e) => return Err(e).context("Failed to look up user"),
    };

    state
        .config
        .set_user(&user.name, &state.config_path)
        .context("Failed to save config")?;

    println!("Logged in as '{}'", user.name);
    Ok(())
}

pub(super) async fn list(state: &State) -> Result<()> {
    let users = state.db.get_users().await.context("Failed to list users")?;
    let current = state.config.current_user_name.as_deref();

    for user in &users {
        if Some(user.name.as_str()) == current {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }
    Ok(())
}

pub(super) async fn reset(state: &State) -> Result<()> {
    let removed = state.db.reset().await.context("Failed to reset database")?;
    tracing::info!(users = removed, "Database reset");
    println!("Database reset: {} users removed", removed);
    Ok(())
}
