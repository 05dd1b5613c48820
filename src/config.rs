//! Configuration file for ~/.config/gator/config.toml.
//!
//! Holds the store location and the active user. A missing file is created
//! with defaults on first load; `register` and `login` rewrite it.
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to encode config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("HOME environment variable not set")]
    NoHome,
}

// ============================================================================
// Configuration
// ============================================================================

/// Persistent CLI configuration.
///
/// Missing keys fall back to defaults; an empty `db_path` resolves to
/// `gator.db` next to the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file
    pub db_path: PathBuf,

    /// User set by the last `register` or `login`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_user_name: Option<String>,
}

/// The config directory path (~/.config/gator/)
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    let home = std::env::var_os("HOME").ok_or(ConfigError::NoHome)?;
    Ok(PathBuf::from(home).join(".config").join("gator"))
}

/// The config file path (~/.config/gator/config.toml)
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(default_config_dir()?.join("config.toml"))
}

impl Config {
    const MAX_FILE_SIZE: u64 = 1_048_576;
    const KNOWN_KEYS: [&'static str; 2] = ["db_path", "current_user_name"];

    fn defaults_for(path: &Path) -> Self {
        Self {
            db_path: default_db_path(path),
            current_user_name: None,
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → defaults, written to `path`
    /// - Empty file → defaults
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::defaults_for(path);
                config.save(path)?;
                tracing::info!(path = %path.display(), "Created default config file");
                return Ok(config);
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::defaults_for(path));
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let mut config: Config = toml::from_str(&content)?;
        if config.db_path.as_os_str().is_empty() {
            config.db_path = default_db_path(path);
        }
        tracing::debug!(
            path = %path.display(),
            db_path = %config.db_path.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Write the config using write-to-temp-then-rename, so a crash never
    /// leaves a half-written file behind.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        let temp_path = path.with_extension("toml.tmp");

        let mut temp_file = std::fs::File::create(&temp_path)?;
        if let Err(e) = temp_file
            .write_all(content.as_bytes())
            .and_then(|_| temp_file.sync_all())
        {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }
        drop(temp_file);

        if let Err(e) = std::fs::rename(&temp_path, path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    /// Make `name` the active user and persist the change.
    pub fn set_user(&mut self, name: &str, path: &Path) -> Result<(), ConfigError> {
        self.current_user_name = Some(name.to_string());
        self.save(path)
    }
}

fn default_db_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|dir| dir.join("gator.db"))
        .unwrap_or_else(|| PathBuf::from("gator.db"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gator_config_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_file_creates_defaults() {
        let dir = test_dir("missing");
        let path = dir.join("config.toml");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.db_path, dir.join("gator.db"));
        assert_eq!(config.current_user_name, None);
        assert!(path.exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = test_dir("empty");
        let path = dir.join("config.toml");
        std::fs::write(&path, "").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.db_path, dir.join("gator.db"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let dir = test_dir("full");
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "db_path = \"/var/lib/gator/feeds.db\"\ncurrent_user_name = \"alice\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/gator/feeds.db"));
        assert_eq!(config.current_user_name.as_deref(), Some("alice"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = test_dir("invalid");
        let path = dir.join("config.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let dir = test_dir("unknown");
        let path = dir.join("config.toml");
        std::fs::write(&path, "current_user_name = \"bob\"\ntheme = \"dark\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.current_user_name.as_deref(), Some("bob"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_rejected() {
        let dir = test_dir("large");
        let path = dir.join("config.toml");
        std::fs::write(&path, vec![b'#'; Config::MAX_FILE_SIZE as usize + 1]).unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::TooLarge(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_set_user_persists() {
        let dir = test_dir("set_user");
        let path = dir.join("config.toml");

        let mut config = Config::load(&path).unwrap();
        config.set_user("carol", &path).unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded, config);
        assert_eq!(reloaded.current_user_name.as_deref(), Some("carol"));
        assert!(!path.with_extension("toml.tmp").exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
