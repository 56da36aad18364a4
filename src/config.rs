//! Configuration file parser for ~/.config/smartmarks/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged, since they are usually typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Bounds for `feed_poll_interval_ms`.
const MIN_POLL_INTERVAL_MS: u64 = 50;
const MAX_POLL_INTERVAL_MS: u64 = 60_000;

const KNOWN_KEYS: &[&str] = &[
    "user_id",
    "email",
    "session_token",
    "feed_poll_interval_ms",
    "database_path",
];

/// Top-level application configuration.
///
/// Every key is optional. The Debug impl masks `session_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Owner identifier of the signed-in user. `--user` overrides it.
    pub user_id: Option<String>,

    /// Shown in the header. `--email` overrides it.
    pub email: Option<String>,

    /// Session token. The `SMARTMARKS_SESSION_TOKEN` env var takes precedence.
    pub session_token: Option<String>,

    /// How often the change feed polls the store, in milliseconds.
    pub feed_poll_interval_ms: u64,

    /// Bookmark database location. Defaults to `bookmarks.db` in the config directory.
    pub database_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: None,
            email: None,
            session_token: None,
            feed_poll_interval_ms: 500,
            database_path: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("feed_poll_interval_ms", &self.feed_poll_interval_ms)
            .field("database_path", &self.database_path)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing or blank file → `Ok(Config::default())`
    /// - Invalid TOML or wrong value types → `Err(ConfigError::Parse)`
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
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            poll_ms = config.feed_poll_interval_ms,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Change feed poll interval, clamped to 50ms..=60s.
    pub fn poll_interval(&self) -> Duration {
        let ms = self
            .feed_poll_interval_ms
            .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS);
        if ms != self.feed_poll_interval_ms {
            tracing::warn!(
                configured = self.feed_poll_interval_ms,
                used = ms,
                "feed_poll_interval_ms out of range, clamped"
            );
        }
        Duration::from_millis(ms)
    }

    /// Database file to open: the configured path, or `bookmarks.db` in `config_dir`.
    pub fn database_path(&self, config_dir: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| config_dir.join("bookmarks.db"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Write `content` to a fresh config file under the temp dir.
    fn write_config(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("smartmarks_config_test_{}", name));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.user_id.is_none());
        assert_eq!(config.feed_poll_interval_ms, 500);
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/smartmarks_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.feed_poll_interval_ms, 500);
    }

    #[test]
    fn test_blank_file_returns_default() {
        let (dir, path) = write_config("blank", "   \n  \n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.feed_poll_interval_ms, 500);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let (dir, path) = write_config(
            "full",
            r#"
user_id = "user-42"
email = "me@example.com"
session_token = "tok-123"
feed_poll_interval_ms = 1500
database_path = "/var/tmp/marks.db"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.user_id.as_deref(), Some("user-42"));
        assert_eq!(config.email.as_deref(), Some("me@example.com"));
        assert_eq!(config.session_token.as_deref(), Some("tok-123"));
        assert_eq!(config.poll_interval(), Duration::from_millis(1500));
        assert_eq!(
            config.database_path(Path::new("/unused")),
            PathBuf::from("/var/tmp/marks.db")
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_default_database_path_in_config_dir() {
        let config = Config::default();
        assert_eq!(
            config.database_path(Path::new("/home/u/.config/smartmarks")),
            PathBuf::from("/home/u/.config/smartmarks/bookmarks.db")
        );
    }

    #[test]
    fn test_poll_interval_clamped() {
        let mut config = Config::default();
        config.feed_poll_interval_ms = 1;
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        config.feed_poll_interval_ms = 10_000_000;
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        // Delete confirmation is not configurable; an old key is ignored
        let (dir, path) = write_config(
            "unknown",
            "confirm_delete = false\ntheme = \"dark\"\nfeed_poll_interval_ms = 800\n",
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(800));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let (dir, path) = write_config("wrongtype", "feed_poll_interval_ms = \"fast\"\n");
        assert!(Config::load(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_debug_masks_session_token() {
        let config = Config {
            session_token: Some("super-secret-token".to_string()),
            ..Config::default()
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-token"));
        assert!(debug_output.contains("[REDACTED]"));

        let debug_default = format!("{:?}", Config::default());
        assert!(!debug_default.contains("[REDACTED]"));
    }
}
