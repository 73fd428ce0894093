//! Bridge configuration.
//!
//! A static board list loaded from JSON at startup.
//!
//! # Example
//!
//! ```json
//! {
//!   "path_prefix": "electrical.yarrboard",
//!   "boards": [
//!     { "host": "yarrboard.local" },
//!     { "host": "10.0.0.7", "require_login": true, "password": "hunter2", "use_ssl": true }
//!   ]
//! }
//! ```
//!
//! ```ignore
//! use yarrboard_bridge::{BoardConfig, BridgeConfig};
//!
//! let config = BridgeConfig::new()
//!     .with_board(BoardConfig::new("yarrboard.local").with_update_interval(500));
//! config.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;
use std::time::Duration;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Deserializer};
use url::Url;

use crate::error::{Error, Result};
use crate::translate::DEFAULT_PATH_PREFIX;

// ============================================================================
// Defaults
// ============================================================================

fn default_path_prefix() -> String {
    DEFAULT_PATH_PREFIX.to_string()
}

fn default_credential() -> String {
    "admin".to_string()
}

const fn default_ping_interval_ms() -> u64 {
    1000
}

const fn default_config_grace_ms() -> u64 {
    50
}

const fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

// ============================================================================
// BridgeConfig
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BridgeConfig {
    /// Prefix of every board root path.
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,

    /// Boards to manage.
    #[serde(default)]
    pub boards: Vec<BoardConfig>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            path_prefix: default_path_prefix(),
            boards: Vec::new(),
        }
    }
}

impl BridgeConfig {
    /// Creates an empty configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the text does not match the schema.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file cannot be read
    /// - [`Error::Json`] if it does not match the schema
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Sets the path prefix.
    #[inline]
    #[must_use]
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    /// Adds a board.
    #[inline]
    #[must_use]
    pub fn with_board(mut self, board: BoardConfig) -> Self {
        self.boards.push(board);
        self
    }

    /// Checks the configuration for mistakes serde cannot catch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty prefix, a duplicate host, or
    /// any invalid board.
    pub fn validate(&self) -> Result<()> {
        if self.path_prefix.trim().is_empty() {
            return Err(Error::config("path_prefix must not be empty"));
        }

        let mut seen = FxHashSet::default();
        for board in &self.boards {
            board.validate()?;
            if !seen.insert(board.host.as_str()) {
                return Err(Error::config(format!("duplicate board host `{}`", board.host)));
            }
        }

        Ok(())
    }
}

// ============================================================================
// BoardConfig
// ============================================================================

/// Connection settings for one board.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BoardConfig {
    /// Hostname or address, optionally with a port.
    #[serde(deserialize_with = "trimmed")]
    pub host: String,

    /// Login user.
    #[serde(default = "default_credential")]
    pub username: String,

    /// Login password.
    #[serde(default = "default_credential")]
    pub password: String,

    /// Send credentials as soon as the socket opens.
    #[serde(default)]
    pub require_login: bool,

    /// Connect with `wss`.
    #[serde(default)]
    pub use_ssl: bool,

    /// Poll with `get_update` at this interval. Boards push updates on
    /// their own when unset.
    #[serde(default)]
    pub update_interval_ms: Option<u64>,

    /// Heartbeat interval.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    /// Delay between open and the config request.
    #[serde(default = "default_config_grace_ms")]
    pub config_grace_ms: u64,

    /// Give up on a pending connect after this long.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Keep the emitted-metadata set across reconnects.
    #[serde(default)]
    pub persist_metadata: bool,
}

impl BoardConfig {
    /// Creates settings for `host` with every default.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into().trim().to_string(),
            username: default_credential(),
            password: default_credential(),
            require_login: false,
            use_ssl: false,
            update_interval_ms: None,
            ping_interval_ms: default_ping_interval_ms(),
            config_grace_ms: default_config_grace_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            persist_metadata: false,
        }
    }

    /// Requires login with the given credentials.
    #[inline]
    #[must_use]
    pub fn with_login(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.require_login = true;
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Connects over TLS.
    #[inline]
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.use_ssl = true;
        self
    }

    /// Polls for updates every `ms` milliseconds.
    #[inline]
    #[must_use]
    pub fn with_update_interval(mut self, ms: u64) -> Self {
        self.update_interval_ms = Some(ms);
        self
    }

    /// Sets the heartbeat interval.
    #[inline]
    #[must_use]
    pub fn with_ping_interval(mut self, ms: u64) -> Self {
        self.ping_interval_ms = ms;
        self
    }

    /// Sets the delay before the config request.
    #[inline]
    #[must_use]
    pub fn with_config_grace(mut self, ms: u64) -> Self {
        self.config_grace_ms = ms;
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Keeps emitted metadata across reconnects.
    #[inline]
    #[must_use]
    pub fn with_persist_metadata(mut self) -> Self {
        self.persist_metadata = true;
        self
    }

    /// Heartbeat interval.
    #[inline]
    #[must_use]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    /// Delay before the config request.
    #[inline]
    #[must_use]
    pub fn config_grace(&self) -> Duration {
        Duration::from_millis(self.config_grace_ms)
    }

    /// Connect timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Update poll interval, if polling is enabled.
    #[inline]
    #[must_use]
    pub fn update_interval(&self) -> Option<Duration> {
        self.update_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Socket URL, `ws[s]://<host>/ws`.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the host does not form a valid URL
    /// - [`Error::Config`] if the URL has no host part
    pub fn ws_url(&self) -> Result<Url> {
        let scheme = if self.use_ssl { "wss" } else { "ws" };
        let url = Url::parse(&format!("{scheme}://{}/ws", self.host))?;

        if url.host_str().is_none_or(str::is_empty) {
            return Err(Error::config(format!("invalid board host `{}`", self.host)));
        }

        Ok(url)
    }

    /// Checks one board entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty host, a zero ping interval,
    /// or a host that does not form a URL.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::config("board host must not be empty"));
        }

        if self.ping_interval_ms == 0 {
            return Err(Error::config(format!(
                "board `{}`: ping_interval_ms must be positive",
                self.host
            )));
        }

        self.ws_url().map_err(|e| match e {
            Error::Config { .. } => e,
            other => Error::config(format!("board `{}`: {other}", self.host)),
        })?;

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::from_json(r#"{"boards":[{"host":" yarrboard.local "}]}"#).unwrap();
        assert_eq!(config.path_prefix, "electrical.yarrboard");

        let board = &config.boards[0];
        assert_eq!(board.host, "yarrboard.local");
        assert_eq!(board.username, "admin");
        assert_eq!(board.password, "admin");
        assert!(!board.require_login);
        assert_eq!(board.ping_interval(), Duration::from_secs(1));
        assert_eq!(board.config_grace(), Duration::from_millis(50));
        assert_eq!(board.connect_timeout(), Duration::from_secs(10));
        assert_eq!(board.update_interval(), None);
        assert_eq!(board, &BoardConfig::new("yarrboard.local"));
    }

    #[test]
    fn test_missing_host_is_rejected() {
        assert!(matches!(
            BridgeConfig::from_json(r#"{"boards":[{"use_ssl":true}]}"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_ws_url() {
        let plain = BoardConfig::new("yarrboard.local").ws_url().unwrap();
        assert_eq!(plain.as_str(), "ws://yarrboard.local/ws");

        let tls = BoardConfig::new("10.0.0.7:8443").with_ssl().ws_url().unwrap();
        assert_eq!(tls.as_str(), "wss://10.0.0.7:8443/ws");
    }

    #[test]
    fn test_validate() {
        assert!(BridgeConfig::new()
            .with_board(BoardConfig::new("a"))
            .with_board(BoardConfig::new("b"))
            .validate()
            .is_ok());

        let duplicate = BridgeConfig::new()
            .with_board(BoardConfig::new("a"))
            .with_board(BoardConfig::new(" a "));
        assert!(matches!(duplicate.validate(), Err(Error::Config { .. })));

        let empty = BridgeConfig::new().with_board(BoardConfig::new("  "));
        assert!(matches!(empty.validate(), Err(Error::Config { .. })));

        let zero_ping = BridgeConfig::new().with_board(BoardConfig::new("a").with_ping_interval(0));
        assert!(matches!(zero_ping.validate(), Err(Error::Config { .. })));

        let bad_host = BridgeConfig::new().with_board(BoardConfig::new("bad host/"));
        assert!(matches!(bad_host.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_builders() {
        let board = BoardConfig::new("yb")
            .with_login("captain", "arr")
            .with_update_interval(250)
            .with_persist_metadata();
        assert!(board.require_login);
        assert_eq!(board.username, "captain");
        assert_eq!(board.update_interval(), Some(Duration::from_millis(250)));
        assert!(board.persist_metadata);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"path_prefix":"electrical.test","boards":[{{"host":"yb","update_interval_ms":500}}]}}"#
        )
        .unwrap();

        let config = BridgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.path_prefix, "electrical.test");
        assert_eq!(config.boards[0].update_interval(), Some(Duration::from_millis(500)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = BridgeConfig::from_file(dir.path().join("boards.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
