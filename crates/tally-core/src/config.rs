//! Configuration loading and typed config structures for the Tally service.
//!
//! The configuration lives in `tally-config.yaml`. Every field has a
//! default, so an absent file or a partial file is valid. A handful of
//! environment variables override the YAML after parsing so deployments
//! can relocate the port and the counter file without editing it. The
//! overrides are applied separately from parsing and report what they
//! rejected, so the caller can log it once a subscriber is installed.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::counter::WriteMode;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TallyConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ListenConfig,

    /// Backing file for the counter.
    #[serde(default)]
    pub counter: CounterConfig,

    /// Single-page application assets.
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Limits on the mutating endpoints.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TallyConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment overrides are NOT applied here; call
    /// [`TallyConfig::apply_env_overrides`] once logging is up so rejected
    /// values can be reported.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load configuration from `path` if it exists.
    ///
    /// Returns `Ok(None)` when the file is absent. Any other read failure
    /// or a parse failure is an error.
    pub fn from_optional_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override fields from the process environment.
    ///
    /// - `TALLY_HOST` overrides `server.host`
    /// - `TALLY_PORT` overrides `server.port`
    /// - `TALLY_COUNTER_PATH` overrides `counter.path`
    /// - `TALLY_ASSETS_DIR` overrides `assets.dir`
    ///
    /// Returns the overrides that were ignored because their value did not
    /// parse.
    pub fn apply_env_overrides(&mut self) -> Vec<RejectedOverride> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override fields from an arbitrary variable source.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Vec<RejectedOverride> {
        let mut rejected = Vec::new();

        if let Some(val) = lookup("TALLY_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("TALLY_PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => rejected.push(RejectedOverride {
                    key: "TALLY_PORT",
                    reason: e.to_string(),
                    value: val,
                }),
            }
        }
        if let Some(val) = lookup("TALLY_COUNTER_PATH") {
            self.counter.path = PathBuf::from(val);
        }
        if let Some(val) = lookup("TALLY_ASSETS_DIR") {
            self.assets.dir = Some(PathBuf::from(val));
        }

        rejected
    }
}

/// An environment override that was ignored because it did not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedOverride {
    /// The environment variable name.
    pub key: &'static str,
    /// The raw value found.
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListenConfig {
    /// Address to bind (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Counter persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CounterConfig {
    /// Backing file path.
    #[serde(default = "default_counter_path")]
    pub path: PathBuf,

    /// How saves reach the backing file.
    #[serde(default)]
    pub write_mode: WriteMode,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            path: default_counter_path(),
            write_mode: WriteMode::default(),
        }
    }
}

/// Static asset configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetsConfig {
    /// Serve the SPA from this directory instead of the build compiled
    /// into the binary (must contain `index.html`).
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Depth of the asset tree logged at startup (negative = unlimited,
    /// 0 = nothing).
    #[serde(default = "default_tree_depth")]
    pub tree_depth: i32,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            tree_depth: default_tree_depth(),
        }
    }
}

/// Fixed-window rate limit applied to increment and decrement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
    /// Whether the limiter is installed at all.
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,

    /// Requests admitted per window.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

fn default_counter_path() -> PathBuf {
    PathBuf::from("counter.txt")
}

const fn default_tree_depth() -> i32 {
    1
}

const fn default_rate_limit_enabled() -> bool {
    true
}

const fn default_max_requests() -> u32 {
    20
}

const fn default_window_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> TallyConfig {
        TallyConfig::parse(yaml).unwrap()
    }

    #[test]
    fn default_config_is_valid() {
        let config = TallyConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.counter.path, PathBuf::from("counter.txt"));
        assert_eq!(config.counter.write_mode, WriteMode::Atomic);
        assert_eq!(config.assets.dir, None);
        assert_eq!(config.assets.tree_depth, 1);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 9090

counter:
  path: "/var/lib/tally/counter.txt"
  write_mode: overwrite

assets:
  dir: "dist"
  tree_depth: -1

rate_limit:
  enabled: false
  max_requests: 5
  window_ms: 250

logging:
  level: "debug"
  json: true
"#;

        let config = parse(yaml);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(
            config.counter.path,
            PathBuf::from("/var/lib/tally/counter.txt")
        );
        assert_eq!(config.counter.write_mode, WriteMode::Overwrite);
        assert_eq!(config.assets.dir, Some(PathBuf::from("dist")));
        assert_eq!(config.assets.tree_depth, -1);
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_ms, 250);
        assert!(config.logging.json);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = parse("counter:\n  path: other.txt\n");
        assert_eq!(config.counter.path, PathBuf::from("other.txt"));
        assert_eq!(config.counter.write_mode, WriteMode::Atomic);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn unknown_write_mode_is_rejected() {
        let result = serde_yml::from_str::<TallyConfig>("counter:\n  write_mode: fsync\n");
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let result = TallyConfig::parse("server: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn overrides_replace_yaml_values() {
        let mut config = TallyConfig::default();
        let rejected = config.apply_overrides(|key| match key {
            "TALLY_PORT" => Some(String::from("3000")),
            "TALLY_COUNTER_PATH" => Some(String::from("/data/count")),
            "TALLY_ASSETS_DIR" => Some(String::from("dist")),
            _ => None,
        });
        assert!(rejected.is_empty());
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.counter.path, PathBuf::from("/data/count"));
        assert_eq!(config.assets.dir, Some(PathBuf::from("dist")));
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn invalid_port_override_is_reported() {
        let mut config = TallyConfig::default();
        let rejected =
            config.apply_overrides(|key| (key == "TALLY_PORT").then(|| String::from("http")));
        assert_eq!(config.server.port, 8080);
        assert_eq!(rejected.len(), 1);
        let first = rejected.first().unwrap();
        assert_eq!(first.key, "TALLY_PORT");
        assert_eq!(first.value, "http");
    }

    #[test]
    fn optional_file_absent_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = TallyConfig::from_optional_file(&dir.path().join("tally-config.yaml"));
        assert!(loaded.unwrap().is_none());
    }

    #[test]
    fn optional_file_present_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally-config.yaml");
        std::fs::write(&path, "server:\n  port: 7070\n").unwrap();
        let loaded = TallyConfig::from_optional_file(&path).unwrap().unwrap();
        assert_eq!(loaded.server.port, 7070);
    }

    #[test]
    fn required_file_absent_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = TallyConfig::from_file(&dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
