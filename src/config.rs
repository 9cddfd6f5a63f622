//! Client configuration from the environment
//!
//! All variables are optional; command-line flags override them:
//! - TETHER_TIMEOUT (response timeout in whole seconds, 0 disables)
//! - TETHER_DOWNLOAD_DIR (directory downloads are saved into)
//! - TETHER_HISTORY (history file path, empty disables history)

use std::path::PathBuf;
use std::time::Duration;

/// History file created under the home directory by default.
const HISTORY_FILE_NAME: &str = ".tether_history";

/// Client settings resolved from defaults and the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Response read timeout; `None` blocks until the peer answers.
    pub timeout: Option<Duration>,
    /// Directory downloads are saved into.
    pub download_dir: PathBuf,
    /// History file; `None` disables persistent history.
    pub history_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            download_dir: PathBuf::from("."),
            history_file: dirs::home_dir().map(|home| home.join(HISTORY_FILE_NAME)),
        }
    }
}

impl ClientConfig {
    /// Resolve settings from the environment on top of the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var("TETHER_TIMEOUT") {
            config.timeout = parse_timeout(&value);
        }
        if let Ok(value) = std::env::var("TETHER_DOWNLOAD_DIR") {
            if !value.is_empty() {
                config.download_dir = PathBuf::from(value);
            }
        }
        if let Ok(value) = std::env::var("TETHER_HISTORY") {
            config.history_file = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        config
    }
}

/// Parse a timeout in whole seconds. Zero and unparsable values mean no
/// timeout.
pub fn parse_timeout(value: &str) -> Option<Duration> {
    match value.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(secs) => Some(Duration::from_secs(secs)),
    }
}
