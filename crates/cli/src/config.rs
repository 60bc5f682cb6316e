//! Configuration for the `dsn` CLI.
//!
//! Read from the TOML file given with `--config`, or from `dsn.toml` in the
//! working directory when that file exists. Every key is optional.
//!
//! # Example
//!
//! ```toml
//! [input]
//! max_file_size = 10485760
//! allowed_extensions = ["txt"]
//!
//! [reporting]
//! default_year = 2024
//! lookback_years = 5
//! lookahead_years = 1
//! ```

use std::path::{Path, PathBuf};

use dsn_core::ResolverOptions;
use serde::{Deserialize, Serialize};

/// Config file picked up from the working directory when `--config` is absent.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "dsn.toml";

/// Largest accepted input, in bytes.
pub(crate) const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Widest accepted `lookback_years` / `lookahead_years`.
pub(crate) const MAX_WINDOW_YEARS: i32 = 100;

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub input: InputConfig,
    /// Fallback year and plausibility window for the reporting period.
    pub reporting: ResolverOptions,
}

/// `[input]` section: checks applied before a file reaches the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct InputConfig {
    pub max_file_size: u64,
    /// Extensions without the leading dot, compared case-insensitively.
    pub allowed_extensions: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: vec!["txt".to_owned()],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("could not read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config '{}': {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

// ── Functions ─────────────────────────────────────────────────────────────────

/// Read, parse and check a config file.
pub(crate) fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.check().map_err(|message| ConfigError::Invalid {
        path: path.to_path_buf(),
        message,
    })?;
    Ok(config)
}

/// Resolve the effective config: an explicit path must exist, the implicit
/// `dsn.toml` is optional, and with neither the defaults apply.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        return read_config(path);
    }
    let implicit = Path::new(DEFAULT_CONFIG_FILE);
    if implicit.is_file() {
        log::debug!("using {}", implicit.display());
        return read_config(implicit);
    }
    Ok(Config::default())
}

impl Config {
    fn check(&self) -> Result<(), String> {
        if self.input.max_file_size == 0 {
            return Err("input.max_file_size must be greater than zero".to_owned());
        }
        if self.input.allowed_extensions.is_empty() {
            return Err("input.allowed_extensions must not be empty".to_owned());
        }
        for (key, years) in [
            ("lookback_years", self.reporting.lookback_years),
            ("lookahead_years", self.reporting.lookahead_years),
        ] {
            if !(0..=MAX_WINDOW_YEARS).contains(&years) {
                return Err(format!(
                    "reporting.{} must be between 0 and {}, got {}",
                    key, MAX_WINDOW_YEARS, years
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_gives_defaults() {
        let file = write_config("");
        let config = read_config(file.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.input.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.reporting.default_year, 2024);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let file = write_config("[reporting]\ndefault_year = 2023\n");
        let config = read_config(file.path()).unwrap();
        assert_eq!(config.reporting.default_year, 2023);
        assert_eq!(config.reporting.lookback_years, 5);
        assert_eq!(config.input.allowed_extensions, vec!["txt"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = write_config("[input]\nmax_size = 3\n");
        assert!(matches!(
            read_config(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn zero_max_size_is_invalid() {
        let file = write_config("[input]\nmax_file_size = 0\n");
        let err = read_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("max_file_size"));
    }

    #[test]
    fn window_years_are_bounded() {
        let file = write_config("[reporting]\nlookahead_years = 2147483647\n");
        let err = read_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("reporting.lookahead_years"));

        let file = write_config("[reporting]\nlookback_years = -1\n");
        assert!(matches!(
            read_config(file.path()),
            Err(ConfigError::Invalid { .. })
        ));

        let file = write_config("[reporting]\nlookback_years = 100\nlookahead_years = 0\n");
        assert!(read_config(file.path()).is_ok());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/dsn.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
