//! Runtime configuration
//!
//! Layered as: defaults, then an optional TOML file, then environment
//! variables, then command-line flags.
//!
//! ```toml
//! [whitelist]
//! path = "whitelist.txt"
//!
//! [output]
//! dir = "reports"
//! format = "text"
//! console = true
//!
//! [remote]
//! enabled = true
//! endpoint = "http://localhost:3001/api/data/saveSyscallData"
//! timeout_ms = 2000
//! ```

use crate::cli::{Cli, OutputFormat};
use crate::sink::file::DEFAULT_STEM;
use crate::sink::remote::DEFAULT_ENDPOINT;
use crate::sink::{CompositeSink, ConsoleSink, LocalFileSink, RemoteSink, SinkError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhitelistConfig {
    pub path: PathBuf,
}

impl Default for WhitelistConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("whitelist.txt"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for per-thread report files
    pub dir: PathBuf,
    /// File name stem for report files
    pub stem: String,
    pub format: OutputFormat,
    /// Print per-thread summaries to stderr
    pub console: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            stem: DEFAULT_STEM.to_string(),
            format: OutputFormat::Text,
            console: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub endpoint: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: 2000,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VigiaConfig {
    pub whitelist: WhitelistConfig,
    pub output: OutputConfig,
    pub remote: RemoteConfig,
}

impl VigiaConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply environment overrides
    ///
    /// Looks for:
    /// - VIGIA_WHITELIST
    /// - VIGIA_OUTPUT_DIR
    /// - VIGIA_REMOTE_ENDPOINT
    pub fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("VIGIA_WHITELIST") {
            self.whitelist.path = PathBuf::from(path);
        }

        if let Ok(dir) = std::env::var("VIGIA_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(dir);
        }

        if let Ok(endpoint) = std::env::var("VIGIA_REMOTE_ENDPOINT") {
            self.remote.endpoint = endpoint;
        }
    }

    /// Apply command-line overrides
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(path) = &cli.whitelist {
            self.whitelist.path = path.clone();
        }
        if let Some(dir) = &cli.output_dir {
            self.output.dir = dir.clone();
        }
        if let Some(format) = cli.format {
            self.output.format = format;
        }
        if cli.quiet {
            self.output.console = false;
        }
        if let Some(endpoint) = &cli.remote {
            self.remote.endpoint = endpoint.clone();
            self.remote.enabled = true;
        }
        if cli.no_remote {
            self.remote.enabled = false;
        }
    }

    /// Resolve the full configuration for a CLI invocation
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.apply_cli(cli);
        Ok(config)
    }

    /// Build the sink chain: file, then remote, then console
    pub fn build_sink(&self) -> Result<CompositeSink, SinkError> {
        let mut sink = CompositeSink::new().with(
            LocalFileSink::new(&self.output.dir, self.output.format)
                .with_stem(self.output.stem.clone()),
        );

        if self.remote.enabled {
            sink = sink.with(RemoteSink::new(
                self.remote.endpoint.clone(),
                self.output.format,
                Duration::from_millis(self.remote.timeout_ms),
            )?);
        }

        if self.output.console {
            sink = sink.with(ConsoleSink::stderr());
        }

        Ok(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults() {
        let config = VigiaConfig::default();
        assert_eq!(config.whitelist.path, PathBuf::from("whitelist.txt"));
        assert_eq!(config.output.dir, PathBuf::from("."));
        assert_eq!(config.output.stem, "syscall_list_runtime");
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.remote.enabled);
        assert_eq!(config.remote.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = VigiaConfig::from_toml_str(
            r#"
[output]
format = "json"

[remote]
enabled = false
"#,
        )
        .unwrap();

        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.console);
        assert!(!config.remote.enabled);
        assert_eq!(config.whitelist.path, PathBuf::from("whitelist.txt"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = VigiaConfig::from_toml_str("[output\nformat = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(VigiaConfig::from_toml_str("[output]\nformat = \"xml\"").is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "vigia",
            "-w",
            "allow.txt",
            "--format",
            "json",
            "-q",
            "--no-remote",
            "--",
            "true",
        ]);
        let mut config = VigiaConfig::default();
        config.apply_cli(&cli);

        assert_eq!(config.whitelist.path, PathBuf::from("allow.txt"));
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(!config.output.console);
        assert!(!config.remote.enabled);
    }

    #[test]
    fn test_build_sink_order() {
        let mut config = VigiaConfig::default();
        assert_eq!(config.build_sink().unwrap().names(), vec!["file", "remote", "console"]);

        config.remote.enabled = false;
        config.output.console = false;
        assert_eq!(config.build_sink().unwrap().names(), vec!["file"]);
    }

    #[test]
    fn test_missing_config_file() {
        let err = VigiaConfig::from_file("/nonexistent/vigia.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
