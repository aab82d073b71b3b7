//! Configuration for numbridge sessions
//!
//! Sources, highest priority first:
//! 1. Environment variables (`NUMBRIDGE_*`)
//! 2. Configuration files (.numbridge.yaml, .numbridge.json, ...)
//! 3. Built-in defaults

use anyhow::{Context, Result};
use log::{debug, info};
use numbridge_marshal::DimensionPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumbridgeConfig {
    #[serde(default)]
    pub marshal: MarshalConfig,
    #[serde(default)]
    pub ffi: FfiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarshalConfig {
    /// How negative output sizes are treated
    #[serde(default)]
    pub dimension_policy: DimensionPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FfiConfig {
    /// Directories searched for shared libraries before the system loader paths
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
    /// Directory holding `<library>.ffi` signature files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_dir: Option<PathBuf>,
    /// Upper bound on host requests in one reverse-communication run
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
    /// Mirror log lines to stderr
    #[serde(default)]
    pub stderr: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

fn default_max_requests() -> usize {
    100_000
}

impl Default for FfiConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            signature_dir: None,
            max_requests: default_max_requests(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            stderr: false,
        }
    }
}

/// Configuration loader with multiple source support
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<NumbridgeConfig> {
        let mut config = Self::load_from_files()?;
        Self::apply_environment_variables(&mut config);
        Ok(config)
    }

    fn load_from_files() -> Result<NumbridgeConfig> {
        for path in Self::find_config_files() {
            if path.exists() {
                info!("Loading configuration from: {}", path.display());
                return Self::load_from_file(&path);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(NumbridgeConfig::default())
    }

    fn find_config_files() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(config_path) = env::var("NUMBRIDGE_CONFIG") {
            paths.push(PathBuf::from(config_path));
        }

        let names = [
            ".numbridge.yaml",
            ".numbridge.yml",
            ".numbridge.json",
            ".numbridge.toml",
        ];

        if let Ok(current_dir) = env::current_dir() {
            paths.extend(names.iter().map(|name| current_dir.join(name)));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.extend(names.iter().map(|name| home_dir.join(name)));
        }

        paths
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<NumbridgeConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            _ => {
                if let Ok(config) = serde_yaml::from_str(&content) {
                    config
                } else if let Ok(config) = serde_json::from_str(&content) {
                    config
                } else if let Ok(config) = toml::from_str(&content) {
                    config
                } else {
                    return Err(anyhow::anyhow!(
                        "Could not parse config file {} (tried YAML, JSON, TOML)",
                        path.display()
                    ));
                }
            }
        };

        Ok(config)
    }

    fn apply_environment_variables(config: &mut NumbridgeConfig) {
        Self::apply_overrides(config, |key| env::var(key).ok());
    }

    /// Apply `NUMBRIDGE_*` overrides read through `lookup`.
    pub fn apply_overrides(config: &mut NumbridgeConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(policy) = lookup("NUMBRIDGE_DIMENSION_POLICY") {
            config.marshal.dimension_policy = match policy.to_lowercase().as_str() {
                "permissive" => DimensionPolicy::Permissive,
                "strict" => DimensionPolicy::Strict,
                _ => config.marshal.dimension_policy,
            };
        }

        if let Some(paths) = lookup("NUMBRIDGE_LIBRARY_PATH") {
            config.ffi.search_paths = env::split_paths(&paths).collect();
        }

        if let Some(dir) = lookup("NUMBRIDGE_SIGNATURE_DIR") {
            config.ffi.signature_dir = Some(PathBuf::from(dir));
        }

        if let Some(max) = lookup("NUMBRIDGE_MAX_REQUESTS") {
            if let Ok(max) = max.parse() {
                config.ffi.max_requests = max;
            }
        }

        if let Some(level) = lookup("NUMBRIDGE_LOG_LEVEL") {
            config.logging.level = LogLevel::parse(&level).unwrap_or(config.logging.level);
        }

        if let Some(stderr) = lookup("NUMBRIDGE_LOG_STDERR") {
            config.logging.stderr = parse_bool(&stderr).unwrap_or(false);
        }
    }

    /// Save configuration to a file
    pub fn save_to_file(config: &NumbridgeConfig, path: &Path) -> Result<()> {
        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(config)
                .context("Failed to serialize config to JSON")?,
            Some("toml") => {
                toml::to_string_pretty(config).context("Failed to serialize config to TOML")?
            }
            _ => serde_yaml::to_string(config).context("Failed to serialize config to YAML")?,
        };

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> String {
        let config = NumbridgeConfig::default();
        serde_yaml::to_string(&config).unwrap_or_else(|_| "# Failed to generate config".to_string())
    }
}

/// Parse a boolean value from string with various formats
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enable" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disable" | "disabled" => Some(false),
        "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = NumbridgeConfig::default();
        assert_eq!(config.marshal.dimension_policy, DimensionPolicy::Permissive);
        assert!(config.ffi.search_paths.is_empty());
        assert_eq!(config.ffi.max_requests, 100_000);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_file_round_trips() {
        let temp_dir = TempDir::new().unwrap();

        let mut config = NumbridgeConfig::default();
        config.marshal.dimension_policy = DimensionPolicy::Strict;
        config.ffi.search_paths = vec![PathBuf::from("/opt/solvers/lib")];
        config.ffi.max_requests = 50;
        config.logging.level = LogLevel::Debug;

        for name in [".numbridge.yaml", ".numbridge.json", ".numbridge.toml"] {
            let path = temp_dir.path().join(name);
            ConfigLoader::save_to_file(&config, &path).unwrap();
            let loaded = ConfigLoader::load_from_file(&path).unwrap();
            assert_eq!(loaded, config, "{name}");
        }
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".numbridge.yaml");
        fs::write(&path, "marshal:\n  dimension_policy: strict\n").unwrap();

        let loaded = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(loaded.marshal.dimension_policy, DimensionPolicy::Strict);
        assert_eq!(loaded.ffi, FfiConfig::default());
    }

    #[test]
    fn test_unparseable_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".numbridge.json");
        fs::write(&path, "{ not json").unwrap();
        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse JSON config"));
    }

    #[test]
    fn test_environment_overrides() {
        let vars: HashMap<&str, &str> = [
            ("NUMBRIDGE_DIMENSION_POLICY", "STRICT"),
            ("NUMBRIDGE_SIGNATURE_DIR", "/srv/ffi"),
            ("NUMBRIDGE_MAX_REQUESTS", "not-a-number"),
            ("NUMBRIDGE_LOG_LEVEL", "trace"),
            ("NUMBRIDGE_LOG_STDERR", "yes"),
        ]
        .into_iter()
        .collect();

        let mut config = NumbridgeConfig::default();
        ConfigLoader::apply_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.marshal.dimension_policy, DimensionPolicy::Strict);
        assert_eq!(config.ffi.signature_dir, Some(PathBuf::from("/srv/ffi")));
        assert_eq!(config.ffi.max_requests, 100_000);
        assert_eq!(config.logging.level, LogLevel::Trace);
        assert!(config.logging.stderr);
    }

    #[test]
    fn test_sample_config_parses() {
        let sample = ConfigLoader::generate_sample_config();
        let parsed: NumbridgeConfig = serde_yaml::from_str(&sample).unwrap();
        assert_eq!(parsed, NumbridgeConfig::default());
    }

    #[test]
    fn test_bool_parsing() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("invalid"), None);
    }
}
