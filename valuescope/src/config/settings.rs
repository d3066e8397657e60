use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use valuescope_core::{ValueOptions, DEFAULT_MAX_READ_SIZE};

/// Log level enumeration for configuration
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(anyhow::anyhow!(
                "Invalid log level: {}. Valid options: error, warn, info, debug, trace",
                s
            )),
        }
    }
}

impl LogLevel {
    /// Convert to tracing level filter
    pub fn to_tracing_level_filter(self) -> tracing::level_filters::LevelFilter {
        match self {
            LogLevel::Error => tracing::level_filters::LevelFilter::ERROR,
            LogLevel::Warn => tracing::level_filters::LevelFilter::WARN,
            LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
            LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
            LogLevel::Trace => tracing::level_filters::LevelFilter::TRACE,
        }
    }
}

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub values: ValuesConfig,
    #[serde(default)]
    pub process: ProcessConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default = "default_enable_logging")]
    pub enable_logging: bool,
    #[serde(default)]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ValuesConfig {
    /// Largest scalar read, in bytes
    #[serde(default = "default_max_read_size")]
    pub max_read_size: u64,
    /// First address handed out by the host scratch allocator
    #[serde(default = "default_host_scratch_base")]
    pub host_scratch_base: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessConfig {
    /// Try process_vm_readv(2) before falling back to /proc/PID/mem
    #[serde(default = "default_use_process_vm_readv")]
    pub use_process_vm_readv: bool,
}

// Default value functions
fn default_log_file() -> String {
    "valuescope.log".to_string()
}

fn default_enable_logging() -> bool {
    false
}

fn default_max_read_size() -> u64 {
    DEFAULT_MAX_READ_SIZE
}

fn default_host_scratch_base() -> u64 {
    0x1000
}

fn default_use_process_vm_readv() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            enable_logging: default_enable_logging(),
            log_level: LogLevel::default(),
        }
    }
}

impl Default for ValuesConfig {
    fn default() -> Self {
        Self {
            max_read_size: default_max_read_size(),
            host_scratch_base: default_host_scratch_base(),
        }
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            use_process_vm_readv: default_use_process_vm_readv(),
        }
    }
}

impl ValuesConfig {
    pub fn value_options(&self) -> ValueOptions {
        ValueOptions {
            max_read_size: self.max_read_size,
        }
    }
}

impl Config {
    /// Load configuration from files with fallback search
    pub fn load() -> Result<Self> {
        let config_paths = Self::get_config_search_paths();

        for path in &config_paths {
            if path.exists() {
                info!("Loading configuration from: {}", path.display());
                return Self::load_from_file(path);
            } else {
                debug!("Configuration file not found: {}", path.display());
            }
        }

        info!("No configuration file found, using default settings");
        Ok(Self::default())
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read configuration file '{}': {}",
                path.display(),
                e
            )
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse TOML text; `origin` names the source in error messages
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Self::create_friendly_toml_error(origin, content, e))?;
        config.validate(origin)?;
        Ok(config)
    }

    /// Reject values that parse but cannot work
    fn validate(&self, origin: &str) -> Result<()> {
        if self.values.max_read_size == 0 {
            return Err(anyhow::anyhow!(
                "Invalid [values] configuration in '{}': max_read_size must be positive",
                origin
            ));
        }
        if self.values.host_scratch_base == 0 {
            return Err(anyhow::anyhow!(
                "Invalid [values] configuration in '{}': host_scratch_base must be non-zero",
                origin
            ));
        }
        Ok(())
    }

    /// Create a user-friendly error message for TOML parsing errors
    fn create_friendly_toml_error(
        file_path: &str,
        content: &str,
        error: toml::de::Error,
    ) -> anyhow::Error {
        let header = format!("Configuration file parsing error in '{file_path}'");
        let suggestion = Self::get_error_suggestion(error.message());

        let Some(span) = error.span() else {
            return anyhow::anyhow!("{header}\n\n{error}\n\nSuggestion: {suggestion}");
        };

        let (line_num, col_num) = span_position(content, span.start);
        let context_line = content.lines().nth(line_num - 1).unwrap_or("");
        let caret = " ".repeat(col_num - 1);

        anyhow::anyhow!(
            "{header}\n\nError at line {line_num}, column {col_num}:\n{error}\n\n\
             {context_line}\n{caret}^\n\nSuggestion: {suggestion}"
        )
    }

    /// Provide helpful suggestions based on common configuration errors
    fn get_error_suggestion(error_msg: &str) -> &'static str {
        if error_msg.contains("unknown field") {
            "Check the field name spelling and ensure it's in the correct section"
        } else if error_msg.contains("log_level") || error_msg.contains("unknown variant") {
            "Valid log levels are: 'error', 'warn', 'info', 'debug', 'trace'"
        } else if error_msg.contains("invalid type") {
            "Check the value type - strings should be in quotes, numbers and booleans should not"
        } else {
            "Please check the configuration file syntax"
        }
    }

    /// Get configuration file search paths in priority order
    fn get_config_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. ~/.valuescope/config.toml (user-level config)
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".valuescope").join("config.toml"));
        }

        // 2. ./valuescope.toml (project-level config)
        if let Ok(current_dir) = std::env::current_dir() {
            paths.push(current_dir.join("valuescope.toml"));
        }

        paths
    }

    /// Load configuration with explicit config file path
    pub fn load_with_explicit_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref();
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "Specified configuration file does not exist: {}",
                path.display()
            ));
        }
        Self::load_from_file(path)
    }
}

/// 1-based line and column of a byte offset
fn span_position(content: &str, offset: usize) -> (usize, usize) {
    let before = content.get(..offset).unwrap_or(content);
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let line = before.matches('\n').count() + 1;
    (line, before[line_start..].chars().count() + 1)
}
