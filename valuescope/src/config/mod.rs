//! Configuration management for valuescope
//!
//! Configuration priority (highest to lowest):
//! 1. Explicitly specified file
//! 2. ~/.valuescope/config.toml
//! 3. ./valuescope.toml

pub mod settings;

pub use settings::{Config, GeneralConfig, LogLevel, ProcessConfig, ValuesConfig};
