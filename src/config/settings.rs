//! TOML-based configuration for kpi-report.
//!
//! Supports a config file (kpi-report.toml) with environment variable
//! expansion in string values.
//!
//! Example configuration:
//! ```toml
//! [compiler]
//! empty_placeholder = "<p>${REPORT_EMPTY_TEXT}</p>"
//! block_separator = "\n\n"
//!
//! [evaluation]
//! empty_value = "n/a"
//! decimal_places = 2
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::compile::{CompileOptions, EMPTY_PLACEHOLDER};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "KPI_REPORT_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Block compiler configuration.
    pub compiler: CompilerSettings,

    /// Dry-run evaluation configuration.
    pub evaluation: EvaluationSettings,
}

/// Block compiler configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Source emitted for an empty block list.
    pub empty_placeholder: String,

    /// Text placed between compiled blocks.
    pub block_separator: String,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            empty_placeholder: EMPTY_PLACEHOLDER.to_string(),
            block_separator: "\n".to_string(),
        }
    }
}

/// Dry-run evaluation configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EvaluationSettings {
    /// Display string for a value that cannot be resolved.
    pub empty_value: String,

    /// Round numeric results to this many decimal places.
    pub decimal_places: Option<u32>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.expanded()
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `KPI_REPORT_CONFIG`
    /// 2. `./kpi-report.toml`
    /// 3. `<config dir>/kpi-report/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("kpi-report.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("kpi-report").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("no config file found, using defaults");
        Ok(Settings::default())
    }

    /// Compiler options described by these settings.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions::default()
            .with_empty_placeholder(self.compiler.empty_placeholder.clone())
            .with_block_separator(self.compiler.block_separator.clone())
    }

    fn expanded(mut self) -> Result<Self, SettingsError> {
        self.compiler.empty_placeholder = expand_env_vars(&self.compiler.empty_placeholder)?;
        self.compiler.block_separator = expand_env_vars(&self.compiler.block_separator)?;
        self.evaluation.empty_value = expand_env_vars(&self.evaluation.empty_value)?;
        if self.evaluation.decimal_places.is_some_and(|d| d > 12) {
            return Err(SettingsError::InvalidConfig(
                "evaluation.decimal_places must be at most 12".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A `$` not followed by a name is kept.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|&ch| ch != '}') {
                name.push(ch);
            }
            chars.next(); // consume '}'
            name
        } else {
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|&ch| ch.is_alphanumeric() || ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                result.push('$');
                continue;
            }
            name
        };

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
