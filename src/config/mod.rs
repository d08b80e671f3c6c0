//! Configuration module for kpi-report.
//!
//! Handles the settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, CompilerSettings, EvaluationSettings, Settings, SettingsError, CONFIG_ENV_VAR,
};
