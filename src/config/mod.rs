//! Configuration loading
//!
//! Options are read from a TOML file and may be overridden from the
//! command line. The file layout mirrors the two option groups:
//!
//! ```toml
//! [general]
//! include-verify-local-vars = true
//! maximum-traceback-depth = 20
//!
//! [debug]
//! phases = true
//! ```

mod args;
mod options;


pub use args::VerifyArgs;
pub use options::{parse_bool, OptionKind, OptionSpec, DEBUG_FLAGS, OPTIONS};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::stack::MAX_TRACEBACK_DEPTH;

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "soft-verify.toml";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error("option '{option}' expects 1/yes/true/on or 0/no/false/off, got '{value}'")]
    InvalidBool { option: String, value: String },

    #[error("option '{option}' expects an integer, got '{value}'")]
    InvalidInt { option: String, value: String },
}

/// Behaviour switches for the verification engine and redelivery hooks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GeneralOptions {
    /// Include local variables in tracebacks created by verify
    pub include_verify_local_vars: bool,
    /// Include verify locals even when `include_verify_local_vars` is off;
    /// captured errors carry no locals
    pub include_all_local_vars: bool,
    /// Stop the traceback at the test function
    pub traceback_stops_at_test_functions: bool,
    /// Raise warnings (enabled) or just save the result (disabled)
    pub raise_warnings: bool,
    /// Maximum number of stack trace entries
    pub maximum_traceback_depth: usize,
    /// Continue to the call phase if setup recorded a failure
    pub continue_on_setup_failure: bool,
    /// Continue to the call phase if setup recorded a warning
    pub continue_on_setup_warning: bool,
}

impl Default for GeneralOptions {
    fn default() -> Self {
        Self {
            include_verify_local_vars: true,
            include_all_local_vars: false,
            traceback_stops_at_test_functions: true,
            raise_warnings: true,
            maximum_traceback_depth: MAX_TRACEBACK_DEPTH,
            continue_on_setup_failure: false,
            continue_on_setup_warning: false,
        }
    }
}

/// Diagnostic switches; each enables the `soft_verify::<name>` tracing target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DebugFlags {
    pub print_saved: bool,
    pub verify: bool,
    pub not_plugin: bool,
    pub phases: bool,
    pub scopes: bool,
    pub summary: bool,
}

impl DebugFlags {
    /// `(name, enabled)` for every flag, in declaration order
    pub fn entries(&self) -> [(&'static str, bool); 6] {
        [
            ("print-saved", self.print_saved),
            ("verify", self.verify),
            ("not-plugin", self.not_plugin),
            ("phases", self.phases),
            ("scopes", self.scopes),
            ("summary", self.summary),
        ]
    }

    fn flag_mut(&mut self, name: &str) -> Option<&mut bool> {
        match name {
            "print-saved" => Some(&mut self.print_saved),
            "verify" => Some(&mut self.verify),
            "not-plugin" => Some(&mut self.not_plugin),
            "phases" => Some(&mut self.phases),
            "scopes" => Some(&mut self.scopes),
            "summary" => Some(&mut self.summary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub general: GeneralOptions,
    pub debug: DebugFlags,
}

impl VerifyConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse verification config")
    }

    /// Load a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Resolve the configuration file.
    ///
    /// Lookup order: the explicit path, `./soft-verify.toml`, then
    /// `<config dir>/soft-verify/config.toml`. Defaults apply when none
    /// exists. An explicit path that does not exist is an error.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::default_locations().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!(
                    target: "soft_verify::summary",
                    path = %path.display(),
                    "loading config"
                );
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            locations.push(dir.join("soft-verify").join("config.toml"));
        }
        locations
    }

    /// Set a `[general]` option or a `debug.<flag>` from its string form
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        if let Some(flag) = name.strip_prefix("debug.") {
            let slot = self
                .debug
                .flag_mut(flag)
                .ok_or_else(|| ConfigError::UnknownOption(name.to_string()))?;
            *slot = bool_value(name, value)?;
            return Ok(());
        }

        let general = &mut self.general;
        match name {
            "include-verify-local-vars" => {
                general.include_verify_local_vars = bool_value(name, value)?
            }
            "include-all-local-vars" => general.include_all_local_vars = bool_value(name, value)?,
            "traceback-stops-at-test-functions" => {
                general.traceback_stops_at_test_functions = bool_value(name, value)?
            }
            "raise-warnings" => general.raise_warnings = bool_value(name, value)?,
            "maximum-traceback-depth" => {
                general.maximum_traceback_depth =
                    value.trim().parse().map_err(|_| ConfigError::InvalidInt {
                        option: name.to_string(),
                        value: value.to_string(),
                    })?
            }
            "continue-on-setup-failure" => {
                general.continue_on_setup_failure = bool_value(name, value)?
            }
            "continue-on-setup-warning" => {
                general.continue_on_setup_warning = bool_value(name, value)?
            }
            _ => return Err(ConfigError::UnknownOption(name.to_string())),
        }
        Ok(())
    }

    /// Apply command-line overrides; options left unset keep their value
    pub fn apply_overrides(&mut self, args: &VerifyArgs) -> Result<(), ConfigError> {
        for (name, value) in args.overrides() {
            self.set_option(name, value)?;
        }
        Ok(())
    }

    /// Current value of a `[general]` option rendered as a string
    pub fn option_value(&self, name: &str) -> Option<String> {
        let g = &self.general;
        let value = match name {
            "include-verify-local-vars" => g.include_verify_local_vars.to_string(),
            "include-all-local-vars" => g.include_all_local_vars.to_string(),
            "traceback-stops-at-test-functions" => g.traceback_stops_at_test_functions.to_string(),
            "raise-warnings" => g.raise_warnings.to_string(),
            "maximum-traceback-depth" => g.maximum_traceback_depth.to_string(),
            "continue-on-setup-failure" => g.continue_on_setup_failure.to_string(),
            "continue-on-setup-warning" => g.continue_on_setup_warning.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// One `name: type=<kind>, val=<value>` line per option
    pub fn describe(&self) -> Vec<String> {
        OPTIONS
            .iter()
            .map(|spec| {
                format!(
                    "{}: type={}, val={}",
                    spec.name,
                    spec.kind,
                    self.option_value(spec.name).unwrap_or_default()
                )
            })
            .collect()
    }

    /// Whether locals snapshots from verify calls go into tracebacks.
    ///
    /// `include-all-local-vars` implies it. Captured errors never carry
    /// locals: a panic or returned error exposes no variables to snapshot.
    pub fn capture_verify_locals(&self) -> bool {
        self.general.include_verify_local_vars || self.general.include_all_local_vars
    }
}

fn bool_value(option: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::InvalidBool {
        option: option.to_string(),
        value: value.to_string(),
    })
}
