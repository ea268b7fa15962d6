#![forbid(unsafe_code)]

//! Tunables for the service views and the inspector.
//!
//! Every field has a default, so embedding code only overrides what it
//! needs. With the `policy-config` feature the configuration can be loaded
//! from TOML or JSON:
//!
//! ```toml
//! viewlet_container = ".viewlet-container"
//! default_viewlet = "overview"
//! resize_debounce_ms = 100
//! min_window_height = 600
//!
//! [grid]
//! large = 25
//! medium = 50
//! small = 250
//! ```

use std::fmt;
use std::time::Duration;

use jgui_core::Selector;

/// Unit-count thresholds for the unit grid size classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct GridTiers {
    /// Up to this many units render large.
    pub large: usize,
    pub medium: usize,
    /// Above this the grid is tiny.
    pub small: usize,
}

impl Default for GridTiers {
    fn default() -> Self {
        Self {
            large: 25,
            medium: 50,
            small: 250,
        }
    }
}

/// Service view and inspector settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct InspectorConfig {
    /// Selector of the region viewlets are shown in.
    pub viewlet_container: String,
    /// Viewlet shown when an inspector opens.
    pub default_viewlet: String,
    pub resize_debounce_ms: u64,
    /// Window heights below this are treated as this value.
    pub min_window_height: u32,
    pub grid: GridTiers,
    /// Constraint keys offered even when the service sets none.
    pub generic_constraints: Vec<String>,
    pub constraints_saved_message: String,
    pub config_saved_message: String,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            viewlet_container: ".viewlet-container".to_string(),
            default_viewlet: "overview".to_string(),
            resize_debounce_ms: 100,
            min_window_height: 600,
            grid: GridTiers::default(),
            generic_constraints: vec!["cpu".to_string(), "mem".to_string(), "arch".to_string()],
            constraints_saved_message: "Constraints updated".to_string(),
            config_saved_message: "Settings updated".to_string(),
        }
    }
}

impl InspectorConfig {
    #[must_use]
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Selector::parse(&self.viewlet_container)
            .map_err(|e| ConfigError::Invalid(format!("viewlet_container: {e}")))?;
        if self.default_viewlet.trim().is_empty() {
            return Err(ConfigError::Invalid("default_viewlet is empty".into()));
        }
        if self.min_window_height == 0 {
            return Err(ConfigError::Invalid("min_window_height must be > 0".into()));
        }
        let GridTiers {
            large,
            medium,
            small,
        } = self.grid;
        if !(large < medium && medium < small) {
            return Err(ConfigError::Invalid(format!(
                "grid tiers must ascend: {large} < {medium} < {small}"
            )));
        }
        Ok(())
    }
}

#[cfg(feature = "policy-config")]
impl InspectorConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// `Parse` for malformed TOML, `Invalid` for bad values.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// `Parse` for malformed JSON, `Invalid` for bad values.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a file; `.json` files are read as JSON, anything else as
    /// TOML.
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be read, otherwise as the parsers.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }
}

/// Errors from loading or validating [`InspectorConfig`].
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: String,
        source: std::io::Error,
    },
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read config '{path}': {source}"),
            Self::Parse(msg) => write!(f, "malformed config: {msg}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
