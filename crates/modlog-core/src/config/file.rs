//! Dispatcher configuration file (YAML or JSON)
//!
//! User-level config lives at `<config dir>/modlog/config.yaml`
//! (`~/.config/modlog/config.yaml` on Linux).
//!
//! ```yaml
//! handlers:
//!   - kind: console
//!     prefix: "[camera]"
//!   - kind: recording
//!     name: audit
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::ConfigResult;
use crate::dispatch::LogDispatcher;
use crate::handlers::HandlerRegistry;
use crate::{debug_log, info_log};

/// One handler entry in a config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerSpec {
    /// Kind name looked up in the `HandlerRegistry`
    pub kind: String,
    /// Optional instance name (used as the label of recording handlers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Line prefix for console handlers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl HandlerSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            prefix: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Handlers to register, in order
    #[serde(default)]
    pub handlers: Vec<HandlerSpec>,
}

impl DispatcherConfig {
    pub fn new(handlers: Vec<HandlerSpec>) -> Self {
        Self { handlers }
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_yaml_string(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Default user-level config path (`<config dir>/modlog/config.yaml`)
    pub fn user_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        config_dir.join("modlog").join("config.yaml")
    }

    /// Load config from a YAML file
    ///
    /// A missing file yields the empty default config.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug_log!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        debug_log!("loaded {} handler entries from {}", config.handlers.len(), path.display());
        Ok(config)
    }

    /// Load the user-level config
    pub fn load_user() -> ConfigResult<Self> {
        Self::load(Self::user_path())
    }

    /// Save config to a YAML file, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }

    /// Create every configured handler and register it with a new dispatcher
    ///
    /// Handlers are registered in file order. The first failure aborts the
    /// build.
    pub fn build(&self, registry: &HandlerRegistry) -> ConfigResult<LogDispatcher> {
        let dispatcher = LogDispatcher::new();
        for spec in &self.handlers {
            let handler = registry.create(spec)?;
            dispatcher.register(handler)?;
        }

        info_log!("built dispatcher with {} handlers", dispatcher.len());
        Ok(dispatcher)
    }
}
