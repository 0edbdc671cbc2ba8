//! Handler registry for creating handlers by kind name

use std::collections::HashMap;
use std::sync::Arc;

use super::console::ConsoleHandler;
use super::noop::NoOpHandler;
use super::recording::RecordingHandler;
use super::traits::SharedHandler;
use crate::config::{ConfigError, ConfigResult, HandlerSpec};

/// Factory function type for creating handlers from a config entry
pub type HandlerFactory = Box<dyn Fn(&HandlerSpec) -> ConfigResult<SharedHandler> + Send + Sync>;

/// Definition of a registered handler kind
pub struct HandlerDefinition {
    /// Unique kind name, as used in config files
    pub kind: String,
    /// Human-readable description
    pub description: String,
    /// Factory function to create instances
    pub factory: HandlerFactory,
}

impl std::fmt::Debug for HandlerDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDefinition")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .finish()
    }
}

fn reject_prefix(spec: &HandlerSpec) -> ConfigResult<()> {
    if spec.prefix.is_some() {
        return Err(ConfigError::invalid_option(
            &spec.kind,
            "prefix is only supported by console handlers",
        ));
    }
    Ok(())
}

/// Registry of handler kinds
///
/// Hosts register the backends they ship under a kind name; configuration
/// files then refer to those names. The registry is an ordinary value, not
/// process-wide state.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use modlog_core::config::HandlerSpec;
/// use modlog_core::handlers::{HandlerRegistry, LogHandler, NoOpHandler};
///
/// let mut registry = HandlerRegistry::with_builtins();
/// registry.register("telemetry", "Ships events upstream", |_spec| Ok(Arc::new(NoOpHandler)));
///
/// let handler = registry.create(&HandlerSpec::new("console")).unwrap();
/// assert_eq!(handler.name(), "console");
/// ```
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    definitions: HashMap<String, HandlerDefinition>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
        }
    }

    /// Create a registry with the built-in kinds: `console`, `noop`, `recording`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register(
            "console",
            "Write events to stdout/stderr",
            |spec| {
                let handler = match &spec.prefix {
                    Some(prefix) => ConsoleHandler::with_prefix(prefix.clone()),
                    None => ConsoleHandler::new(),
                };
                Ok(Arc::new(handler))
            },
        );

        registry.register(
            "noop",
            "Discard all events",
            |spec| {
                reject_prefix(spec)?;
                Ok(Arc::new(NoOpHandler::new()))
            },
        );

        registry.register(
            "recording",
            "Keep events in memory",
            |spec| {
                reject_prefix(spec)?;
                let label = spec.name.clone().unwrap_or_else(|| "recording".to_string());
                Ok(Arc::new(RecordingHandler::new(label)))
            },
        );

        registry
    }

    /// Register a handler kind, replacing any existing kind with the same name
    pub fn register<F>(&mut self, kind: &str, description: &str, factory: F)
    where
        F: Fn(&HandlerSpec) -> ConfigResult<SharedHandler> + Send + Sync + 'static,
    {
        self.definitions.insert(
            kind.to_string(),
            HandlerDefinition {
                kind: kind.to_string(),
                description: description.to_string(),
                factory: Box::new(factory),
            },
        );
    }

    /// Remove a handler kind
    pub fn unregister(&mut self, kind: &str) -> bool {
        self.definitions.remove(kind).is_some()
    }

    /// Check if a kind is registered
    pub fn contains(&self, kind: &str) -> bool {
        self.definitions.contains_key(kind)
    }

    /// List registered kinds as (kind, description), sorted by kind
    pub fn list(&self) -> Vec<(String, String)> {
        let mut kinds: Vec<_> = self
            .definitions
            .values()
            .map(|def| (def.kind.clone(), def.description.clone()))
            .collect();
        kinds.sort();
        kinds
    }

    /// Create a handler from a config entry
    ///
    /// # Errors
    /// `UnknownHandler` if the kind is not registered, or whatever the
    /// factory reports.
    pub fn create(&self, spec: &HandlerSpec) -> ConfigResult<SharedHandler> {
        let definition = self
            .definitions
            .get(&spec.kind)
            .ok_or_else(|| ConfigError::UnknownHandler(spec.kind.clone()))?;
        (definition.factory)(spec)
    }
}
