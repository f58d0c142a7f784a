//! Configuration system for the Prism framework

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, PrismError, Result};
use crate::logging::LogCategory;

/// Global configuration for Prism
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Diagnostic event buffering
    pub diagnostics: DiagnosticsConfig,
    /// Retry policy for services that can be reinitialized
    pub resilience: ResilienceConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when neither `RUST_LOG` nor a category override applies
    pub default_level: String,
    /// Category-specific log levels (category name -> level string)
    pub category_levels: HashMap<String, String>,
    /// Rate limiting duration in seconds
    pub rate_limit_seconds: u64,
    /// Maximum number of messages before rate limiting kicks in
    pub max_rate_limit_count: u32,
}

/// Diagnostics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Whether diagnostic events are recorded at all
    pub enabled: bool,
    /// Events kept while no listener is attached; the oldest are dropped first
    pub max_pending_events: usize,
}

/// Resilience configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Reinitialize-and-retry attempts after a whitelisted failure
    pub max_retries: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut category_levels = HashMap::new();
        category_levels.insert("core".to_string(), "info".to_string());
        category_levels.insert("geometry".to_string(), "warn".to_string());
        category_levels.insert("diagnostics".to_string(), "info".to_string());
        category_levels.insert("services".to_string(), "info".to_string());
        category_levels.insert("config".to_string(), "info".to_string());

        Self {
            default_level: "info".to_string(),
            category_levels,
            rate_limit_seconds: 5,
            max_rate_limit_count: 10,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_pending_events: 2000,
        }
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self { max_retries: 1 }
    }
}

impl PrismConfig {
    /// Parse a configuration from JSON; missing sections fall back to defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PrismConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents).map_err(|e| match e {
            PrismError::Configuration { message, .. } => PrismError::configuration_with_context(
                message,
                ErrorContext::new("load", "config").with_metadata("path", path.display().to_string()),
            ),
            other => other,
        })
    }

    /// Check values that serde cannot reject on its own
    pub fn validate(&self) -> Result<()> {
        if self.diagnostics.max_pending_events == 0 {
            return Err(PrismError::configuration(
                "diagnostics.max_pending_events must be at least 1",
            ));
        }
        if crate::logging::LogLevel::from_str(&self.logging.default_level).is_none() {
            return Err(PrismError::configuration(format!(
                "unknown log level '{}'",
                self.logging.default_level
            )));
        }
        Ok(())
    }
}

/// Global configuration manager
pub struct ConfigManager {
    config: RwLock<PrismConfig>,
}

impl ConfigManager {
    /// Create a new configuration manager with default settings
    pub fn new() -> Self {
        Self::with_config(PrismConfig::default())
    }

    /// Create a configuration manager with custom config
    pub fn with_config(config: PrismConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    /// Get a copy of the current configuration
    pub fn get_config(&self) -> PrismConfig {
        self.config.read().clone()
    }

    /// Update the configuration
    pub fn update_config<F>(&self, updater: F)
    where
        F: FnOnce(&mut PrismConfig),
    {
        updater(&mut *self.config.write());
    }

    /// Get the current logging configuration
    pub fn get_logging_config(&self) -> LoggingConfig {
        self.config.read().logging.clone()
    }

    /// Set log level for a specific category
    pub fn set_category_level(&self, category: &str, level: &str) {
        self.config
            .write()
            .logging
            .category_levels
            .insert(category.to_string(), level.to_string());
    }

    /// Get log level for a specific category
    pub fn get_category_level(&self, category: &str) -> Option<String> {
        self.config.read().logging.category_levels.get(category).cloned()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

static CONFIG_MANAGER: OnceLock<ConfigManager> = OnceLock::new();

/// Initialize the global configuration manager
pub fn init_config() -> &'static ConfigManager {
    CONFIG_MANAGER.get_or_init(ConfigManager::new)
}

/// Initialize the global configuration manager with custom config.
///
/// The manager is created once. If it already exists with a different
/// configuration, `config` is discarded and a warning is logged; use
/// [`ConfigManager::update_config`] to change it afterwards.
pub fn init_config_with(config: PrismConfig) -> &'static ConfigManager {
    let manager = CONFIG_MANAGER.get_or_init(|| ConfigManager::with_config(config.clone()));
    if manager.get_config() != config {
        crate::prism_warn!(
            LogCategory::Config,
            "configuration manager already initialized; ignoring new configuration"
        );
    }
    manager
}

/// Get the global configuration manager
pub fn get_config_manager() -> Option<&'static ConfigManager> {
    CONFIG_MANAGER.get()
}
