//! Logging system for the Prism framework
//!
//! Messages are filtered per category and optionally rate limited before
//! being handed to `tracing`. The category name is used as the event target,
//! so subscribers and `RUST_LOG` can filter on it.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Log levels supported by the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Log categories for organizing log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogCategory {
    Core,
    Geometry,
    Diagnostics,
    Services,
    Config,
}

impl LogCategory {
    /// Convert LogCategory to string
    pub const fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Core => "core",
            LogCategory::Geometry => "geometry",
            LogCategory::Diagnostics => "diagnostics",
            LogCategory::Services => "services",
            LogCategory::Config => "config",
        }
    }
}

impl std::fmt::Display for LogCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LogLevel {
    /// Convert string to LogLevel
    pub fn from_str(s: &str) -> Option<LogLevel> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Convert LogLevel to string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Rate limiting state for a specific category
#[derive(Debug)]
struct RateLimitState {
    last_reset: Instant,
    count: u32,
    max_count: u32,
    duration: Duration,
}

impl RateLimitState {
    fn new(max_count: u32, duration: Duration) -> Self {
        Self {
            last_reset: Instant::now(),
            count: 0,
            max_count,
            duration,
        }
    }

    fn should_allow(&mut self) -> bool {
        let now = Instant::now();

        if now.duration_since(self.last_reset) >= self.duration {
            self.last_reset = now;
            self.count = 0;
        }

        if self.count < self.max_count {
            self.count += 1;
            true
        } else {
            false
        }
    }
}

/// Category filter and rate limiter state
#[derive(Debug)]
pub struct Logger {
    rate_limiters: Mutex<HashMap<LogCategory, RateLimitState>>,
    default_level: LogLevel,
    config: LoggingConfig,
}

impl Logger {
    /// Create a logger from configuration
    pub fn new(config: LoggingConfig) -> Self {
        Self {
            rate_limiters: Mutex::new(HashMap::new()),
            default_level: LogLevel::from_str(&config.default_level).unwrap_or(LogLevel::Info),
            config,
        }
    }

    /// Check if a log message should be allowed based on rate limiting
    pub fn should_allow_log(&self, category: LogCategory) -> bool {
        let mut limiters = self.rate_limiters.lock();
        limiters
            .entry(category)
            .or_insert_with(|| {
                RateLimitState::new(
                    self.config.max_rate_limit_count,
                    Duration::from_secs(self.config.rate_limit_seconds),
                )
            })
            .should_allow()
    }

    /// Check if a log level is enabled for a category
    pub fn is_level_enabled(&self, category: LogCategory, level: LogLevel) -> bool {
        let threshold = self
            .config
            .category_levels
            .get(category.as_str())
            .and_then(|s| LogLevel::from_str(s))
            .unwrap_or(self.default_level);
        level >= threshold
    }

    /// Replace the configuration and reset rate limiters
    pub fn update_config(&mut self, config: LoggingConfig) {
        self.default_level = LogLevel::from_str(&config.default_level).unwrap_or(LogLevel::Info);
        self.config = config;
        self.rate_limiters.get_mut().clear();
    }
}

static LOGGER: OnceLock<RwLock<Logger>> = OnceLock::new();

fn logger() -> &'static RwLock<Logger> {
    LOGGER.get_or_init(|| RwLock::new(Logger::new(LoggingConfig::default())))
}

/// Initialize the logging system.
///
/// Installs a `tracing` subscriber honouring `RUST_LOG`, falling back to the
/// configured default level. Calling this again only refreshes the category
/// configuration.
pub fn init(config: &LoggingConfig) -> crate::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_level))
        .map_err(|e| {
            crate::PrismError::configuration(format!("invalid log filter: {}", e))
        })?;

    // A subscriber may already be installed by the host or an earlier call.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();

    update_config(config.clone());
    Ok(())
}

/// Update logger configuration
pub fn update_config(config: LoggingConfig) {
    logger().write().update_config(config);
}

// Targets must be constant, so each category gets its own callsite.
macro_rules! emit {
    ($level:ident, $category:expr, $message:expr) => {
        match $category {
            LogCategory::Core => tracing::$level!(target: "core", "{}", $message),
            LogCategory::Geometry => tracing::$level!(target: "geometry", "{}", $message),
            LogCategory::Diagnostics => tracing::$level!(target: "diagnostics", "{}", $message),
            LogCategory::Services => tracing::$level!(target: "services", "{}", $message),
            LogCategory::Config => tracing::$level!(target: "config", "{}", $message),
        }
    };
}

/// Internal logging function used by the `prism_*` macros.
///
/// The category becomes the event's `tracing` target, so `RUST_LOG`
/// directives such as `geometry=debug` select it.
pub fn log_internal(level: LogLevel, category: LogCategory, message: &str, rate_limited: bool) {
    {
        let guard = logger().read();
        if !guard.is_level_enabled(category, level) {
            return;
        }
        if rate_limited && !guard.should_allow_log(category) {
            return;
        }
    }

    match level {
        LogLevel::Trace => emit!(trace, category, message),
        LogLevel::Debug => emit!(debug, category, message),
        LogLevel::Info => emit!(info, category, message),
        LogLevel::Warn => emit!(warn, category, message),
        LogLevel::Error => emit!(error, category, message),
    }
}

#[macro_export]
macro_rules! prism_trace {
    ($category:expr, $($arg:tt)*) => {
        $crate::logging::log_internal($crate::logging::LogLevel::Trace, $category, &format!($($arg)*), false)
    };
}

#[macro_export]
macro_rules! prism_debug {
    ($category:expr, $($arg:tt)*) => {
        $crate::logging::log_internal($crate::logging::LogLevel::Debug, $category, &format!($($arg)*), false)
    };
}

#[macro_export]
macro_rules! prism_info {
    ($category:expr, $($arg:tt)*) => {
        $crate::logging::log_internal($crate::logging::LogLevel::Info, $category, &format!($($arg)*), false)
    };
}

#[macro_export]
macro_rules! prism_warn {
    ($category:expr, $($arg:tt)*) => {
        $crate::logging::log_internal($crate::logging::LogLevel::Warn, $category, &format!($($arg)*), false)
    };
}

#[macro_export]
macro_rules! prism_error {
    ($category:expr, $($arg:tt)*) => {
        $crate::logging::log_internal($crate::logging::LogLevel::Error, $category, &format!($($arg)*), false)
    };
}

#[macro_export]
macro_rules! prism_debug_rate_limited {
    ($category:expr, $($arg:tt)*) => {
        $crate::logging::log_internal($crate::logging::LogLevel::Debug, $category, &format!($($arg)*), true)
    };
}

#[macro_export]
macro_rules! prism_warn_rate_limited {
    ($category:expr, $($arg:tt)*) => {
        $crate::logging::log_internal($crate::logging::LogLevel::Warn, $category, &format!($($arg)*), true)
    };
}

pub use prism_debug;
pub use prism_debug_rate_limited;
pub use prism_error;
pub use prism_info;
pub use prism_trace;
pub use prism_warn;
pub use prism_warn_rate_limited;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::from_str("info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("WARN"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("invalid"), None);
        assert_eq!(LogLevel::Error.as_str(), "error");
        assert!(LogLevel::Trace < LogLevel::Error);
    }

    #[test]
    fn test_rate_limiting() {
        let mut state = RateLimitState::new(2, Duration::from_millis(100));

        assert!(state.should_allow());
        assert!(state.should_allow());
        assert!(!state.should_allow());

        std::thread::sleep(Duration::from_millis(150));
        assert!(state.should_allow());
    }

    #[test]
    fn test_category_thresholds() {
        let mut config = LoggingConfig::default();
        config.default_level = "error".to_string();
        config.category_levels.clear();
        config
            .category_levels
            .insert("geometry".to_string(), "debug".to_string());

        let logger = Logger::new(config);
        assert!(logger.is_level_enabled(LogCategory::Geometry, LogLevel::Debug));
        assert!(!logger.is_level_enabled(LogCategory::Geometry, LogLevel::Trace));
        assert!(!logger.is_level_enabled(LogCategory::Core, LogLevel::Warn));
        assert!(logger.is_level_enabled(LogCategory::Core, LogLevel::Error));
    }

    #[test]
    fn test_rate_limit_per_category() {
        let config = LoggingConfig {
            max_rate_limit_count: 1,
            rate_limit_seconds: 60,
            ..LoggingConfig::default()
        };
        let logger = Logger::new(config);
        assert!(logger.should_allow_log(LogCategory::Services));
        assert!(!logger.should_allow_log(LogCategory::Services));
        assert!(logger.should_allow_log(LogCategory::Diagnostics));
    }

    #[derive(Clone, Default)]
    struct TargetRecorder(std::sync::Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for TargetRecorder {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.0.lock().push(event.metadata().target().to_string());
        }
    }

    #[test]
    fn test_category_is_event_target() {
        let recorder = TargetRecorder::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());

        tracing::subscriber::with_default(subscriber, || {
            log_internal(LogLevel::Error, LogCategory::Geometry, "singular", false);
            log_internal(LogLevel::Error, LogCategory::Services, "reinit failed", false);
        });

        assert_eq!(
            *recorder.0.lock(),
            vec!["geometry".to_string(), "services".to_string()]
        );
    }

    #[test]
    fn test_macros_do_not_panic_before_init() {
        prism_info!(LogCategory::Core, "hello {}", 1);
        prism_warn_rate_limited!(LogCategory::Services, "retrying {}", "op");
    }
}
