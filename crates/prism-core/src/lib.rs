//! Core functionality for the Prism framework
//!
//! This crate provides the fundamental building blocks for Prism: the
//! classified affine transform and the geometry it acts on, plus the error,
//! logging and configuration layers shared by the rest of the workspace.

pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;

pub use config::{DiagnosticsConfig, LoggingConfig, PrismConfig, ResilienceConfig};
pub use error::{ErrorContext, GeometryError, GeometryResult, PrismError, Result};
pub use geometry::{Matrix, MatrixKind, Point, Rect, Size, Vector};
pub use logging::{LogCategory, LogLevel};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        error::{GeometryError, PrismError, Result},
        geometry::{Matrix, MatrixKind, Point, Rect, Size, Vector},
        logging::{LogCategory, LogLevel},
    };
}

/// Framework version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the core framework with the given configuration
pub fn init(config: &PrismConfig) -> Result<()> {
    config.validate()?;
    if let Err(e) = logging::init(&config.logging) {
        return Err(PrismError::initialization_with_context(
            format!("Failed to initialize logging: {}", e),
            ErrorContext::new("init", "core"),
        ));
    }
    config::init_config_with(config.clone());

    prism_info!(LogCategory::Core, "Prism Core v{} initialized", VERSION);
    Ok(())
}
