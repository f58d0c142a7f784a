//! Prism - presentation primitives for hosts and tools
//!
//! Prism bundles a classified 2D affine transform with the geometry it acts
//! on, and a handful of runtime services (buffered diagnostics, resilient
//! service wrappers, shared resources) that presentation hosts tend to need.

pub use prism_core;
pub use prism_services;

pub use prism_core::{PrismConfig, PrismError, Result, VERSION};

use prism_core::logging::LogCategory;

/// Unified prelude module that exports all commonly used types
pub mod prelude {
    pub use prism_core::prelude::*;
    pub use prism_services::{
        DiagnosticEvent, DiagnosticsHub, ResilientService, RetryPolicy, SharedResource,
    };
}

/// Initialize every layer with the default configuration.
pub fn init() -> Result<()> {
    init_with_config(&PrismConfig::default())
}

/// Initialize logging and global config, then bring up the diagnostics hub.
pub fn init_with_config(config: &PrismConfig) -> Result<()> {
    prism_core::init(config)?;
    let hub = prism_services::diagnostics::init_hub(config.diagnostics.clone());
    prism_core::prism_debug!(
        LogCategory::Diagnostics,
        "diagnostics hub ready (enabled: {}, backlog: {})",
        hub.config().enabled,
        hub.config().max_pending_events
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_init() {
        assert!(init().is_ok());
        assert!(prism_core::config::get_config_manager().is_some());
    }
}
