//! Error types for the Prism framework

use std::collections::HashMap;
use thiserror::Error;

/// Context information for errors to aid in debugging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Operation that was being performed when the error occurred
    pub operation: String,
    /// Component or module where the error occurred
    pub component: String,
    /// Additional contextual data
    pub metadata: HashMap<String, String>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(operation: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            component: component.into(),
            metadata: HashMap::new(),
        }
    }

    /// Add metadata to the context
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Format context for logging
    pub fn format_for_log(&self) -> String {
        let mut parts = vec![
            format!("operation={}", self.operation),
            format!("component={}", self.component),
        ];

        if !self.metadata.is_empty() {
            let mut entries: Vec<_> = self.metadata.iter().collect();
            entries.sort();
            let metadata_str = entries
                .into_iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("metadata=[{}]", metadata_str));
        }

        parts.join(", ")
    }
}

/// Errors raised by the geometry primitives.
///
/// These are precondition failures: the offending value is never mutated
/// when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// The matrix determinant is zero within tolerance.
    #[error("Transform is not invertible (determinant = {determinant})")]
    NotInvertible { determinant: f64 },

    /// Width or height is negative.
    #[error("Negative dimension: width={width}, height={height}")]
    NegativeDimension { width: f64, height: f64 },

    /// Text could not be parsed into a geometry value.
    #[error("Cannot parse '{input}': {reason}")]
    Parse { input: String, reason: String },
}

impl GeometryError {
    pub(crate) fn parse(input: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Main error type for Prism operations
#[derive(Debug, Error)]
pub enum PrismError {
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Initialization error: {message}")]
    Initialization {
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PrismError {
    /// Create an initialization error with context
    pub fn initialization_with_context<S: Into<String>>(msg: S, context: ErrorContext) -> Self {
        Self::Initialization {
            message: msg.into(),
            context: Some(context),
        }
    }

    /// Create a configuration error with context
    pub fn configuration_with_context<S: Into<String>>(msg: S, context: ErrorContext) -> Self {
        Self::Configuration {
            message: msg.into(),
            context: Some(context),
        }
    }

    /// Create a configuration error from a string
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration {
            message: msg.into(),
            context: None,
        }
    }

    /// Get the error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::Initialization { context, .. } | Self::Configuration { context, .. } => {
                context.as_ref()
            }
            Self::Geometry(_) | Self::Io(_) | Self::Json(_) => None,
        }
    }

    /// Format error with context for logging
    pub fn format_for_log(&self) -> String {
        let base_msg = self.to_string();
        if let Some(context) = self.context() {
            format!("{} [{}]", base_msg, context.format_for_log())
        } else {
            base_msg
        }
    }
}

/// Result type alias for Prism operations
pub type Result<T> = std::result::Result<T, PrismError>;

/// Result type for geometry operations.
pub type GeometryResult<T> = std::result::Result<T, GeometryError>;
