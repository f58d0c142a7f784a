//! Runtime services for the Prism framework
//!
//! Small pieces of plumbing shared by hosts: buffered diagnostic events,
//! reinitialize-and-retry wrappers, and lazily created shared resources.

pub mod diagnostics;
pub mod retry;
pub mod shared;

pub use diagnostics::{
    DiagnosticEvent, DiagnosticRecord, DiagnosticsHub, Subscription, TraceLevel,
};
pub use retry::{ResilientService, RetryPolicy};
pub use shared::{ResourceContext, SharedResource};
