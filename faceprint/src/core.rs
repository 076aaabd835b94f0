//! The core module defines the business logic of faceprint.
//! It provides the traits and models upstream adapters need to implement.

/// Face embedding interfaces.
pub mod embeddings;

/// Face records and collection models.
pub mod model;

/// Provider infrastructure.
pub mod provider;

/// High level faceprint APIs.
pub mod service;

/// Vector DB interfaces.
pub mod vector;

/// Utility macro for timing short expressions so we don't polute the codebase.
///
/// Logs the amount of milliseconds the expression took to complete.
#[macro_export]
macro_rules! timed {
    ($msg:literal, $expr:expr) => {{
        let start = std::time::Instant::now();
        let result = $expr;
        let elapsed = start.elapsed().as_millis();
        tracing::debug!("{} ({elapsed}ms)", $msg);
        result
    }};
}
