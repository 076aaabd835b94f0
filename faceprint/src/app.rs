//! Module containing concrete implementations from the [core](crate::core) module.

/// Face embedder implementations.
pub mod embedder;

/// Application state configuration.
pub mod state;

/// Vector database implementations.
pub mod vector;

/// HTTP server implementation.
pub mod server;
