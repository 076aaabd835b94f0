use std::sync::Arc;

/// OpenAPI definitions.
mod api;

/// HTTP specific DTOs.
mod dto;

/// HTTP API.
pub mod router;

/// Maximum accepted request body size, applies to image uploads.
pub const MAX_BODY_SIZE: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct HttpConfiguration {
    pub cors_origins: Arc<[String]>,
}

#[cfg(test)]
impl Default for HttpConfiguration {
    fn default() -> Self {
        HttpConfiguration {
            cors_origins: Arc::new([String::from("*")]),
        }
    }
}
