use super::{FaceprintErr, FaceprintError};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

impl FaceprintError {
    pub fn status(&self) -> StatusCode {
        use FaceprintErr as E;
        use StatusCode as SC;
        match self.error {
            E::DoesNotExist(_) => SC::NOT_FOUND,
            E::InvalidFile(_)
            | E::NoFaceDetected(_)
            | E::InvalidParameter(_)
            | E::MultipartRejection(_)
            | E::QueryRejection(_)
            | E::Uuid(_) => SC::BAD_REQUEST,
            // Distinguishes oversized uploads (413) from malformed ones.
            E::Multipart(ref e) => e.status(),
            E::Validation(_) => SC::UNPROCESSABLE_ENTITY,
            E::Unavailable(_) => SC::SERVICE_UNAVAILABLE,
            E::Embedding(_) | E::MalformedPayload(_) | E::Task(_) => SC::INTERNAL_SERVER_ERROR,

            #[cfg(feature = "qdrant")]
            E::Qdrant(ref e) if qdrant_unreachable(e) => SC::SERVICE_UNAVAILABLE,

            #[cfg(feature = "qdrant")]
            E::Qdrant(_) => SC::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The client reports refused connections as `Internal` responses carrying
/// a "Failed to connect" message.
#[cfg(feature = "qdrant")]
fn qdrant_unreachable(error: &qdrant_client::QdrantError) -> bool {
    // gRPC status codes.
    const UNKNOWN: i32 = 2;
    const DEADLINE_EXCEEDED: i32 = 4;
    const INTERNAL: i32 = 13;
    const UNAVAILABLE: i32 = 14;

    let qdrant_client::QdrantError::ResponseError { status } = error else {
        return false;
    };

    match status.code() as i32 {
        UNAVAILABLE | DEADLINE_EXCEEDED => true,
        INTERNAL | UNKNOWN => status.message().starts_with("Failed to connect"),
        _ => false,
    }
}

/// Error response body.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    error_type: ErrorType,

    /// Error message.
    error: String,

    /// Detailed error information.
    #[schema(value_type = Object)]
    detail: Option<serde_json::Value>,

    timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: ErrorType, error: impl Into<String>) -> Self {
        Self {
            error_type,
            error: error.into(),
            detail: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub enum ErrorType {
    Internal,
    Api,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        <Json<ErrorResponse> as IntoResponse>::into_response(Json(self))
    }
}

impl IntoResponse for FaceprintError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        self.print();

        use ErrorType as ET;
        use FaceprintErr as FE;

        let response = match self.error {
            FE::DoesNotExist(e) => ErrorResponse::new(ET::Api, format!("{e} not found")),
            FE::InvalidFile(e) => ErrorResponse::new(ET::Api, e),
            FE::NoFaceDetected(e) => ErrorResponse::new(ET::Api, e),
            FE::InvalidParameter(e) => ErrorResponse::new(ET::Api, e),
            FE::Multipart(e) => ErrorResponse::new(ET::Api, e.body_text()),
            FE::MultipartRejection(e) => ErrorResponse::new(ET::Api, e.body_text()),
            FE::QueryRejection(e) => ErrorResponse::new(ET::Api, e.body_text()),
            FE::Uuid(_) => ErrorResponse::new(ET::Api, "Invalid UUID format"),
            FE::Validation(errors) => {
                let detail = serde_json::to_value(&errors).unwrap_or_default();
                ErrorResponse::new(ET::Api, "Validation failed").with_detail(detail)
            }
            FE::Unavailable(e) => ErrorResponse::new(ET::Internal, e),
            FE::Embedding(_) | FE::MalformedPayload(_) | FE::Task(_) => {
                ErrorResponse::new(ET::Internal, "Internal server error")
            }

            #[cfg(feature = "qdrant")]
            FE::Qdrant(_) if status == StatusCode::SERVICE_UNAVAILABLE => {
                ErrorResponse::new(ET::Internal, "Vector database unavailable")
            }

            #[cfg(feature = "qdrant")]
            FE::Qdrant(_) => ErrorResponse::new(ET::Internal, "Internal server error"),
        };

        (status, response).into_response()
    }
}
