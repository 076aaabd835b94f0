use faceprint_embedders::EmbeddingError;
use std::fmt::Display;

/// HTTP error mapping.
pub mod http;

/// Wraps a [FaceprintErr] with the location it was created at.
///
/// Construct it with [err][crate::err] or [map_err][crate::map_err] so the location
/// is captured automatically.
#[derive(Debug)]
pub struct FaceprintError {
    pub error: FaceprintErr,
    file: &'static str,
    line: u32,
    column: u32,
}

impl FaceprintError {
    pub fn new(file: &'static str, line: u32, column: u32, error: FaceprintErr) -> Self {
        Self {
            error,
            file,
            line,
            column,
        }
    }

    /// Log the error along with where it originated.
    pub fn print(&self) {
        tracing::error!(
            "{}:{}:{} | {}",
            self.file,
            self.line,
            self.column,
            self.error
        );
    }
}

impl Display for FaceprintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for FaceprintError {}

#[derive(Debug, thiserror::Error)]
pub enum FaceprintErr {
    #[error("does not exist; {0}")]
    DoesNotExist(String),

    #[error("invalid file; {0}")]
    InvalidFile(String),

    #[error("no face detected; {0}")]
    NoFaceDetected(String),

    #[error("invalid parameter; {0}")]
    InvalidParameter(String),

    #[error("validation; {0}")]
    Validation(#[from] validify::ValidationErrors),

    #[error("multipart; {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("multipart; {0}")]
    MultipartRejection(#[from] axum::extract::multipart::MultipartRejection),

    #[error("query; {0}")]
    QueryRejection(#[from] axum::extract::rejection::QueryRejection),

    #[error("uuid; {0}")]
    Uuid(#[from] uuid::Error),

    #[error("embedding; {0}")]
    Embedding(String),

    #[error("malformed payload; {0}")]
    MalformedPayload(String),

    #[error("unavailable; {0}")]
    Unavailable(String),

    #[error("task; {0}")]
    Task(#[from] tokio::task::JoinError),

    #[cfg(feature = "qdrant")]
    #[error("qdrant; {0}")]
    Qdrant(#[from] qdrant_client::QdrantError),
}

impl From<EmbeddingError> for FaceprintErr {
    fn from(value: EmbeddingError) -> Self {
        match value {
            EmbeddingError::InvalidImage(e) => Self::InvalidFile(e),
            EmbeddingError::NoFaceDetected => {
                Self::NoFaceDetected("no faces detected in the image".to_string())
            }
            e => Self::Embedding(e.to_string()),
        }
    }
}

/// Create an `Err(FaceprintError)` at the call site.
///
/// `err!(DoesNotExist, "Face with ID '{id}'")` formats the message into the variant,
/// `err!(FaceprintErr::Task(e))` wraps an already constructed variant.
#[macro_export]
macro_rules! err {
    ($ty:ident $(, $l:literal $(,)? $($args:expr),* )?) => {
        Err($crate::error::FaceprintError::new(
            file!(),
            line!(),
            column!(),
            $crate::error::FaceprintErr::$ty $( (format!($l, $($args),*)) )?,
        ))
    };
    ($e:expr) => {
        Err($crate::error::FaceprintError::new(
            file!(),
            line!(),
            column!(),
            $e,
        ))
    };
}

/// Unwrap a result or return early, converting its error into a [FaceprintError].
#[macro_export]
macro_rules! map_err {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => {
                return Err($crate::error::FaceprintError::new(
                    file!(),
                    line!(),
                    column!(),
                    $crate::error::FaceprintErr::from(e),
                ))
            }
        }
    };
}
