use clap::Parser;

// Adapter identifiers.

#[cfg(feature = "qdrant")]
pub const QDRANT_ID: &str = "qdrant";
#[cfg(feature = "insightface")]
pub const INSIGHTFACE_EMBEDDER_ID: &str = "insightface";

/// Reported by the health and root endpoints.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const SERVICE_NAME: &str = "Face Recognition API";

/// The default address to listen on.
const DEFAULT_ADDRESS: &str = "0.0.0.0:8000";
/// The default Qdrant gRPC endpoint.
#[cfg(feature = "qdrant")]
const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
/// The default collection holding face embeddings.
const DEFAULT_COLLECTION: &str = "face_embeddings";
#[cfg(feature = "insightface")]
const DEFAULT_DETECTOR_MODEL: &str = "models/det_10g.onnx";
#[cfg(feature = "insightface")]
const DEFAULT_RECOGNIZER_MODEL: &str = "models/w600k_r50.onnx";
/// Minimum face detection score.
const DEFAULT_DETECTION_CONFIDENCE: f32 = 0.5;
/// Cosine similarity required for a verification match when the request does not specify one.
const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.6;

#[derive(Debug, Parser)]
#[command(name = "faceprint", version, about = "Face embedding registration and verification", long_about = None)]
pub struct StartArgs {
    /// Address to listen on.
    #[arg(long, short)]
    address: Option<String>,

    /// RUST_LOG string to use as the env filter.
    #[arg(long, short)]
    log: Option<String>,

    /// Qdrant URL.
    #[cfg(feature = "qdrant")]
    #[arg(long)]
    qdrant_url: Option<String>,

    /// Name of the vector collection holding the embeddings.
    #[arg(long)]
    collection: Option<String>,

    /// Path to the face detection ONNX model.
    #[cfg(feature = "insightface")]
    #[arg(long)]
    detector_model: Option<String>,

    /// Path to the face recognition ONNX model.
    #[cfg(feature = "insightface")]
    #[arg(long)]
    recognizer_model: Option<String>,

    /// Minimum confidence for a detected face to be used.
    #[arg(long)]
    detection_confidence: Option<f32>,

    /// Default similarity threshold for verification.
    #[arg(long)]
    similarity_threshold: Option<f32>,

    /// CORS allowed origins, comma separated. `*` allows any origin.
    #[arg(long)]
    cors_allowed_origins: Option<String>,
}

/// Implement a getter method on [StartArgs], using the `$var` environment variable as a fallback
/// and the default if neither the argument nor the environment variable is set.
/// Typed getters panic on unparsable environment values.
macro_rules! arg {
    ($id:ident, $var:literal, default $value:expr) => {
        impl StartArgs {
            pub fn $id(&self) -> String {
                match &self.$id {
                    Some(val) => val.to_string(),
                    None => match std::env::var($var) {
                        Ok(val) => val,
                        Err(_) => $value,
                    },
                }
            }
        }
    };
    ($id:ident: $ty:ty, $var:literal, default $value:expr) => {
        impl StartArgs {
            pub fn $id(&self) -> $ty {
                match self.$id {
                    Some(val) => val,
                    None => match std::env::var($var) {
                        Ok(val) => val.parse().unwrap_or_else(|_| {
                            panic!("Invalid value '{val}' for {}", $var)
                        }),
                        Err(_) => $value,
                    },
                }
            }
        }
    };
}

impl StartArgs {
    pub fn allowed_origins(&self) -> Vec<String> {
        let origins = match &self.cors_allowed_origins {
            Some(origins) => origins.clone(),
            None => std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| String::from("*")),
        };

        origins
            .split(',')
            .map(str::trim)
            .filter_map(|o| (!o.is_empty()).then_some(String::from(o)))
            .collect()
    }
}

arg!(log,             "RUST_LOG",        default "info".to_string());
arg!(address,         "ADDRESS",         default DEFAULT_ADDRESS.to_string());
arg!(collection,      "FACE_COLLECTION", default DEFAULT_COLLECTION.to_string());

arg!(detection_confidence: f32, "DETECTION_CONFIDENCE", default DEFAULT_DETECTION_CONFIDENCE);
arg!(similarity_threshold: f32, "SIMILARITY_THRESHOLD", default DEFAULT_SIMILARITY_THRESHOLD);

// qdrant

#[cfg(feature = "qdrant")]
arg!(qdrant_url,      "QDRANT_URL",      default DEFAULT_QDRANT_URL.to_string());

// insightface

#[cfg(feature = "insightface")]
arg!(detector_model,  "DETECTOR_MODEL_PATH",   default DEFAULT_DETECTOR_MODEL.to_string());

#[cfg(feature = "insightface")]
arg!(recognizer_model, "RECOGNIZER_MODEL_PATH", default DEFAULT_RECOGNIZER_MODEL.to_string());
