use super::provider::Identity;
use crate::error::FaceprintError;

pub use faceprint_embedders::{FaceBox, FaceEmbedding, FaceModel};

/// Operations for face embeddings.
#[async_trait::async_trait]
pub trait FaceEmbedder: Identity {
    /// Detect the most prominent face in the encoded image and return its embedding.
    ///
    /// * `image`: Encoded image bytes (JPEG, PNG, ...).
    async fn embed_face(&self, image: &[u8]) -> Result<FaceEmbedding, FaceprintError>;

    /// The model backing this embedder.
    fn model(&self) -> FaceModel;
}
