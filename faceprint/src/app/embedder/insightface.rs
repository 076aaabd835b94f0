use crate::config::INSIGHTFACE_EMBEDDER_ID;
use crate::core::embeddings::{FaceEmbedder, FaceEmbedding, FaceModel};
use crate::core::provider::Identity;
use crate::error::FaceprintError;
use crate::{map_err, timed};
use faceprint_embedders::insightface::{InsightFace, InsightFaceConfig};
use std::sync::Arc;

/// Runs the ONNX face models on the blocking thread pool.
#[derive(Clone)]
pub struct InsightFaceEmbedder {
    model: Arc<InsightFace>,
}

impl InsightFaceEmbedder {
    /// Load the detection and recognition sessions. Panics when the models cannot be loaded.
    pub fn new(config: InsightFaceConfig) -> Self {
        tracing::info!(
            "Loading face models | detector: {} | recognizer: {}",
            config.detector_path.display(),
            config.recognizer_path.display()
        );

        let model = InsightFace::load(config).expect("error loading face models");

        Self {
            model: Arc::new(model),
        }
    }
}

impl Identity for InsightFaceEmbedder {
    fn id(&self) -> &'static str {
        INSIGHTFACE_EMBEDDER_ID
    }
}

#[async_trait::async_trait]
impl FaceEmbedder for InsightFaceEmbedder {
    async fn embed_face(&self, image: &[u8]) -> Result<FaceEmbedding, FaceprintError> {
        let model = self.model.clone();
        let image = image.to_vec();

        let result = timed!(
            "Face embedding",
            map_err!(tokio::task::spawn_blocking(move || model.process(&image)).await)
        );

        let face = map_err!(result);

        tracing::debug!(
            "Embedded face | confidence: {:.3} | faces detected: {} | box: ({:.0}, {:.0}) {:.0}x{:.0}",
            face.confidence,
            face.faces_detected,
            face.face.x1,
            face.face.y1,
            face.face.width(),
            face.face.height()
        );

        Ok(face)
    }

    fn model(&self) -> FaceModel {
        self.model.model()
    }
}
