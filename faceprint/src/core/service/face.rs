use crate::core::model::face::{FaceInsert, FaceRecord};
use crate::core::provider::ProviderState;
use crate::error::FaceprintError;
use crate::{err, map_err};
use dto::{FaceProcessorInfo, FaceVerification, ImageUpload, RegisterFace, SystemStats};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use uuid::Uuid;
use validify::Validify;

/// Amount of faces listed when the caller does not specify a limit.
pub const DEFAULT_LIST_LIMIT: u32 = 100;
const MAX_LIST_LIMIT: u32 = 1000;

/// High level operations related to registered faces.
#[derive(Clone)]
pub struct FaceService {
    providers: ProviderState,

    /// Vector collection holding the embeddings.
    collection: String,

    /// Used for verification when the request does not specify a threshold.
    default_threshold: f32,

    /// Set once the collection is known to exist.
    collection_ready: Arc<OnceCell<()>>,
}

impl FaceService {
    pub fn new(providers: ProviderState, collection: &str, default_threshold: f32) -> Self {
        Self {
            providers,
            collection: collection.to_string(),
            default_threshold,
            collection_ready: Arc::default(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the face collection in the vector database if it does not exist.
    ///
    /// Every database operation calls this first, so a failed attempt is retried on the next
    /// request. Once it succeeds the database is not asked again.
    pub async fn init(&self) -> Result<(), FaceprintError> {
        self.collection_ready
            .get_or_try_init(|| async {
                let size = self.providers.embedder.model().size;
                self.providers
                    .vector
                    .init_collection(&self.collection, size)
                    .await?;
                info!("Initialised face collection '{}'", self.collection);
                Ok::<_, FaceprintError>(())
            })
            .await?;
        Ok(())
    }

    /// Extract the embedding of the face in `image` and store it under the given name.
    ///
    /// Returns the stored record and the detection confidence of the face.
    ///
    /// * `image`: Uploaded image.
    /// * `data`: Person information.
    pub async fn register(
        &self,
        image: ImageUpload<'_>,
        mut data: RegisterFace,
    ) -> Result<(FaceRecord, f32), FaceprintError> {
        map_err!(data.validify());
        image.check()?;

        let face = self.providers.embedder.embed_face(image.bytes).await?;
        self.check_dimensions(face.embedding.len())?;

        let description = data.description.as_deref().filter(|d| !d.trim().is_empty());
        let insert = FaceInsert::new(&data.person_name, description, face.embedding);

        self.init().await?;
        let record = self
            .providers
            .vector
            .insert_face(&self.collection, insert)
            .await?;

        info!(
            "Registered face for '{}' with ID '{}'",
            record.person_name, record.id
        );

        Ok((record, face.confidence))
    }

    /// Compare the face in `image` with the closest registered face.
    ///
    /// * `image`: Uploaded image.
    /// * `threshold`: Minimum cosine similarity for a match. Defaults to the configured one.
    pub async fn verify(
        &self,
        image: ImageUpload<'_>,
        threshold: Option<f32>,
    ) -> Result<FaceVerification, FaceprintError> {
        let threshold = threshold.unwrap_or(self.default_threshold);
        if !(0.0..=1.0).contains(&threshold) {
            return err!(InvalidParameter, "Threshold must be between 0.0 and 1.0");
        }

        image.check()?;

        let face = self.providers.embedder.embed_face(image.bytes).await?;
        self.check_dimensions(face.embedding.len())?;

        self.init().await?;
        let best = self
            .providers
            .vector
            .search(&self.collection, face.embedding, 1, Some(threshold))
            .await?
            .into_iter()
            .next();

        // The search only returns faces at or above the threshold.
        let verification = match best {
            Some(best) if best.score >= threshold => FaceVerification {
                is_match: true,
                matched_face_id: Some(best.face.id),
                matched_person_name: Some(best.face.person_name),
                similarity_score: best.score,
                confidence: face.confidence,
                threshold_used: threshold,
            },
            _ => FaceVerification {
                is_match: false,
                matched_face_id: None,
                matched_person_name: None,
                similarity_score: 0.0,
                confidence: face.confidence,
                threshold_used: threshold,
            },
        };

        info!(
            "Verification | match: {} | score: {:.4} | threshold: {threshold}",
            verification.is_match, verification.similarity_score
        );

        Ok(verification)
    }

    /// List registered faces.
    ///
    /// * `limit`: Amount of faces to return, 1 to 1000.
    pub async fn list(&self, limit: Option<u32>) -> Result<Vec<FaceRecord>, FaceprintError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        if !(1..=MAX_LIST_LIMIT).contains(&limit) {
            return err!(InvalidParameter, "Limit must be between 1 and {MAX_LIST_LIMIT}");
        }
        self.init().await?;
        self.providers
            .vector
            .list_faces(&self.collection, limit)
            .await
    }

    /// Get the face for the given ID.
    ///
    /// * `id`: Face ID.
    pub async fn get(&self, id: Uuid) -> Result<FaceRecord, FaceprintError> {
        self.init().await?;
        match self.providers.vector.get_face(&self.collection, id).await? {
            Some(face) => Ok(face),
            None => err!(DoesNotExist, "Face with ID '{id}'"),
        }
    }

    /// Delete the face for the given ID.
    ///
    /// * `id`: Face ID.
    pub async fn delete(&self, id: Uuid) -> Result<(), FaceprintError> {
        self.init().await?;
        if !self
            .providers
            .vector
            .delete_face(&self.collection, id)
            .await?
        {
            return err!(DoesNotExist, "Face with ID '{id}'");
        }
        info!("Deleted face '{id}'");
        Ok(())
    }

    /// Remove all registered faces.
    pub async fn clear(&self) -> Result<(), FaceprintError> {
        let size = self.providers.embedder.model().size;
        self.providers.vector.clear(&self.collection, size).await?;
        warn!("Cleared all faces from '{}'", self.collection);
        Ok(())
    }

    pub async fn stats(&self) -> Result<SystemStats, FaceprintError> {
        self.init().await?;
        let database = self
            .providers
            .vector
            .collection_stats(&self.collection)
            .await?;
        let model = self.providers.embedder.model();

        Ok(SystemStats {
            database,
            face_processor: FaceProcessorInfo {
                model_name: model.name,
                embedding_size: model.size,
                detection_confidence: model.detection_confidence,
            },
        })
    }

    /// Check whether the vector database is reachable.
    pub async fn health(&self) -> Result<(), FaceprintError> {
        if let Err(e) = self.providers.vector.health().await {
            e.print();
            return err!(Unavailable, "Service unhealthy");
        }
        Ok(())
    }

    fn check_dimensions(&self, size: usize) -> Result<(), FaceprintError> {
        let model = self.providers.embedder.model();
        if size != model.size {
            return err!(
                Embedding,
                "Model '{}' produced an embedding of size {size}, expected {}",
                model.name,
                model.size
            );
        }
        Ok(())
    }
}

/// DTOs for face operations.
pub mod dto {
    use crate::core::model::face::CollectionStats;
    use crate::error::FaceprintError;
    use crate::err;
    use serde::Serialize;
    use utoipa::ToSchema;
    use uuid::Uuid;
    use validify::Validify;

    /// Person information attached to a registered face.
    #[derive(Debug, Clone, Default, Validify)]
    pub struct RegisterFace {
        #[modify(trim)]
        #[validate(length(min = 1, max = 100, message = "person name must be 1 to 100 characters"))]
        pub person_name: String,

        #[validate(length(max = 500, message = "description cannot exceed 500 characters"))]
        pub description: Option<String>,
    }

    impl RegisterFace {
        pub fn new(person_name: impl Into<String>, description: Option<String>) -> Self {
            Self {
                person_name: person_name.into(),
                description,
            }
        }
    }

    /// An uploaded image file.
    #[derive(Debug, Clone, Copy)]
    pub struct ImageUpload<'a> {
        /// Content type declared by the client.
        pub content_type: Option<&'a str>,
        pub bytes: &'a [u8],
    }

    impl<'a> ImageUpload<'a> {
        pub fn new(content_type: Option<&'a str>, bytes: &'a [u8]) -> Self {
            Self {
                content_type,
                bytes,
            }
        }

        /// Only `image/*` uploads with content are accepted.
        pub fn check(&self) -> Result<(), FaceprintError> {
            if !self
                .content_type
                .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
            {
                return err!(InvalidFile, "File must be an image");
            }
            if self.bytes.is_empty() {
                return err!(InvalidFile, "Image file is empty");
            }
            Ok(())
        }
    }

    #[derive(Debug, Serialize, ToSchema)]
    pub struct FaceVerification {
        /// Whether the face matches a registered face.
        pub is_match: bool,

        pub matched_face_id: Option<Uuid>,

        pub matched_person_name: Option<String>,

        /// Cosine similarity with the best match, 0 if nothing was found.
        pub similarity_score: f32,

        /// Detection confidence of the face in the uploaded image.
        pub confidence: f32,

        pub threshold_used: f32,
    }

    #[derive(Debug, Serialize, ToSchema)]
    pub struct SystemStats {
        pub database: CollectionStats,
        pub face_processor: FaceProcessorInfo,
    }

    #[derive(Debug, Serialize, ToSchema)]
    pub struct FaceProcessorInfo {
        pub model_name: String,
        pub embedding_size: usize,
        pub detection_confidence: f32,
    }
}
