use super::model::face::{CollectionStats, FaceInsert, FaceMatch, FaceRecord};
use super::provider::Identity;
use crate::error::FaceprintError;
use uuid::Uuid;

/// Operations related to the vector database holding face embeddings.
///
/// Implementations own the storage of the vectors and their payloads,
/// the service layer only deals with [FaceRecord]s.
#[async_trait::async_trait]
pub trait VectorDb: Identity {
    /// Create the collection if it does not already exist.
    ///
    /// * `name`: Collection name.
    /// * `size`: Vector dimensions.
    async fn init_collection(&self, name: &str, size: usize) -> Result<(), FaceprintError>;

    /// Store a face embedding and its metadata. The implementation assigns the ID
    /// and creation timestamp.
    ///
    /// * `collection`: Collection name.
    /// * `insert`: Face data.
    async fn insert_face(
        &self,
        collection: &str,
        insert: FaceInsert<'_>,
    ) -> Result<FaceRecord, FaceprintError>;

    /// Find the faces closest to `vector` by cosine similarity.
    ///
    /// * `collection`: Collection name.
    /// * `vector`: Query embedding.
    /// * `limit`: Maximum amount of matches.
    /// * `score_threshold`: Matches scoring below this are discarded.
    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        score_threshold: Option<f32>,
    ) -> Result<Vec<FaceMatch>, FaceprintError>;

    async fn get_face(&self, collection: &str, id: Uuid)
        -> Result<Option<FaceRecord>, FaceprintError>;

    /// List stored faces without their vectors.
    async fn list_faces(&self, collection: &str, limit: u32)
        -> Result<Vec<FaceRecord>, FaceprintError>;

    /// Returns `false` if no face with the given ID exists.
    async fn delete_face(&self, collection: &str, id: Uuid) -> Result<bool, FaceprintError>;

    async fn collection_stats(&self, collection: &str) -> Result<CollectionStats, FaceprintError>;

    /// Remove every face by dropping and recreating the collection.
    async fn clear(&self, collection: &str, size: usize) -> Result<(), FaceprintError>;

    /// Round trip to the database.
    async fn health(&self) -> Result<(), FaceprintError>;
}
