use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A registered face.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct FaceRecord {
    /// Primary key, also the point ID in the vector database.
    pub id: Uuid,

    pub person_name: String,

    pub description: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Dimensions of the stored embedding.
    pub embedding_size: usize,
}

pub struct FaceInsert<'a> {
    pub person_name: &'a str,
    pub description: Option<&'a str>,
    pub embedding: Vec<f32>,
}

impl<'a> FaceInsert<'a> {
    pub fn new(person_name: &'a str, description: Option<&'a str>, embedding: Vec<f32>) -> Self {
        Self {
            person_name,
            description,
            embedding,
        }
    }
}

/// A search hit.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct FaceMatch {
    pub face: FaceRecord,

    /// Cosine similarity to the query vector.
    pub score: f32,
}

/// Vector collection information as reported by the database.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CollectionStats {
    pub collection_name: String,
    pub vector_size: u64,
    pub distance: String,
    pub points_count: u64,
    pub segments_count: u64,
    pub status: String,
}
