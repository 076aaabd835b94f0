//! Http specific DTOs.

use crate::core::model::face::FaceRecord;
use crate::error::FaceprintError;
use crate::{err, map_err};
use axum::body::Bytes;
use axum::extract::Multipart;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Name of the multipart field holding the image.
const IMAGE_FIELD: &str = "image";

/// A multipart form with one image file and arbitrary text fields.
pub(super) struct ImageForm {
    pub content_type: Option<String>,
    pub image: Bytes,
    pub fields: HashMap<String, String>,
}

impl ImageForm {
    pub async fn read(mut form: Multipart) -> Result<Self, FaceprintError> {
        let mut image = None;
        let mut fields = HashMap::new();

        while let Some(field) = map_err!(form.next_field().await) {
            let Some(name) = field.name().map(String::from) else {
                continue;
            };

            if name == IMAGE_FIELD {
                let content_type = field.content_type().map(String::from);
                let bytes = map_err!(field.bytes().await);
                image = Some((content_type, bytes));
                continue;
            }

            let value = map_err!(field.text().await);
            fields.insert(name, value);
        }

        let Some((content_type, image)) = image else {
            return err!(InvalidFile, "Missing '{IMAGE_FIELD}' file");
        };

        Ok(Self {
            content_type,
            image,
            fields,
        })
    }

    /// Remove a text field, treating empty values as absent.
    pub fn take(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name).filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub(super) struct ListFacesParams {
    /// Maximum amount of faces to return, 1 to 1000. Defaults to 100.
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(super) struct RegisterFaceResponse {
    pub face_id: Uuid,
    pub person_name: String,
    pub embedding_size: usize,

    /// Detection confidence of the registered face.
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

impl RegisterFaceResponse {
    pub fn new(record: FaceRecord, confidence: f32) -> Self {
        Self {
            face_id: record.id,
            person_name: record.person_name,
            embedding_size: record.embedding_size,
            confidence,
            created_at: record.created_at,
            message: String::from("Face registered successfully"),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub(super) struct FaceInfo {
    pub face_id: Uuid,
    pub person_name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub embedding_size: usize,
}

impl From<FaceRecord> for FaceInfo {
    fn from(record: FaceRecord) -> Self {
        Self {
            face_id: record.id,
            person_name: record.person_name,
            description: record.description,
            created_at: record.created_at,
            embedding_size: record.embedding_size,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub(super) struct FaceListResponse {
    pub faces: Vec<FaceInfo>,
    pub total_count: usize,
}

impl From<Vec<FaceRecord>> for FaceListResponse {
    fn from(records: Vec<FaceRecord>) -> Self {
        let faces: Vec<FaceInfo> = records.into_iter().map(FaceInfo::from).collect();
        Self {
            total_count: faces.len(),
            faces,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub(super) struct DeleteFaceResponse {
    pub face_id: Uuid,
    pub message: String,
    pub deleted_at: DateTime<Utc>,
}

impl DeleteFaceResponse {
    pub fn new(face_id: Uuid) -> Self {
        Self {
            face_id,
            message: String::from("Face deleted successfully"),
            deleted_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub(super) struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(super) struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(super) struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub docs: String,
    pub health: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> FaceRecord {
        FaceRecord {
            id: Uuid::new_v4(),
            person_name: name.to_string(),
            description: Some("desc".to_string()),
            created_at: Utc::now(),
            embedding_size: 512,
        }
    }

    #[test]
    fn face_list_counts_faces() {
        let response = FaceListResponse::from(vec![record("a"), record("b")]);
        assert_eq!(2, response.total_count);
        assert_eq!("b", response.faces[1].person_name);
    }

    #[test]
    fn face_info_does_not_leak_vectors() {
        let json = serde_json::to_value(FaceInfo::from(record("a"))).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            vec![
                "created_at",
                "description",
                "embedding_size",
                "face_id",
                "person_name"
            ],
            keys
        );
    }

    #[test]
    fn register_response_has_default_message() {
        let response = RegisterFaceResponse::new(record("a"), 0.99);
        assert_eq!("Face registered successfully", response.message);
        assert_eq!(512, response.embedding_size);
    }
}
