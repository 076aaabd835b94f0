use crate::config::QDRANT_ID;
use crate::core::model::face::{CollectionStats, FaceInsert, FaceMatch, FaceRecord};
use crate::core::provider::Identity;
use crate::core::vector::VectorDb;
use crate::{err, error::FaceprintError, map_err};
use chrono::{DateTime, Utc};
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config;
use qdrant_client::qdrant::{
    CollectionStatus, CreateCollectionBuilder, DeletePointsBuilder, Distance, GetPointsBuilder,
    PointId, PointStruct, PointsIdsList, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const PERSON_NAME_PROPERTY: &str = "person_name";
const DESCRIPTION_PROPERTY: &str = "description";
const CREATED_AT_PROPERTY: &str = "created_at";
const EMBEDDING_SIZE_PROPERTY: &str = "embedding_size";

/// Alias for an arced Qdrant client.
pub type QdrantDb = Arc<Qdrant>;

pub fn init(url: &str) -> QdrantDb {
    tracing::info!("Connecting to qdrant at {url}");
    Arc::new(
        Qdrant::from_url(url)
            .build()
            .expect("error initialising qdrant"),
    )
}

impl Identity for Qdrant {
    fn id(&self) -> &'static str {
        QDRANT_ID
    }
}

#[async_trait::async_trait]
impl VectorDb for Qdrant {
    async fn init_collection(&self, name: &str, size: usize) -> Result<(), FaceprintError> {
        if map_err!(self.collection_exists(name).await) {
            tracing::info!("Collection '{name}' already exists");
            return Ok(());
        }

        map_err!(self.create_collection(create_collection(name, size)).await);

        tracing::info!("Created collection '{name}' of size {size}");

        Ok(())
    }

    async fn insert_face(
        &self,
        collection: &str,
        insert: FaceInsert<'_>,
    ) -> Result<FaceRecord, FaceprintError> {
        let FaceInsert {
            person_name,
            description,
            embedding,
        } = insert;

        let record = FaceRecord {
            id: Uuid::new_v4(),
            person_name: person_name.to_string(),
            description: description.map(String::from),
            created_at: Utc::now(),
            embedding_size: embedding.len(),
        };

        let point = PointStruct::new(record.id.to_string(), embedding, record_payload(&record));

        map_err!(
            self.upsert_points(UpsertPointsBuilder::new(collection, vec![point]).wait(true))
                .await
        );

        Ok(record)
    }

    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        score_threshold: Option<f32>,
    ) -> Result<Vec<FaceMatch>, FaceprintError> {
        let mut search = SearchPointsBuilder::new(collection, vector, limit).with_payload(true);

        if let Some(threshold) = score_threshold {
            search = search.score_threshold(threshold);
        }

        let response = map_err!(self.search_points(search).await);

        response
            .result
            .into_iter()
            .map(|point| {
                Ok(FaceMatch {
                    face: face_record(point.id, point.payload)?,
                    score: point.score,
                })
            })
            .collect()
    }

    async fn get_face(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<FaceRecord>, FaceprintError> {
        let get = GetPointsBuilder::new(collection, vec![PointId::from(id.to_string())])
            .with_payload(true)
            .with_vectors(false);

        let response = map_err!(self.get_points(get).await);

        response
            .result
            .into_iter()
            .next()
            .map(|point| face_record(point.id, point.payload))
            .transpose()
    }

    async fn list_faces(
        &self,
        collection: &str,
        limit: u32,
    ) -> Result<Vec<FaceRecord>, FaceprintError> {
        let scroll = ScrollPointsBuilder::new(collection)
            .limit(limit)
            .with_payload(true)
            .with_vectors(false);

        let response = map_err!(self.scroll(scroll).await);

        response
            .result
            .into_iter()
            .map(|point| face_record(point.id, point.payload))
            .collect()
    }

    async fn delete_face(&self, collection: &str, id: Uuid) -> Result<bool, FaceprintError> {
        // Qdrant deletes are idempotent so the existence has to be checked upfront.
        if self.get_face(collection, id).await?.is_none() {
            return Ok(false);
        }

        let delete = DeletePointsBuilder::new(collection)
            .points(PointsIdsList {
                ids: vec![PointId::from(id.to_string())],
            })
            .wait(true);

        map_err!(self.delete_points(delete).await);

        Ok(true)
    }

    async fn collection_stats(&self, collection: &str) -> Result<CollectionStats, FaceprintError> {
        let response = map_err!(self.collection_info(collection).await);

        let Some(info) = response.result else {
            return err!(DoesNotExist, "Collection '{collection}'");
        };

        let params = info
            .config
            .and_then(|config| config.params)
            .and_then(|params| params.vectors_config)
            .and_then(|vectors| vectors.config)
            .and_then(|config| match config {
                Config::Params(params) => Some(params),
                Config::ParamsMap(_) => None,
            });

        let (vector_size, distance) = match params {
            Some(params) => (
                params.size,
                Distance::try_from(params.distance)
                    .map(|d| d.as_str_name().to_string())
                    .unwrap_or_else(|_| params.distance.to_string()),
            ),
            None => (0, String::from("unknown")),
        };

        let status = CollectionStatus::try_from(info.status)
            .map(|s| s.as_str_name().to_string())
            .unwrap_or_else(|_| info.status.to_string());

        Ok(CollectionStats {
            collection_name: collection.to_string(),
            vector_size,
            distance,
            points_count: info.points_count.unwrap_or_default(),
            segments_count: info.segments_count,
            status,
        })
    }

    async fn clear(&self, collection: &str, size: usize) -> Result<(), FaceprintError> {
        map_err!(self.delete_collection(collection).await);
        map_err!(
            self.create_collection(create_collection(collection, size))
                .await
        );
        tracing::info!("Recreated collection '{collection}'");
        Ok(())
    }

    async fn health(&self) -> Result<(), FaceprintError> {
        let reply = map_err!(self.health_check().await);
        tracing::debug!("Qdrant {} is healthy", reply.version);
        Ok(())
    }
}

fn create_collection(name: &str, size: usize) -> CreateCollectionBuilder {
    CreateCollectionBuilder::new(name)
        .vectors_config(VectorParamsBuilder::new(size as u64, Distance::Cosine))
}

fn record_payload(record: &FaceRecord) -> Payload {
    let mut payload = Payload::new();
    payload.insert(PERSON_NAME_PROPERTY, record.person_name.clone());
    if let Some(ref description) = record.description {
        payload.insert(DESCRIPTION_PROPERTY, description.clone());
    }
    payload.insert(CREATED_AT_PROPERTY, record.created_at.to_rfc3339());
    payload.insert(EMBEDDING_SIZE_PROPERTY, record.embedding_size as i64);
    payload
}

fn face_record(
    id: Option<PointId>,
    payload: HashMap<String, Value>,
) -> Result<FaceRecord, FaceprintError> {
    let id = match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Uuid(id)) => map_err!(Uuid::parse_str(&id)),
        Some(PointIdOptions::Num(id)) => {
            return err!(MalformedPayload, "numeric point ID '{id}'");
        }
        None => return err!(MalformedPayload, "point without ID"),
    };

    let Some(person_name) = string_property(&payload, PERSON_NAME_PROPERTY) else {
        return err!(MalformedPayload, "point '{id}' has no {PERSON_NAME_PROPERTY}");
    };

    let Some(created_at) = string_property(&payload, CREATED_AT_PROPERTY) else {
        return err!(MalformedPayload, "point '{id}' has no {CREATED_AT_PROPERTY}");
    };

    let created_at = match DateTime::parse_from_rfc3339(&created_at) {
        Ok(date) => date.with_timezone(&Utc),
        Err(e) => return err!(MalformedPayload, "point '{id}' {CREATED_AT_PROPERTY}: {e}"),
    };

    let embedding_size = match payload.get(EMBEDDING_SIZE_PROPERTY).and_then(|v| v.kind.as_ref()) {
        Some(Kind::IntegerValue(size)) if *size > 0 => *size as usize,
        Some(Kind::DoubleValue(size)) if *size >= 1.0 && size.fract() == 0.0 => *size as usize,
        Some(_) => {
            return err!(MalformedPayload, "point '{id}' has an invalid {EMBEDDING_SIZE_PROPERTY}")
        }
        None => return err!(MalformedPayload, "point '{id}' has no {EMBEDDING_SIZE_PROPERTY}"),
    };

    Ok(FaceRecord {
        id,
        person_name,
        description: string_property(&payload, DESCRIPTION_PROPERTY),
        created_at,
        embedding_size,
    })
}

fn string_property(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaceprintErr;

    fn record() -> FaceRecord {
        FaceRecord {
            id: Uuid::new_v4(),
            person_name: "Ada".to_string(),
            description: None,
            created_at: Utc::now(),
            embedding_size: 512,
        }
    }

    fn into_map(payload: Payload) -> HashMap<String, Value> {
        payload.into()
    }

    #[test]
    fn payload_round_trips_into_record() {
        let mut stored = record();
        stored.description = Some("front door".to_string());

        let payload = into_map(record_payload(&stored));
        let parsed = face_record(Some(PointId::from(stored.id.to_string())), payload).unwrap();

        assert_eq!(stored.id, parsed.id);
        assert_eq!(stored.person_name, parsed.person_name);
        assert_eq!(stored.description, parsed.description);
        assert_eq!(stored.created_at, parsed.created_at);
        assert_eq!(512, parsed.embedding_size);
    }

    #[test]
    fn payload_omits_missing_description() {
        let payload = into_map(record_payload(&record()));
        assert!(!payload.contains_key(DESCRIPTION_PROPERTY));
        assert!(payload.contains_key(PERSON_NAME_PROPERTY));
    }

    #[test]
    fn record_requires_uuid_point_id() {
        let payload = into_map(record_payload(&record()));
        assert!(face_record(Some(PointId::from(7u64)), payload.clone()).is_err());
        assert!(face_record(None, payload).is_err());
    }

    #[test]
    fn record_requires_embedding_size() {
        let stored = record();
        let id = || Some(PointId::from(stored.id.to_string()));

        let mut payload = into_map(record_payload(&stored));
        payload.remove(EMBEDDING_SIZE_PROPERTY);
        let error = face_record(id(), payload).unwrap_err();
        assert!(matches!(error.error, FaceprintErr::MalformedPayload(_)));

        let mut payload = into_map(record_payload(&stored));
        payload.insert(EMBEDDING_SIZE_PROPERTY.to_string(), Value::from(-3i64));
        let error = face_record(id(), payload).unwrap_err();
        assert!(matches!(error.error, FaceprintErr::MalformedPayload(_)));

        let mut payload = into_map(record_payload(&stored));
        payload.insert(EMBEDDING_SIZE_PROPERTY.to_string(), Value::from("512"));
        let error = face_record(id(), payload).unwrap_err();
        assert!(matches!(error.error, FaceprintErr::MalformedPayload(_)));
    }
}
