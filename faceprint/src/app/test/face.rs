#[cfg(all(test, feature = "qdrant"))]
#[suitest::suite(integration_tests)]
#[suitest::suite_cfg(sequential = true)]
mod face_service_integration_tests {
    use crate::{
        app::test::{TestState, NO_FACE_IMAGE_PREFIX},
        core::service::face::dto::{ImageUpload, RegisterFace},
        error::FaceprintErr,
    };
    use suitest::before_all;
    use uuid::Uuid;

    const TEST_COLLECTION: &str = "face_embeddings_test";

    fn jpeg(bytes: &[u8]) -> ImageUpload<'_> {
        ImageUpload::new(Some("image/jpeg"), bytes)
    }

    #[before_all]
    async fn setup() -> TestState {
        let test_state = TestState::init(TEST_COLLECTION).await;
        test_state
    }

    #[test]
    async fn register_then_verify_matches(state: TestState) {
        let service = state.app.services.face.clone();
        let image = b"register_then_verify_matches";

        let (record, confidence) = service
            .register(
                jpeg(image),
                RegisterFace::new(" Ada Lovelace ", Some("lab".to_string())),
            )
            .await
            .unwrap();

        assert_eq!("Ada Lovelace", record.person_name);
        assert_eq!(Some("lab"), record.description.as_deref());
        assert_eq!(512, record.embedding_size);
        assert!(confidence > 0.0);

        let verification = service.verify(jpeg(image), None).await.unwrap();

        assert!(verification.is_match);
        assert_eq!(Some(record.id), verification.matched_face_id);
        assert_eq!(
            Some("Ada Lovelace"),
            verification.matched_person_name.as_deref()
        );
        assert!(verification.similarity_score > 0.99);
        assert_eq!(0.6, verification.threshold_used);

        service.delete(record.id).await.unwrap();
    }

    #[test]
    async fn unrelated_face_does_not_match(state: TestState) {
        let service = state.app.services.face.clone();

        let (record, _) = service
            .register(
                jpeg(b"unrelated_face_registered"),
                RegisterFace::new("Grace", None),
            )
            .await
            .unwrap();

        let verification = service
            .verify(jpeg(b"unrelated_face_query"), Some(0.8))
            .await
            .unwrap();

        assert!(!verification.is_match);
        assert!(verification.matched_face_id.is_none());
        assert!(verification.matched_person_name.is_none());
        assert_eq!(0.0, verification.similarity_score);
        assert_eq!(0.8, verification.threshold_used);

        service.delete(record.id).await.unwrap();
    }

    #[test]
    async fn image_without_face_is_rejected(state: TestState) {
        let service = state.app.services.face.clone();

        let mut image = NO_FACE_IMAGE_PREFIX.to_vec();
        image.extend_from_slice(b"_landscape");

        let error = service
            .register(jpeg(&image), RegisterFace::new("Nobody", None))
            .await
            .unwrap_err();

        assert!(matches!(error.error, FaceprintErr::NoFaceDetected(_)));
    }

    #[test]
    async fn get_returns_registered_face(state: TestState) {
        let service = state.app.services.face.clone();

        let (record, _) = service
            .register(
                jpeg(b"get_returns_registered_face"),
                RegisterFace::new("Alan", Some("   ".to_string())),
            )
            .await
            .unwrap();

        let face = service.get(record.id).await.unwrap();

        assert_eq!(record.id, face.id);
        assert_eq!("Alan", face.person_name);
        assert!(face.description.is_none());
        assert_eq!(record.created_at, face.created_at);
        assert_eq!(512, face.embedding_size);

        service.delete(record.id).await.unwrap();
    }

    #[test]
    async fn deleted_face_is_removed_from_list(state: TestState) {
        let service = state.app.services.face.clone();

        let (record, _) = service
            .register(
                jpeg(b"deleted_face_is_removed_from_list"),
                RegisterFace::new("Edsger", None),
            )
            .await
            .unwrap();

        let faces = service.list(None).await.unwrap();
        assert!(faces.iter().any(|face| face.id == record.id));

        service.delete(record.id).await.unwrap();

        let faces = service.list(None).await.unwrap();
        assert!(!faces.iter().any(|face| face.id == record.id));

        let error = service.get(record.id).await.unwrap_err();
        assert!(matches!(error.error, FaceprintErr::DoesNotExist(_)));
    }

    #[test]
    async fn unknown_face_does_not_exist(state: TestState) {
        let service = state.app.services.face.clone();
        let id = Uuid::new_v4();

        let error = service.get(id).await.unwrap_err();
        assert!(matches!(error.error, FaceprintErr::DoesNotExist(_)));

        let error = service.delete(id).await.unwrap_err();
        assert!(matches!(error.error, FaceprintErr::DoesNotExist(_)));
    }

    #[test]
    async fn list_respects_limit(state: TestState) {
        let service = state.app.services.face.clone();

        let mut ids = vec![];
        for i in 0..3 {
            let image = format!("list_respects_limit_{i}");
            let (record, _) = service
                .register(
                    jpeg(image.as_bytes()),
                    RegisterFace::new(format!("Person {i}"), None),
                )
                .await
                .unwrap();
            ids.push(record.id);
        }

        let faces = service.list(Some(2)).await.unwrap();
        assert_eq!(2, faces.len());

        for id in ids {
            service.delete(id).await.unwrap();
        }
    }

    #[test]
    async fn clear_empties_collection(state: TestState) {
        let service = state.app.services.face.clone();

        for i in 0..2 {
            let image = format!("clear_empties_collection_{i}");
            service
                .register(jpeg(image.as_bytes()), RegisterFace::new("Barbara", None))
                .await
                .unwrap();
        }

        service.clear().await.unwrap();

        assert!(service.list(None).await.unwrap().is_empty());

        let stats = service.stats().await.unwrap();
        assert_eq!(0, stats.database.points_count);
        assert_eq!(512, stats.database.vector_size);
        assert_eq!("Cosine", stats.database.distance);
        assert_eq!(TEST_COLLECTION, stats.database.collection_name);
        assert_eq!("stub", stats.face_processor.model_name);
    }

    #[test]
    async fn health_reaches_database(state: TestState) {
        state.app.services.face.health().await.unwrap();
    }

    #[test]
    async fn http_round_trip(state: TestState) {
        use reqwest::multipart::{Form, Part};
        use serde_json::Value;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = crate::app::server::router::router(state.app.clone());
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        let client = reqwest::Client::new();
        let base = format!("http://{addr}");

        let image = || {
            Part::bytes(b"http_round_trip".to_vec())
                .file_name("ada.jpg")
                .mime_str("image/jpeg")
                .unwrap()
        };

        // Register
        let form = Form::new()
            .part("image", image())
            .text("person_name", "Ada")
            .text("description", "front door");

        let response = client
            .post(format!("{base}/api/faces/register"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(200, response.status().as_u16());

        let registered: Value = response.json().await.unwrap();
        let face_id = registered["face_id"].as_str().unwrap().to_string();
        assert_eq!("Ada", registered["person_name"]);
        assert_eq!(512, registered["embedding_size"]);
        assert_eq!("Face registered successfully", registered["message"]);

        // Verify
        let form = Form::new().part("image", image()).text("threshold", "0.7");
        let response = client
            .post(format!("{base}/api/faces/verify"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(200, response.status().as_u16());

        let verification: Value = response.json().await.unwrap();
        assert_eq!(true, verification["is_match"]);
        assert_eq!(face_id.as_str(), verification["matched_face_id"]);
        assert_eq!("Ada", verification["matched_person_name"]);

        // Invalid threshold
        let form = Form::new().part("image", image()).text("threshold", "1.5");
        let response = client
            .post(format!("{base}/api/faces/verify"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(400, response.status().as_u16());

        // Non image upload
        let text = Part::bytes(b"hello".to_vec())
            .file_name("notes.txt")
            .mime_str("text/plain")
            .unwrap();
        let form = Form::new().part("image", text).text("person_name", "Ada");
        let response = client
            .post(format!("{base}/api/faces/register"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(400, response.status().as_u16());

        let error: Value = response.json().await.unwrap();
        assert_eq!("File must be an image", error["error"]);

        // Missing name
        let form = Form::new().part("image", image());
        let response = client
            .post(format!("{base}/api/faces/register"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(422, response.status().as_u16());

        // Get
        let response = client
            .get(format!("{base}/api/faces/{face_id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(200, response.status().as_u16());
        let face: Value = response.json().await.unwrap();
        assert_eq!("front door", face["description"]);

        // Malformed ID
        let response = client
            .get(format!("{base}/api/faces/not-a-uuid"))
            .send()
            .await
            .unwrap();
        assert_eq!(400, response.status().as_u16());

        // List
        let response = client
            .get(format!("{base}/api/faces/list?limit=1000"))
            .send()
            .await
            .unwrap();
        assert_eq!(200, response.status().as_u16());
        let list: Value = response.json().await.unwrap();
        assert!(list["total_count"].as_u64().unwrap() >= 1);

        let response = client
            .get(format!("{base}/api/faces/list?limit=0"))
            .send()
            .await
            .unwrap();
        assert_eq!(400, response.status().as_u16());

        // Delete
        let response = client
            .delete(format!("{base}/api/faces/{face_id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(200, response.status().as_u16());
        let deleted: Value = response.json().await.unwrap();
        assert_eq!(face_id.as_str(), deleted["face_id"]);

        let response = client
            .delete(format!("{base}/api/faces/{face_id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(404, response.status().as_u16());

        // System
        let response = client
            .get(format!("{base}/api/health"))
            .send()
            .await
            .unwrap();
        assert_eq!(200, response.status().as_u16());
        let health: Value = response.json().await.unwrap();
        assert_eq!("healthy", health["status"]);

        let response = client
            .get(format!("{base}/api/stats"))
            .send()
            .await
            .unwrap();
        assert_eq!(200, response.status().as_u16());
        let stats: Value = response.json().await.unwrap();
        assert_eq!(TEST_COLLECTION, stats["database"]["collection_name"]);

        let response = client.get(format!("{base}/")).send().await.unwrap();
        let info: Value = response.json().await.unwrap();
        assert_eq!("/api/health", info["health"]);

        let response = client
            .get(format!("{base}/api-docs/openapi.json"))
            .send()
            .await
            .unwrap();
        assert_eq!(200, response.status().as_u16());
    }
}
