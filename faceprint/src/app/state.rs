use super::server::HttpConfiguration;
use crate::{
    config::StartArgs,
    core::{
        provider::{FaceEmbedderProvider, Identity, ProviderState, VectorDbProvider},
        service::{face::FaceService, ServiceState},
    },
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    /// Faceprint services.
    pub services: ServiceState,

    /// HTTP layer configuration.
    pub http_config: HttpConfiguration,
}

impl AppState {
    /// Load the application state using the provided configuration.
    pub async fn new(args: &StartArgs) -> Self {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from(args.log()))
            .init();

        let providers = ProviderState {
            vector: Self::init_vector_provider(args),
            embedder: Self::init_face_embedder(args),
        };

        tracing::info!(
            "Using {} vector provider and {} face embedder",
            providers.vector.id(),
            providers.embedder.id()
        );

        let face = FaceService::new(
            providers,
            &args.collection(),
            args.similarity_threshold(),
        );

        if let Err(e) = face.init().await {
            e.print();
            tracing::warn!(
                "Face collection '{}' will be created on the first request",
                face.collection()
            );
        }

        let http_config = HttpConfiguration {
            cors_origins: Arc::from(args.allowed_origins()),
        };

        Self {
            services: ServiceState { face },
            http_config,
        }
    }

    fn init_vector_provider(_args: &StartArgs) -> VectorDbProvider {
        #[cfg(not(feature = "qdrant"))]
        compile_error!("the `qdrant` feature must be enabled");

        #[cfg(feature = "qdrant")]
        {
            let qdrant = crate::app::vector::qdrant::init(&_args.qdrant_url());
            tracing::info!("Registered Qdrant vector provider");
            qdrant
        }
    }

    fn init_face_embedder(_args: &StartArgs) -> FaceEmbedderProvider {
        #[cfg(not(feature = "insightface"))]
        compile_error!("the `insightface` feature must be enabled");

        #[cfg(feature = "insightface")]
        {
            use faceprint_embedders::insightface::InsightFaceConfig;

            let config = InsightFaceConfig::new(
                _args.detector_model(),
                _args.recognizer_model(),
                _args.detection_confidence(),
            );

            let embedder = crate::app::embedder::insightface::InsightFaceEmbedder::new(config);
            tracing::info!("Registered InsightFace face embedder");
            Arc::new(embedder)
        }
    }
}
