#[rustfmt::skip]
use super::router::{
    // Faces
    face::{
        __path_register_face,
        __path_verify_face,
        __path_list_faces,
        __path_get_face,
        __path_delete_face,
        __path_clear_faces,
    },

    // System
    system::{
        __path_health,
        __path_stats,
        __path_service_info,
    },
};

use super::dto::{
    DeleteFaceResponse, FaceInfo, FaceListResponse, HealthResponse, ListFacesParams,
    MessageResponse, RegisterFaceResponse, ServiceInfo,
};
use crate::{
    core::{
        model::face::CollectionStats,
        service::face::dto::{FaceProcessorInfo, FaceVerification, SystemStats},
    },
    error::http::{ErrorResponse, ErrorType},
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Face Recognition API",
        description = "Register faces and verify them against stored embeddings."
    ),
    paths(
        // Faces
        register_face,
        verify_face,
        list_faces,
        get_face,
        delete_face,

        // System
        clear_faces,
        health,
        stats,
        service_info,
    ),
    components(schemas(
        RegisterFaceResponse,
        FaceVerification,
        FaceInfo,
        FaceListResponse,
        DeleteFaceResponse,
        ListFacesParams,
        MessageResponse,
        HealthResponse,
        ServiceInfo,
        SystemStats,
        CollectionStats,
        FaceProcessorInfo,
        ErrorResponse,
        ErrorType,
    )),
    tags(
        (name = "Faces", description = "Face registration and verification"),
        (name = "System", description = "Collection management and statistics"),
        (name = "Health", description = "Service status")
    )
)]
pub struct ApiDoc;
