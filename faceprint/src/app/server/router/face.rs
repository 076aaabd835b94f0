use crate::{
    app::{
        server::dto::{
            DeleteFaceResponse, FaceInfo, FaceListResponse, ImageForm, ListFacesParams,
            MessageResponse, RegisterFaceResponse,
        },
        state::AppState,
    },
    core::service::face::dto::{FaceVerification, ImageUpload, RegisterFace},
    err,
    error::FaceprintError,
    map_err,
};
use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::QueryRejection,
        Multipart, Path, Query, State,
    },
    Json,
};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/faces/register",
    request_body(content = String, content_type = "multipart/form-data", description = "`image` file, `person_name` and optional `description` fields"),
    responses(
        (status = 200, description = "Face registered", body = RegisterFaceResponse),
        (status = 400, description = "Malformed form, missing or invalid image, or no face detected"),
        (status = 413, description = "Image exceeds the upload limit"),
        (status = 422, description = "Invalid person name or description"),
        (status = 500, description = "Internal server error"),
        (status = 503, description = "Vector database unavailable")
    ),
    tag = "Faces"
)]
pub(super) async fn register_face(
    State(state): State<AppState>,
    form: Result<Multipart, MultipartRejection>,
) -> Result<Json<RegisterFaceResponse>, FaceprintError> {
    let mut form = ImageForm::read(map_err!(form)).await?;

    let data = RegisterFace::new(
        form.fields.remove("person_name").unwrap_or_default(),
        form.take("description"),
    );
    let upload = ImageUpload::new(form.content_type.as_deref(), &form.image);

    let (record, confidence) = state.services.face.register(upload, data).await?;

    Ok(Json(RegisterFaceResponse::new(record, confidence)))
}

#[utoipa::path(
    post,
    path = "/api/faces/verify",
    request_body(content = String, content_type = "multipart/form-data", description = "`image` file and optional `threshold` field"),
    responses(
        (status = 200, description = "Verification result", body = FaceVerification),
        (status = 400, description = "Malformed form, invalid image or threshold, or no face detected"),
        (status = 413, description = "Image exceeds the upload limit"),
        (status = 500, description = "Internal server error"),
        (status = 503, description = "Vector database unavailable")
    ),
    tag = "Faces"
)]
pub(super) async fn verify_face(
    State(state): State<AppState>,
    form: Result<Multipart, MultipartRejection>,
) -> Result<Json<FaceVerification>, FaceprintError> {
    let mut form = ImageForm::read(map_err!(form)).await?;

    let threshold = match form.take("threshold") {
        Some(threshold) => match threshold.trim().parse::<f32>() {
            Ok(threshold) => Some(threshold),
            Err(_) => return err!(InvalidParameter, "Threshold must be a number"),
        },
        None => None,
    };

    let upload = ImageUpload::new(form.content_type.as_deref(), &form.image);
    let verification = state.services.face.verify(upload, threshold).await?;

    Ok(Json(verification))
}

#[utoipa::path(
    get,
    path = "/api/faces/list",
    responses(
        (status = 200, description = "List registered faces", body = FaceListResponse),
        (status = 400, description = "Invalid limit"),
        (status = 500, description = "Internal server error"),
        (status = 503, description = "Vector database unavailable")
    ),
    params(ListFacesParams),
    tag = "Faces"
)]
pub(super) async fn list_faces(
    State(state): State<AppState>,
    params: Result<Query<ListFacesParams>, QueryRejection>,
) -> Result<Json<FaceListResponse>, FaceprintError> {
    let Query(params) = map_err!(params);
    let faces = state.services.face.list(params.limit).await?;
    Ok(Json(faces.into()))
}

#[utoipa::path(
    get,
    path = "/api/faces/{id}",
    responses(
        (status = 200, description = "Face information", body = FaceInfo),
        (status = 400, description = "Invalid face ID format"),
        (status = 404, description = "Face not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = Uuid, Path, description = "Face ID")
    ),
    tag = "Faces"
)]
pub(super) async fn get_face(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FaceInfo>, FaceprintError> {
    let id = map_err!(Uuid::parse_str(&id));
    let face = state.services.face.get(id).await?;
    Ok(Json(face.into()))
}

#[utoipa::path(
    delete,
    path = "/api/faces/{id}",
    responses(
        (status = 200, description = "Face deleted", body = DeleteFaceResponse),
        (status = 400, description = "Invalid face ID format"),
        (status = 404, description = "Face not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = Uuid, Path, description = "Face ID")
    ),
    tag = "Faces"
)]
pub(super) async fn delete_face(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteFaceResponse>, FaceprintError> {
    let id = map_err!(Uuid::parse_str(&id));
    state.services.face.delete(id).await?;
    Ok(Json(DeleteFaceResponse::new(id)))
}

#[utoipa::path(
    delete,
    path = "/api/faces",
    responses(
        (status = 200, description = "All faces removed", body = MessageResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "System"
)]
pub(super) async fn clear_faces(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, FaceprintError> {
    state.services.face.clear().await?;
    Ok(Json(MessageResponse {
        message: String::from("All faces cleared successfully"),
    }))
}
