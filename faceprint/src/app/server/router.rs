use super::{api::ApiDoc, HttpConfiguration, MAX_BODY_SIZE};
use crate::app::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    classify::ServerErrorsFailureClass,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub(super) mod face;
pub(super) mod system;

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.http_config);

    let api = Router::new()
        .route("/health", get(system::health))
        .route("/stats", get(system::stats))
        .route("/faces/register", post(face::register_face))
        .route("/faces/verify", post(face::verify_face))
        .route("/faces/list", get(face::list_faces))
        .route("/faces", delete(face::clear_faces))
        .route("/faces/:id", get(face::get_face))
        .route("/faces/:id", delete(face::delete_face))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state);

    Router::new()
        .route("/", get(system::service_info))
        .route("/health", get(system::health_redirect))
        .nest("/api", api)
        .layer(
            TraceLayer::new_for_http()
                .on_request(|req: &axum::http::Request<_>, _span: &Span| {
                    let ctype = req
                        .headers()
                        .get("content-type")
                        .map(|v| v.to_str().unwrap_or("none"))
                        .unwrap_or_else(|| "none");

                    tracing::info!(
                        "Processing request | {} {} | content-type: {ctype}",
                        req.method(),
                        req.uri().path()
                    );
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                        let status = res.status();
                        let ctype = res
                            .headers()
                            .get("content-type")
                            .map(|v| v.to_str().unwrap_or("none"))
                            .unwrap_or_else(|| "none");

                        tracing::info!(
                            "Sending response | {status} | {}ms | {ctype}",
                            latency.as_millis()
                        );
                    },
                )
                .on_failure(
                    |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                        tracing::error!("Error in request: {error}")
                    },
                ),
        )
        .layer(cors)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

fn cors_layer(config: &HttpConfiguration) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    if config.cors_origins.iter().any(|origin| origin == "*") {
        tracing::info!("CORS - Allowing any origin");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(Any)
            .allow_methods(methods);
    }

    let origins = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => {
                tracing::info!("CORS - Adding {origin} to allowed origins");
                Some(value)
            }
            Err(e) => {
                tracing::warn!("CORS - Skipping invalid origin {origin}: {e}");
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_headers(Any)
        .allow_methods(methods)
}
