//! Thin axum handlers over [`AnnotationService`].
//!
//! Store calls may hit the disk, so each service call runs on the blocking
//! thread pool.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::service::AnnotationService;

/// Path parameters of an annotation route.
#[derive(Debug, Deserialize)]
pub struct AnnotationPath {
    pub user: String,
    pub collection: String,
    pub annotation: String,
}

/// Path parameters of a collection route.
#[derive(Debug, Deserialize)]
pub struct CollectionPath {
    pub user: String,
    pub collection: String,
}

/// `POST /{user}/{collection}`
pub async fn create_annotation(
    State(service): State<Arc<AnnotationService>>,
    Path(path): Path<CollectionPath>,
    body: Bytes,
) -> ApiResult<Response> {
    let created =
        blocking(move || service.create_from_body(&path.user, &path.collection, &body)).await?;
    Ok((
        StatusCode::CREATED,
        [(LOCATION, created.location)],
        created.resource,
    )
        .into_response())
}

/// `GET /{user}/{collection}/{annotation}`
pub async fn get_annotation(
    State(service): State<Arc<AnnotationService>>,
    Path(path): Path<AnnotationPath>,
) -> ApiResult<Response> {
    let resource =
        blocking(move || service.get(&path.user, &path.collection, &path.annotation)).await?;
    Ok(resource.into_response())
}

/// `DELETE /{user}/{collection}/{annotation}`
pub async fn delete_annotation(
    State(service): State<Arc<AnnotationService>>,
    Path(path): Path<AnnotationPath>,
) -> ApiResult<StatusCode> {
    blocking(move || service.delete(&path.user, &path.collection, &path.annotation)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Health check response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Info handler.
pub async fn info_handler() -> Json<Value> {
    Json(json!({
        "name": "anno-server",
        "version": env!("CARGO_PKG_VERSION"),
        "media_type": anno_ldp::vocab::ANNO_MEDIA_TYPE,
    }))
}

async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("request task failed: {e}")))?
}
