use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    AppState,
    utils::{Claims, success_to_api_response},
};

use super::model::{ShareFileRequest, SharedFile};

#[derive(Debug, Deserialize)]
pub struct GroupQuery {
    pub group_id: String,
}

#[axum::debug_handler]
pub async fn share_file(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ShareFileRequest>,
) -> impl IntoResponse {
    match SharedFile::create(&state.pool, req, &claims.sub).await {
        Ok(file) => (StatusCode::CREATED, success_to_api_response(file)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn get_files(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<GroupQuery>,
) -> impl IntoResponse {
    match SharedFile::list_for_group(&state.pool, &query.group_id, &claims.sub).await {
        Ok(files) => (StatusCode::OK, success_to_api_response(files)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(file_id): Path<String>,
) -> impl IntoResponse {
    match SharedFile::delete(&state.pool, &file_id, &claims.sub).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "success": true })),
        ),
        Err(e) => e.to_response(),
    }
}
