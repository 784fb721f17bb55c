use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{AppState, utils::success_to_api_response};

use super::model::{collection_counts, import_frontend_data as import_data};

#[axum::debug_handler]
pub async fn import_frontend_data(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> impl IntoResponse {
    match import_data(&state.pool, payload).await {
        Ok(summary) => (StatusCode::OK, success_to_api_response(summary)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn sync_status(State(state): State<AppState>) -> impl IntoResponse {
    match collection_counts(&state.pool).await {
        Ok(counts) => (StatusCode::OK, success_to_api_response(counts)),
        Err(e) => e.to_response(),
    }
}
