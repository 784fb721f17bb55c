use axum::{
    extract::{Extension, Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    AppState,
    utils::{Claims, success_to_api_response},
};

use super::model::{ReviewProgressRequest, SubmitProgressRequest, WeeklyProgress};

#[derive(Debug, Deserialize)]
pub struct GroupQuery {
    pub group_id: String,
}

#[axum::debug_handler]
pub async fn submit_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitProgressRequest>,
) -> impl IntoResponse {
    match WeeklyProgress::submit(&state.pool, req, &claims.sub).await {
        Ok(progress) => (StatusCode::CREATED, success_to_api_response(progress)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn get_progress_reports(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<GroupQuery>,
) -> impl IntoResponse {
    match WeeklyProgress::list_for_group(&state.pool, &query.group_id, &claims.sub).await {
        Ok(reports) => (StatusCode::OK, success_to_api_response(reports)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn review_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReviewProgressRequest>,
) -> impl IntoResponse {
    match WeeklyProgress::review(&state.pool, req, &claims.sub).await {
        Ok(progress) => (StatusCode::OK, success_to_api_response(progress)),
        Err(e) => e.to_response(),
    }
}
