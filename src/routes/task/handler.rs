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

use super::model::{CreateTaskRequest, Task, UpdateTaskRequest};

#[derive(Debug, Deserialize)]
pub struct GroupQuery {
    pub group_id: String,
}

#[axum::debug_handler]
pub async fn create_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateTaskRequest>,
) -> impl IntoResponse {
    match Task::create(&state.pool, req, &claims.sub).await {
        Ok(task) => (StatusCode::CREATED, success_to_api_response(task)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn get_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<GroupQuery>,
) -> impl IntoResponse {
    match Task::list_for_group(&state.pool, &query.group_id, &claims.sub).await {
        Ok(tasks) => (StatusCode::OK, success_to_api_response(tasks)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn update_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateTaskRequest>,
) -> impl IntoResponse {
    match Task::update(&state.pool, req, &claims.sub).await {
        Ok(task) => (StatusCode::OK, success_to_api_response(task)),
        Err(e) => e.to_response(),
    }
}
