use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    error::WorkflowError,
    routes::group::model::StudentGroup,
    utils::{Claims, success_to_api_response},
};

use super::model::{
    FinalizeRequestRequest, RespondRequestRequest, SendRequestRequest, SupervisionRequest,
};

#[axum::debug_handler]
pub async fn send_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendRequestRequest>,
) -> impl IntoResponse {
    let group = match StudentGroup::find_by_member(&state.pool, &claims.sub).await {
        Ok(Some(group)) => group,
        Ok(None) => return WorkflowError::NotFound("小组").to_response(),
        Err(e) => return e.to_response(),
    };

    match SupervisionRequest::send(&state.pool, &group.group_id, req).await {
        Ok(request) => (StatusCode::CREATED, success_to_api_response(request)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn respond_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RespondRequestRequest>,
) -> impl IntoResponse {
    match SupervisionRequest::respond(&state.pool, &claims.sub, req).await {
        Ok(request) => (StatusCode::OK, success_to_api_response(request)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn finalize_request(
    State(state): State<AppState>,
    Json(req): Json<FinalizeRequestRequest>,
) -> impl IntoResponse {
    match SupervisionRequest::finalize(&state.pool, &state.redis, req).await {
        Ok(request) => (StatusCode::OK, success_to_api_response(request)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn get_teacher_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match SupervisionRequest::list_for_teacher(&state.pool, &claims.sub).await {
        Ok(requests) => (StatusCode::OK, success_to_api_response(requests)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn get_group_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let group = match StudentGroup::find_by_member(&state.pool, &claims.sub).await {
        Ok(Some(group)) => group,
        Ok(None) => return WorkflowError::NotFound("小组").to_response(),
        Err(e) => return e.to_response(),
    };

    match SupervisionRequest::list_for_group(&state.pool, &group.group_id).await {
        Ok(requests) => (StatusCode::OK, success_to_api_response(requests)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn get_pending_admin_requests(State(state): State<AppState>) -> impl IntoResponse {
    match SupervisionRequest::list_pending_admin(&state.pool).await {
        Ok(requests) => (StatusCode::OK, success_to_api_response(requests)),
        Err(e) => e.to_response(),
    }
}
