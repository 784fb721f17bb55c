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

use super::model::{CreateMeetingRequest, Meeting, UpdateMeetingStatusRequest};

#[derive(Debug, Deserialize)]
pub struct GroupQuery {
    pub group_id: String,
}

#[axum::debug_handler]
pub async fn create_meeting(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateMeetingRequest>,
) -> impl IntoResponse {
    match Meeting::create(&state.pool, req, &claims.sub).await {
        Ok(meeting) => (StatusCode::CREATED, success_to_api_response(meeting)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn get_meetings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<GroupQuery>,
) -> impl IntoResponse {
    match Meeting::list_for_group(&state.pool, &query.group_id, &claims.sub).await {
        Ok(meetings) => (StatusCode::OK, success_to_api_response(meetings)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn update_meeting_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateMeetingStatusRequest>,
) -> impl IntoResponse {
    match Meeting::update_status(&state.pool, req, &claims.sub).await {
        Ok(meeting) => (StatusCode::OK, success_to_api_response(meeting)),
        Err(e) => e.to_response(),
    }
}
