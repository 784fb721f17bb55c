use axum::{
    extract::{Extension, Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    error::WorkflowError,
    routes::{student::model::Student, teacher::model::Teacher},
    utils::{Claims, Role, success_to_api_response},
};

use super::model::{CreateMessageRequest, GetMessagesRequest, MessageInfo};

async fn sender_name(state: &AppState, claims: &Claims) -> Result<String, WorkflowError> {
    match claims.role {
        Role::Student => Ok(Student::find_by_id(&state.pool, &claims.sub)
            .await?
            .ok_or(WorkflowError::NotFound("学生"))?
            .full_name),
        Role::Teacher => Ok(Teacher::find_by_id(&state.pool, &claims.sub)
            .await?
            .ok_or(WorkflowError::NotFound("教师"))?
            .full_name),
        Role::Admin => Ok("管理员".to_string()),
    }
}

#[axum::debug_handler]
pub async fn create_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateMessageRequest>,
) -> impl IntoResponse {
    let name = match sender_name(&state, &claims).await {
        Ok(name) => name,
        Err(e) => return e.to_response(),
    };

    match MessageInfo::create(&state.pool, &state.redis, req, claims.sub, name).await {
        Ok(message) => (StatusCode::CREATED, success_to_api_response(message)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(req): Query<GetMessagesRequest>,
) -> impl IntoResponse {
    match MessageInfo::get_messages(&state.pool, &state.redis, req, &claims.sub).await {
        Ok(messages) => (StatusCode::OK, success_to_api_response(messages)),
        Err(e) => e.to_response(),
    }
}
