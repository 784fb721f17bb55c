use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    error::WorkflowError,
    utils::{Claims, success_to_api_response},
};

use super::model::{
    CancelInvitationRequest, CreateGroupRequest, GroupInvitation, InviteStudentRequest,
    RemoveMemberRequest, RespondInvitationRequest, StudentGroup,
};

#[axum::debug_handler]
pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupRequest>,
) -> impl IntoResponse {
    match StudentGroup::create(&state.pool, &state.redis, &claims.sub, req).await {
        Ok(group) => (StatusCode::CREATED, success_to_api_response(group)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn get_my_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let group = match StudentGroup::find_by_member(&state.pool, &claims.sub).await {
        Ok(Some(group)) => group,
        Ok(None) => return WorkflowError::NotFound("小组").to_response(),
        Err(e) => return e.to_response(),
    };

    match StudentGroup::detail(&state.pool, &state.redis, &group.group_id).await {
        Ok(detail) => (StatusCode::OK, success_to_api_response(detail)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn invite_student(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<InviteStudentRequest>,
) -> impl IntoResponse {
    let group = match StudentGroup::find_by_member(&state.pool, &claims.sub).await {
        Ok(Some(group)) => group,
        Ok(None) => return WorkflowError::NotFound("小组").to_response(),
        Err(e) => return e.to_response(),
    };

    match GroupInvitation::invite(&state.pool, &group.group_id, &claims.sub, req).await {
        Ok(invitation) => (StatusCode::CREATED, success_to_api_response(invitation)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn respond_to_invitation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RespondInvitationRequest>,
) -> impl IntoResponse {
    match GroupInvitation::respond(&state.pool, &state.redis, &claims.sub, req).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "success": true })),
        ),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn cancel_invitation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CancelInvitationRequest>,
) -> impl IntoResponse {
    match GroupInvitation::cancel(&state.pool, &claims.sub, &req.invitation_id).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "success": true })),
        ),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RemoveMemberRequest>,
) -> impl IntoResponse {
    let group = match StudentGroup::find_by_member(&state.pool, &claims.sub).await {
        Ok(Some(group)) => group,
        Ok(None) => return WorkflowError::NotFound("小组").to_response(),
        Err(e) => return e.to_response(),
    };

    match StudentGroup::remove_member(
        &state.pool,
        &state.redis,
        &group.group_id,
        &claims.sub,
        &req.student_id,
    )
    .await
    {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "success": true })),
        ),
        Err(e) => e.to_response(),
    }
}

/// 当前学生收到的待处理邀请
#[axum::debug_handler]
pub async fn get_my_invitations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match GroupInvitation::list_for_student(&state.pool, &claims.sub).await {
        Ok(invitations) => (StatusCode::OK, success_to_api_response(invitations)),
        Err(e) => e.to_response(),
    }
}

/// 当前小组发出的全部邀请，容量展示用
#[axum::debug_handler]
pub async fn get_group_invitations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let group = match StudentGroup::find_by_member(&state.pool, &claims.sub).await {
        Ok(Some(group)) => group,
        Ok(None) => return WorkflowError::NotFound("小组").to_response(),
        Err(e) => return e.to_response(),
    };

    match GroupInvitation::list_for_group(&state.pool, &group.group_id).await {
        Ok(invitations) => (StatusCode::OK, success_to_api_response(invitations)),
        Err(e) => e.to_response(),
    }
}
