use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    AppState,
    error::WorkflowError,
    matching::rank_teachers,
    routes::{group::model::StudentGroup, proposal::model::Proposal},
    utils::{
        Claims, Role, error_codes, error_to_api_response, generate_token, success_to_api_response,
    },
};

use super::model::{Teacher, TeacherLoginRequest, TeacherLoginResponse, UpdateTeacherRequest};

#[derive(Debug, Serialize)]
pub struct RankedTeacher {
    #[serde(flatten)]
    pub teacher: Teacher,
    pub relevance_score: u8,
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<TeacherLoginRequest>,
) -> impl IntoResponse {
    let teacher = match Teacher::find_by_id(&state.pool, &req.teacher_id).await {
        Ok(Some(teacher)) => teacher,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                error_to_api_response(error_codes::AUTH_FAILED, "工号或密码错误".to_string()),
            );
        }
        Err(e) => return e.to_response(),
    };

    match teacher.verify_login(&req.password) {
        Ok(true) => (),
        Ok(false) => {
            return (
                StatusCode::UNAUTHORIZED,
                error_to_api_response(error_codes::AUTH_FAILED, "工号或密码错误".to_string()),
            );
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "密码校验失败".to_string()),
            );
        }
    }

    match generate_token(&teacher.teacher_id, Role::Teacher, &state.config) {
        Ok(token) => (
            StatusCode::OK,
            success_to_api_response(TeacherLoginResponse { token, teacher }),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, "生成令牌失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn list_teachers(State(state): State<AppState>) -> impl IntoResponse {
    match Teacher::list_active(&state.pool).await {
        Ok(teachers) => (StatusCode::OK, success_to_api_response(teachers)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match Teacher::find_by_id(&state.pool, &claims.sub).await {
        Ok(Some(teacher)) => (StatusCode::OK, success_to_api_response(teacher)),
        Ok(None) => WorkflowError::NotFound("教师").to_response(),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateTeacherRequest>,
) -> impl IntoResponse {
    match Teacher::update_profile(&state.pool, &claims.sub, req).await {
        Ok(teacher) => (StatusCode::OK, success_to_api_response(teacher)),
        Err(e) => e.to_response(),
    }
}

/// 按当前学生小组的选题书给在岗教师打分排序；
/// 小组还没有选题书时所有教师并列中性分
#[axum::debug_handler]
pub async fn match_teachers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    if claims.role != Role::Student {
        return (
            StatusCode::FORBIDDEN,
            error_to_api_response(error_codes::PERMISSION_DENIED, "仅学生可访问".to_string()),
        );
    }

    let group = match StudentGroup::find_by_member(&state.pool, &claims.sub).await {
        Ok(Some(group)) => group,
        Ok(None) => return WorkflowError::NotFound("小组").to_response(),
        Err(e) => return e.to_response(),
    };

    let proposal = match Proposal::find_by_group(&state.pool, &group.group_id).await {
        Ok(p) => p,
        Err(e) => return e.to_response(),
    };

    match Teacher::list_active(&state.pool).await {
        Ok(teachers) => {
            let ranked = rank_teachers(teachers, proposal.as_ref())
                .into_iter()
                .map(|(teacher, relevance_score)| RankedTeacher {
                    teacher,
                    relevance_score,
                })
                .collect::<Vec<_>>();
            (StatusCode::OK, success_to_api_response(ranked))
        }
        Err(e) => e.to_response(),
    }
}
