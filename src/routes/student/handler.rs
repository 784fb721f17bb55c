use axum::{
    extract::{Extension, Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    AppState,
    error::WorkflowError,
    utils::{
        Claims, Role, error_codes, error_to_api_response, generate_token, success_to_api_response,
    },
};

use super::model::{
    LoginRequest, LoginResponse, RegisterStudentRequest, Student, UpdateProfileRequest,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterStudentRequest>,
) -> impl IntoResponse {
    // 检查学号格式
    if !req
        .student_id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "学号格式无效，只允许使用字母、数字、连字符和下划线".to_string(),
            ),
        );
    }
    if req.password.len() < 6 || req.password.len() > 64 {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "密码长度必须在6到64个字符之间".to_string(),
            ),
        );
    }

    match Student::create(&state.pool, req).await {
        Ok(student) => match generate_token(&student.student_id, Role::Student, &state.config) {
            Ok(token) => (
                StatusCode::CREATED,
                success_to_api_response(LoginResponse { token, student }),
            ),
            Err(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "生成令牌失败".to_string()),
            ),
        },
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let student = match Student::find_by_id(&state.pool, &req.student_id).await {
        Ok(Some(student)) => student,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                error_to_api_response(error_codes::AUTH_FAILED, "学号或密码错误".to_string()),
            );
        }
        Err(e) => return e.to_response(),
    };

    match student.verify_login(&req.password) {
        Ok(true) => (),
        Ok(false) => {
            return (
                StatusCode::UNAUTHORIZED,
                error_to_api_response(error_codes::AUTH_FAILED, "学号或密码错误".to_string()),
            );
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "密码校验失败".to_string()),
            );
        }
    }

    match generate_token(&student.student_id, Role::Student, &state.config) {
        Ok(token) => (
            StatusCode::OK,
            success_to_api_response(LoginResponse { token, student }),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, "生成令牌失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match Student::find_by_id(&state.pool, &claims.sub).await {
        Ok(Some(student)) => (StatusCode::OK, success_to_api_response(student)),
        Ok(None) => WorkflowError::NotFound("学生").to_response(),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> impl IntoResponse {
    match Student::update_profile(&state.pool, &claims.sub, req).await {
        Ok(student) => (StatusCode::OK, success_to_api_response(student)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn search_students(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    if query.q.trim().len() < 2 {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "搜索关键字至少2个字符".to_string(),
            ),
        );
    }
    match Student::search(&state.pool, query.q.trim()).await {
        Ok(students) => (StatusCode::OK, success_to_api_response(students)),
        Err(e) => e.to_response(),
    }
}
