use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    routes::teacher::model::{CreateTeacherRequest, Teacher},
    utils::{
        Claims, Role, error_codes, error_to_api_response, generate_token, success_to_api_response,
    },
};

use super::model::{
    Admin, AdminLoginRequest, AdminLoginResponse, ConfirmClearRequest, DashboardStats, all_data,
    confirm_clear, issue_clear_token,
};

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<AdminLoginRequest>,
) -> impl IntoResponse {
    let admin = match Admin::find_by_username(&state.pool, &req.username).await {
        Ok(Some(admin)) => admin,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                error_to_api_response(error_codes::AUTH_FAILED, "用户名或密码错误".to_string()),
            );
        }
        Err(e) => return e.to_response(),
    };

    match admin.verify_login(&req.password) {
        Ok(true) => (),
        Ok(false) => {
            return (
                StatusCode::UNAUTHORIZED,
                error_to_api_response(error_codes::AUTH_FAILED, "用户名或密码错误".to_string()),
            );
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response(error_codes::INTERNAL_ERROR, "密码校验失败".to_string()),
            );
        }
    }

    match generate_token(&admin.username, Role::Admin, &state.config) {
        Ok(token) => (
            StatusCode::OK,
            success_to_api_response(AdminLoginResponse { token, admin }),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, "生成令牌失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    match DashboardStats::collect(&state.pool).await {
        Ok(stats) => (StatusCode::OK, success_to_api_response(stats)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn get_all_data(State(state): State<AppState>) -> impl IntoResponse {
    match all_data(&state.pool).await {
        Ok(data) => (StatusCode::OK, success_to_api_response(data)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn create_teacher(
    State(state): State<AppState>,
    Json(req): Json<CreateTeacherRequest>,
) -> impl IntoResponse {
    match Teacher::create(&state.pool, req).await {
        Ok(teacher) => (StatusCode::CREATED, success_to_api_response(teacher)),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn request_clear_all(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match issue_clear_token(&state.redis, &claims.sub, state.config.clear_confirm_ttl_secs).await {
        Ok(token) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({
                "confirm_token": token,
                "expires_in_secs": state.config.clear_confirm_ttl_secs,
            })),
        ),
        Err(e) => e.to_response(),
    }
}

#[axum::debug_handler]
pub async fn confirm_clear_all(
    State(state): State<AppState>,
    Json(req): Json<ConfirmClearRequest>,
) -> impl IntoResponse {
    match confirm_clear(&state.pool, &state.redis, &req.confirm_token).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "success": true })),
        ),
        Err(e) => e.to_response(),
    }
}
