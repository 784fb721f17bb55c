use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};

use crate::{
    AppState,
    utils::{Claims, Role, error_codes, error_to_api_response, verify_token},
};

/// 校验Bearer token，并把Claims放入请求扩展供handler使用
pub async fn auth_middleware(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match auth {
        Some(TypedHeader(auth)) => auth.token().to_string(),
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                error_to_api_response::<()>(error_codes::AUTH_FAILED, "缺少认证信息".to_string()),
            )
                .into_response();
        }
    };

    match verify_token(&token, &state.config) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!("Token verification failed: {}", e);
            (
                StatusCode::UNAUTHORIZED,
                error_to_api_response::<()>(error_codes::AUTH_FAILED, "令牌无效或已过期".to_string()),
            )
                .into_response()
        }
    }
}

fn require_role(req: &Request<Body>, role: Role) -> bool {
    req.extensions()
        .get::<Claims>()
        .map(|claims| claims.role == role)
        .unwrap_or(false)
}

/// 管理员专用路由的角色检查，需挂在auth_middleware之后
pub async fn require_admin(req: Request<Body>, next: Next) -> Response {
    if !require_role(&req, Role::Admin) {
        return (
            StatusCode::FORBIDDEN,
            error_to_api_response::<()>(
                error_codes::PERMISSION_DENIED,
                "仅管理员可访问".to_string(),
            ),
        )
            .into_response();
    }
    next.run(req).await
}

pub async fn require_teacher(req: Request<Body>, next: Next) -> Response {
    if !require_role(&req, Role::Teacher) {
        return (
            StatusCode::FORBIDDEN,
            error_to_api_response::<()>(
                error_codes::PERMISSION_DENIED,
                "仅教师可访问".to_string(),
            ),
        )
            .into_response();
    }
    next.run(req).await
}
