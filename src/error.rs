use axum::Json;
use axum::http::StatusCode;
use thiserror::Error;

use crate::utils::{ApiResponse, error_codes, error_to_api_response};

/// 工作流错误，与基础设施错误区分开，
/// 前端可以针对领域错误展示具体提示
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("学生已加入其他小组")]
    AlreadyInGroup,
    #[error("小组人数已达上限")]
    CapacityExceeded,
    #[error("只有组长可以执行此操作")]
    NotGroupAdmin,
    #[error("没有权限执行此操作")]
    NotAuthorized,
    #[error("邀请已被处理")]
    AlreadyResolved,
    #[error("当前状态不允许此操作")]
    InvalidStateTransition,
    #[error("记录已存在")]
    Duplicate,
    #[error("{0}不存在")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("数据库错误")]
    Database(sqlx::Error),
    #[error("缓存服务错误")]
    Cache(redis::RedisError),
}

impl From<sqlx::Error> for WorkflowError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => WorkflowError::Duplicate,
            _ => WorkflowError::Database(e),
        }
    }
}

impl From<redis::RedisError> for WorkflowError {
    fn from(e: redis::RedisError) -> Self {
        WorkflowError::Cache(e)
    }
}

impl WorkflowError {
    pub fn status(&self) -> StatusCode {
        match self {
            WorkflowError::AlreadyInGroup
            | WorkflowError::CapacityExceeded
            | WorkflowError::AlreadyResolved
            | WorkflowError::InvalidStateTransition => StatusCode::CONFLICT,
            WorkflowError::NotGroupAdmin | WorkflowError::NotAuthorized => StatusCode::FORBIDDEN,
            WorkflowError::Duplicate | WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
            WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkflowError::Database(_) | WorkflowError::Cache(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            WorkflowError::AlreadyInGroup => error_codes::ALREADY_IN_GROUP,
            WorkflowError::CapacityExceeded => error_codes::CAPACITY_EXCEEDED,
            WorkflowError::NotGroupAdmin => error_codes::NOT_GROUP_ADMIN,
            WorkflowError::NotAuthorized => error_codes::PERMISSION_DENIED,
            WorkflowError::AlreadyResolved => error_codes::ALREADY_RESOLVED,
            WorkflowError::InvalidStateTransition => error_codes::INVALID_STATE,
            WorkflowError::Duplicate => error_codes::DUPLICATE_RECORD,
            WorkflowError::NotFound(_) => error_codes::NOT_FOUND,
            WorkflowError::Validation(_) => error_codes::VALIDATION_ERROR,
            WorkflowError::Database(_) | WorkflowError::Cache(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// 转换为handler的统一响应格式，基础设施错误只记日志不外泄
    pub fn to_response<T>(&self) -> (StatusCode, Json<ApiResponse<T>>) {
        match self {
            WorkflowError::Database(e) => tracing::error!("Database error: {:?}", e),
            WorkflowError::Cache(e) => tracing::error!("Redis error: {:?}", e),
            _ => {}
        }
        (self.status(), error_to_api_response(self.code(), self.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_client_statuses() {
        assert_eq!(WorkflowError::CapacityExceeded.status(), StatusCode::CONFLICT);
        assert_eq!(WorkflowError::NotGroupAdmin.status(), StatusCode::FORBIDDEN);
        assert_eq!(WorkflowError::NotFound("小组").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            WorkflowError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn cache_errors_stay_internal_and_generic() {
        let e = WorkflowError::Cache(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection refused",
        )));
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.code(), 5000);
        // 客户端可见的消息不携带底层错误详情
        assert_eq!(e.to_string(), "缓存服务错误");
    }

    #[test]
    fn codes_are_stable_per_variant() {
        assert_eq!(WorkflowError::CapacityExceeded.code(), 2001);
        assert_eq!(WorkflowError::InvalidStateTransition.code(), 2004);
        assert_eq!(WorkflowError::Duplicate.code(), 1001);
    }
}
