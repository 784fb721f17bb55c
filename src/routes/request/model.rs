use chrono::{DateTime, Utc};
use redis::Client as RedisClient;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::routes::proposal::model::Proposal;

/// 指导申请的状态机：
/// pending -> accepted | rejected（教师）
/// accepted -> approved | admin_rejected（管理员）
/// rejected / approved / admin_rejected 为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
    AdminRejected,
    Approved,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
            RequestStatus::AdminRejected => "admin_rejected",
            RequestStatus::Approved => "approved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "rejected" => Some(RequestStatus::Rejected),
            "admin_rejected" => Some(RequestStatus::AdminRejected),
            "approved" => Some(RequestStatus::Approved),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Rejected | RequestStatus::AdminRejected | RequestStatus::Approved
        )
    }

    pub fn can_transition(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Accepted)
                | (RequestStatus::Pending, RequestStatus::Rejected)
                | (RequestStatus::Accepted, RequestStatus::Approved)
                | (RequestStatus::Accepted, RequestStatus::AdminRejected)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SupervisionRequest {
    pub request_id: String,
    pub group_id: String,
    pub teacher_id: String,
    pub proposal_id: String,
    pub message: Option<String>,
    pub status: String,
    pub requested_date: DateTime<Utc>,
    pub response_date: Option<DateTime<Utc>>,
    pub response_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendRequestRequest {
    pub teacher_id: String,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeacherDecision {
    Accept,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequestRequest {
    pub request_id: String,
    pub decision: TeacherDecision,
    pub response_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminDecision {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRequestRequest {
    pub request_id: String,
    pub decision: AdminDecision,
    pub response_message: Option<String>,
}

const REQUEST_COLUMNS: &str = "request_id, group_id, teacher_id, proposal_id, message, status, \
     requested_date, response_date, response_message";

fn parse_status(raw: &str) -> Result<RequestStatus, WorkflowError> {
    RequestStatus::parse(raw).ok_or_else(|| {
        tracing::error!("Unknown supervision request status in store: {}", raw);
        WorkflowError::Validation("申请状态数据异常".into())
    })
}

impl SupervisionRequest {
    /// 学生向教师发出指导申请。前提：小组已有选题书，
    /// 且对同一教师没有未完结的申请
    pub async fn send(
        pool: &PgPool,
        group_id: &str,
        req: SendRequestRequest,
    ) -> Result<Self, WorkflowError> {
        let proposal = Proposal::find_by_group(pool, group_id)
            .await?
            .ok_or(WorkflowError::NotFound("选题书"))?;

        let teacher_active: Option<String> =
            sqlx::query_scalar("SELECT status FROM teachers WHERE teacher_id = $1")
                .bind(&req.teacher_id)
                .fetch_optional(pool)
                .await?;
        match teacher_active.as_deref() {
            None => return Err(WorkflowError::NotFound("教师")),
            Some("active") => {}
            Some(_) => return Err(WorkflowError::Validation("该教师当前不接收指导申请".into())),
        }

        let live_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM supervision_requests \
             WHERE group_id = $1 AND teacher_id = $2 AND status IN ('pending', 'accepted'))",
        )
        .bind(group_id)
        .bind(&req.teacher_id)
        .fetch_one(pool)
        .await?;
        if live_exists {
            return Err(WorkflowError::Duplicate);
        }

        let request_id = Uuid::new_v4().to_string();
        let request = sqlx::query_as::<_, SupervisionRequest>(&format!(
            r#"
            INSERT INTO supervision_requests (
                request_id, group_id, teacher_id, proposal_id, message,
                status, requested_date
            )
            VALUES ($1, $2, $3, $4, $5, 'pending', NOW())
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(&request_id)
        .bind(group_id)
        .bind(&req.teacher_id)
        .bind(&proposal.proposal_id)
        .bind(&req.message)
        .fetch_one(pool)
        .await?;

        Ok(request)
    }

    /// 教师受理申请。接受只是中间态，还需管理员批准；
    /// 名额已满时拒绝接受并保持pending
    pub async fn respond(
        pool: &PgPool,
        teacher_id: &str,
        req: RespondRequestRequest,
    ) -> Result<Self, WorkflowError> {
        let mut tx = pool.begin().await?;

        let request = sqlx::query_as::<_, SupervisionRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM supervision_requests WHERE request_id = $1 FOR UPDATE"
        ))
        .bind(&req.request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WorkflowError::NotFound("申请"))?;

        if request.teacher_id != teacher_id {
            return Err(WorkflowError::NotAuthorized);
        }

        let current = parse_status(&request.status)?;
        let next = match req.decision {
            TeacherDecision::Accept => RequestStatus::Accepted,
            TeacherDecision::Reject => RequestStatus::Rejected,
        };
        if !current.can_transition(next) {
            return Err(WorkflowError::InvalidStateTransition);
        }

        if next == RequestStatus::Accepted {
            // 锁定教师行检查名额，满员则整体回滚，申请保持pending
            let counts: Option<(i32, i32)> = sqlx::query_as(
                "SELECT current_students_count, max_students FROM teachers \
                 WHERE teacher_id = $1 FOR UPDATE",
            )
            .bind(teacher_id)
            .fetch_optional(&mut *tx)
            .await?;
            let (current_count, max_students) =
                counts.ok_or(WorkflowError::NotFound("教师"))?;
            if current_count >= max_students {
                return Err(WorkflowError::CapacityExceeded);
            }
        }

        let updated = sqlx::query_as::<_, SupervisionRequest>(&format!(
            r#"
            UPDATE supervision_requests SET
                status = $1, response_date = NOW(), response_message = $2
            WHERE request_id = $3
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(next.as_str())
        .bind(&req.response_message)
        .bind(&req.request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// 管理员终审。批准时三处写入在同一事务内完成：
    /// 申请置为approved、小组绑定导师、教师名额计数+1，
    /// 任何一步失败整体回滚
    pub async fn finalize(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        req: FinalizeRequestRequest,
    ) -> Result<Self, WorkflowError> {
        let mut tx = pool.begin().await?;

        let request = sqlx::query_as::<_, SupervisionRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM supervision_requests WHERE request_id = $1 FOR UPDATE"
        ))
        .bind(&req.request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WorkflowError::NotFound("申请"))?;

        let current = parse_status(&request.status)?;
        let next = match req.decision {
            AdminDecision::Approve => RequestStatus::Approved,
            AdminDecision::Reject => RequestStatus::AdminRejected,
        };
        if !current.can_transition(next) {
            // 包括对已批准申请的重复批准：报错而不是静默重放
            return Err(WorkflowError::InvalidStateTransition);
        }

        if next == RequestStatus::Approved {
            // 名额守卫写在UPDATE条件里，教师满员时此处0行生效
            let incremented = sqlx::query(
                "UPDATE teachers SET \
                     current_students_count = current_students_count + 1, updated_at = NOW() \
                 WHERE teacher_id = $1 AND current_students_count < max_students",
            )
            .bind(&request.teacher_id)
            .execute(&mut *tx)
            .await?;
            if incremented.rows_affected() == 0 {
                return Err(WorkflowError::CapacityExceeded);
            }

            let group_updated = sqlx::query(
                "UPDATE student_groups SET \
                     supervisor_id = $1, status = 'supervised', updated_at = NOW() \
                 WHERE group_id = $2 AND supervisor_id IS NULL",
            )
            .bind(&request.teacher_id)
            .bind(&request.group_id)
            .execute(&mut *tx)
            .await?;
            if group_updated.rows_affected() == 0 {
                // 小组已被其他教师指导或已不存在
                return Err(WorkflowError::InvalidStateTransition);
            }
        }

        let updated = sqlx::query_as::<_, SupervisionRequest>(&format!(
            r#"
            UPDATE supervision_requests SET
                status = $1, response_date = NOW(),
                response_message = COALESCE($2, response_message)
            WHERE request_id = $3
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(next.as_str())
        .bind(&req.response_message)
        .bind(&req.request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        // 小组状态变了，清除详情缓存
        if next == RequestStatus::Approved {
            if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
                use redis::AsyncCommands;
                let cache_key = format!("group:id:{}", request.group_id);
                let _: Result<(), redis::RedisError> = conn.del(&cache_key).await;
            }
        }

        Ok(updated)
    }

    pub async fn list_for_teacher(
        pool: &PgPool,
        teacher_id: &str,
    ) -> Result<Vec<Self>, WorkflowError> {
        let requests = sqlx::query_as::<_, SupervisionRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM supervision_requests \
             WHERE teacher_id = $1 ORDER BY requested_date DESC"
        ))
        .bind(teacher_id)
        .fetch_all(pool)
        .await?;

        Ok(requests)
    }

    pub async fn list_for_group(pool: &PgPool, group_id: &str) -> Result<Vec<Self>, WorkflowError> {
        let requests = sqlx::query_as::<_, SupervisionRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM supervision_requests \
             WHERE group_id = $1 ORDER BY requested_date DESC"
        ))
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(requests)
    }

    /// 等待管理员终审的申请（教师已接受）
    pub async fn list_pending_admin(pool: &PgPool) -> Result<Vec<Self>, WorkflowError> {
        let requests = sqlx::query_as::<_, SupervisionRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM supervision_requests \
             WHERE status = 'accepted' ORDER BY requested_date"
        ))
        .fetch_all(pool)
        .await?;

        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_string_roundtrip() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Accepted,
            RequestStatus::Rejected,
            RequestStatus::AdminRejected,
            RequestStatus::Approved,
        ] {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse("cancelled"), None);
    }

    #[test]
    fn transition_table_matches_workflow() {
        use RequestStatus::*;
        assert!(Pending.can_transition(Accepted));
        assert!(Pending.can_transition(Rejected));
        assert!(Accepted.can_transition(Approved));
        assert!(Accepted.can_transition(AdminRejected));

        // 不允许跳过教师环节或回退
        assert!(!Pending.can_transition(Approved));
        assert!(!Pending.can_transition(AdminRejected));
        assert!(!Accepted.can_transition(Pending));
        assert!(!Accepted.can_transition(Rejected));
    }

    #[test]
    fn terminal_states_allow_nothing() {
        use RequestStatus::*;
        for terminal in [Rejected, AdminRejected, Approved] {
            assert!(terminal.is_terminal());
            for next in [Pending, Accepted, Rejected, AdminRejected, Approved] {
                assert!(!terminal.can_transition(next));
            }
        }
        assert!(!Pending.is_terminal());
        assert!(!Accepted.is_terminal());
    }

    #[test]
    fn reapproving_approved_request_is_rejected() {
        assert!(!RequestStatus::Approved.can_transition(RequestStatus::Approved));
    }
}
