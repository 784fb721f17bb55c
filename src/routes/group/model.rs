use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::WorkflowError;

/// 一个小组最多3人：1名组长 + 最多2名组员
pub const MAX_GROUP_MEMBERS: i64 = 3;

// 缓存相关常量
const GROUP_CACHE_EXPIRE: u64 = 300;
const GROUP_ID_CACHE_PREFIX: &str = "group:id:";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentGroup {
    pub group_id: String,
    pub group_name: String,
    pub leader_student_id: String,
    pub supervisor_id: Option<String>,
    pub project_title: Option<String>,
    pub project_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct GroupMemberInfo {
    pub student_id: String,
    pub full_name: String,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct GroupInvitation {
    pub invitation_id: String,
    pub group_id: String,
    pub from_student_id: String,
    pub to_student_id: String,
    pub message: Option<String>,
    pub status: String,
    pub sent_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: StudentGroup,
    pub members: Vec<GroupMemberInfo>,
    pub pending_invitations: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub group_name: String,
    pub project_title: Option<String>,
    #[serde(default = "default_project_type")]
    pub project_type: String,
}

fn default_project_type() -> String {
    "thesis".to_string()
}

#[derive(Debug, Deserialize)]
pub struct InviteStudentRequest {
    pub to_student_id: String,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RespondInvitationRequest {
    pub invitation_id: String,
    pub accept: bool,
}

#[derive(Debug, Deserialize)]
pub struct RemoveMemberRequest {
    pub student_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelInvitationRequest {
    pub invitation_id: String,
}

const GROUP_COLUMNS: &str = "group_id, group_name, leader_student_id, supervisor_id, \
     project_title, project_type, status, created_at, updated_at";

pub fn seats_left(member_count: i64, pending_invitations: i64) -> i64 {
    MAX_GROUP_MEMBERS - member_count - pending_invitations
}

/// 已结题或已解散的小组不再接收新成员
fn accepts_new_members(status: &str) -> bool {
    !matches!(status, "completed" | "dissolved")
}

/// 小组成员或指导教师才算参与者，协作数据按此做访问控制
pub async fn is_participant(
    pool: &PgPool,
    group_id: &str,
    user_id: &str,
) -> Result<bool, WorkflowError> {
    let participant: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM group_members WHERE group_id = $1 AND student_id = $2
            UNION
            SELECT 1 FROM student_groups WHERE group_id = $1 AND supervisor_id = $2
        )
        "#,
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(participant)
}

async fn invalidate_group_cache(redis: &Arc<RedisClient>, group_id: &str) {
    if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
        let cache_key = format!("{}{}", GROUP_ID_CACHE_PREFIX, group_id);
        let _: Result<(), redis::RedisError> = conn.del(&cache_key).await;
    }
}

/// 事务内锁定小组行，后续的容量检查在锁保护下进行
async fn lock_group(
    tx: &mut Transaction<'_, Postgres>,
    group_id: &str,
) -> Result<StudentGroup, WorkflowError> {
    let group = sqlx::query_as::<_, StudentGroup>(&format!(
        "SELECT {GROUP_COLUMNS} FROM student_groups WHERE group_id = $1 FOR UPDATE"
    ))
    .bind(group_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(WorkflowError::NotFound("小组"))?;

    Ok(group)
}

impl StudentGroup {
    pub async fn create(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        owner_student_id: &str,
        req: CreateGroupRequest,
    ) -> Result<Self, WorkflowError> {
        if req.group_name.trim().is_empty() {
            return Err(WorkflowError::Validation("小组名称不能为空".into()));
        }
        if !matches!(req.project_type.as_str(), "thesis" | "project") {
            return Err(WorkflowError::Validation("无效的项目类型".into()));
        }

        let mut tx = pool.begin().await?;

        // 锁定学生行，防止并发创建/接受邀请绕过"一人一组"
        let current_group: Option<Option<String>> = sqlx::query_scalar(
            "SELECT group_id FROM students WHERE student_id = $1 FOR UPDATE",
        )
        .bind(owner_student_id)
        .fetch_optional(&mut *tx)
        .await?;

        match current_group {
            None => return Err(WorkflowError::NotFound("学生")),
            Some(Some(_)) => return Err(WorkflowError::AlreadyInGroup),
            Some(None) => {}
        }

        let group_id = Uuid::new_v4().to_string();
        let group = sqlx::query_as::<_, StudentGroup>(&format!(
            r#"
            INSERT INTO student_groups (
                group_id, group_name, leader_student_id, supervisor_id,
                project_title, project_type, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, NULL, $4, $5, 'forming', NOW(), NOW())
            RETURNING {GROUP_COLUMNS}
            "#
        ))
        .bind(&group_id)
        .bind(req.group_name.trim())
        .bind(owner_student_id)
        .bind(&req.project_title)
        .bind(&req.project_type)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO group_members (group_id, student_id, role, joined_at) \
             VALUES ($1, $2, 'leader', NOW())",
        )
        .bind(&group_id)
        .bind(owner_student_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE students SET group_id = $1, is_group_admin = TRUE, updated_at = NOW() \
             WHERE student_id = $2",
        )
        .bind(&group_id)
        .bind(owner_student_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        invalidate_group_cache(redis, &group_id).await;

        Ok(group)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        group_id: &str,
    ) -> Result<Option<Self>, WorkflowError> {
        // 尝试从缓存读取
        let cache_key = format!("{}{}", GROUP_ID_CACHE_PREFIX, group_id);

        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            let cached: redis::RedisResult<String> = conn.get(&cache_key).await;

            if let Ok(json_str) = cached {
                if let Ok(group) = serde_json::from_str::<StudentGroup>(&json_str) {
                    tracing::debug!("Get group from cache: {}", cache_key);
                    return Ok(Some(group));
                }
            }
        }

        let group = sqlx::query_as::<_, StudentGroup>(&format!(
            "SELECT {GROUP_COLUMNS} FROM student_groups WHERE group_id = $1"
        ))
        .bind(group_id)
        .fetch_optional(pool)
        .await?;

        // 缓存结果
        if let Some(ref g) = group {
            if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
                if let Ok(json_str) = serde_json::to_string(g) {
                    let _: Result<(), redis::RedisError> =
                        conn.set_ex(&cache_key, json_str, GROUP_CACHE_EXPIRE).await;
                }
            }
        }

        Ok(group)
    }

    pub async fn find_by_member(
        pool: &PgPool,
        student_id: &str,
    ) -> Result<Option<Self>, WorkflowError> {
        let group = sqlx::query_as::<_, StudentGroup>(&format!(
            r#"
            SELECT {GROUP_COLUMNS} FROM student_groups g
            WHERE EXISTS (
                SELECT 1 FROM group_members m
                WHERE m.group_id = g.group_id AND m.student_id = $1
            )
            "#
        ))
        .bind(student_id)
        .fetch_optional(pool)
        .await?;

        Ok(group)
    }

    pub async fn members(pool: &PgPool, group_id: &str) -> Result<Vec<GroupMemberInfo>, WorkflowError> {
        let members = sqlx::query_as::<_, GroupMemberInfo>(
            r#"
            SELECT m.student_id, s.full_name, m.role, m.joined_at
            FROM group_members m
            JOIN students s ON s.student_id = m.student_id
            WHERE m.group_id = $1
            ORDER BY m.joined_at
            "#,
        )
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    pub async fn detail(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        group_id: &str,
    ) -> Result<GroupDetail, WorkflowError> {
        let group = Self::find_by_id(pool, redis, group_id)
            .await?
            .ok_or(WorkflowError::NotFound("小组"))?;
        let members = Self::members(pool, group_id).await?;
        let pending_invitations: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM group_invitations WHERE group_id = $1 AND status = 'pending'",
        )
        .bind(group_id)
        .fetch_one(pool)
        .await?;

        Ok(GroupDetail {
            group,
            members,
            pending_invitations,
        })
    }
}

impl GroupInvitation {
    /// 组长邀请学生入组。容量规则：已有成员 + 待处理邀请 >= 3 时拒绝，
    /// 防止邀请全部被接受后超员
    pub async fn invite(
        pool: &PgPool,
        group_id: &str,
        from_student_id: &str,
        req: InviteStudentRequest,
    ) -> Result<Self, WorkflowError> {
        let mut tx = pool.begin().await?;

        let group = lock_group(&mut tx, group_id).await?;
        if group.leader_student_id != from_student_id {
            return Err(WorkflowError::NotGroupAdmin);
        }
        if !accepts_new_members(&group.status) {
            return Err(WorkflowError::InvalidStateTransition);
        }

        // 被邀请学生必须存在且未加入其他小组
        let invitee_group: Option<Option<String>> =
            sqlx::query_scalar("SELECT group_id FROM students WHERE student_id = $1")
                .bind(&req.to_student_id)
                .fetch_optional(&mut *tx)
                .await?;
        match invitee_group {
            None => return Err(WorkflowError::NotFound("学生")),
            Some(Some(_)) => return Err(WorkflowError::AlreadyInGroup),
            Some(None) => {}
        }

        let member_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM group_members WHERE group_id = $1")
                .bind(group_id)
                .fetch_one(&mut *tx)
                .await?;
        let pending: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM group_invitations WHERE group_id = $1 AND status = 'pending'",
        )
        .bind(group_id)
        .fetch_one(&mut *tx)
        .await?;

        if seats_left(member_count, pending) <= 0 {
            return Err(WorkflowError::CapacityExceeded);
        }

        // 同一学生在同一小组只允许一条待处理邀请
        let duplicate: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM group_invitations \
             WHERE group_id = $1 AND to_student_id = $2 AND status = 'pending')",
        )
        .bind(group_id)
        .bind(&req.to_student_id)
        .fetch_one(&mut *tx)
        .await?;
        if duplicate {
            return Err(WorkflowError::Duplicate);
        }

        let invitation_id = Uuid::new_v4().to_string();
        let invitation = sqlx::query_as::<_, GroupInvitation>(
            r#"
            INSERT INTO group_invitations (
                invitation_id, group_id, from_student_id, to_student_id,
                message, status, sent_date
            )
            VALUES ($1, $2, $3, $4, $5, 'pending', NOW())
            RETURNING invitation_id, group_id, from_student_id, to_student_id,
                      message, status, sent_date
            "#,
        )
        .bind(&invitation_id)
        .bind(group_id)
        .bind(from_student_id)
        .bind(&req.to_student_id)
        .bind(&req.message)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(invitation)
    }

    /// 被邀请学生接受或拒绝邀请。接受时在组行锁内复查3人上限，
    /// 两份并发接受不会把同一小组挤超员
    pub async fn respond(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        responder_id: &str,
        req: RespondInvitationRequest,
    ) -> Result<(), WorkflowError> {
        let mut tx = pool.begin().await?;

        let invitation = sqlx::query_as::<_, GroupInvitation>(
            "SELECT invitation_id, group_id, from_student_id, to_student_id, message, status, \
             sent_date FROM group_invitations WHERE invitation_id = $1 FOR UPDATE",
        )
        .bind(&req.invitation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WorkflowError::NotFound("邀请"))?;

        if invitation.to_student_id != responder_id {
            return Err(WorkflowError::NotAuthorized);
        }
        if invitation.status != "pending" {
            return Err(WorkflowError::AlreadyResolved);
        }

        if !req.accept {
            sqlx::query(
                "UPDATE group_invitations SET status = 'declined' WHERE invitation_id = $1",
            )
            .bind(&req.invitation_id)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok(());
        }

        let group = lock_group(&mut tx, &invitation.group_id).await?;

        // 邀请发出后小组可能已经解散或结题
        if !accepts_new_members(&group.status) {
            return Err(WorkflowError::InvalidStateTransition);
        }

        // 锁定学生行并复查"一人一组"
        let responder_group: Option<Option<String>> = sqlx::query_scalar(
            "SELECT group_id FROM students WHERE student_id = $1 FOR UPDATE",
        )
        .bind(responder_id)
        .fetch_optional(&mut *tx)
        .await?;
        match responder_group {
            None => return Err(WorkflowError::NotFound("学生")),
            Some(Some(_)) => return Err(WorkflowError::AlreadyInGroup),
            Some(None) => {}
        }

        let member_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM group_members WHERE group_id = $1")
                .bind(&invitation.group_id)
                .fetch_one(&mut *tx)
                .await?;
        if member_count >= MAX_GROUP_MEMBERS {
            return Err(WorkflowError::CapacityExceeded);
        }

        sqlx::query(
            "UPDATE group_invitations SET status = 'accepted' WHERE invitation_id = $1",
        )
        .bind(&req.invitation_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO group_members (group_id, student_id, role, joined_at) \
             VALUES ($1, $2, 'member', NOW())",
        )
        .bind(&invitation.group_id)
        .bind(responder_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE students SET group_id = $1, is_group_admin = FALSE, updated_at = NOW() \
             WHERE student_id = $2",
        )
        .bind(&invitation.group_id)
        .bind(responder_id)
        .execute(&mut *tx)
        .await?;

        // 第一个组员加入后小组从组建中转为活动状态
        if group.status == "forming" {
            sqlx::query(
                "UPDATE student_groups SET status = 'active', updated_at = NOW() \
                 WHERE group_id = $1",
            )
            .bind(&invitation.group_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        invalidate_group_cache(redis, &invitation.group_id).await;

        Ok(())
    }

    /// 只有发出邀请的组长可以撤销待处理的邀请
    pub async fn cancel(
        pool: &PgPool,
        requester_id: &str,
        invitation_id: &str,
    ) -> Result<(), WorkflowError> {
        let mut tx = pool.begin().await?;

        let invitation = sqlx::query_as::<_, GroupInvitation>(
            "SELECT invitation_id, group_id, from_student_id, to_student_id, message, status, \
             sent_date FROM group_invitations WHERE invitation_id = $1 FOR UPDATE",
        )
        .bind(invitation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WorkflowError::NotFound("邀请"))?;

        if invitation.from_student_id != requester_id {
            return Err(WorkflowError::NotAuthorized);
        }
        if invitation.status != "pending" {
            return Err(WorkflowError::AlreadyResolved);
        }

        sqlx::query(
            "UPDATE group_invitations SET status = 'cancelled' WHERE invitation_id = $1",
        )
        .bind(invitation_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    pub async fn list_for_student(
        pool: &PgPool,
        student_id: &str,
    ) -> Result<Vec<Self>, WorkflowError> {
        let invitations = sqlx::query_as::<_, GroupInvitation>(
            "SELECT invitation_id, group_id, from_student_id, to_student_id, message, status, \
             sent_date FROM group_invitations \
             WHERE to_student_id = $1 AND status = 'pending' ORDER BY sent_date DESC",
        )
        .bind(student_id)
        .fetch_all(pool)
        .await?;

        Ok(invitations)
    }

    pub async fn list_for_group(pool: &PgPool, group_id: &str) -> Result<Vec<Self>, WorkflowError> {
        let invitations = sqlx::query_as::<_, GroupInvitation>(
            "SELECT invitation_id, group_id, from_student_id, to_student_id, message, status, \
             sent_date FROM group_invitations WHERE group_id = $1 ORDER BY sent_date DESC",
        )
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(invitations)
    }
}

impl StudentGroup {
    /// 组长移除组员；组长不能移除自己（解散另行处理）
    pub async fn remove_member(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        group_id: &str,
        requester_id: &str,
        target_student_id: &str,
    ) -> Result<(), WorkflowError> {
        let mut tx = pool.begin().await?;

        let group = lock_group(&mut tx, group_id).await?;
        if group.leader_student_id != requester_id {
            return Err(WorkflowError::NotGroupAdmin);
        }
        if target_student_id == group.leader_student_id {
            return Err(WorkflowError::Validation("组长不能移除自己".into()));
        }

        let removed = sqlx::query(
            "DELETE FROM group_members WHERE group_id = $1 AND student_id = $2",
        )
        .bind(group_id)
        .bind(target_student_id)
        .execute(&mut *tx)
        .await?;
        if removed.rows_affected() == 0 {
            return Err(WorkflowError::NotFound("组员"));
        }

        sqlx::query(
            "UPDATE students SET group_id = NULL, is_group_admin = FALSE, updated_at = NOW() \
             WHERE student_id = $1",
        )
        .bind(target_student_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        invalidate_group_cache(redis, group_id).await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seats_account_for_pending_invitations() {
        // 组长1人 + 2条待处理邀请：第三条邀请必须被拒绝
        assert_eq!(seats_left(1, 2), 0);
        assert!(seats_left(1, 2) <= 0);
        // 组长1人 + 1条待处理：还能再邀请1人
        assert!(seats_left(1, 1) > 0);
        // 满员小组
        assert_eq!(seats_left(3, 0), 0);
    }

    #[test]
    fn seats_never_go_positive_past_cap() {
        assert!(seats_left(3, 1) < 0);
        assert!(seats_left(2, 2) < 0);
    }

    #[test]
    fn closed_groups_reject_new_members() {
        // 邀请和接受共用同一判定：解散/结题后两条路都关闭
        assert!(!accepts_new_members("dissolved"));
        assert!(!accepts_new_members("completed"));
        assert!(accepts_new_members("forming"));
        assert!(accepts_new_members("active"));
        assert!(accepts_new_members("supervised"));
    }
}
