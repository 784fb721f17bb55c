use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::WorkflowError;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Admin {
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub token: String,
    pub admin: Admin,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub students: i64,
    pub teachers: i64,
    pub groups: i64,
    pub invitations: i64,
    pub proposals: i64,
    pub requests: i64,
    pub messages: i64,
    pub meetings: i64,
    pub tasks: i64,
    pub files: i64,
    pub progress_reports: i64,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmClearRequest {
    pub confirm_token: String,
}

const CLEAR_CONFIRM_PREFIX: &str = "dashboard:clear:";

/// 清空操作涉及的全部业务表，管理员表除外
const CLEARED_TABLES: &[&str] = &[
    "weekly_progress",
    "shared_files",
    "tasks",
    "meetings",
    "messages",
    "supervision_requests",
    "proposals",
    "group_invitations",
    "group_members",
    "student_groups",
    "teachers",
    "students",
];

impl Admin {
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, WorkflowError> {
        let admin = sqlx::query_as::<_, Admin>(
            "SELECT username, password_hash, role, created_at FROM admins WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(admin)
    }

    pub fn verify_login(&self, password: &str) -> Result<bool, bcrypt::BcryptError> {
        match &self.password_hash {
            Some(hash) => crate::utils::verify_password(password, hash),
            None => Ok(false),
        }
    }
}

async fn count(pool: &PgPool, table: &str) -> Result<i64, WorkflowError> {
    let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await?;
    Ok(n)
}

impl DashboardStats {
    pub async fn collect(pool: &PgPool) -> Result<Self, WorkflowError> {
        // 各表计数并发执行，相互之间没有顺序要求
        let (
            students,
            teachers,
            groups,
            invitations,
            proposals,
            requests,
            messages,
            meetings,
            tasks,
            files,
            progress_reports,
        ) = futures_util::try_join!(
            count(pool, "students"),
            count(pool, "teachers"),
            count(pool, "student_groups"),
            count(pool, "group_invitations"),
            count(pool, "proposals"),
            count(pool, "supervision_requests"),
            count(pool, "messages"),
            count(pool, "meetings"),
            count(pool, "tasks"),
            count(pool, "shared_files"),
            count(pool, "weekly_progress"),
        )?;

        Ok(DashboardStats {
            students,
            teachers,
            groups,
            invitations,
            proposals,
            requests,
            messages,
            meetings,
            tasks,
            files,
            progress_reports,
        })
    }
}

/// 整表导出为JSON数组，列序无关。
/// 口令散列在导出时剔除，没有该列的表减法不生效
fn dump_query(table: &str) -> String {
    format!("SELECT jsonb_agg(to_jsonb(t) - 'password_hash') FROM {table} t")
}

async fn dump_table(pool: &PgPool, table: &str) -> Result<serde_json::Value, WorkflowError> {
    let rows: Option<serde_json::Value> = sqlx::query_scalar(&dump_query(table))
        .fetch_one(pool)
        .await?;
    Ok(rows.unwrap_or(serde_json::Value::Array(Vec::new())))
}

pub async fn all_data(pool: &PgPool) -> Result<serde_json::Value, WorkflowError> {
    let (
        students,
        teachers,
        groups,
        members,
        invitations,
        proposals,
        requests,
        messages,
        meetings,
        tasks,
        files,
        progress_reports,
    ) = futures_util::try_join!(
        dump_table(pool, "students"),
        dump_table(pool, "teachers"),
        dump_table(pool, "student_groups"),
        dump_table(pool, "group_members"),
        dump_table(pool, "group_invitations"),
        dump_table(pool, "proposals"),
        dump_table(pool, "supervision_requests"),
        dump_table(pool, "messages"),
        dump_table(pool, "meetings"),
        dump_table(pool, "tasks"),
        dump_table(pool, "shared_files"),
        dump_table(pool, "weekly_progress"),
    )?;

    Ok(serde_json::json!({
        "students": students,
        "teachers": teachers,
        "student_groups": groups,
        "group_members": members,
        "group_invitations": invitations,
        "proposals": proposals,
        "supervision_requests": requests,
        "messages": messages,
        "meetings": meetings,
        "tasks": tasks,
        "shared_files": files,
        "weekly_progress": progress_reports,
    }))
}

/// 第一步：签发一次性确认令牌，过期自动失效。
/// 清库必须分两步走，防止单次误调用直接清空数据
pub async fn issue_clear_token(
    redis: &Arc<RedisClient>,
    admin_username: &str,
    ttl_secs: u64,
) -> Result<String, WorkflowError> {
    let mut hasher = Sha256::new();
    hasher.update(admin_username.as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    let token: String = hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();

    let mut conn = redis.get_multiplexed_async_connection().await?;
    let key = format!("{}{}", CLEAR_CONFIRM_PREFIX, token);
    let _: () = conn.set_ex(&key, admin_username, ttl_secs).await?;

    Ok(token)
}

/// 第二步：校验令牌并在一个事务内清空全部业务表
pub async fn confirm_clear(
    pool: &PgPool,
    redis: &Arc<RedisClient>,
    confirm_token: &str,
) -> Result<(), WorkflowError> {
    let mut conn = redis.get_multiplexed_async_connection().await?;
    let key = format!("{}{}", CLEAR_CONFIRM_PREFIX, confirm_token);
    let holder: Option<String> = conn.get(&key).await?;
    if holder.is_none() {
        return Err(WorkflowError::Validation("确认令牌无效或已过期".into()));
    }
    // 令牌一次性使用
    let _: Result<(), redis::RedisError> = conn.del(&key).await;

    let mut tx = pool.begin().await?;
    for table in CLEARED_TABLES {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::warn!("All business data cleared by admin request");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_strips_password_hash_for_every_table() {
        // 含口令列的表和不含的表走同一条导出语句
        for table in ["students", "teachers", "proposals"] {
            let query = dump_query(table);
            assert!(query.contains("- 'password_hash'"));
            assert!(query.contains(table));
        }
    }
}
