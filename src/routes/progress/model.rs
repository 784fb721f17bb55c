use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::routes::group::model::is_participant;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct WeeklyProgress {
    pub progress_id: String,
    pub group_id: String,
    pub student_id: String,
    pub week_number: i32,
    pub content: String,
    pub hours_spent: f64,
    pub supervisor_feedback: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitProgressRequest {
    pub group_id: String,
    pub week_number: i32,
    pub content: String,
    #[serde(default)]
    pub hours_spent: f64,
}

#[derive(Debug, Deserialize)]
pub struct ReviewProgressRequest {
    pub progress_id: String,
    pub feedback: String,
}

const PROGRESS_COLUMNS: &str = "progress_id, group_id, student_id, week_number, content, \
     hours_spent, supervisor_feedback, submitted_at";

impl WeeklyProgress {
    pub async fn submit(
        pool: &PgPool,
        req: SubmitProgressRequest,
        student_id: &str,
    ) -> Result<Self, WorkflowError> {
        let is_member: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM group_members WHERE group_id = $1 AND student_id = $2)",
        )
        .bind(&req.group_id)
        .bind(student_id)
        .fetch_one(pool)
        .await?;
        if !is_member {
            return Err(WorkflowError::NotAuthorized);
        }
        if req.week_number < 1 {
            return Err(WorkflowError::Validation("周数必须从1开始".into()));
        }
        if req.content.trim().is_empty() {
            return Err(WorkflowError::Validation("进度内容不能为空".into()));
        }

        let progress_id = Uuid::new_v4().to_string();
        let progress = sqlx::query_as::<_, WeeklyProgress>(&format!(
            r#"
            INSERT INTO weekly_progress (
                progress_id, group_id, student_id, week_number, content,
                hours_spent, submitted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING {PROGRESS_COLUMNS}
            "#
        ))
        .bind(&progress_id)
        .bind(&req.group_id)
        .bind(student_id)
        .bind(req.week_number)
        .bind(req.content.trim())
        .bind(req.hours_spent)
        .fetch_one(pool)
        .await?;

        Ok(progress)
    }

    pub async fn list_for_group(
        pool: &PgPool,
        group_id: &str,
        user_id: &str,
    ) -> Result<Vec<Self>, WorkflowError> {
        if !is_participant(pool, group_id, user_id).await? {
            return Err(WorkflowError::NotAuthorized);
        }

        let reports = sqlx::query_as::<_, WeeklyProgress>(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM weekly_progress \
             WHERE group_id = $1 ORDER BY week_number DESC, submitted_at DESC"
        ))
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(reports)
    }

    /// 只有该小组的指导教师可以批阅周报
    pub async fn review(
        pool: &PgPool,
        req: ReviewProgressRequest,
        teacher_id: &str,
    ) -> Result<Self, WorkflowError> {
        let supervises: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM weekly_progress p
                JOIN student_groups g ON g.group_id = p.group_id
                WHERE p.progress_id = $1 AND g.supervisor_id = $2
            )
            "#,
        )
        .bind(&req.progress_id)
        .bind(teacher_id)
        .fetch_one(pool)
        .await?;
        if !supervises {
            return Err(WorkflowError::NotAuthorized);
        }

        let progress = sqlx::query_as::<_, WeeklyProgress>(&format!(
            "UPDATE weekly_progress SET supervisor_feedback = $1 \
             WHERE progress_id = $2 RETURNING {PROGRESS_COLUMNS}"
        ))
        .bind(&req.feedback)
        .bind(&req.progress_id)
        .fetch_optional(pool)
        .await?
        .ok_or(WorkflowError::NotFound("周报"))?;

        Ok(progress)
    }
}
