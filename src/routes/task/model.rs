use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::routes::group::model::is_participant;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub task_id: String,
    pub group_id: String,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub status: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub group_id: String,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub task_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

const TASK_COLUMNS: &str = "task_id, group_id, title, description, assigned_to, status, \
     due_date, created_by, created_at, updated_at";

impl Task {
    pub async fn create(
        pool: &PgPool,
        req: CreateTaskRequest,
        created_by: &str,
    ) -> Result<Self, WorkflowError> {
        if !is_participant(pool, &req.group_id, created_by).await? {
            return Err(WorkflowError::NotAuthorized);
        }
        if req.title.trim().is_empty() {
            return Err(WorkflowError::Validation("任务标题不能为空".into()));
        }

        let task_id = Uuid::new_v4().to_string();
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (
                task_id, group_id, title, description, assigned_to,
                status, due_date, created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, 'todo', $6, $7, NOW(), NOW())
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(&task_id)
        .bind(&req.group_id)
        .bind(req.title.trim())
        .bind(&req.description)
        .bind(&req.assigned_to)
        .bind(req.due_date)
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    pub async fn list_for_group(
        pool: &PgPool,
        group_id: &str,
        user_id: &str,
    ) -> Result<Vec<Self>, WorkflowError> {
        if !is_participant(pool, group_id, user_id).await? {
            return Err(WorkflowError::NotAuthorized);
        }

        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE group_id = $1 ORDER BY created_at"
        ))
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    pub async fn update(
        pool: &PgPool,
        req: UpdateTaskRequest,
        user_id: &str,
    ) -> Result<Self, WorkflowError> {
        if let Some(status) = &req.status {
            if !matches!(status.as_str(), "todo" | "in_progress" | "done") {
                return Err(WorkflowError::Validation("无效的任务状态".into()));
            }
        }

        let group_id: Option<String> =
            sqlx::query_scalar("SELECT group_id FROM tasks WHERE task_id = $1")
                .bind(&req.task_id)
                .fetch_optional(pool)
                .await?;
        let group_id = group_id.ok_or(WorkflowError::NotFound("任务"))?;
        if !is_participant(pool, &group_id, user_id).await? {
            return Err(WorkflowError::NotAuthorized);
        }

        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                assigned_to = COALESCE($3, assigned_to),
                status = COALESCE($4, status),
                due_date = COALESCE($5, due_date),
                updated_at = NOW()
            WHERE task_id = $6
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.assigned_to)
        .bind(&req.status)
        .bind(req.due_date)
        .bind(&req.task_id)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }
}
