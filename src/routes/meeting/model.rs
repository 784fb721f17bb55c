use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::routes::group::model::is_participant;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Meeting {
    pub meeting_id: String,
    pub group_id: String,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub location: Option<String>,
    pub created_by: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMeetingRequest {
    pub group_id: String,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMeetingStatusRequest {
    pub meeting_id: String,
    pub status: String,
}

const MEETING_COLUMNS: &str =
    "meeting_id, group_id, title, description, scheduled_at, location, created_by, status, created_at";

impl Meeting {
    pub async fn create(
        pool: &PgPool,
        req: CreateMeetingRequest,
        created_by: &str,
    ) -> Result<Self, WorkflowError> {
        if !is_participant(pool, &req.group_id, created_by).await? {
            return Err(WorkflowError::NotAuthorized);
        }
        if req.title.trim().is_empty() {
            return Err(WorkflowError::Validation("会议主题不能为空".into()));
        }

        let meeting_id = Uuid::new_v4().to_string();
        let meeting = sqlx::query_as::<_, Meeting>(&format!(
            r#"
            INSERT INTO meetings (
                meeting_id, group_id, title, description, scheduled_at,
                location, created_by, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'scheduled', NOW())
            RETURNING {MEETING_COLUMNS}
            "#
        ))
        .bind(&meeting_id)
        .bind(&req.group_id)
        .bind(req.title.trim())
        .bind(&req.description)
        .bind(req.scheduled_at)
        .bind(&req.location)
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        Ok(meeting)
    }

    pub async fn list_for_group(
        pool: &PgPool,
        group_id: &str,
        user_id: &str,
    ) -> Result<Vec<Self>, WorkflowError> {
        if !is_participant(pool, group_id, user_id).await? {
            return Err(WorkflowError::NotAuthorized);
        }

        let meetings = sqlx::query_as::<_, Meeting>(&format!(
            "SELECT {MEETING_COLUMNS} FROM meetings WHERE group_id = $1 ORDER BY scheduled_at DESC"
        ))
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(meetings)
    }

    pub async fn update_status(
        pool: &PgPool,
        req: UpdateMeetingStatusRequest,
        user_id: &str,
    ) -> Result<Self, WorkflowError> {
        if !matches!(req.status.as_str(), "scheduled" | "completed" | "cancelled") {
            return Err(WorkflowError::Validation("无效的会议状态".into()));
        }

        let group_id: Option<String> =
            sqlx::query_scalar("SELECT group_id FROM meetings WHERE meeting_id = $1")
                .bind(&req.meeting_id)
                .fetch_optional(pool)
                .await?;
        let group_id = group_id.ok_or(WorkflowError::NotFound("会议"))?;
        if !is_participant(pool, &group_id, user_id).await? {
            return Err(WorkflowError::NotAuthorized);
        }

        let meeting = sqlx::query_as::<_, Meeting>(&format!(
            "UPDATE meetings SET status = $1 WHERE meeting_id = $2 RETURNING {MEETING_COLUMNS}"
        ))
        .bind(&req.status)
        .bind(&req.meeting_id)
        .fetch_one(pool)
        .await?;

        Ok(meeting)
    }
}
