use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::routes::group::model::is_participant;

/// 只存文件元数据和外部存储地址，文件本体不经过本服务
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct SharedFile {
    pub file_id: String,
    pub group_id: String,
    pub file_name: String,
    pub file_url: String,
    pub file_type: Option<String>,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ShareFileRequest {
    pub group_id: String,
    pub file_name: String,
    pub file_url: String,
    pub file_type: Option<String>,
}

const FILE_COLUMNS: &str =
    "file_id, group_id, file_name, file_url, file_type, uploaded_by, uploaded_at";

impl SharedFile {
    pub async fn create(
        pool: &PgPool,
        req: ShareFileRequest,
        uploaded_by: &str,
    ) -> Result<Self, WorkflowError> {
        if !is_participant(pool, &req.group_id, uploaded_by).await? {
            return Err(WorkflowError::NotAuthorized);
        }
        if req.file_name.trim().is_empty() || req.file_url.trim().is_empty() {
            return Err(WorkflowError::Validation("文件名和地址不能为空".into()));
        }

        let file_id = Uuid::new_v4().to_string();
        let file = sqlx::query_as::<_, SharedFile>(&format!(
            r#"
            INSERT INTO shared_files (
                file_id, group_id, file_name, file_url, file_type, uploaded_by, uploaded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING {FILE_COLUMNS}
            "#
        ))
        .bind(&file_id)
        .bind(&req.group_id)
        .bind(req.file_name.trim())
        .bind(req.file_url.trim())
        .bind(&req.file_type)
        .bind(uploaded_by)
        .fetch_one(pool)
        .await?;

        Ok(file)
    }

    pub async fn list_for_group(
        pool: &PgPool,
        group_id: &str,
        user_id: &str,
    ) -> Result<Vec<Self>, WorkflowError> {
        if !is_participant(pool, group_id, user_id).await? {
            return Err(WorkflowError::NotAuthorized);
        }

        let files = sqlx::query_as::<_, SharedFile>(&format!(
            "SELECT {FILE_COLUMNS} FROM shared_files WHERE group_id = $1 ORDER BY uploaded_at DESC"
        ))
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(files)
    }

    /// 上传者本人才能删除分享记录
    pub async fn delete(pool: &PgPool, file_id: &str, user_id: &str) -> Result<(), WorkflowError> {
        let file = sqlx::query_as::<_, SharedFile>(&format!(
            "SELECT {FILE_COLUMNS} FROM shared_files WHERE file_id = $1"
        ))
        .bind(file_id)
        .fetch_optional(pool)
        .await?
        .ok_or(WorkflowError::NotFound("文件"))?;

        if file.uploaded_by != user_id {
            return Err(WorkflowError::NotAuthorized);
        }

        sqlx::query("DELETE FROM shared_files WHERE file_id = $1")
            .bind(file_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
