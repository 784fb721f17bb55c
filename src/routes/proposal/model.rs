use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::WorkflowError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Proposal {
    pub proposal_id: String,
    pub group_id: String,
    pub title: String,
    pub description: String,
    pub full_proposal: Option<String>,
    pub field: String,
    pub keywords: Vec<String>,
    pub project_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SaveProposalRequest {
    pub title: String,
    pub description: String,
    pub full_proposal: Option<String>,
    pub field: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_project_type")]
    pub project_type: String,
}

fn default_project_type() -> String {
    "thesis".to_string()
}

const PROPOSAL_COLUMNS: &str = "proposal_id, group_id, title, description, full_proposal, \
     field, keywords, project_type, status, created_at, updated_at";

impl Proposal {
    pub async fn find_by_group(pool: &PgPool, group_id: &str) -> Result<Option<Self>, WorkflowError> {
        let proposal = sqlx::query_as::<_, Proposal>(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE group_id = $1"
        ))
        .bind(group_id)
        .fetch_optional(pool)
        .await?;

        Ok(proposal)
    }

    /// 保存草稿：没有就新建，有且还是草稿就覆盖。
    /// 已提交的选题书不允许再改
    pub async fn save(
        pool: &PgPool,
        group_id: &str,
        req: SaveProposalRequest,
    ) -> Result<Self, WorkflowError> {
        if req.title.trim().is_empty() {
            return Err(WorkflowError::Validation("选题标题不能为空".into()));
        }
        if !matches!(req.project_type.as_str(), "thesis" | "project") {
            return Err(WorkflowError::Validation("无效的项目类型".into()));
        }

        let mut tx = pool.begin().await?;

        let existing = sqlx::query_as::<_, Proposal>(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE group_id = $1 FOR UPDATE"
        ))
        .bind(group_id)
        .fetch_optional(&mut *tx)
        .await?;

        let proposal = match existing {
            Some(p) if p.status != "draft" && p.status != "rejected" => {
                return Err(WorkflowError::InvalidStateTransition);
            }
            Some(p) => {
                sqlx::query_as::<_, Proposal>(&format!(
                    r#"
                    UPDATE proposals SET
                        title = $1, description = $2, full_proposal = $3, field = $4,
                        keywords = $5, project_type = $6, status = 'draft', updated_at = NOW()
                    WHERE proposal_id = $7
                    RETURNING {PROPOSAL_COLUMNS}
                    "#
                ))
                .bind(req.title.trim())
                .bind(&req.description)
                .bind(&req.full_proposal)
                .bind(&req.field)
                .bind(&req.keywords)
                .bind(&req.project_type)
                .bind(&p.proposal_id)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                let proposal_id = Uuid::new_v4().to_string();
                sqlx::query_as::<_, Proposal>(&format!(
                    r#"
                    INSERT INTO proposals (
                        proposal_id, group_id, title, description, full_proposal,
                        field, keywords, project_type, status, created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'draft', NOW(), NOW())
                    RETURNING {PROPOSAL_COLUMNS}
                    "#
                ))
                .bind(&proposal_id)
                .bind(group_id)
                .bind(req.title.trim())
                .bind(&req.description)
                .bind(&req.full_proposal)
                .bind(&req.field)
                .bind(&req.keywords)
                .bind(&req.project_type)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;

        Ok(proposal)
    }

    /// 草稿提交，进入待审状态后锁定内容
    pub async fn submit(pool: &PgPool, group_id: &str) -> Result<Self, WorkflowError> {
        let proposal = sqlx::query_as::<_, Proposal>(&format!(
            r#"
            UPDATE proposals SET status = 'submitted', updated_at = NOW()
            WHERE group_id = $1 AND status = 'draft'
            RETURNING {PROPOSAL_COLUMNS}
            "#
        ))
        .bind(group_id)
        .fetch_optional(pool)
        .await?;

        match proposal {
            Some(p) => Ok(p),
            None => {
                // 区分"没有选题书"和"状态不允许提交"
                let exists = Self::find_by_group(pool, group_id).await?;
                match exists {
                    Some(_) => Err(WorkflowError::InvalidStateTransition),
                    None => Err(WorkflowError::NotFound("选题书")),
                }
            }
        }
    }
}
