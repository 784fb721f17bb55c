use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::WorkflowError;
use crate::utils::hash_password;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Teacher {
    pub teacher_id: String,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub department: String,
    pub research_field: String,
    /// 发表论文列表 [{title, year, journal}]
    pub publications: serde_json::Value,
    pub max_students: i32,
    pub current_students_count: i32,
    pub accepted_topics: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTeacherRequest {
    pub teacher_id: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub department: String,
    pub research_field: String,
    #[serde(default)]
    pub publications: Vec<Publication>,
    pub max_students: i32,
    #[serde(default)]
    pub accepted_topics: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Publication {
    pub title: String,
    pub year: i32,
    pub journal: String,
}

#[derive(Debug, Deserialize)]
pub struct TeacherLoginRequest {
    pub teacher_id: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TeacherLoginResponse {
    pub token: String,
    pub teacher: Teacher,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeacherRequest {
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub research_field: Option<String>,
    pub publications: Option<Vec<Publication>>,
    pub max_students: Option<i32>,
    pub accepted_topics: Option<Vec<String>>,
    pub status: Option<String>,
}

const TEACHER_COLUMNS: &str = "teacher_id, full_name, email, password_hash, department, \
     research_field, publications, max_students, current_students_count, accepted_topics, \
     status, created_at, updated_at";

impl Teacher {
    pub async fn create(pool: &PgPool, req: CreateTeacherRequest) -> Result<Self, WorkflowError> {
        if req.max_students < 0 {
            return Err(WorkflowError::Validation("指导名额不能为负".into()));
        }
        let password_hash = hash_password(&req.password)
            .map_err(|e| WorkflowError::Validation(format!("密码处理失败: {}", e)))?;
        let publications = serde_json::to_value(&req.publications)
            .map_err(|e| WorkflowError::Validation(format!("论文列表格式错误: {}", e)))?;

        let teacher = sqlx::query_as::<_, Teacher>(&format!(
            r#"
            INSERT INTO teachers (
                teacher_id, full_name, email, password_hash, department, research_field,
                publications, max_students, current_students_count, accepted_topics,
                status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, 'active', NOW(), NOW())
            RETURNING {TEACHER_COLUMNS}
            "#
        ))
        .bind(&req.teacher_id)
        .bind(&req.full_name)
        .bind(&req.email)
        .bind(&password_hash)
        .bind(&req.department)
        .bind(&req.research_field)
        .bind(&publications)
        .bind(req.max_students)
        .bind(&req.accepted_topics)
        .fetch_one(pool)
        .await?;

        Ok(teacher)
    }

    pub async fn find_by_id(pool: &PgPool, teacher_id: &str) -> Result<Option<Self>, WorkflowError> {
        let teacher = sqlx::query_as::<_, Teacher>(&format!(
            "SELECT {TEACHER_COLUMNS} FROM teachers WHERE teacher_id = $1"
        ))
        .bind(teacher_id)
        .fetch_optional(pool)
        .await?;

        Ok(teacher)
    }

    /// 在岗教师列表，选导师页面展示用
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>, WorkflowError> {
        let teachers = sqlx::query_as::<_, Teacher>(&format!(
            "SELECT {TEACHER_COLUMNS} FROM teachers WHERE status = 'active' ORDER BY teacher_id"
        ))
        .fetch_all(pool)
        .await?;

        Ok(teachers)
    }

    pub async fn update_profile(
        pool: &PgPool,
        teacher_id: &str,
        req: UpdateTeacherRequest,
    ) -> Result<Self, WorkflowError> {
        if let Some(status) = &req.status {
            if !matches!(status.as_str(), "active" | "inactive" | "on_leave") {
                return Err(WorkflowError::Validation("无效的教师状态".into()));
            }
        }
        let publications = match &req.publications {
            Some(p) => Some(
                serde_json::to_value(p)
                    .map_err(|e| WorkflowError::Validation(format!("论文列表格式错误: {}", e)))?,
            ),
            None => None,
        };

        let teacher = sqlx::query_as::<_, Teacher>(&format!(
            r#"
            UPDATE teachers SET
                full_name = COALESCE($1, full_name),
                department = COALESCE($2, department),
                research_field = COALESCE($3, research_field),
                publications = COALESCE($4, publications),
                max_students = COALESCE($5, max_students),
                accepted_topics = COALESCE($6, accepted_topics),
                status = COALESCE($7, status),
                updated_at = NOW()
            WHERE teacher_id = $8
            RETURNING {TEACHER_COLUMNS}
            "#
        ))
        .bind(&req.full_name)
        .bind(&req.department)
        .bind(&req.research_field)
        .bind(&publications)
        .bind(req.max_students)
        .bind(&req.accepted_topics)
        .bind(&req.status)
        .bind(teacher_id)
        .fetch_optional(pool)
        .await?
        .ok_or(WorkflowError::NotFound("教师"))?;

        Ok(teacher)
    }

    pub fn verify_login(&self, password: &str) -> Result<bool, bcrypt::BcryptError> {
        match &self.password_hash {
            Some(hash) => crate::utils::verify_password(password, hash),
            None => Ok(false),
        }
    }
}
