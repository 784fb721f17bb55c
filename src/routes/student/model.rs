use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::WorkflowError;
use crate::utils::hash_password;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub student_id: String,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub department: String,
    pub year: i32,
    pub semester: i32,
    pub gpa: f64,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub group_id: Option<String>,
    pub is_group_admin: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterStudentRequest {
    pub student_id: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub department: String,
    pub year: i32,
    pub semester: i32,
    #[serde(default)]
    pub gpa: f64,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub student_id: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub student: Student,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub year: Option<i32>,
    pub semester: Option<i32>,
    pub gpa: Option<f64>,
    pub skills: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
}

const STUDENT_COLUMNS: &str = "student_id, full_name, email, password_hash, department, year, \
     semester, gpa, skills, interests, group_id, is_group_admin, status, created_at, updated_at";

impl Student {
    pub async fn create(
        pool: &PgPool,
        req: RegisterStudentRequest,
    ) -> Result<Self, WorkflowError> {
        let password_hash = hash_password(&req.password)
            .map_err(|e| WorkflowError::Validation(format!("密码处理失败: {}", e)))?;

        // student_id 和 email 的唯一性由数据库约束保证
        let student = sqlx::query_as::<_, Student>(&format!(
            r#"
            INSERT INTO students (
                student_id, full_name, email, password_hash, department,
                year, semester, gpa, skills, interests, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'active', NOW(), NOW())
            RETURNING {STUDENT_COLUMNS}
            "#
        ))
        .bind(&req.student_id)
        .bind(&req.full_name)
        .bind(&req.email)
        .bind(&password_hash)
        .bind(&req.department)
        .bind(req.year)
        .bind(req.semester)
        .bind(req.gpa)
        .bind(&req.skills)
        .bind(&req.interests)
        .fetch_one(pool)
        .await?;

        Ok(student)
    }

    pub async fn find_by_id(pool: &PgPool, student_id: &str) -> Result<Option<Self>, WorkflowError> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE student_id = $1"
        ))
        .bind(student_id)
        .fetch_optional(pool)
        .await?;

        Ok(student)
    }

    /// 按学号或姓名模糊搜索，邀请组员时使用
    pub async fn search(pool: &PgPool, query: &str) -> Result<Vec<Self>, WorkflowError> {
        let students = sqlx::query_as::<_, Student>(&format!(
            r#"
            SELECT {STUDENT_COLUMNS} FROM students
            WHERE status = 'active'
              AND (student_id ILIKE $1 OR full_name ILIKE $1)
            ORDER BY student_id
            LIMIT 50
            "#
        ))
        .bind(format!("%{}%", query))
        .fetch_all(pool)
        .await?;

        Ok(students)
    }

    pub async fn update_profile(
        pool: &PgPool,
        student_id: &str,
        req: UpdateProfileRequest,
    ) -> Result<Self, WorkflowError> {
        // 只更新提交的字段，合并语义
        let student = sqlx::query_as::<_, Student>(&format!(
            r#"
            UPDATE students SET
                full_name = COALESCE($1, full_name),
                department = COALESCE($2, department),
                year = COALESCE($3, year),
                semester = COALESCE($4, semester),
                gpa = COALESCE($5, gpa),
                skills = COALESCE($6, skills),
                interests = COALESCE($7, interests),
                updated_at = NOW()
            WHERE student_id = $8
            RETURNING {STUDENT_COLUMNS}
            "#
        ))
        .bind(&req.full_name)
        .bind(&req.department)
        .bind(req.year)
        .bind(req.semester)
        .bind(req.gpa)
        .bind(&req.skills)
        .bind(&req.interests)
        .bind(student_id)
        .fetch_optional(pool)
        .await?
        .ok_or(WorkflowError::NotFound("学生"))?;

        Ok(student)
    }

    pub fn verify_login(&self, password: &str) -> Result<bool, bcrypt::BcryptError> {
        match &self.password_hash {
            Some(hash) => crate::utils::verify_password(password, hash),
            None => Ok(false),
        }
    }
}
