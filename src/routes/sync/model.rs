use serde::Serialize;
use sqlx::PgPool;
use std::collections::BTreeMap;

use crate::error::WorkflowError;

/// 允许同步的表，按外键依赖排序：清空倒序、写入正序
const SYNC_TABLES: &[&str] = &[
    "students",
    "teachers",
    "student_groups",
    "group_members",
    "group_invitations",
    "proposals",
    "supervision_requests",
    "messages",
    "meetings",
    "tasks",
    "shared_files",
    "weekly_progress",
];

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub imported: BTreeMap<String, u64>,
}

/// 前端本地数据整体导入：载荷里出现的每张表先清空再写入，
/// 全部表在同一个事务内完成，失败整体回滚
pub async fn import_frontend_data(
    pool: &PgPool,
    payload: serde_json::Value,
) -> Result<ImportSummary, WorkflowError> {
    let object = payload
        .as_object()
        .ok_or_else(|| WorkflowError::Validation("同步载荷必须是JSON对象".into()))?;

    for key in object.keys() {
        if !SYNC_TABLES.contains(&key.as_str()) {
            return Err(WorkflowError::Validation(format!("未知的数据集合: {}", key)));
        }
    }

    let mut tx = pool.begin().await?;
    let mut imported = BTreeMap::new();

    // 先按依赖倒序清空所有涉及的表
    for table in SYNC_TABLES.iter().rev() {
        if object.contains_key(*table) {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }
    }

    // 再按依赖正序写入
    for table in SYNC_TABLES {
        let Some(rows) = object.get(*table) else {
            continue;
        };
        if !rows.is_array() {
            return Err(WorkflowError::Validation(format!(
                "{}必须是记录数组",
                table
            )));
        }

        // 记录字段与表列按名称对应，缺失的列留空
        let result = sqlx::query(&format!(
            "INSERT INTO {table} SELECT * FROM jsonb_populate_recordset(NULL::{table}, $1)"
        ))
        .bind(rows)
        .execute(&mut *tx)
        .await?;

        imported.insert(table.to_string(), result.rows_affected());
    }

    tx.commit().await?;

    Ok(ImportSummary { imported })
}

pub async fn collection_counts(pool: &PgPool) -> Result<BTreeMap<String, i64>, WorkflowError> {
    let mut counts = BTreeMap::new();
    for table in SYNC_TABLES {
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await?;
        counts.insert(table.to_string(), n);
    }
    Ok(counts)
}
