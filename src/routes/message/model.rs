use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::routes::group::model::is_participant;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct MessageInfo {
    pub message_id: String,
    pub group_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub group_id: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct GetMessagesRequest {
    pub group_id: String,
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

// 缓存相关的常量
const MESSAGE_CACHE_EXPIRE: u64 = 300;
const MESSAGE_CACHE_PREFIX: &str = "msg:group:";

impl MessageInfo {
    pub async fn create(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        req: CreateMessageRequest,
        sender_id: String,
        sender_name: String,
    ) -> Result<Self, WorkflowError> {
        if !is_participant(pool, &req.group_id, &sender_id).await? {
            return Err(WorkflowError::NotAuthorized);
        }
        if req.content.trim().is_empty() {
            return Err(WorkflowError::Validation("消息内容不能为空".into()));
        }

        let message_id = Uuid::new_v4().to_string();
        let message = sqlx::query_as::<_, MessageInfo>(
            r#"
            INSERT INTO messages (message_id, group_id, sender_id, sender_name, content, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING message_id, group_id, sender_id, sender_name, content, created_at
            "#,
        )
        .bind(&message_id)
        .bind(&req.group_id)
        .bind(&sender_id)
        .bind(&sender_name)
        .bind(req.content.trim())
        .fetch_one(pool)
        .await?;

        // 发送新消息后，清除该小组的消息缓存
        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            let cache_key = format!("{}{}", MESSAGE_CACHE_PREFIX, req.group_id);
            let _: Result<(), redis::RedisError> = conn.del(&cache_key).await;
        }

        Ok(message)
    }

    pub async fn get_messages(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        req: GetMessagesRequest,
        user_id: &str,
    ) -> Result<Vec<Self>, WorkflowError> {
        if !is_participant(pool, &req.group_id, user_id).await? {
            return Err(WorkflowError::NotAuthorized);
        }

        let limit = req.limit.unwrap_or(50).clamp(1, 100);

        // 没有翻页参数的最新消息走缓存
        if req.before.is_none() && limit <= 50 {
            let cache_key = format!("{}{}", MESSAGE_CACHE_PREFIX, req.group_id);

            if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
                let cached: redis::RedisResult<String> = conn.get(&cache_key).await;

                if let Ok(json_str) = cached {
                    if let Ok(messages) = serde_json::from_str::<Vec<MessageInfo>>(&json_str) {
                        tracing::debug!("Get messages from cache: {}", cache_key);
                        return Ok(messages);
                    }
                }
            }
        }

        let messages = match req.before {
            Some(before) => {
                sqlx::query_as::<_, MessageInfo>(
                    "SELECT message_id, group_id, sender_id, sender_name, content, created_at \
                     FROM messages WHERE group_id = $1 AND created_at < $2 \
                     ORDER BY created_at DESC LIMIT $3",
                )
                .bind(&req.group_id)
                .bind(before)
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
            None => {
                let msgs = sqlx::query_as::<_, MessageInfo>(
                    "SELECT message_id, group_id, sender_id, sender_name, content, created_at \
                     FROM messages WHERE group_id = $1 \
                     ORDER BY created_at DESC LIMIT $2",
                )
                .bind(&req.group_id)
                .bind(limit)
                .fetch_all(pool)
                .await?;

                if limit <= 50 {
                    if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
                        let cache_key = format!("{}{}", MESSAGE_CACHE_PREFIX, req.group_id);
                        if let Ok(json_str) = serde_json::to_string(&msgs) {
                            let _: Result<(), redis::RedisError> =
                                conn.set_ex(&cache_key, json_str, MESSAGE_CACHE_EXPIRE).await;
                        }
                    }
                }

                msgs
            }
        };

        Ok(messages)
    }
}
