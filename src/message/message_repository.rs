use crate::{dto::Page, error::Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::message_models::Message;

#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: i64,
        sender_id: Uuid,
        body: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Message> {
        let message = sqlx::query_as::<_, Message>(
            "WITH inserted AS (
                INSERT INTO messages (conversation_id, sender_id, body, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $4)
                RETURNING *
             )
             SELECT m.id, m.conversation_id, m.sender_id, u.name AS sender_name,
                    m.body, m.created_at, m.deleted_at
             FROM inserted m
             JOIN users u ON u.id = m.sender_id",
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(body)
        .bind(created_at)
        .fetch_one(&mut **tx)
        .await?;

        Ok(message)
    }

    /// Newest first, tombstoned messages excluded.
    pub async fn find_page(&self, conversation_id: i64, page: Page) -> Result<(Vec<Message>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = $1 AND deleted_at IS NULL",
        )
        .bind(conversation_id)
        .fetch_one(&self.pool)
        .await?;

        let messages = sqlx::query_as::<_, Message>(
            "SELECT m.id, m.conversation_id, m.sender_id, u.name AS sender_name,
                    m.body, m.created_at, m.deleted_at
             FROM messages m
             JOIN users u ON u.id = m.sender_id
             WHERE m.conversation_id = $1 AND m.deleted_at IS NULL
             ORDER BY m.id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(conversation_id)
        .bind(page.limit as i64)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((messages, total))
    }

    /// Latest visible message of each given conversation.
    pub async fn find_latest(&self, conversation_ids: &[i64]) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT DISTINCT ON (m.conversation_id)
                    m.id, m.conversation_id, m.sender_id, u.name AS sender_name,
                    m.body, m.created_at, m.deleted_at
             FROM messages m
             JOIN users u ON u.id = m.sender_id
             WHERE m.conversation_id = ANY($1) AND m.deleted_at IS NULL
             ORDER BY m.conversation_id, m.id DESC",
        )
        .bind(conversation_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    pub async fn find_by_id(&self, conversation_id: i64, message_id: i64) -> Result<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(
            "SELECT m.id, m.conversation_id, m.sender_id, u.name AS sender_name,
                    m.body, m.created_at, m.deleted_at
             FROM messages m
             JOIN users u ON u.id = m.sender_id
             WHERE m.id = $1 AND m.conversation_id = $2 AND m.deleted_at IS NULL",
        )
        .bind(message_id)
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    pub async fn soft_delete(&self, message_id: i64, deleted_at: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE messages SET deleted_at = $1, updated_at = $1
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(deleted_at)
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
