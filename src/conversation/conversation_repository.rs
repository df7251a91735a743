use crate::{dto::Page, error::Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::conversation_models::{Conversation, ConversationRow, InboxRow, Participant};

const ROW_SELECT: &str = "SELECT c.*, a.title AS ad_title, a.slug AS ad_slug, a.user_id AS ad_owner_id
     FROM conversations c
     LEFT JOIN ads a ON a.id = c.ad_id";

#[derive(Clone)]
pub struct ConversationRepository {
    pool: PgPool,
}

impl ConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Conversation>> {
        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(conversation)
    }

    pub async fn find_with_ad(&self, id: i64) -> Result<Option<ConversationRow>> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!("{ROW_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn find_by_pair_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_low: Uuid,
        user_high: Uuid,
        ad_id: Option<i64>,
    ) -> Result<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations
             WHERE user_low = $1 AND user_high = $2 AND ad_id IS NOT DISTINCT FROM $3",
        )
        .bind(user_low)
        .bind(user_high)
        .bind(ad_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(conversation)
    }

    /// `None` when a concurrent request created the same conversation first.
    pub async fn create_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_low: Uuid,
        user_high: Uuid,
        ad_id: Option<i64>,
    ) -> Result<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "INSERT INTO conversations (ad_id, user_low, user_high)
             VALUES ($1, $2, $3)
             ON CONFLICT DO NOTHING
             RETURNING *",
        )
        .bind(ad_id)
        .bind(user_low)
        .bind(user_high)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(conversation)
    }

    pub async fn add_participants_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: i64,
        user_ids: &[Uuid],
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO conversation_participants (conversation_id, user_id)
             SELECT $1, UNNEST($2::uuid[])
             ON CONFLICT (conversation_id, user_id) DO NOTHING",
        )
        .bind(conversation_id)
        .bind(user_ids)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Bumps the activity timestamp that orders the inbox.
    pub async fn touch_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE conversations SET updated_at = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub async fn find_participant_ids(&self, conversation_id: i64) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM conversation_participants WHERE conversation_id = $1 ORDER BY id",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    pub async fn find_participants(&self, conversation_ids: &[i64]) -> Result<Vec<Participant>> {
        let participants = sqlx::query_as::<_, Participant>(
            "SELECT p.conversation_id, p.user_id, u.name, p.last_read_at
             FROM conversation_participants p
             JOIN users u ON u.id = p.user_id
             WHERE p.conversation_id = ANY($1)
             ORDER BY p.conversation_id, p.id",
        )
        .bind(conversation_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    /// Returns the number of participant rows updated; zero means the user is
    /// not part of the conversation.
    pub async fn mark_read(
        &self,
        conversation_id: i64,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE conversation_participants
             SET last_read_at = $1, updated_at = $1
             WHERE conversation_id = $2 AND user_id = $3",
        )
        .bind(at)
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Conversations the user takes part in, most recently active first,
    /// with the user's unread count.
    pub async fn find_for_user(&self, user_id: Uuid, page: Page) -> Result<(Vec<InboxRow>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM conversation_participants WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, InboxRow>(
            "SELECT c.*, a.title AS ad_title, a.slug AS ad_slug, a.user_id AS ad_owner_id,
                    (SELECT COUNT(*) FROM messages m
                     WHERE m.conversation_id = c.id
                       AND m.deleted_at IS NULL
                       AND (p.last_read_at IS NULL OR m.created_at > p.last_read_at)
                    ) AS unread_count
             FROM conversations c
             JOIN conversation_participants p ON p.conversation_id = c.id AND p.user_id = $1
             LEFT JOIN ads a ON a.id = c.ad_id
             ORDER BY c.updated_at DESC, c.id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit as i64)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }
}
