use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    conversation::{
        conversation_repository::ConversationRepository, conversation_service::authorize,
    },
    db::DbPool,
    error::{AppError, Result},
};

use super::{message_models::MessageEvent, message_repository::MessageRepository};

#[derive(Clone)]
pub struct MessageService {
    db: DbPool,
    repo: MessageRepository,
    conversation_repo: ConversationRepository,
}

impl MessageService {
    pub fn new(
        db: DbPool,
        repo: MessageRepository,
        conversation_repo: ConversationRepository,
    ) -> Self {
        Self {
            db,
            repo,
            conversation_repo,
        }
    }

    /// Appends the message and moves the conversation to the top of every
    /// participant's inbox.
    pub async fn post_message(
        &self,
        conversation_id: i64,
        sender_id: Uuid,
        body: &str,
    ) -> Result<MessageEvent> {
        let participants = authorize(&self.conversation_repo, conversation_id, sender_id).await?;
        let body = normalize_body(body)?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let message = self
            .repo
            .create_with_tx(&mut tx, conversation_id, sender_id, body, now)
            .await?;
        self.conversation_repo
            .touch_with_tx(&mut tx, conversation_id, now)
            .await?;
        tx.commit().await?;

        tracing::info!(
            "Message {} posted to conversation {} by {}",
            message.id,
            conversation_id,
            sender_id
        );

        Ok(MessageEvent {
            recipients: participants.into_iter().filter(|id| *id != sender_id).collect(),
            message,
        })
    }

    pub async fn mark_read(&self, conversation_id: i64, user_id: Uuid) -> Result<DateTime<Utc>> {
        self.conversation_repo
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conversation not found".into()))?;

        let now = Utc::now();
        if self
            .conversation_repo
            .mark_read(conversation_id, user_id, now)
            .await?
            == 0
        {
            return Err(AppError::Forbidden);
        }

        Ok(now)
    }

    /// Tombstones a message. Only its sender may do this.
    pub async fn delete_message(
        &self,
        conversation_id: i64,
        message_id: i64,
        user_id: Uuid,
    ) -> Result<()> {
        authorize(&self.conversation_repo, conversation_id, user_id).await?;

        let message = self
            .repo
            .find_by_id(conversation_id, message_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Message not found".into()))?;

        if message.sender_id != user_id {
            return Err(AppError::Forbidden);
        }

        if self.repo.soft_delete(message.id, Utc::now()).await? == 0 {
            return Err(AppError::NotFound("Message not found".into()));
        }

        tracing::info!(
            "Message {} in conversation {} deleted by {}",
            message_id,
            conversation_id,
            user_id
        );
        Ok(())
    }
}

pub const MAX_BODY_CHARS: usize = 5000;

fn normalize_body(body: &str) -> Result<&str> {
    match body.trim() {
        "" => Err(AppError::Validation("body: must not be empty".into())),
        trimmed if trimmed.chars().count() > MAX_BODY_CHARS => Err(AppError::Validation(
            format!("body: at most {MAX_BODY_CHARS} characters"),
        )),
        trimmed => Ok(trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        conversation::conversation_dto::CreateConversationRequest,
        dto::Page,
        test_support::{insert_user, state},
    };
    use sqlx::PgPool;

    #[test]
    fn test_normalize_body() {
        assert_eq!(normalize_body("  hello \n").unwrap(), "hello");
        assert!(matches!(normalize_body(""), Err(AppError::Validation(_))));
        assert!(matches!(normalize_body(" \t\n"), Err(AppError::Validation(_))));

        let longest = "ž".repeat(MAX_BODY_CHARS);
        assert_eq!(normalize_body(&longest).unwrap(), longest);
        assert!(matches!(
            normalize_body(&format!("{longest}a")),
            Err(AppError::Validation(_))
        ));
    }

    #[sqlx::test]
    async fn test_only_sender_can_delete_and_deleted_messages_are_hidden(pool: PgPool) {
        let buyer = insert_user(&pool, "Marko").await;
        let seller = insert_user(&pool, "Ana").await;
        let app = state(pool);

        let id = app
            .conversation_service
            .get_or_create(
                buyer,
                CreateConversationRequest {
                    recipient_id: seller,
                    ad_id: None,
                    initial_message: None,
                },
            )
            .await
            .unwrap()
            .detail
            .conversation
            .id;

        let event = app.message_service.post_message(id, buyer, "  Typo  ").await.unwrap();
        assert_eq!(event.message.body, "Typo");
        assert!(event.is_for(seller));
        assert!(!event.is_for(buyer));
        let message_id = event.message.id;

        let by_recipient = app.message_service.delete_message(id, message_id, seller).await;
        assert!(matches!(by_recipient, Err(AppError::Forbidden)));

        app.message_service
            .delete_message(id, message_id, buyer)
            .await
            .unwrap();

        let thread = app
            .conversation_service
            .show(id, seller, Page::new(None, None, 30))
            .await
            .unwrap();
        assert_eq!(thread.messages.total, 0);

        let again = app.message_service.delete_message(id, message_id, buyer).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }
}
