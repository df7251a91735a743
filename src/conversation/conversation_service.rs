use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    ad::ad_repository::AdRepository,
    db::DbPool,
    dto::{Page, PaginatedResponse},
    error::{AppError, Result},
    message::{
        message_models::{Message, MessageEvent},
        message_repository::MessageRepository,
    },
    user::user_repository::UserRepository,
};

use super::{
    conversation_dto::CreateConversationRequest,
    conversation_models::{
        ordered_pair, ConversationDetail, ConversationThread, InboxEntry, Participant,
    },
    conversation_repository::ConversationRepository,
};

/// Outcome of a contact attempt.
pub struct OpenedConversation {
    pub detail: ConversationDetail,
    pub created: bool,
    /// Set when an initial message was posted.
    pub event: Option<MessageEvent>,
}

#[derive(Clone)]
pub struct ConversationService {
    db: DbPool,
    repo: ConversationRepository,
    message_repo: MessageRepository,
    ad_repo: AdRepository,
    user_repo: UserRepository,
}

impl ConversationService {
    pub fn new(
        db: DbPool,
        repo: ConversationRepository,
        message_repo: MessageRepository,
        ad_repo: AdRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            db,
            repo,
            message_repo,
            ad_repo,
            user_repo,
        }
    }

    /// Reuses the conversation between the two users about the ad (or the
    /// general one when no ad is given), creating it on first contact.
    pub async fn get_or_create(
        &self,
        initiator_id: Uuid,
        payload: CreateConversationRequest,
    ) -> Result<OpenedConversation> {
        let recipient_id = payload.recipient_id;
        check_contact(initiator_id, recipient_id, None)?;

        self.user_repo
            .find_by_id(recipient_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Recipient not found".into()))?;

        if let Some(ad_id) = payload.ad_id {
            let ad = self
                .ad_repo
                .find_by_id(ad_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Ad not found".into()))?;
            check_contact(initiator_id, recipient_id, Some(ad.user_id))?;
        }

        let (user_low, user_high) = ordered_pair(initiator_id, recipient_id);
        let mut tx = self.db.begin().await?;

        let (conversation, created) = match self
            .repo
            .find_by_pair_with_tx(&mut tx, user_low, user_high, payload.ad_id)
            .await?
        {
            Some(existing) => (existing, false),
            None => match self
                .repo
                .create_with_tx(&mut tx, user_low, user_high, payload.ad_id)
                .await?
            {
                Some(created) => (created, true),
                // Lost the race to a concurrent first contact.
                None => (
                    self.repo
                        .find_by_pair_with_tx(&mut tx, user_low, user_high, payload.ad_id)
                        .await?
                        .ok_or(AppError::InternalError)?,
                    false,
                ),
            },
        };

        self.repo
            .add_participants_with_tx(&mut tx, conversation.id, &[initiator_id, recipient_id])
            .await?;

        let message = match payload.initial_message() {
            Some(body) => {
                let now = Utc::now();
                let message = self
                    .message_repo
                    .create_with_tx(&mut tx, conversation.id, initiator_id, body, now)
                    .await?;
                self.repo.touch_with_tx(&mut tx, conversation.id, now).await?;
                Some(message)
            }
            None => None,
        };

        tx.commit().await?;

        if created {
            tracing::info!(
                "Conversation {} opened by {} with {} (ad {:?})",
                conversation.id,
                initiator_id,
                recipient_id,
                payload.ad_id
            );
        }

        let detail = self.detail(conversation.id).await?;
        let event = message.map(|message| MessageEvent {
            recipients: vec![recipient_id],
            message,
        });

        Ok(OpenedConversation {
            detail,
            created,
            event,
        })
    }

    pub async fn inbox(&self, user_id: Uuid, page: Page) -> Result<PaginatedResponse<InboxEntry>> {
        let (rows, total) = self.repo.find_for_user(user_id, page).await?;
        let ids: Vec<i64> = rows.iter().map(|r| r.conversation_row.conversation.id).collect();

        let mut participants = group_participants(self.repo.find_participants(&ids).await?);
        let mut latest: HashMap<i64, Message> = self
            .message_repo
            .find_latest(&ids)
            .await?
            .into_iter()
            .map(|m| (m.conversation_id, m))
            .collect();

        let entries = rows
            .into_iter()
            .map(|inbox_row| {
                let ad = inbox_row.conversation_row.ad_summary();
                let conversation = inbox_row.conversation_row.conversation;
                InboxEntry {
                    ad,
                    latest_message: latest.remove(&conversation.id),
                    participants: participants.remove(&conversation.id).unwrap_or_default(),
                    unread_count: inbox_row.unread_count,
                    conversation,
                }
            })
            .collect();

        Ok(PaginatedResponse::new(entries, total, page))
    }

    /// The conversation with one page of its messages, newest first.
    pub async fn show(
        &self,
        conversation_id: i64,
        user_id: Uuid,
        page: Page,
    ) -> Result<ConversationThread> {
        authorize(&self.repo, conversation_id, user_id).await?;

        let conversation = self.detail(conversation_id).await?;
        let (messages, total) = self.message_repo.find_page(conversation_id, page).await?;

        Ok(ConversationThread {
            conversation,
            messages: PaginatedResponse::new(messages, total, page),
        })
    }

    async fn detail(&self, conversation_id: i64) -> Result<ConversationDetail> {
        let row = self
            .repo
            .find_with_ad(conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conversation not found".into()))?;
        let participants = self.repo.find_participants(&[conversation_id]).await?;

        Ok(ConversationDetail {
            ad: row.ad_summary(),
            conversation: row.conversation,
            participants,
        })
    }
}

/// Participant ids of an existing conversation the user takes part in.
pub async fn authorize(
    repo: &ConversationRepository,
    conversation_id: i64,
    user_id: Uuid,
) -> Result<Vec<Uuid>> {
    repo.find_by_id(conversation_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Conversation not found".into()))?;

    let participants = repo.find_participant_ids(conversation_id).await?;
    check_participant(&participants, user_id)?;

    Ok(participants)
}

/// An ad-scoped conversation has to involve the ad's owner on one side.
pub fn check_contact(initiator_id: Uuid, recipient_id: Uuid, ad_owner: Option<Uuid>) -> Result<()> {
    if initiator_id == recipient_id {
        return Err(AppError::Validation(
            "recipient_id: cannot start a conversation with yourself".into(),
        ));
    }

    match ad_owner {
        Some(owner) if owner != recipient_id && owner != initiator_id => Err(
            AppError::Unprocessable("Recipient does not match ad owner".into()),
        ),
        _ => Ok(()),
    }
}

pub fn check_participant(participants: &[Uuid], user_id: Uuid) -> Result<()> {
    if participants.contains(&user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn group_participants(participants: Vec<Participant>) -> HashMap<i64, Vec<Participant>> {
    let mut grouped: HashMap<i64, Vec<Participant>> = HashMap::new();
    for participant in participants {
        grouped
            .entry(participant.conversation_id)
            .or_default()
            .push(participant);
    }
    grouped
}
