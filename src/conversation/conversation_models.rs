use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dto::MessagePage, message::message_models::Message};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Conversation {
    pub id: i64,
    pub ad_id: Option<i64>,
    #[serde(skip_serializing)]
    pub user_low: Uuid,
    #[serde(skip_serializing)]
    pub user_high: Uuid,
    pub created_at: DateTime<Utc>,
    /// Activity timestamp, bumped by every new message.
    pub updated_at: DateTime<Utc>,
}

/// Participants are stored as an ordered pair so one index covers both
/// directions of a 1:1 conversation.
pub fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Participant {
    #[serde(skip_serializing)]
    pub conversation_id: i64,
    pub user_id: Uuid,
    pub name: String,
    pub last_read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub user_id: Uuid,
}

/// Conversation joined with the ad it is about.
#[derive(Debug, Clone, FromRow)]
pub struct ConversationRow {
    #[sqlx(flatten)]
    pub conversation: Conversation,
    pub ad_title: Option<String>,
    pub ad_slug: Option<String>,
    pub ad_owner_id: Option<Uuid>,
}

impl ConversationRow {
    pub fn ad_summary(&self) -> Option<AdSummary> {
        match (
            self.conversation.ad_id,
            &self.ad_title,
            &self.ad_slug,
            self.ad_owner_id,
        ) {
            (Some(id), Some(title), Some(slug), Some(user_id)) => Some(AdSummary {
                id,
                title: title.clone(),
                slug: slug.clone(),
                user_id,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct InboxRow {
    #[sqlx(flatten)]
    pub conversation_row: ConversationRow,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub ad: Option<AdSummary>,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InboxEntry {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub ad: Option<AdSummary>,
    pub latest_message: Option<Message>,
    pub participants: Vec<Participant>,
    /// Messages newer than the caller's last read.
    pub unread_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationThread {
    pub conversation: ConversationDetail,
    pub messages: MessagePage,
}
