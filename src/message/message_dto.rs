use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Blank or overlong bodies are rejected after the participant check.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PostMessageRequest {
    pub body: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadReceipt {
    pub status: String,
    pub last_read_at: DateTime<Utc>,
}
