use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_INBOX_PER_PAGE: u32 = 20;
pub const DEFAULT_THREAD_PER_PAGE: u32 = 30;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateConversationRequest {
    pub recipient_id: Uuid,
    pub ad_id: Option<i64>,
    #[validate(length(max = 5000))]
    pub initial_message: Option<String>,
}

impl CreateConversationRequest {
    /// The opening message, if one with any content was sent.
    pub fn initial_message(&self) -> Option<&str> {
        self.initial_message
            .as_deref()
            .map(str::trim)
            .filter(|body| !body.is_empty())
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
