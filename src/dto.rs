use serde::Serialize;
use utoipa::ToSchema;

use crate::{ad::ad_models::AdListItem, conversation::conversation_models::InboxEntry, message::message_models::Message};

#[derive(Debug, Serialize, ToSchema)]
#[aliases(AdPage = PaginatedResponse<AdListItem>, InboxPage = PaginatedResponse<InboxEntry>, MessagePage = PaginatedResponse<Message>)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, page: Page) -> Self {
        let total_pages = ((total.max(0) as f64) / (page.limit as f64)).ceil() as u32;
        Self {
            data,
            total,
            page: page.number,
            limit: page.limit,
            total_pages,
        }
    }
}

/// A 1-indexed page request, already clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub limit: u32,
}

impl Page {
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(number: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self {
            number: number.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.number as i64 - 1) * self.limit as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_clamping() {
        let page = Page::new(None, None, 15);
        assert_eq!(page, Page { number: 1, limit: 15 });
        assert_eq!(page.offset(), 0);

        let page = Page::new(Some(0), Some(1000), 15);
        assert_eq!(page, Page { number: 1, limit: 100 });

        let page = Page::new(Some(3), Some(20), 15);
        assert_eq!(page.offset(), 40);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let response = PaginatedResponse::new(vec![1, 2], 31, Page::new(Some(2), Some(15), 15));
        assert_eq!(response.total_pages, 3);
        assert_eq!(response.page, 2);

        let empty: PaginatedResponse<i32> = PaginatedResponse::new(vec![], 0, Page::new(None, None, 30));
        assert_eq!(empty.total_pages, 0);
    }
}
