use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One parent edge of the category forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct CategoryEdge {
    pub id: i64,
    pub parent_id: Option<i64>,
}
