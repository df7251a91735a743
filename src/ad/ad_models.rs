use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::category::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Rsd,
    Eur,
    Usd,
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Rsd => write!(f, "RSD"),
            Currency::Eur => write!(f, "EUR"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RSD" => Ok(Currency::Rsd),
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            other => Err(format!("currency: unknown value '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    Used,
    ForParts,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::New => write!(f, "new"),
            Condition::LikeNew => write!(f, "like_new"),
            Condition::Used => write!(f, "used"),
            Condition::ForParts => write!(f, "for_parts"),
        }
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Condition::New),
            "like_new" => Ok(Condition::LikeNew),
            "used" => Ok(Condition::Used),
            "for_parts" => Ok(Condition::ForParts),
            other => Err(format!("condition: unknown value '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdStatus {
    Draft,
    #[default]
    Active,
    Archived,
}

impl std::fmt::Display for AdStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdStatus::Draft => write!(f, "draft"),
            AdStatus::Active => write!(f, "active"),
            AdStatus::Archived => write!(f, "archived"),
        }
    }
}

impl FromStr for AdStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(AdStatus::Draft),
            "active" => Ok(AdStatus::Active),
            "archived" => Ok(AdStatus::Archived),
            other => Err(format!("status: unknown value '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Ad {
    pub id: i64,
    pub user_id: Uuid,
    pub category_id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub currency: Currency,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub condition: Condition,
    pub delivery_options: Vec<String>,
    pub is_negotiable: bool,
    pub status: AdStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub views: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AdImage {
    pub id: i64,
    pub ad_id: i64,
    pub path: String,
    pub is_cover: bool,
    pub position: i32,
}

/// Catalog row: the ad with its category name and cover image.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AdListItem {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub ad: Ad,
    pub category_name: String,
    pub cover_image_id: Option<i64>,
    pub cover_image_path: Option<String>,
}

/// Full ad as returned by show, create and update.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdDetail {
    #[serde(flatten)]
    pub ad: Ad,
    pub category: Category,
    pub images: Vec<AdImage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_text_round_trip() {
        for currency in [Currency::Rsd, Currency::Eur, Currency::Usd] {
            assert_eq!(currency.to_string().parse::<Currency>().unwrap(), currency);
        }
        for condition in [Condition::New, Condition::LikeNew, Condition::Used, Condition::ForParts] {
            assert_eq!(condition.to_string().parse::<Condition>().unwrap(), condition);
        }
        for status in [AdStatus::Draft, AdStatus::Active, AdStatus::Archived] {
            assert_eq!(status.to_string().parse::<AdStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_serde_matches_stored_text() {
        assert_eq!(serde_json::to_string(&Condition::LikeNew).unwrap(), "\"like_new\"");
        assert_eq!(serde_json::to_string(&Currency::Eur).unwrap(), "\"EUR\"");
        assert!("rsd".parse::<Currency>().is_err());
        assert_eq!(AdStatus::default(), AdStatus::Active);
    }
}
