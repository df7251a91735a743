use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, Result};

use super::ad_models::{Condition, Currency};

/// Highest accepted price, NUMERIC(12, 2).
pub const MAX_PRICE: Decimal = Decimal::from_parts(1410065408, 2, 0, false, 0); // 10_000_000_000

pub const MAX_IMAGES_PER_REQUEST: usize = 10;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAdRequest {
    pub category_id: i64,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[schema(value_type = String, example = "1000.00")]
    pub price: Decimal,
    pub currency: Currency,
    #[validate(length(max = 120))]
    pub city: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub condition: Condition,
    #[serde(default)]
    pub delivery_options: Vec<String>,
    #[serde(default)]
    pub is_negotiable: bool,
    pub cover_image_id: Option<i64>,
    pub images_order: Option<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAdRequest {
    pub category_id: Option<i64>,
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    #[schema(value_type = Option<String>, example = "1000.00")]
    pub price: Option<Decimal>,
    pub currency: Option<Currency>,
    #[validate(length(max = 120))]
    pub city: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub condition: Option<Condition>,
    pub delivery_options: Option<Vec<String>>,
    pub is_negotiable: Option<bool>,
    #[serde(default)]
    pub remove_image_ids: Vec<i64>,
    pub cover_image_id: Option<i64>,
    pub images_order: Option<Vec<i64>>,
}

impl CreateAdRequest {
    /// Trims the free-text fields so length rules see what will be stored.
    pub fn trimmed(mut self) -> Self {
        trim_in_place(&mut self.title);
        trim_in_place(&mut self.description);
        self
    }
}

impl UpdateAdRequest {
    pub fn trimmed(mut self) -> Self {
        if let Some(title) = self.title.as_mut() {
            trim_in_place(title);
        }
        if let Some(description) = self.description.as_mut() {
            trim_in_place(description);
        }
        self
    }
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

/// Image changes applied after the ad fields, in one pass.
#[derive(Debug, Default)]
pub struct ImageChanges {
    pub remove_image_ids: Vec<i64>,
    pub uploads: Vec<ImageUpload>,
    pub cover_image_id: Option<i64>,
    pub images_order: Option<Vec<i64>>,
}

/// Prices carry two fractional digits and must be non-negative.
pub fn normalize_price(price: Decimal) -> Result<Decimal> {
    if price < Decimal::ZERO {
        return Err(AppError::Validation("price: must be at least 0".to_string()));
    }
    let price = price.round_dp(2);
    if price >= MAX_PRICE {
        return Err(AppError::Validation("price: too large".to_string()));
    }
    Ok(price)
}

/// Trimmed, non-empty, first occurrence wins.
pub fn normalize_delivery_options(options: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(options.len());
    for option in options {
        let option = option.trim();
        if !option.is_empty() && !normalized.iter().any(|o| o == option) {
            normalized.push(option.to_string());
        }
    }
    normalized
}

/// An uploaded image file awaiting storage.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn extension(&self) -> Option<&'static str> {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => Some("jpg"),
            "image/png" => Some("png"),
            "image/webp" => Some("webp"),
            _ => None,
        }
    }
}

pub fn validate_uploads(uploads: &[ImageUpload]) -> Result<()> {
    if uploads.len() > MAX_IMAGES_PER_REQUEST {
        return Err(AppError::Validation(format!(
            "images: at most {MAX_IMAGES_PER_REQUEST} files per request"
        )));
    }

    for (index, upload) in uploads.iter().enumerate() {
        if upload.extension().is_none() {
            return Err(AppError::Validation(format!(
                "images.{index}: unsupported type '{}'",
                upload.content_type
            )));
        }
        if upload.bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::Validation(format!(
                "images.{index}: larger than 5MB"
            )));
        }
        if upload.bytes.is_empty() {
            return Err(AppError::Validation(format!("images.{index}: empty file")));
        }
    }

    Ok(())
}

/// Raw catalog query string. Every value arrives as text so blank
/// parameters can be treated as absent.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdListParams {
    /// Case-insensitive substring of title or description
    pub q: Option<String>,
    /// RSD, EUR or USD
    pub currency: Option<String>,
    /// Exact city, case-insensitive
    pub city: Option<String>,
    /// new, like_new, used or for_parts
    pub condition: Option<String>,
    /// Inclusive lower price bound
    pub price_min: Option<String>,
    /// Inclusive upper price bound
    pub price_max: Option<String>,
    /// Category; its sub-categories are included
    pub category_id: Option<String>,
    /// draft, active (default) or archived
    pub status: Option<String>,
    /// price_asc, price_desc or newest (default, also used for unknown values)
    pub sort: Option<String>,
    pub page: Option<u32>,
    /// Page size, default 15
    pub per_page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, len: usize) -> ImageUpload {
        ImageUpload {
            content_type: content_type.to_string(),
            bytes: vec![0u8; len],
        }
    }

    #[test]
    fn test_max_price_constant() {
        assert_eq!(MAX_PRICE, Decimal::from(10_000_000_000i64));
    }

    #[test]
    fn test_normalize_price() {
        assert_eq!(normalize_price(Decimal::new(100000, 2)).unwrap(), Decimal::new(100000, 2));
        assert_eq!(normalize_price(Decimal::new(12345, 3)).unwrap(), Decimal::new(1234, 2));
        assert_eq!(normalize_price(Decimal::ZERO).unwrap(), Decimal::ZERO);
        assert!(matches!(normalize_price(Decimal::new(-1, 2)), Err(AppError::Validation(_))));
        assert!(matches!(normalize_price(MAX_PRICE), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_normalize_delivery_options() {
        let options = vec![
            " pickup ".to_string(),
            "courier".to_string(),
            "".to_string(),
            "pickup".to_string(),
        ];
        assert_eq!(normalize_delivery_options(options), vec!["pickup", "courier"]);
    }

    #[test]
    fn test_validate_uploads() {
        assert!(validate_uploads(&[]).is_ok());
        assert!(validate_uploads(&[upload("image/png", 10), upload("image/webp", MAX_IMAGE_BYTES)]).is_ok());

        assert!(validate_uploads(&[upload("image/gif", 10)]).is_err());
        assert!(validate_uploads(&[upload("image/jpeg", MAX_IMAGE_BYTES + 1)]).is_err());
        assert!(validate_uploads(&[upload("image/jpeg", 0)]).is_err());

        let too_many: Vec<_> = (0..=MAX_IMAGES_PER_REQUEST).map(|_| upload("image/jpeg", 1)).collect();
        assert!(validate_uploads(&too_many).is_err());
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateAdRequest = serde_json::from_str(
            r#"{"category_id": 3, "title": "Bike", "description": "Red", "price": "1000.00",
                "currency": "RSD", "condition": "used"}"#,
        )
        .unwrap();

        assert!(request.validate().is_ok());
        assert!(!request.is_negotiable);
        assert!(request.delivery_options.is_empty());
        assert_eq!(request.price, Decimal::new(100000, 2));
    }

    #[test]
    fn test_whitespace_only_text_fails_validation() {
        let request: CreateAdRequest = serde_json::from_str(
            r#"{"category_id": 3, "title": "   ", "description": "  ", "price": "10",
                "currency": "EUR", "condition": "new"}"#,
        )
        .unwrap();

        let errors = request.trimmed().validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("description"));

        let update = UpdateAdRequest {
            title: Some(" \t ".into()),
            ..UpdateAdRequest::default()
        };
        assert!(update.trimmed().validate().is_err());
    }

    #[test]
    fn test_trimmed_keeps_inner_text() {
        let update = UpdateAdRequest {
            title: Some("  Red bike ".into()),
            description: Some("Barely used\n".into()),
            ..UpdateAdRequest::default()
        }
        .trimmed();

        assert!(update.validate().is_ok());
        assert_eq!(update.title.as_deref(), Some("Red bike"));
        assert_eq!(update.description.as_deref(), Some("Barely used"));
        assert!(UpdateAdRequest::default().trimmed().validate().is_ok());
    }
}
