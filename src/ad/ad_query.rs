use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};
use std::str::FromStr;

use crate::{
    dto::Page,
    error::{AppError, Result},
    slug::escape_like,
};

use super::{
    ad_dto::AdListParams,
    ad_models::{AdStatus, Condition, Currency},
};

pub const DEFAULT_PER_PAGE: u32 = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdSort {
    PriceAsc,
    PriceDesc,
    /// Newest first by publication time, ties broken by id.
    #[default]
    Newest,
}

impl FromStr for AdSort {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "price_asc" => Ok(AdSort::PriceAsc),
            "price_desc" => Ok(AdSort::PriceDesc),
            "newest" => Ok(AdSort::Newest),
            other => Err(format!("sort: unknown value '{other}'")),
        }
    }
}

impl AdSort {
    fn order_by(&self) -> &'static str {
        match self {
            AdSort::PriceAsc => " ORDER BY a.price ASC, a.id DESC",
            AdSort::PriceDesc => " ORDER BY a.price DESC, a.id DESC",
            AdSort::Newest => " ORDER BY a.published_at DESC NULLS LAST, a.id DESC",
        }
    }
}

/// Parsed catalog filters. `None` never narrows the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdFilters {
    pub q: Option<String>,
    pub currency: Option<Currency>,
    pub city: Option<String>,
    pub condition: Option<Condition>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub category_id: Option<i64>,
    pub status: AdStatus,
    pub sort: AdSort,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_field<T: FromStr>(field: &str, value: &Option<String>) -> Result<Option<T>> {
    non_blank(value)
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| AppError::Validation(format!("{field}: invalid value '{v}'")))
        })
        .transpose()
}

impl AdFilters {
    pub fn from_params(params: &AdListParams) -> Result<Self> {
        let filters = Self {
            q: non_blank(&params.q).map(str::to_string),
            currency: parse_field("currency", &params.currency)?,
            city: non_blank(&params.city).map(str::to_string),
            condition: parse_field("condition", &params.condition)?,
            price_min: parse_field("price_min", &params.price_min)?,
            price_max: parse_field("price_max", &params.price_max)?,
            category_id: parse_field("category_id", &params.category_id)?,
            status: parse_field("status", &params.status)?.unwrap_or_default(),
            sort: non_blank(&params.sort)
                .and_then(|s| s.parse::<AdSort>().ok())
                .unwrap_or_default(),
        };

        Ok(filters)
    }
}

/// Filters with the category already expanded to its descendant set.
#[derive(Debug, Clone)]
pub struct AdQuery {
    filters: AdFilters,
    category_ids: Option<Vec<i64>>,
}

const LIST_SELECT: &str = "SELECT a.*, c.name AS category_name,
        cover.id AS cover_image_id, cover.path AS cover_image_path
     FROM ads a
     JOIN categories c ON c.id = a.category_id
     LEFT JOIN LATERAL (
        SELECT i.id, i.path FROM ad_images i
        WHERE i.ad_id = a.id AND i.is_cover
        ORDER BY i.position, i.id
        LIMIT 1
     ) cover ON TRUE";

impl AdQuery {
    pub fn new(filters: AdFilters, category_ids: Option<Vec<i64>>) -> Self {
        Self {
            filters,
            category_ids,
        }
    }

    pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ads a");
        self.push_conditions(&mut qb);
        qb
    }

    pub fn page_query(&self, page: Page) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(LIST_SELECT);
        self.push_conditions(&mut qb);
        qb.push(self.filters.sort.order_by());
        qb.push(" LIMIT ").push_bind(page.limit as i64);
        qb.push(" OFFSET ").push_bind(page.offset());
        qb
    }

    fn push_conditions(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        let f = &self.filters;

        qb.push(" WHERE a.status = ").push_bind(f.status);

        if let Some(q) = &f.q {
            // Both sides are folded by the database so they agree on case.
            let pattern = format!("%{}%", escape_like(q));
            qb.push(" AND (LOWER(a.title) LIKE LOWER(")
                .push_bind(pattern.clone())
                .push(") OR LOWER(a.description) LIKE LOWER(")
                .push_bind(pattern)
                .push("))");
        }
        if let Some(currency) = f.currency {
            qb.push(" AND a.currency = ").push_bind(currency);
        }
        if let Some(city) = &f.city {
            qb.push(" AND LOWER(a.city) = LOWER(")
                .push_bind(city.clone())
                .push(")");
        }
        if let Some(condition) = f.condition {
            qb.push(" AND a.condition = ").push_bind(condition);
        }
        if let Some(min) = f.price_min {
            qb.push(" AND a.price >= ").push_bind(min);
        }
        if let Some(max) = f.price_max {
            qb.push(" AND a.price <= ").push_bind(max);
        }
        if let Some(ids) = &self.category_ids {
            qb.push(" AND a.category_id = ANY(")
                .push_bind(ids.clone())
                .push(")");
        }
    }
}
