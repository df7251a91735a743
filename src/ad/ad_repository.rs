use crate::{dto::Page, error::Result, slug::suffix_pattern};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashSet;
use uuid::Uuid;

use super::{
    ad_models::{Ad, AdImage, AdListItem, AdStatus, Condition, Currency},
    ad_query::AdQuery,
};

#[derive(Clone)]
pub struct AdRepository {
    pool: PgPool,
}

/// Column values for a new ad row.
#[derive(Debug)]
pub struct NewAd<'a> {
    pub user_id: Uuid,
    pub category_id: i64,
    pub title: &'a str,
    pub slug: &'a str,
    pub description: &'a str,
    pub price: Decimal,
    pub currency: Currency,
    pub city: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub condition: Condition,
    pub delivery_options: &'a [String],
    pub is_negotiable: bool,
    pub status: AdStatus,
    pub published_at: Option<DateTime<Utc>>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct AdChanges<'a> {
    pub category_id: Option<i64>,
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub price: Option<Decimal>,
    pub currency: Option<Currency>,
    pub city: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub condition: Option<Condition>,
    pub delivery_options: Option<&'a [String]>,
    pub is_negotiable: Option<bool>,
}

impl AdRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_all(&self, query: &AdQuery, page: Page) -> Result<(Vec<AdListItem>, i64)> {
        let total: i64 = query
            .count_query()
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let ads = query
            .page_query(page)
            .build_query_as::<AdListItem>()
            .fetch_all(&self.pool)
            .await?;

        Ok((ads, total))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Ad>> {
        let ad = sqlx::query_as::<_, Ad>("SELECT * FROM ads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ad)
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Ad>> {
        let ad = sqlx::query_as::<_, Ad>("SELECT * FROM ads WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ad)
    }

    pub async fn increment_views(&self, id: i64) -> Result<Option<Ad>> {
        let ad = sqlx::query_as::<_, Ad>(
            "UPDATE ads SET views = views + 1 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ad)
    }

    /// Slugs equal to `base` or of the form `base-*`.
    pub async fn taken_slugs_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        base: &str,
    ) -> Result<HashSet<String>> {
        let slugs: Vec<String> =
            sqlx::query_scalar("SELECT slug FROM ads WHERE slug = $1 OR slug LIKE $2")
                .bind(base)
                .bind(suffix_pattern(base))
                .fetch_all(&mut **tx)
                .await?;

        Ok(slugs.into_iter().collect())
    }

    pub async fn create_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ad: NewAd<'_>,
    ) -> Result<Ad> {
        let ad = sqlx::query_as::<_, Ad>(
            "INSERT INTO ads (user_id, category_id, title, slug, description, price, currency,
                              city, phone, condition, delivery_options, is_negotiable, status,
                              published_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING *",
        )
        .bind(ad.user_id)
        .bind(ad.category_id)
        .bind(ad.title)
        .bind(ad.slug)
        .bind(ad.description)
        .bind(ad.price)
        .bind(ad.currency)
        .bind(ad.city)
        .bind(ad.phone)
        .bind(ad.condition)
        .bind(ad.delivery_options)
        .bind(ad.is_negotiable)
        .bind(ad.status)
        .bind(ad.published_at)
        .fetch_one(&mut **tx)
        .await?;

        Ok(ad)
    }

    pub async fn update_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
        changes: AdChanges<'_>,
    ) -> Result<Ad> {
        let ad = sqlx::query_as::<_, Ad>(
            "UPDATE ads SET
                category_id = COALESCE($1, category_id),
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                currency = COALESCE($5, currency),
                city = COALESCE($6, city),
                phone = COALESCE($7, phone),
                condition = COALESCE($8, condition),
                delivery_options = COALESCE($9, delivery_options),
                is_negotiable = COALESCE($10, is_negotiable),
                updated_at = NOW()
             WHERE id = $11
             RETURNING *",
        )
        .bind(changes.category_id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.price)
        .bind(changes.currency)
        .bind(changes.city)
        .bind(changes.phone)
        .bind(changes.condition)
        .bind(changes.delivery_options)
        .bind(changes.is_negotiable)
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(ad)
    }

    pub async fn delete(&self, id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM ads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn find_images(&self, ad_id: i64) -> Result<Vec<AdImage>> {
        let images = sqlx::query_as::<_, AdImage>(
            "SELECT id, ad_id, path, is_cover, position FROM ad_images
             WHERE ad_id = $1
             ORDER BY position, id",
        )
        .bind(ad_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    pub async fn find_image(&self, id: i64) -> Result<Option<AdImage>> {
        let image = sqlx::query_as::<_, AdImage>(
            "SELECT id, ad_id, path, is_cover, position FROM ad_images WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(image)
    }

    /// Loads and row-locks the ad's images for the rest of the transaction.
    pub async fn lock_images_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ad_id: i64,
    ) -> Result<Vec<AdImage>> {
        let images = sqlx::query_as::<_, AdImage>(
            "SELECT id, ad_id, path, is_cover, position FROM ad_images
             WHERE ad_id = $1
             ORDER BY position, id
             FOR UPDATE",
        )
        .bind(ad_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(images)
    }

    pub async fn delete_images_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ad_id: i64,
        image_ids: &[i64],
    ) -> Result<u64> {
        if image_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM ad_images WHERE ad_id = $1 AND id = ANY($2)")
            .bind(ad_id)
            .bind(image_ids)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn create_image_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ad_id: i64,
        path: &str,
        position: i32,
    ) -> Result<AdImage> {
        let image = sqlx::query_as::<_, AdImage>(
            "INSERT INTO ad_images (ad_id, path, is_cover, position)
             VALUES ($1, $2, FALSE, $3)
             RETURNING id, ad_id, path, is_cover, position",
        )
        .bind(ad_id)
        .bind(path)
        .bind(position)
        .fetch_one(&mut **tx)
        .await?;

        Ok(image)
    }

    /// Writes cover flags and positions for every given image of the ad.
    pub async fn save_image_layout_with_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ad_id: i64,
        images: &[AdImage],
    ) -> Result<()> {
        if images.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = images.iter().map(|i| i.id).collect();
        let covers: Vec<bool> = images.iter().map(|i| i.is_cover).collect();
        let positions: Vec<i32> = images.iter().map(|i| i.position).collect();

        sqlx::query(
            "UPDATE ad_images AS i
             SET is_cover = u.is_cover, position = u.position, updated_at = NOW()
             FROM UNNEST($1::BIGINT[], $2::BOOLEAN[], $3::INTEGER[]) AS u(id, is_cover, position)
             WHERE i.id = u.id AND i.ad_id = $4",
        )
        .bind(ids)
        .bind(covers)
        .bind(positions)
        .bind(ad_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
