use crate::error::Result;
use sqlx::PgPool;

use super::category_models::{Category, CategoryEdge};

#[derive(Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_all(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories ORDER BY parent_id NULLS FIRST, name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    pub async fn find_edges(&self) -> Result<Vec<CategoryEdge>> {
        let edges = sqlx::query_as::<_, CategoryEdge>("SELECT id, parent_id FROM categories")
            .fetch_all(&self.pool)
            .await?;

        Ok(edges)
    }

    /// Inserts the category unless its slug is already taken; either way
    /// returns the row stored under that slug.
    pub async fn create_or_get(
        &self,
        name: &str,
        slug: &str,
        parent_id: Option<i64>,
    ) -> Result<Category> {
        let inserted = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, slug, parent_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (slug) DO NOTHING
             RETURNING *",
        )
        .bind(name)
        .bind(slug)
        .bind(parent_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(category) = inserted {
            return Ok(category);
        }

        let existing = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;

        Ok(existing)
    }
}
