use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    slug::slugify,
    state::{AppState, Config},
    storage::LocalBlobStore,
};

pub fn state(pool: PgPool) -> AppState {
    let config = Config {
        database_url: String::new(),
        database_max_connections: 1,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        storage_root: std::env::temp_dir().join(format!("marketplace-{}", Uuid::new_v4())),
        seed_categories: false,
    };
    let blob_store = Arc::new(LocalBlobStore::new(config.storage_root.clone()));

    AppState::new(pool, Arc::new(config), blob_store)
}

pub async fn insert_user(pool: &PgPool, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(format!("{id}@example.com"))
        .execute(pool)
        .await
        .unwrap();
    id
}

pub async fn insert_category(pool: &PgPool, name: &str, parent_id: Option<i64>) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO categories (name, slug, parent_id) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(name)
    .bind(slugify(name))
    .bind(parent_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// An active, published ad.
pub async fn insert_ad(
    pool: &PgPool,
    user_id: Uuid,
    category_id: i64,
    title: &str,
    price: Decimal,
) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO ads (user_id, category_id, title, slug, description, price, published_at)
         VALUES ($1, $2, $3, $4, $5, $6, NOW())
         RETURNING id",
    )
    .bind(user_id)
    .bind(category_id)
    .bind(title)
    .bind(format!("{}-{}", slugify(title), Uuid::new_v4()))
    .bind(format!("{title} in good shape"))
    .bind(price)
    .fetch_one(pool)
    .await
    .unwrap()
}
