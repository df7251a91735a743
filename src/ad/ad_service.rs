use std::sync::Arc;

use uuid::Uuid;

use crate::{
    category::{
        category_repository::CategoryRepository, category_service::CategoryService, Category,
    },
    db::DbPool,
    dto::{Page, PaginatedResponse},
    error::{is_unique_violation, AppError, Result},
    slug::{disambiguate, slugify},
    storage::{ad_dir, remove_quietly, BlobStore},
};

use super::{
    ad_dto::{
        normalize_delivery_options, normalize_price, CreateAdRequest, ImageChanges,
        UpdateAdRequest,
    },
    ad_models::{Ad, AdDetail, AdImage, AdListItem, AdStatus},
    ad_query::{AdFilters, AdQuery},
    ad_repository::{AdChanges, AdRepository, NewAd},
    image_set::ImageSet,
};

/// Result of one image sync inside a transaction.
struct SyncedImages {
    images: Vec<AdImage>,
    removed_paths: Vec<String>,
}

#[derive(Clone)]
pub struct AdService {
    db: DbPool,
    repo: AdRepository,
    category_repo: CategoryRepository,
    category_service: CategoryService,
    blob_store: Arc<dyn BlobStore>,
}

impl AdService {
    pub fn new(
        db: DbPool,
        repo: AdRepository,
        category_repo: CategoryRepository,
        category_service: CategoryService,
        blob_store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            db,
            repo,
            category_repo,
            category_service,
            blob_store,
        }
    }

    pub async fn list_ads(
        &self,
        filters: AdFilters,
        page: Page,
    ) -> Result<PaginatedResponse<AdListItem>> {
        let category_ids = match filters.category_id {
            Some(category_id) => Some(self.category_service.descendant_ids(category_id).await?),
            None => None,
        };

        let query = AdQuery::new(filters, category_ids);
        let (ads, total) = self.repo.find_all(&query, page).await?;

        Ok(PaginatedResponse::new(ads, total, page))
    }

    /// Returns the ad with its category and images and counts the view.
    pub async fn get_ad(&self, slug: &str) -> Result<AdDetail> {
        let ad = self.find_by_slug(slug).await?;
        let ad = self
            .repo
            .increment_views(ad.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ad not found".into()))?;
        let images = self.repo.find_images(ad.id).await?;

        self.detail(ad, images).await
    }

    pub async fn create_ad(
        &self,
        user_id: Uuid,
        payload: CreateAdRequest,
        changes: ImageChanges,
    ) -> Result<AdDetail> {
        self.find_category(payload.category_id).await?;
        let price = normalize_price(payload.price)?;
        let delivery_options = normalize_delivery_options(payload.delivery_options);

        let mut stored_paths = Vec::new();
        let result = async {
            let mut tx = self.db.begin().await?;

            let base = match slugify(&payload.title) {
                s if s.is_empty() => "ad".to_string(),
                s => s,
            };
            let taken = self.repo.taken_slugs_with_tx(&mut tx, &base).await?;
            let slug = disambiguate(&base, &taken);

            let ad = self
                .repo
                .create_with_tx(
                    &mut tx,
                    NewAd {
                        user_id,
                        category_id: payload.category_id,
                        title: payload.title.trim(),
                        slug: &slug,
                        description: &payload.description,
                        price,
                        currency: payload.currency,
                        city: payload.city.as_deref(),
                        phone: payload.phone.as_deref(),
                        condition: payload.condition,
                        delivery_options: &delivery_options,
                        is_negotiable: payload.is_negotiable,
                        status: AdStatus::Active,
                        published_at: Some(chrono::Utc::now()),
                    },
                )
                .await
                .map_err(slug_conflict)?;

            let synced = self
                .sync_images_with_tx(&mut tx, ad.id, changes, &mut stored_paths)
                .await?;

            tx.commit().await?;
            Ok::<_, AppError>((ad, synced))
        }
        .await;

        let (ad, synced) = self.finish(result, stored_paths).await?;
        tracing::info!("Ad {} ({}) created by {}", ad.id, ad.slug, user_id);

        self.detail(ad, synced.images).await
    }

    pub async fn update_ad(
        &self,
        user_id: Uuid,
        slug: &str,
        payload: UpdateAdRequest,
        mut changes: ImageChanges,
    ) -> Result<AdDetail> {
        let ad = self.find_owned(user_id, slug).await?;

        let UpdateAdRequest {
            category_id,
            title,
            description,
            price,
            currency,
            city,
            phone,
            condition,
            delivery_options,
            is_negotiable,
            remove_image_ids,
            cover_image_id,
            images_order,
        } = payload;

        if let Some(category_id) = category_id {
            self.find_category(category_id).await?;
        }
        let price = price.map(normalize_price).transpose()?;
        let delivery_options = delivery_options.map(normalize_delivery_options);

        changes.remove_image_ids = remove_image_ids;
        changes.cover_image_id = cover_image_id;
        changes.images_order = images_order;

        let mut stored_paths = Vec::new();
        let result = async {
            let mut tx = self.db.begin().await?;

            let ad = self
                .repo
                .update_with_tx(
                    &mut tx,
                    ad.id,
                    AdChanges {
                        category_id,
                        title: title.as_deref().map(str::trim),
                        description: description.as_deref(),
                        price,
                        currency,
                        city: city.as_deref(),
                        phone: phone.as_deref(),
                        condition,
                        delivery_options: delivery_options.as_deref(),
                        is_negotiable,
                    },
                )
                .await?;

            let synced = self
                .sync_images_with_tx(&mut tx, ad.id, changes, &mut stored_paths)
                .await?;

            tx.commit().await?;
            Ok::<_, AppError>((ad, synced))
        }
        .await;

        let (ad, synced) = self.finish(result, stored_paths).await?;
        tracing::info!("Ad {} ({}) updated by {}", ad.id, ad.slug, user_id);

        self.detail(ad, synced.images).await
    }

    pub async fn delete_ad(&self, user_id: Uuid, slug: &str) -> Result<()> {
        let ad = self.find_owned(user_id, slug).await?;

        if self.repo.delete(ad.id).await? == 0 {
            return Err(AppError::NotFound("Ad not found".into()));
        }

        if let Err(e) = self.blob_store.delete_dir(&ad_dir(ad.id)).await {
            tracing::warn!("Failed to delete image directory of ad {}: {:?}", ad.id, e);
        }

        tracing::info!("Ad {} ({}) deleted by {}", ad.id, ad.slug, user_id);
        Ok(())
    }

    /// Stored image record and file contents.
    pub async fn get_image(&self, image_id: i64) -> Result<(AdImage, Vec<u8>)> {
        let image = self
            .repo
            .find_image(image_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Image not found".into()))?;

        let bytes = self
            .blob_store
            .read(&image.path)
            .await?
            .ok_or_else(|| AppError::NotFound("Image not found".into()))?;

        Ok((image, bytes))
    }

    /// Remove, add, set cover, reorder; leaves exactly one cover whenever the
    /// ad has images. Paths of newly written files are pushed to `stored` so
    /// the caller can discard them if the transaction fails.
    async fn sync_images_with_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        ad_id: i64,
        changes: ImageChanges,
        stored: &mut Vec<String>,
    ) -> Result<SyncedImages> {
        let mut set = ImageSet::new(ad_id, self.repo.lock_images_with_tx(tx, ad_id).await?);

        let removed = set.remove(&changes.remove_image_ids);
        let removed_ids: Vec<i64> = removed.iter().map(|i| i.id).collect();
        self.repo
            .delete_images_with_tx(tx, ad_id, &removed_ids)
            .await?;

        let dir = ad_dir(ad_id);
        for upload in &changes.uploads {
            let extension = upload.extension().ok_or_else(|| {
                AppError::Validation(format!("images: unsupported type '{}'", upload.content_type))
            })?;
            let path = self.blob_store.put(&dir, extension, &upload.bytes).await?;
            stored.push(path.clone());

            let image = self
                .repo
                .create_image_with_tx(tx, ad_id, &path, set.next_position())
                .await?;
            set.push(image);
        }

        set.arrange(changes.cover_image_id, changes.images_order.as_deref());
        self.repo
            .save_image_layout_with_tx(tx, ad_id, set.images())
            .await?;

        tracing::debug!(
            "Ad {} images synced: {} removed, {} added, cover {:?}",
            ad_id,
            removed.len(),
            changes.uploads.len(),
            set.cover().map(|i| i.id)
        );

        Ok(SyncedImages {
            images: set.into_images(),
            removed_paths: removed.into_iter().map(|i| i.path).collect(),
        })
    }

    /// After a committed sync, deletes files of removed images. After a
    /// failed one, deletes the files written for it.
    async fn finish(
        &self,
        result: Result<(Ad, SyncedImages)>,
        stored_paths: Vec<String>,
    ) -> Result<(Ad, SyncedImages)> {
        match result {
            Ok((ad, synced)) => {
                for path in &synced.removed_paths {
                    remove_quietly(self.blob_store.as_ref(), path).await;
                }
                Ok((ad, synced))
            }
            Err(e) => {
                for path in &stored_paths {
                    remove_quietly(self.blob_store.as_ref(), path).await;
                }
                Err(e)
            }
        }
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Ad> {
        self.repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound("Ad not found".into()))
    }

    async fn find_owned(&self, user_id: Uuid, slug: &str) -> Result<Ad> {
        let ad = self.find_by_slug(slug).await?;
        if ad.user_id != user_id {
            return Err(AppError::Forbidden);
        }
        Ok(ad)
    }

    async fn find_category(&self, category_id: i64) -> Result<Category> {
        self.category_repo
            .find_by_id(category_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".into()))
    }

    async fn detail(&self, ad: Ad, images: Vec<AdImage>) -> Result<AdDetail> {
        let category = self.find_category(ad.category_id).await?;
        Ok(AdDetail {
            ad,
            category,
            images,
        })
    }
}

/// A concurrent insert took the disambiguated slug first.
fn slug_conflict(err: AppError) -> AppError {
    match err {
        AppError::Database(ref e) if is_unique_violation(e) => {
            AppError::Conflict("slug: already taken, please retry".into())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_ad, insert_category, insert_user, state};
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    async fn listed_ids(service: &AdService, filters: AdFilters) -> Vec<i64> {
        let page = service
            .list_ads(filters, Page::new(None, Some(100), 15))
            .await
            .unwrap();
        let mut ids: Vec<i64> = page.data.iter().map(|item| item.ad.id).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_slug_conflict_only_maps_unique_violations() {
        assert!(matches!(
            slug_conflict(AppError::Database(sqlx::Error::RowNotFound)),
            AppError::Database(_)
        ));
        assert!(matches!(slug_conflict(AppError::Forbidden), AppError::Forbidden));
    }

    #[sqlx::test]
    async fn test_price_bounds_include_exact_matches(pool: PgPool) {
        let seller = insert_user(&pool, "Ana").await;
        let category = insert_category(&pool, "Bikes", None).await;
        let exact = insert_ad(&pool, seller, category, "Exact", Decimal::new(100000, 2)).await;
        insert_ad(&pool, seller, category, "Cheaper", Decimal::new(99999, 2)).await;
        insert_ad(&pool, seller, category, "Pricier", Decimal::new(100001, 2)).await;
        let service = state(pool).ad_service;

        let bounded = |min: Decimal, max: Option<Decimal>| AdFilters {
            price_min: Some(min),
            price_max: max,
            ..AdFilters::default()
        };

        let thousand = Decimal::new(1000, 0);
        assert_eq!(listed_ids(&service, bounded(thousand, Some(thousand))).await, vec![exact]);

        let above = bounded(Decimal::new(100001, 2), Some(Decimal::new(200000, 2)));
        let ids = listed_ids(&service, above).await;
        assert_eq!(ids.len(), 1);
        assert!(!ids.contains(&exact));
    }

    #[sqlx::test]
    async fn test_category_filter_includes_subtree(pool: PgPool) {
        let seller = insert_user(&pool, "Marko").await;
        let electronics = insert_category(&pool, "Electronics", None).await;
        let phones = insert_category(&pool, "Phones", Some(electronics)).await;
        let laptops = insert_category(&pool, "Laptops", Some(electronics)).await;
        let cars = insert_category(&pool, "Cars", None).await;

        let price = Decimal::new(5000, 0);
        let mut expected = vec![
            insert_ad(&pool, seller, electronics, "Radio", price).await,
            insert_ad(&pool, seller, phones, "Phone", price).await,
            insert_ad(&pool, seller, laptops, "Laptop", price).await,
        ];
        expected.sort_unstable();
        let car = insert_ad(&pool, seller, cars, "Golf", price).await;
        let service = state(pool).ad_service;

        let by_category = |category_id| AdFilters {
            category_id: Some(category_id),
            ..AdFilters::default()
        };

        assert_eq!(listed_ids(&service, by_category(electronics)).await, expected);
        assert_eq!(listed_ids(&service, by_category(cars)).await, vec![car]);
        assert!(listed_ids(&service, by_category(cars + 1000)).await.is_empty());
    }

    #[sqlx::test]
    async fn test_text_search_matches_non_ascii_titles(pool: PgPool) {
        let seller = insert_user(&pool, "Jelena").await;
        let category = insert_category(&pool, "Food", None).await;
        let plums = insert_ad(&pool, seller, category, "Šljive sveže", Decimal::new(300, 0)).await;
        insert_ad(&pool, seller, category, "Jabuke", Decimal::new(200, 0)).await;
        let service = state(pool).ad_service;

        let search = |q: &str| AdFilters {
            q: Some(q.to_string()),
            ..AdFilters::default()
        };

        assert_eq!(listed_ids(&service, search("Šljive")).await, vec![plums]);
        assert_eq!(listed_ids(&service, search("sveže")).await, vec![plums]);
        assert_eq!(listed_ids(&service, search("SVE")).await, vec![plums]);
        assert!(listed_ids(&service, search("100%")).await.is_empty());
    }
}
