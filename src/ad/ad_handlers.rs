use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{
    dto::{AdPage, Page},
    error::{AppError, Result},
    middleware::AuthUser,
    state::AppState,
    storage::content_type_for,
};

use super::{
    ad_dto::{
        validate_uploads, AdListParams, CreateAdRequest, ImageChanges, ImageUpload,
        UpdateAdRequest,
    },
    ad_models::AdDetail,
    ad_query::{AdFilters, DEFAULT_PER_PAGE},
};

/// Reads the `payload` JSON part and every `images` file part.
async fn read_ad_form<T: DeserializeOwned>(
    mut multipart: Multipart,
) -> Result<(Option<T>, Vec<ImageUpload>)> {
    let mut payload = None;
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("payload") => {
                let text = field.text().await?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| AppError::Validation(format!("payload: {e}")))?;
                payload = Some(parsed);
            }
            Some("images") | Some("images[]") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                uploads.push(ImageUpload {
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok((payload, uploads))
}

/// Browse and filter the ad catalog
#[utoipa::path(
    get,
    path = "/api/ads",
    tag = "ads",
    params(AdListParams),
    responses(
        (status = 200, description = "Paginated ads", body = AdPage),
        (status = 422, description = "Invalid filter value")
    )
)]
pub async fn list_ads(
    State(state): State<AppState>,
    Query(params): Query<AdListParams>,
) -> Result<impl IntoResponse> {
    let filters = AdFilters::from_params(&params)?;
    let page = Page::new(params.page, params.per_page, DEFAULT_PER_PAGE);

    let ads = state.ad_service.list_ads(filters, page).await?;

    Ok((StatusCode::OK, Json(ads)))
}

/// Get a single ad with its images and category
#[utoipa::path(
    get,
    path = "/api/ads/{slug}",
    tag = "ads",
    params(("slug" = String, Path, description = "Ad slug")),
    responses(
        (status = 200, description = "Ad found", body = AdDetail),
        (status = 404, description = "Ad not found")
    )
)]
pub async fn get_ad(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<AdDetail>> {
    let ad = state.ad_service.get_ad(&slug).await?;
    Ok(Json(ad))
}

/// Create an ad with optional image uploads
#[utoipa::path(
    post,
    path = "/api/ads",
    tag = "ads",
    request_body(content = CreateAdRequest, content_type = "multipart/form-data",
        description = "`payload` JSON part plus up to 10 `images` file parts"),
    responses(
        (status = 201, description = "Ad created", body = AdDetail),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Category not found"),
        (status = 422, description = "Invalid input")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_ad(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let (payload, uploads) = read_ad_form::<CreateAdRequest>(multipart).await?;
    let payload = payload
        .ok_or_else(|| AppError::Validation("payload: missing".to_string()))?
        .trimmed();
    payload.validate()?;
    validate_uploads(&uploads)?;

    let changes = ImageChanges {
        remove_image_ids: Vec::new(),
        uploads,
        cover_image_id: payload.cover_image_id,
        images_order: payload.images_order.clone(),
    };

    let ad = state.ad_service.create_ad(user_id, payload, changes).await?;

    Ok((StatusCode::CREATED, Json(ad)))
}

/// Update an ad (owner only) and sync its images
#[utoipa::path(
    put,
    path = "/api/ads/{slug}",
    tag = "ads",
    params(("slug" = String, Path, description = "Ad slug")),
    request_body(content = UpdateAdRequest, content_type = "multipart/form-data",
        description = "Optional `payload` JSON part plus up to 10 `images` file parts"),
    responses(
        (status = 200, description = "Ad updated", body = AdDetail),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Ad not found"),
        (status = 422, description = "Invalid input")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_ad(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> Result<Json<AdDetail>> {
    let (payload, uploads) = read_ad_form::<UpdateAdRequest>(multipart).await?;
    let payload = payload.unwrap_or_default().trimmed();
    payload.validate()?;
    validate_uploads(&uploads)?;

    let changes = ImageChanges {
        uploads,
        ..ImageChanges::default()
    };

    let ad = state
        .ad_service
        .update_ad(user_id, &slug, payload, changes)
        .await?;

    Ok(Json(ad))
}

/// Delete an ad (owner only) together with its images
#[utoipa::path(
    delete,
    path = "/api/ads/{slug}",
    tag = "ads",
    params(("slug" = String, Path, description = "Ad slug")),
    responses(
        (status = 204, description = "Ad deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Ad not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_ad(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug): Path<String>,
) -> Result<StatusCode> {
    state.ad_service.delete_ad(user_id, &slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Serve a stored ad image inline
#[utoipa::path(
    get,
    path = "/api/media/{id}",
    tag = "ads",
    params(("id" = i64, Path, description = "Image id")),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "Image not found")
    )
)]
pub async fn get_media(
    State(state): State<AppState>,
    Path(image_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let (image, bytes) = state.ad_service.get_image(image_id).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type_for(&image.path)),
            (header::CONTENT_DISPOSITION, "inline"),
        ],
        bytes,
    ))
}
