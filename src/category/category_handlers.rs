use axum::{extract::State, Json};

use crate::{error::Result, state::AppState};

use super::category_models::Category;

/// List all categories, parents first
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "categories",
    responses(
        (status = 200, description = "All categories", body = Vec<Category>)
    )
)]
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = state.category_service.list_categories().await?;
    Ok(Json(categories))
}
