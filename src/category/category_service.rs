use crate::error::Result;
use crate::slug::slugify;

use super::{
    category_models::Category, category_repository::CategoryRepository,
    category_tree::CategoryTree,
};

#[derive(Clone)]
pub struct CategoryService {
    repo: CategoryRepository,
}

impl CategoryService {
    pub fn new(repo: CategoryRepository) -> Self {
        Self { repo }
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.repo.find_all().await
    }

    /// `category_id` plus every category beneath it. The tree is rebuilt on
    /// each call so category writes never need cache invalidation.
    pub async fn descendant_ids(&self, category_id: i64) -> Result<Vec<i64>> {
        let tree = CategoryTree::from_edges(self.repo.find_edges().await?);
        Ok(tree.descendant_ids(category_id))
    }

    /// Creates the category, deriving the slug from the name when none is given.
    pub async fn create_category(
        &self,
        name: &str,
        slug: Option<&str>,
        parent_id: Option<i64>,
    ) -> Result<Category> {
        let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => slug.to_string(),
            None => slugify(name),
        };

        self.repo.create_or_get(name, &slug, parent_id).await
    }
}
