use crate::{db::DbPool, error::Result, slug::slugify};

use super::{category_repository::CategoryRepository, category_service::CategoryService};

/// Default two-level category tree.
pub const DEFAULT_TREE: &[(&str, &[&str])] = &[
    ("Cars", &["Sedan", "SUV", "Hatchback", "Coupe", "Convertible", "Electric", "Motorcycles"]),
    ("Real Estate", &["Apartments", "Houses", "Land", "Commercial"]),
    ("Electronics", &["Phones", "Laptops", "Tablets", "TVs", "Audio", "Cameras"]),
    ("Clothing", &["Men", "Women", "Kids", "Shoes", "Accessories"]),
    ("Home & Garden", &["Furniture", "Appliances", "Tools", "Garden"]),
    ("Sports & Leisure", &["Fitness", "Cycling", "Camping", "Games"]),
];

/// Child slugs are prefixed with the parent name so "Garden" under
/// "Home & Garden" does not clash with other trees.
pub fn child_slug(parent: &str, child: &str) -> String {
    slugify(&format!("{parent}-{child}"))
}

/// Inserts the default tree; categories already present are left as they are.
pub async fn seed_categories(pool: &DbPool) -> Result<usize> {
    let service = CategoryService::new(CategoryRepository::new(pool.clone()));
    let mut count = 0;

    for (parent_name, children) in DEFAULT_TREE {
        let parent = service.create_category(parent_name, None, None).await?;
        count += 1;

        for child_name in children.iter() {
            let slug = child_slug(parent_name, child_name);
            service
                .create_category(child_name, Some(&slug), Some(parent.id))
                .await?;
            count += 1;
        }
    }

    Ok(count)
}
