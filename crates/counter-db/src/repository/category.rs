//! # Category Repository
//!
//! Flat category rows. The two-level rule is enforced twice: by
//! [`CategoryTree::check_new_parent`] before insert and by the
//! `categories_depth_insert` trigger in the schema.

use sqlx::SqlitePool;
use tracing::debug;

use counter_core::category::CategoryTree;
use counter_core::validation::validate_name;
use counter_core::{Category, CoreError};

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// All categories ordered by name.
    pub async fn list_all(&self) -> DbResult<Vec<Category>> {
        let categories: Vec<Category> =
            sqlx::query_as("SELECT id, name, parent_id FROM categories ORDER BY name, id")
                .fetch_all(&self.pool)
                .await?;

        debug!(count = categories.len(), "Loaded categories");
        Ok(categories)
    }

    /// Loads and validates the hierarchy.
    pub async fn tree(&self) -> DbResult<CategoryTree> {
        let tree = CategoryTree::build(self.list_all().await?).map_err(CoreError::from)?;
        Ok(tree)
    }

    /// Inserts a category.
    ///
    /// ## Errors
    /// `DbError::InvalidData` when the name is empty, the id is taken, or
    /// the parent is unknown or itself a subcategory.
    pub async fn insert(&self, category: &Category) -> DbResult<Category> {
        validate_name("name", &category.name).map_err(CoreError::from)?;

        if let Some(parent_id) = category.parent_id.as_deref() {
            self.tree()
                .await?
                .check_new_parent(&category.id, parent_id)
                .map_err(CoreError::from)?;
        }

        debug!(id = %category.id, parent_id = ?category.parent_id, "Inserting category");

        sqlx::query("INSERT INTO categories (id, name, parent_id) VALUES (?1, ?2, ?3)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.parent_id)
            .execute(&self.pool)
            .await?;

        Ok(category.clone())
    }
}
