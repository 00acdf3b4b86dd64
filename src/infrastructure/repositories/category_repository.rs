//! SeaORM implementation of CategoryRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::{CategoryInput, CategoryRepository, DomainError};
use crate::models::Category;
use crate::models::book::{self, Entity as BookEntity};
use crate::models::category::{ActiveModel, Column, Entity as CategoryEntity};

pub struct SeaOrmCategoryRepository {
    db: DatabaseConnection,
}

impl SeaOrmCategoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn ensure_slug_free(&self, slug: &str, except: Option<i32>) -> Result<(), DomainError> {
        let existing = CategoryEntity::find()
            .filter(Column::Slug.eq(slug))
            .one(&self.db)
            .await?;

        match existing {
            Some(category) if Some(category.id) != except => Err(DomainError::Conflict(
                format!("Slug '{}' is already in use", slug),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl CategoryRepository for SeaOrmCategoryRepository {
    async fn find_all(&self) -> Result<Vec<Category>, DomainError> {
        let categories = CategoryEntity::find()
            .order_by_asc(Column::Name)
            .all(&self.db)
            .await?;
        Ok(categories.into_iter().map(Category::from).collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Category>, DomainError> {
        Ok(CategoryEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Category::from))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, DomainError> {
        Ok(CategoryEntity::find()
            .filter(Column::Slug.eq(slug))
            .one(&self.db)
            .await?
            .map(Category::from))
    }

    async fn create(&self, input: CategoryInput) -> Result<Category, DomainError> {
        let slug = input.slug.trim().to_string();
        self.ensure_slug_free(&slug, None).await?;

        let now = chrono::Utc::now().to_rfc3339();
        let category = ActiveModel {
            name: Set(input.name.trim().to_string()),
            slug: Set(slug),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(Category::from(category.insert(&self.db).await?))
    }

    async fn update(&self, id: i32, input: CategoryInput) -> Result<Category, DomainError> {
        let existing = CategoryEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;

        let slug = input.slug.trim().to_string();
        self.ensure_slug_free(&slug, Some(id)).await?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(input.name.trim().to_string());
        active.slug = Set(slug);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        Ok(Category::from(active.update(&self.db).await?))
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let books = BookEntity::find()
            .filter(book::Column::CategoryId.eq(id))
            .count(&self.db)
            .await?;
        if books > 0 {
            return Err(DomainError::Conflict(format!(
                "Category still has {} book(s)",
                books
            )));
        }

        let result = CategoryEntity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(DomainError::NotFound);
        }

        Ok(())
    }

    async fn count(&self) -> Result<u64, DomainError> {
        Ok(CategoryEntity::find().count(&self.db).await?)
    }
}
