//! SeaORM implementation of BookRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use std::collections::HashMap;

use crate::domain::{BookFilter, BookInput, BookRepository, DomainError, PaginatedBooks};
use crate::models::book::{ActiveModel, Column, Entity as BookEntity, Model};
use crate::models::category::{self, Entity as CategoryEntity};
use crate::models::{Book, Category};

/// SeaORM-based implementation of BookRepository
pub struct SeaOrmBookRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Attach categories to a page of books with a single extra query
    async fn with_categories(&self, models: Vec<Model>) -> Result<Vec<Book>, DomainError> {
        let mut category_ids: Vec<i32> = models.iter().map(|b| b.category_id).collect();
        category_ids.sort_unstable();
        category_ids.dedup();

        let categories: HashMap<i32, Category> = if category_ids.is_empty() {
            HashMap::new()
        } else {
            CategoryEntity::find()
                .filter(category::Column::Id.is_in(category_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|c| (c.id, Category::from(c)))
                .collect()
        };

        Ok(models
            .into_iter()
            .map(|model| {
                let category = categories.get(&model.category_id).cloned();
                Book::from(model).with_category(category)
            })
            .collect())
    }

    async fn ensure_category(&self, category_id: i32) -> Result<(), DomainError> {
        CategoryEntity::find_by_id(category_id)
            .one(&self.db)
            .await?
            .map(|_| ())
            .ok_or_else(|| DomainError::Validation("Unknown category".to_string()))
    }

    async fn ensure_slug_free(&self, slug: &str, except: Option<i32>) -> Result<(), DomainError> {
        let existing = BookEntity::find()
            .filter(Column::Slug.eq(slug))
            .one(&self.db)
            .await?;

        match existing {
            Some(book) if Some(book.id) != except => Err(DomainError::Conflict(format!(
                "Slug '{}' is already in use",
                slug
            ))),
            _ => Ok(()),
        }
    }
}

/// The unique index still catches a slug taken between the check and the write
fn slug_conflict(slug: &str, e: sea_orm::DbErr) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            DomainError::Conflict(format!("Slug '{}' is already in use", slug))
        }
        _ => DomainError::from(e),
    }
}

#[async_trait]
impl BookRepository for SeaOrmBookRepository {
    async fn find_all(&self, filter: BookFilter) -> Result<PaginatedBooks, DomainError> {
        let mut query = BookEntity::find();

        if let Some(q) = &filter.query
            && !q.trim().is_empty()
        {
            let q = q.trim();
            let cond = Condition::any()
                .add(Column::Title.contains(q))
                .add(Column::Author.contains(q));
            query = query.filter(cond);
        }

        if let Some(slug) = &filter.category
            && !slug.is_empty()
        {
            let category = CategoryEntity::find()
                .filter(category::Column::Slug.eq(slug.as_str()))
                .one(&self.db)
                .await?;

            match category {
                Some(category) => query = query.filter(Column::CategoryId.eq(category.id)),
                // Unknown category: nothing can match
                None => {
                    return Ok(PaginatedBooks {
                        books: Vec::new(),
                        total: 0,
                    });
                }
            }
        }

        query = match filter.sort.as_deref() {
            Some("price-asc") => query.order_by_asc(Column::PriceCents),
            Some("price-desc") => query.order_by_desc(Column::PriceCents),
            _ => query.order_by_desc(Column::CreatedAt),
        };
        query = query.order_by_desc(Column::Id);

        // Fetch with pagination and total count
        let (books, total) = if let Some(limit) = filter.limit {
            let page = filter.page.unwrap_or(0);
            let paginator = query.paginate(&self.db, limit.max(1));
            let total = paginator.num_items().await?;
            let items = paginator.fetch_page(page).await?;
            (items, total)
        } else {
            let items = query.all(&self.db).await?;
            let total = items.len() as u64;
            (items, total)
        };

        Ok(PaginatedBooks {
            books: self.with_categories(books).await?,
            total,
        })
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Book>, DomainError> {
        match BookEntity::find_by_id(id).one(&self.db).await? {
            Some(model) => Ok(self.with_categories(vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Book>, DomainError> {
        let model = BookEntity::find()
            .filter(Column::Slug.eq(slug))
            .one(&self.db)
            .await?;

        match model {
            Some(model) => Ok(self.with_categories(vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<Book>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let books = BookEntity::find()
            .filter(Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await?;

        Ok(books.into_iter().map(Book::from).collect())
    }

    async fn create(&self, input: BookInput) -> Result<Book, DomainError> {
        let slug = input.slug.trim().to_string();
        self.ensure_category(input.category_id).await?;
        self.ensure_slug_free(&slug, None).await?;

        let now = chrono::Utc::now().to_rfc3339();
        let new_book = ActiveModel {
            title: Set(input.title.trim().to_string()),
            slug: Set(slug.clone()),
            author: Set(input.author.trim().to_string()),
            description: Set(input.description),
            price_cents: Set(input.price_cents),
            currency: Set(input.currency.to_uppercase()),
            stock: Set(input.stock),
            image_url: Set(input.image_url),
            category_id: Set(input.category_id),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = new_book
            .insert(&self.db)
            .await
            .map_err(|e| slug_conflict(&slug, e))?;
        Ok(self.with_categories(vec![result]).await?.remove(0))
    }

    async fn update(&self, id: i32, input: BookInput) -> Result<Book, DomainError> {
        let existing = BookEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;

        let slug = input.slug.trim().to_string();
        self.ensure_category(input.category_id).await?;
        self.ensure_slug_free(&slug, Some(id)).await?;

        let mut active: ActiveModel = existing.into();
        active.title = Set(input.title.trim().to_string());
        active.slug = Set(slug.clone());
        active.author = Set(input.author.trim().to_string());
        active.description = Set(input.description);
        active.price_cents = Set(input.price_cents);
        active.currency = Set(input.currency.to_uppercase());
        active.stock = Set(input.stock);
        active.image_url = Set(input.image_url);
        active.category_id = Set(input.category_id);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let result = active
            .update(&self.db)
            .await
            .map_err(|e| slug_conflict(&slug, e))?;
        Ok(self.with_categories(vec![result]).await?.remove(0))
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = BookEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound);
        }

        Ok(())
    }

    async fn count(&self) -> Result<u64, DomainError> {
        Ok(BookEntity::find().count(&self.db).await?)
    }
}
