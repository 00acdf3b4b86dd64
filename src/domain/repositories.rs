//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;
use serde::Deserialize;

use super::DomainError;
use crate::models::user::Model as UserRecord;
use crate::models::{Book, Category, Order, OrderStatus, PaymentMethod, Role};

/// Filter criteria for catalog queries
#[derive(Debug, Default, Clone)]
pub struct BookFilter {
    /// Substring matched against title and author
    pub query: Option<String>,
    /// Category slug
    pub category: Option<String>,
    /// `price-asc`, `price-desc`; anything else is newest first
    pub sort: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Paginated result with total count
#[derive(Debug)]
pub struct PaginatedBooks {
    pub books: Vec<Book>,
    pub total: u64,
}

/// Input for creating or replacing a book
#[derive(Debug, Clone, Deserialize)]
pub struct BookInput {
    pub title: String,
    pub slug: String,
    pub author: String,
    pub description: String,
    pub price_cents: i64,
    pub currency: String,
    pub stock: i32,
    pub image_url: String,
    pub category_id: i32,
}

/// Input for creating or renaming a category
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub slug: String,
}

/// Repository trait for Book entity
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Find all books matching the filter criteria with pagination support
    async fn find_all(&self, filter: BookFilter) -> Result<PaginatedBooks, DomainError>;

    /// Find a single book by ID
    async fn find_by_id(&self, id: i32) -> Result<Option<Book>, DomainError>;

    /// Find a single book by its URL slug
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Book>, DomainError>;

    /// Fetch the books referenced by a cart; unknown ids are skipped
    async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<Book>, DomainError>;

    async fn create(&self, input: BookInput) -> Result<Book, DomainError>;

    async fn update(&self, id: i32, input: BookInput) -> Result<Book, DomainError>;

    async fn delete(&self, id: i32) -> Result<(), DomainError>;

    async fn count(&self) -> Result<u64, DomainError>;
}

/// Repository trait for Category entity
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// All categories ordered by name
    async fn find_all(&self) -> Result<Vec<Category>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Category>, DomainError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, DomainError>;

    async fn create(&self, input: CategoryInput) -> Result<Category, DomainError>;

    async fn update(&self, id: i32, input: CategoryInput) -> Result<Category, DomainError>;

    /// Fails with `Conflict` while books still reference the category
    async fn delete(&self, id: i32) -> Result<(), DomainError>;

    async fn count(&self) -> Result<u64, DomainError>;
}

/// Data needed to register a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Repository trait for User entity
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<UserRecord>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<UserRecord>, DomainError>;

    /// Lookup by (already lowercased) email
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DomainError>;

    async fn create(&self, user: NewUser) -> Result<UserRecord, DomainError>;

    async fn update_role(&self, id: i32, role: Role) -> Result<UserRecord, DomainError>;

    async fn count(&self) -> Result<u64, DomainError>;
}

/// One priced line of an order about to be placed
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub book_id: i32,
    pub title: String,
    pub quantity: i32,
    pub price_cents: i64,
    pub image_url: Option<String>,
}

/// Everything needed to persist an order in one transaction
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i32,
    pub total_cents: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub stripe_session_id: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

/// Filter for the admin order listing
#[derive(Debug, Default, Clone)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub limit: Option<u64>,
}

/// Aggregate figures for the admin dashboard
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderTotals {
    pub orders: u64,
    /// Sum of totals over orders that are not cancelled
    pub revenue_cents: i64,
}

/// Repository trait for Order entity (with its items)
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Orders of one customer, newest first
    async fn find_by_user(&self, user_id: i32) -> Result<Vec<Order>, DomainError>;

    /// All orders newest first, with the purchaser's email
    async fn find_all(&self, filter: OrderFilter) -> Result<Vec<Order>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Order>, DomainError>;

    async fn find_by_stripe_session(&self, session_id: &str)
    -> Result<Option<Order>, DomainError>;

    /// Decrement stock for every line and insert the order with its items,
    /// atomically. Any line without enough stock aborts the whole order
    /// with `InsufficientStock`.
    async fn place(&self, order: NewOrder) -> Result<Order, DomainError>;

    async fn update_status(&self, id: i32, status: OrderStatus) -> Result<Order, DomainError>;

    async fn totals(&self) -> Result<OrderTotals, DomainError>;
}
