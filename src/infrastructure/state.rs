//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::{BookRepository, CategoryRepository, OrderRepository, UserRepository};
use crate::infrastructure::Config;
use crate::infrastructure::{
    SeaOrmBookRepository, SeaOrmCategoryRepository, SeaOrmOrderRepository, SeaOrmUserRepository,
};
use crate::modules::payments::StripeClient;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub config: Arc<Config>,
    pub book_repo: Arc<dyn BookRepository>,
    pub category_repo: Arc<dyn CategoryRepository>,
    pub user_repo: Arc<dyn UserRepository>,
    pub order_repo: Arc<dyn OrderRepository>,
    /// Present only when a Stripe secret key is configured
    pub stripe: Option<Arc<StripeClient>>,
}

impl AppState {
    /// State with default configuration (no card payments)
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_config(db, Config::default())
    }

    /// Create a new AppState with all repositories initialized
    pub fn with_config(db: DatabaseConnection, config: Config) -> Self {
        let stripe = config
            .stripe
            .clone()
            .map(|stripe_config| Arc::new(StripeClient::new(stripe_config)));

        Self {
            book_repo: Arc::new(SeaOrmBookRepository::new(db.clone())),
            category_repo: Arc::new(SeaOrmCategoryRepository::new(db.clone())),
            user_repo: Arc::new(SeaOrmUserRepository::new(db.clone())),
            order_repo: Arc::new(SeaOrmOrderRepository::new(db.clone())),
            config: Arc::new(config),
            stripe,
            db,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
