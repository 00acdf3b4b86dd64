use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::category::Category;
use crate::utils::format::format_price;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub author: String,
    pub description: String,
    pub price_cents: i64, // smallest currency unit
    pub currency: String,
    pub stock: i32,
    pub image_url: String,
    pub category_id: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Category,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// DTO for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub author: String,
    pub description: String,
    pub price_cents: i64,
    pub currency: String,
    /// Display form of `price_cents`, e.g. `18,99 UM`
    pub price_display: String,
    pub stock: i32,
    pub in_stock: bool,
    pub image_url: String,
    pub category_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub created_at: String,
}

impl Book {
    pub fn with_category(mut self, category: Option<Category>) -> Self {
        self.category = category;
        self
    }
}

impl From<Model> for Book {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            price_display: format_price(model.price_cents),
            in_stock: model.stock > 0,
            title: model.title,
            slug: model.slug,
            author: model.author,
            description: model.description,
            price_cents: model.price_cents,
            currency: model.currency,
            stock: model.stock,
            image_url: model.image_url,
            category_id: model.category_id,
            category: None,
            created_at: model.created_at,
        }
    }
}
