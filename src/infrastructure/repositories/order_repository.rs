//! SeaORM implementation of OrderRepository

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use std::collections::HashMap;

use crate::domain::{DomainError, NewOrder, OrderFilter, OrderRepository, OrderTotals};
use crate::models::book::{self, Entity as BookEntity};
use crate::models::order::{self, Entity as OrderEntity, Model};
use crate::models::order_item::{self, Entity as OrderItemEntity};
use crate::models::user::{self, Entity as UserEntity};
use crate::models::{Order, OrderItem, OrderStatus};

pub struct SeaOrmOrderRepository {
    db: DatabaseConnection,
}

impl SeaOrmOrderRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn items_by_order(
        &self,
        order_ids: Vec<i32>,
    ) -> Result<HashMap<i32, Vec<OrderItem>>, DomainError> {
        let mut map: HashMap<i32, Vec<OrderItem>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(map);
        }

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .order_by_asc(order_item::Column::Id)
            .all(&self.db)
            .await?;

        for item in items {
            map.entry(item.order_id)
                .or_default()
                .push(OrderItem::from(item));
        }

        Ok(map)
    }

    async fn hydrate(
        &self,
        rows: Vec<(Model, Option<user::Model>)>,
    ) -> Result<Vec<Order>, DomainError> {
        let ids = rows.iter().map(|(o, _)| o.id).collect();
        let mut items = self.items_by_order(ids).await?;

        Ok(rows
            .into_iter()
            .map(|(model, buyer)| {
                let lines = items.remove(&model.id).unwrap_or_default();
                let mut order = Order::from_parts(model, lines);
                order.user_email = buyer.map(|u| u.email);
                order
            })
            .collect())
    }
}

#[async_trait]
impl OrderRepository for SeaOrmOrderRepository {
    async fn find_by_user(&self, user_id: i32) -> Result<Vec<Order>, DomainError> {
        let orders = OrderEntity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .all(&self.db)
            .await?;

        self.hydrate(orders.into_iter().map(|o| (o, None)).collect())
            .await
    }

    async fn find_all(&self, filter: OrderFilter) -> Result<Vec<Order>, DomainError> {
        let mut query = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id);

        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status.as_str()));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let rows = query.find_also_related(UserEntity).all(&self.db).await?;
        self.hydrate(rows).await
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Order>, DomainError> {
        let row = OrderEntity::find_by_id(id)
            .find_also_related(UserEntity)
            .one(&self.db)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_stripe_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Order>, DomainError> {
        let row = OrderEntity::find()
            .filter(order::Column::StripeSessionId.eq(session_id))
            .find_also_related(UserEntity)
            .one(&self.db)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn place(&self, new_order: NewOrder) -> Result<Order, DomainError> {
        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.db.begin().await?;

        // Reserve stock first; the WHERE clause is the oversell guard
        for line in &new_order.lines {
            let result = BookEntity::update_many()
                .col_expr(
                    book::Column::Stock,
                    Expr::col(book::Column::Stock).sub(line.quantity),
                )
                .col_expr(book::Column::UpdatedAt, Expr::value(now.clone()))
                .filter(book::Column::Id.eq(line.book_id))
                .filter(book::Column::Stock.gte(line.quantity))
                .exec(&txn)
                .await?;

            if result.rows_affected == 0 {
                txn.rollback().await?;
                tracing::warn!(
                    "Order for user {} rejected: book {} lacks {} copies",
                    new_order.user_id,
                    line.book_id,
                    line.quantity
                );
                return Err(DomainError::InsufficientStock);
            }
        }

        let active = order::ActiveModel {
            user_id: Set(new_order.user_id),
            total_cents: Set(new_order.total_cents),
            currency: Set(new_order.currency.clone()),
            status: Set(new_order.status.as_str().to_string()),
            payment_method: Set(new_order.payment_method.as_str().to_string()),
            stripe_session_id: Set(new_order.stripe_session_id.clone()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let saved = match active.insert(&txn).await {
            Ok(saved) => saved,
            Err(e) => {
                txn.rollback().await?;
                // A concurrent delivery of the same Stripe session won the race
                if let Some(session_id) = &new_order.stripe_session_id
                    && matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
                    && let Some(existing) = self.find_by_stripe_session(session_id).await?
                {
                    tracing::info!("Stripe session {} already has order {}", session_id, existing.id);
                    return Ok(existing);
                }
                return Err(e.into());
            }
        };

        let rows: Vec<order_item::ActiveModel> = new_order
            .lines
            .iter()
            .map(|line| order_item::ActiveModel {
                order_id: Set(saved.id),
                book_id: Set(Some(line.book_id)),
                title: Set(line.title.clone()),
                quantity: Set(line.quantity),
                price_cents: Set(line.price_cents),
                image_url: Set(line.image_url.clone()),
                ..Default::default()
            })
            .collect();
        OrderItemEntity::insert_many(rows).exec(&txn).await?;

        txn.commit().await?;

        let items = new_order
            .lines
            .into_iter()
            .map(|line| OrderItem {
                book_id: Some(line.book_id),
                title: line.title,
                quantity: line.quantity,
                price_cents: line.price_cents,
                image_url: line.image_url,
            })
            .collect();

        tracing::info!(
            "Order {} placed for user {} ({} {})",
            saved.id,
            saved.user_id,
            saved.total_cents,
            saved.currency
        );
        Ok(Order::from_parts(saved, items))
    }

    async fn update_status(&self, id: i32, status: OrderStatus) -> Result<Order, DomainError> {
        let existing = OrderEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.db).await?;

        self.find_by_id(id).await?.ok_or(DomainError::NotFound)
    }

    async fn totals(&self) -> Result<OrderTotals, DomainError> {
        let orders = OrderEntity::find().count(&self.db).await?;

        let revenue_cents = OrderEntity::find()
            .filter(order::Column::Status.ne(OrderStatus::Cancelled.as_str()))
            .all(&self.db)
            .await?
            .iter()
            .map(|o| o.total_cents)
            .sum();

        Ok(OrderTotals {
            orders,
            revenue_cents,
        })
    }
}
