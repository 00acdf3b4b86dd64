//! Checkout Service - cart pricing and order placement
//!
//! Both payment paths share the same steps: validate the cart, check every
//! line against current stock, total it, then hand a `NewOrder` to the
//! order repository which decrements stock and writes the order in one
//! transaction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::{DomainError, NewOrder, NewOrderLine};
use crate::infrastructure::AppState;
use crate::models::{Book, Order, OrderStatus, PaymentMethod};
use crate::modules::payments::ManualPaymentInstructions;
use crate::modules::payments::stripe::{CheckoutLineItem, CheckoutSession, CheckoutSessionRequest};

/// Stripe metadata keys written at checkout and read back by the webhook
pub const METADATA_USER_ID: &str = "user_id";
pub const METADATA_CART: &str = "cart";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub book_id: i32,
    pub quantity: i32,
}

/// A cart line joined with the book it refers to
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub book: Book,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub total_cents: i64,
}

impl PricedCart {
    fn into_new_order(
        self,
        user_id: i32,
        currency: &str,
        status: OrderStatus,
        payment_method: PaymentMethod,
        stripe_session_id: Option<String>,
    ) -> NewOrder {
        NewOrder {
            user_id,
            total_cents: self.total_cents,
            currency: currency.to_string(),
            status,
            payment_method,
            stripe_session_id,
            lines: self
                .lines
                .into_iter()
                .map(|line| NewOrderLine {
                    book_id: line.book.id,
                    title: line.book.title,
                    quantity: line.quantity,
                    price_cents: line.book.price_cents,
                    image_url: Some(line.book.image_url),
                })
                .collect(),
        }
    }
}

/// Reject empty carts and non-positive quantities, and merge repeated
/// books into one line (first occurrence keeps its position).
pub fn validate_cart(items: &[CartItem]) -> Result<Vec<CartItem>, DomainError> {
    if items.is_empty() {
        return Err(DomainError::Validation("Cart is empty".to_string()));
    }

    let mut merged: Vec<CartItem> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity <= 0 {
            return Err(DomainError::Validation(
                "Quantity must be a positive integer".to_string(),
            ));
        }
        match merged.iter_mut().find(|line| line.book_id == item.book_id) {
            Some(line) => {
                line.quantity = line.quantity.checked_add(item.quantity).ok_or_else(|| {
                    DomainError::Validation("Quantity is too large".to_string())
                })?;
            }
            None => merged.push(*item),
        }
    }

    Ok(merged)
}

/// Lenient reading of the cart stored in Stripe metadata: malformed JSON
/// yields an empty cart and malformed entries are dropped.
pub fn parse_cart_metadata(raw: &str) -> Vec<CartItem> {
    let Ok(entries) = serde_json::from_str::<Vec<serde_json::Value>>(raw) else {
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<CartItem>(entry).ok())
        .filter(|item| item.quantity > 0)
        .collect()
}

/// Sum of unit price times quantity over every line
pub fn compute_total(lines: &[PricedLine]) -> Result<i64, DomainError> {
    lines.iter().try_fold(0i64, |total, line| {
        line.book
            .price_cents
            .checked_mul(i64::from(line.quantity))
            .and_then(|amount| total.checked_add(amount))
            .ok_or_else(|| DomainError::Validation("Order total is too large".to_string()))
    })
}

/// Join a validated cart with the catalog. Every book must exist and hold
/// at least the requested quantity.
pub fn price_lines(items: &[CartItem], books: Vec<Book>) -> Result<PricedCart, DomainError> {
    let mut by_id: HashMap<i32, Book> = books.into_iter().map(|b| (b.id, b)).collect();

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let book = by_id
            .remove(&item.book_id)
            .ok_or(DomainError::InsufficientStock)?;
        if book.stock < item.quantity {
            return Err(DomainError::InsufficientStock);
        }
        lines.push(PricedLine {
            book,
            quantity: item.quantity,
        });
    }

    let total_cents = compute_total(&lines)?;
    Ok(PricedCart { lines, total_cents })
}

pub async fn price_cart(state: &AppState, items: &[CartItem]) -> Result<PricedCart, DomainError> {
    let items = validate_cart(items)?;
    let ids: Vec<i32> = items.iter().map(|i| i.book_id).collect();
    let books = state.book_repo.find_by_ids(&ids).await?;
    price_lines(&items, books)
}

/// Result of the manual (WhatsApp / transfer) checkout
#[derive(Debug, Clone, Serialize)]
pub struct ManualOrderReceipt {
    pub order_id: i32,
    pub total_cents: i64,
    pub total_display: String,
    pub currency: String,
    pub status: String,
    pub instructions: ManualPaymentInstructions,
}

/// Place a PENDING order that an admin confirms once the transfer arrives
pub async fn place_manual_order(
    state: &AppState,
    user_id: i32,
    items: &[CartItem],
) -> Result<ManualOrderReceipt, DomainError> {
    let cart = price_cart(state, items).await?;
    let new_order = cart.into_new_order(
        user_id,
        &state.config.store_currency,
        OrderStatus::Pending,
        PaymentMethod::Manual,
        None,
    );

    let order = state.order_repo.place(new_order).await?;
    let instructions = state
        .config
        .manual_payments
        .instructions_for(order.id, &order.total_display);

    Ok(ManualOrderReceipt {
        order_id: order.id,
        total_cents: order.total_cents,
        total_display: order.total_display,
        currency: order.currency,
        status: order.status,
        instructions,
    })
}

/// Hosted payment page the client should be redirected to
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRedirect {
    pub url: Option<String>,
    pub session_id: String,
}

fn absolute_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{}{}", base.trim_end_matches('/'), path)
    }
}

/// Open a Stripe Checkout Session for the cart. No order is written here;
/// the webhook (or the confirm call) creates it once payment succeeds.
pub async fn start_stripe_checkout(
    state: &AppState,
    user_id: i32,
    email: Option<String>,
    items: &[CartItem],
) -> Result<CheckoutRedirect, DomainError> {
    let stripe = state
        .stripe
        .as_ref()
        .ok_or_else(|| DomainError::Internal("Stripe is not configured.".to_string()))?;
    let (Some(success_url), Some(cancel_url)) = (
        stripe.config().success_url.clone(),
        stripe.config().cancel_url.clone(),
    ) else {
        return Err(DomainError::Internal(
            "Stripe redirect URLs are not configured.".to_string(),
        ));
    };

    let items = validate_cart(items)?;
    let cart = price_cart(state, &items).await?;

    let cart_json = serde_json::to_string(&items)
        .map_err(|e| DomainError::Internal(format!("Failed to encode cart: {}", e)))?;

    let request = CheckoutSessionRequest {
        customer_email: email,
        line_items: cart
            .lines
            .iter()
            .map(|line| CheckoutLineItem {
                name: line.book.title.clone(),
                description: Some(line.book.author.clone()),
                image_url: (!line.book.image_url.is_empty())
                    .then(|| absolute_url(&state.config.public_url, &line.book.image_url)),
                currency: line.book.currency.clone(),
                unit_amount: line.book.price_cents,
                quantity: line.quantity,
            })
            .collect(),
        success_url,
        cancel_url,
        metadata: vec![
            (METADATA_USER_ID.to_string(), user_id.to_string()),
            (METADATA_CART.to_string(), cart_json),
        ],
    };

    let session = stripe.create_checkout_session(&request).await?;
    tracing::info!(
        "Stripe session {} opened for user {} ({} cents)",
        session.id,
        user_id,
        cart.total_cents
    );

    Ok(CheckoutRedirect {
        url: session.url,
        session_id: session.id,
    })
}

/// Turn a completed Checkout Session into a CONFIRMED order.
///
/// Returns `Ok(None)` when the session is not paid or carries no usable
/// cart or user. Running it twice for the same session returns the order
/// created the first time.
pub async fn create_order_from_session(
    state: &AppState,
    session: &CheckoutSession,
) -> Result<Option<Order>, DomainError> {
    if session.id.is_empty() || !session.is_paid() {
        return Ok(None);
    }

    if let Some(existing) = state.order_repo.find_by_stripe_session(&session.id).await? {
        tracing::debug!("Session {} already converted to order {}", session.id, existing.id);
        return Ok(Some(existing));
    }

    let items = parse_cart_metadata(session.metadata_value(METADATA_CART).unwrap_or("[]"));
    let user_id = session
        .metadata_value(METADATA_USER_ID)
        .and_then(|raw| raw.parse::<i32>().ok());
    let Some(user_id) = user_id else {
        tracing::warn!("Session {} has no user id in metadata", session.id);
        return Ok(None);
    };
    if items.is_empty() {
        tracing::warn!("Session {} has an empty cart", session.id);
        return Ok(None);
    }

    let cart = price_cart(state, &items).await?;
    let new_order = cart.into_new_order(
        user_id,
        &state.config.store_currency,
        OrderStatus::Confirmed,
        PaymentMethod::Stripe,
        Some(session.id.clone()),
    );

    state.order_repo.place(new_order).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: i32, price_cents: i64, stock: i32) -> Book {
        Book {
            id,
            title: format!("Book {}", id),
            slug: format!("book-{}", id),
            author: "Author".to_string(),
            description: "A description".to_string(),
            price_cents,
            currency: "MRU".to_string(),
            price_display: String::new(),
            stock,
            in_stock: stock > 0,
            image_url: "/images/books/placeholder.svg".to_string(),
            category_id: 1,
            category: None,
            created_at: String::new(),
        }
    }

    #[test]
    fn merges_duplicate_lines() {
        let cart = validate_cart(&[
            CartItem { book_id: 2, quantity: 1 },
            CartItem { book_id: 1, quantity: 1 },
            CartItem { book_id: 2, quantity: 3 },
        ])
        .unwrap();
        assert_eq!(
            cart,
            vec![
                CartItem { book_id: 2, quantity: 4 },
                CartItem { book_id: 1, quantity: 1 },
            ]
        );
    }

    #[test]
    fn rejects_empty_cart_and_bad_quantities() {
        assert!(validate_cart(&[]).is_err());
        assert!(validate_cart(&[CartItem { book_id: 1, quantity: 0 }]).is_err());
        assert!(validate_cart(&[CartItem { book_id: 1, quantity: -2 }]).is_err());
    }

    #[test]
    fn totals_price_times_quantity() {
        let cart = price_lines(
            &[
                CartItem { book_id: 1, quantity: 2 },
                CartItem { book_id: 2, quantity: 1 },
            ],
            vec![book(1, 1899, 5), book(2, 2599, 1)],
        )
        .unwrap();
        assert_eq!(cart.total_cents, 2 * 1899 + 2599);
    }

    #[test]
    fn stock_check_covers_missing_and_short_books() {
        let short = price_lines(&[CartItem { book_id: 1, quantity: 3 }], vec![book(1, 100, 2)]);
        assert!(matches!(short, Err(DomainError::InsufficientStock)));

        let missing = price_lines(&[CartItem { book_id: 9, quantity: 1 }], vec![book(1, 100, 2)]);
        assert!(matches!(missing, Err(DomainError::InsufficientStock)));

        let exact = price_lines(&[CartItem { book_id: 1, quantity: 2 }], vec![book(1, 100, 2)]);
        assert!(exact.is_ok());
    }

    #[test]
    fn total_overflow_is_an_error() {
        let result = price_lines(
            &[CartItem { book_id: 1, quantity: 3 }],
            vec![book(1, i64::MAX / 2, 10)],
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn metadata_cart_is_parsed_leniently() {
        assert!(parse_cart_metadata("not json").is_empty());
        assert!(parse_cart_metadata("{}").is_empty());

        let items = parse_cart_metadata(
            r#"[{"book_id":1,"quantity":2},{"book_id":"x","quantity":1},{"book_id":3,"quantity":0},{"book_id":4}]"#,
        );
        assert_eq!(items, vec![CartItem { book_id: 1, quantity: 2 }]);
    }

    #[test]
    fn image_paths_become_absolute() {
        assert_eq!(
            absolute_url("http://localhost:3000/", "/images/a.png"),
            "http://localhost:3000/images/a.png"
        );
        assert_eq!(
            absolute_url("http://localhost:3000", "https://cdn.example/a.png"),
            "https://cdn.example/a.png"
        );
    }
}
