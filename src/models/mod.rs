pub mod book;
pub mod category;
pub mod order;
pub mod order_item;
pub mod user;

pub use book::Book;
pub use category::Category;
pub use order::{Order, OrderStatus, PaymentMethod};
pub use order_item::OrderItem;
pub use user::{Role, UserProfile};
