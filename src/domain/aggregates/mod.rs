//! Aggregates module
pub mod account;
pub mod cart;
pub mod coupon;
pub mod order;
pub mod product;

pub use account::{ContactMessage, User, WishlistEntry};
pub use cart::{CartAddition, CartItem, CartLine, LineChange};
pub use coupon::Coupon;
pub use order::{Order, OrderDetails, OrderError, OrderItem, OrderStatus, PaymentMethod, ShippingDetails};
pub use product::{Category, Product, ProductError, ProductImage, RatingSummary, Review};
