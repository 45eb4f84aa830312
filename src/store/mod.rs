//! Storage seam for the storefront.
//!
//! [`ShopStore`] covers every read and write the services perform. Checkout runs
//! through [`CheckoutTx`], a unit of work that either commits as a whole or is
//! rolled back when dropped. Two backends exist: PostgreSQL and an in-process
//! memory store used for tests and database-less runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::{
    CartAddition, CartLine, Category, ContactMessage, Coupon, Order, OrderDetails, OrderItem, OrderStatus, Product,
    ProductImage, Review, User, WishlistEntry,
};
use crate::domain::value_objects::{CouponCode, Quantity};
use crate::Result;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    /// Most stock first, then newest.
    #[default]
    Default,
    PriceAsc,
    PriceDesc,
    NameAsc,
}

#[derive(Clone, Debug, Default)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category_ids: Vec<Uuid>,
    pub sort: ProductSort,
    pub page: u32,
    pub per_page: u32,
}

impl ProductQuery {
    /// Clamps `page` into `1..=num_pages` for `total` matches.
    pub fn resolve_page(&self, total: u64) -> u32 {
        let pages = num_pages(total, self.per_page);
        self.page.clamp(1, pages)
    }
}

pub fn num_pages(total: u64, per_page: u32) -> u32 {
    let per_page = u64::from(per_page.max(1));
    u32::try_from(total.div_ceil(per_page)).unwrap_or(u32::MAX).max(1)
}

#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub num_pages: u32,
}

/// Unit of work for checkout. Dropping it without [`CheckoutTx::commit`] discards every write.
#[async_trait]
pub trait CheckoutTx: Send {
    /// The user's cart, with its rows and their product rows locked until commit.
    async fn cart(&mut self, user_id: Uuid) -> Result<Vec<CartLine>>;

    async fn active_coupon(&mut self, coupon_id: Uuid) -> Result<Option<Coupon>>;

    /// Conditional decrement: `stock -= qty` only when `stock >= qty`. Returns false when nothing changed.
    async fn reserve_stock(&mut self, product_id: Uuid, quantity: Quantity) -> Result<bool>;

    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    async fn insert_order_items(&mut self, items: &[OrderItem]) -> Result<()>;

    /// Deletes the given lines of the user's cart. Lines added after [`CheckoutTx::cart`] stay.
    async fn clear_cart(&mut self, user_id: Uuid, item_ids: &[Uuid]) -> Result<()>;

    async fn clear_session_coupon(&mut self, user_id: Uuid) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait ShopStore: Send + Sync + 'static {
    // --- catalog ---

    async fn active_categories(&self, limit: Option<u32>) -> Result<Vec<Category>>;

    async fn search_products(&self, query: &ProductQuery) -> Result<Page<Product>>;

    /// Newest available products that are in stock.
    async fn new_arrivals(&self, limit: u32) -> Result<Vec<Product>>;

    async fn product(&self, id: Uuid) -> Result<Option<Product>>;

    async fn product_images(&self, product_id: Uuid) -> Result<Vec<ProductImage>>;

    /// Other products of the same category.
    async fn related_products(&self, product: &Product, limit: u32) -> Result<Vec<Product>>;

    async fn reviews(&self, product_id: Uuid) -> Result<Vec<Review>>;

    async fn insert_review(&self, review: &Review) -> Result<()>;

    // --- cart ---

    async fn cart(&self, user_id: Uuid) -> Result<Vec<CartLine>>;

    /// Get-or-create the (user, product) line and add `quantity` to it.
    async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: Quantity) -> Result<CartAddition>;

    /// Returns false when the line does not exist or belongs to someone else.
    async fn set_cart_quantity(&self, user_id: Uuid, item_id: Uuid, quantity: Quantity) -> Result<bool>;

    /// Returns false when the line does not exist or belongs to someone else.
    async fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool>;

    // --- coupons & session ---

    /// Case-insensitive, active-only lookup.
    async fn coupon_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>>;

    async fn active_coupon(&self, coupon_id: Uuid) -> Result<Option<Coupon>>;

    async fn session_coupon(&self, user_id: Uuid) -> Result<Option<Uuid>>;

    async fn set_session_coupon(&self, user_id: Uuid, coupon_id: Option<Uuid>) -> Result<()>;

    // --- checkout & orders ---

    async fn begin_checkout(&self) -> Result<Box<dyn CheckoutTx>>;

    /// Order with items, only if owned by `user_id`.
    async fn order_for_user(&self, user_id: Uuid, order_id: Uuid) -> Result<Option<OrderDetails>>;

    /// Orders of a user, newest first.
    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;

    async fn order(&self, order_id: Uuid) -> Result<Option<Order>>;

    /// Compare-and-swap on the status column. Returns false if the stored status was not `from`.
    async fn update_order_status(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<bool>;

    // --- accounts ---

    async fn user(&self, user_id: Uuid) -> Result<Option<User>>;

    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Fails with `DuplicateEmail` if the email is taken.
    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn update_user(&self, user: &User) -> Result<()>;

    // --- wishlist ---

    async fn wishlist(&self, user_id: Uuid) -> Result<Vec<WishlistEntry>>;

    /// Idempotent. Returns true when a new entry was created.
    async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<bool>;

    async fn remove_from_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<bool>;

    // --- contact ---

    async fn insert_contact(&self, message: &ContactMessage) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamping() {
        let q = ProductQuery { page: 9, per_page: 6, ..ProductQuery::default() };
        assert_eq!(num_pages(13, 6), 3);
        assert_eq!(q.resolve_page(13), 3);
        assert_eq!(num_pages(0, 6), 1);
        assert_eq!(ProductQuery { page: 0, per_page: 6, ..q }.resolve_page(13), 1);
    }
}
