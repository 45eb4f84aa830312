//! In-process store.
//!
//! All state sits behind one async mutex. A checkout holds that mutex for its
//! whole lifetime and works on a copy of the state, which replaces the shared
//! state on commit and is thrown away otherwise.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{num_pages, CheckoutTx, Page, ProductQuery, ProductSort, ShopStore};
use crate::domain::aggregates::{
    CartAddition, CartItem, CartLine, Category, ContactMessage, Coupon, Order, OrderDetails, OrderItem, OrderStatus,
    Product, ProductImage, Review, User, WishlistEntry,
};
use crate::domain::value_objects::{CouponCode, Quantity};
use crate::{Result, ShopError};

/// Write step at which an injected failure fires during checkout.
#[cfg(feature = "testing")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailPoint {
    InsertOrderItems,
    ClearCart,
}

#[derive(Clone, Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    categories: Vec<Category>,
    products: HashMap<Uuid, Product>,
    images: Vec<ProductImage>,
    reviews: Vec<Review>,
    cart: Vec<CartItem>,
    coupons: HashMap<Uuid, Coupon>,
    sessions: HashMap<Uuid, Uuid>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    wishlist: Vec<(Uuid, Uuid, chrono::DateTime<Utc>)>,
    contacts: Vec<ContactMessage>,
}

impl State {
    fn cart_lines(&self, user_id: Uuid) -> Vec<CartLine> {
        self.cart
            .iter()
            .filter(|i| i.user_id == user_id)
            .filter_map(|i| self.products.get(&i.product_id).map(|p| CartLine { item: i.clone(), product: p.clone() }))
            .collect()
    }

    fn active_coupon(&self, coupon_id: Uuid) -> Option<Coupon> {
        self.coupons.get(&coupon_id).filter(|c| c.is_active).cloned()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    #[cfg(feature = "testing")]
    fail_at: Arc<std::sync::Mutex<Option<FailPoint>>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("MemoryStore").finish_non_exhaustive() }
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub async fn insert_category(&self, category: Category) { self.state.lock().await.categories.push(category); }

    pub async fn insert_product(&self, product: Product) { self.state.lock().await.products.insert(product.id, product); }

    pub async fn insert_product_image(&self, image: ProductImage) { self.state.lock().await.images.push(image); }

    pub async fn insert_coupon(&self, coupon: Coupon) { self.state.lock().await.coupons.insert(coupon.id, coupon); }

    pub async fn remove_coupon(&self, coupon_id: Uuid) { self.state.lock().await.coupons.remove(&coupon_id); }

    /// Makes the next checkout fail at `point`, after its earlier writes.
    #[cfg(feature = "testing")]
    pub fn fail_next_checkout_at(&self, point: FailPoint) {
        if let Ok(mut slot) = self.fail_at.lock() { *slot = Some(point); }
    }

    pub async fn contacts(&self) -> Vec<ContactMessage> { self.state.lock().await.contacts.clone() }

    pub async fn order_count(&self) -> usize { self.state.lock().await.orders.len() }

    pub async fn order_item_count(&self) -> usize { self.state.lock().await.order_items.len() }
}

pub struct MemoryCheckout {
    shared: OwnedMutexGuard<State>,
    work: State,
    #[cfg(feature = "testing")]
    fail_at: Option<FailPoint>,
}

#[cfg(feature = "testing")]
impl MemoryCheckout {
    fn check(&self, point: FailPoint) -> Result<()> {
        if self.fail_at == Some(point) {
            return Err(ShopError::StorageError(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl CheckoutTx for MemoryCheckout {
    async fn cart(&mut self, user_id: Uuid) -> Result<Vec<CartLine>> { Ok(self.work.cart_lines(user_id)) }

    async fn active_coupon(&mut self, coupon_id: Uuid) -> Result<Option<Coupon>> { Ok(self.work.active_coupon(coupon_id)) }

    async fn reserve_stock(&mut self, product_id: Uuid, quantity: Quantity) -> Result<bool> {
        Ok(self.work.products.get_mut(&product_id).is_some_and(|p| p.remove_inventory(quantity).is_ok()))
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        self.work.orders.push(order.clone());
        Ok(())
    }

    async fn insert_order_items(&mut self, items: &[OrderItem]) -> Result<()> {
        #[cfg(feature = "testing")]
        self.check(FailPoint::InsertOrderItems)?;
        self.work.order_items.extend_from_slice(items);
        Ok(())
    }

    async fn clear_cart(&mut self, user_id: Uuid, item_ids: &[Uuid]) -> Result<()> {
        #[cfg(feature = "testing")]
        self.check(FailPoint::ClearCart)?;
        self.work.cart.retain(|i| !(i.user_id == user_id && item_ids.contains(&i.id)));
        Ok(())
    }

    async fn clear_session_coupon(&mut self, user_id: Uuid) -> Result<()> {
        self.work.sessions.remove(&user_id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryCheckout { mut shared, work, .. } = *self;
        *shared = work;
        Ok(())
    }
}

/// Same ordering as the SQL backend, ties broken by id.
fn sort_products(products: &mut [Product], sort: ProductSort) {
    products.sort_by(|a, b| {
        let primary = match sort {
            ProductSort::PriceAsc => a.price.cmp(&b.price),
            ProductSort::PriceDesc => b.price.cmp(&a.price),
            ProductSort::NameAsc => a.name.cmp(&b.name),
            ProductSort::Default => b.stock.cmp(&a.stock).then(b.created_at.cmp(&a.created_at)),
        };
        primary.then(a.id.cmp(&b.id))
    });
}

#[async_trait]
impl ShopStore for MemoryStore {
    async fn active_categories(&self, limit: Option<u32>) -> Result<Vec<Category>> {
        let state = self.state.lock().await;
        let limit = limit.map_or(usize::MAX, |l| l as usize);
        Ok(state.categories.iter().filter(|c| c.is_active).take(limit).cloned().collect())
    }

    async fn search_products(&self, query: &ProductQuery) -> Result<Page<Product>> {
        let state = self.state.lock().await;
        let needle = query.search.as_deref().map(str::to_lowercase).filter(|s| !s.is_empty());
        let mut matches: Vec<Product> = state
            .products
            .values()
            .filter(|p| needle.as_ref().map_or(true, |n| p.name.to_lowercase().contains(n) || p.description.to_lowercase().contains(n)))
            .filter(|p| query.category_ids.is_empty() || query.category_ids.contains(&p.category_id))
            .cloned()
            .collect();
        sort_products(&mut matches, query.sort);

        let total = matches.len() as u64;
        let page = query.resolve_page(total);
        let per_page = query.per_page.max(1) as usize;
        let items = matches.into_iter().skip((page as usize - 1) * per_page).take(per_page).collect();
        Ok(Page { items, total, page, num_pages: num_pages(total, query.per_page) })
    }

    async fn new_arrivals(&self, limit: u32) -> Result<Vec<Product>> {
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state.products.values().filter(|p| p.is_available && p.stock > 0).cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        products.truncate(limit as usize);
        Ok(products)
    }

    async fn product(&self, id: Uuid) -> Result<Option<Product>> { Ok(self.state.lock().await.products.get(&id).cloned()) }

    async fn product_images(&self, product_id: Uuid) -> Result<Vec<ProductImage>> {
        Ok(self.state.lock().await.images.iter().filter(|i| i.product_id == product_id).cloned().collect())
    }

    async fn related_products(&self, product: &Product, limit: u32) -> Result<Vec<Product>> {
        let state = self.state.lock().await;
        let mut related: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.category_id == product.category_id && p.id != product.id)
            .cloned()
            .collect();
        related.sort_by_key(|p| p.id);
        related.truncate(limit as usize);
        Ok(related)
    }

    async fn reviews(&self, product_id: Uuid) -> Result<Vec<Review>> {
        let state = self.state.lock().await;
        let mut reviews: Vec<Review> = state.reviews.iter().filter(|r| r.product_id == product_id).cloned().collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn insert_review(&self, review: &Review) -> Result<()> {
        self.state.lock().await.reviews.push(review.clone());
        Ok(())
    }

    async fn cart(&self, user_id: Uuid) -> Result<Vec<CartLine>> { Ok(self.state.lock().await.cart_lines(user_id)) }

    async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: Quantity) -> Result<CartAddition> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.cart.iter_mut().find(|i| i.user_id == user_id && i.product_id == product_id) {
            existing.quantity = existing.quantity.add(quantity);
            return Ok(CartAddition { item: existing.clone(), created: false });
        }
        let item = CartItem::new(user_id, product_id, quantity);
        state.cart.push(item.clone());
        Ok(CartAddition { item, created: true })
    }

    async fn set_cart_quantity(&self, user_id: Uuid, item_id: Uuid, quantity: Quantity) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(match state.cart.iter_mut().find(|i| i.id == item_id && i.user_id == user_id) {
            Some(item) => { item.quantity = quantity; true }
            None => false,
        })
    }

    async fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        let before = state.cart.len();
        state.cart.retain(|i| !(i.id == item_id && i.user_id == user_id));
        Ok(state.cart.len() != before)
    }

    async fn coupon_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>> {
        let state = self.state.lock().await;
        Ok(state.coupons.values().find(|c| c.redeemable_with(code.as_str())).cloned())
    }

    async fn active_coupon(&self, coupon_id: Uuid) -> Result<Option<Coupon>> { Ok(self.state.lock().await.active_coupon(coupon_id)) }

    async fn session_coupon(&self, user_id: Uuid) -> Result<Option<Uuid>> { Ok(self.state.lock().await.sessions.get(&user_id).copied()) }

    async fn set_session_coupon(&self, user_id: Uuid, coupon_id: Option<Uuid>) -> Result<()> {
        let mut state = self.state.lock().await;
        match coupon_id {
            Some(id) => { state.sessions.insert(user_id, id); }
            None => { state.sessions.remove(&user_id); }
        }
        Ok(())
    }

    async fn begin_checkout(&self) -> Result<Box<dyn CheckoutTx>> {
        let shared = Arc::clone(&self.state).lock_owned().await;
        let work = shared.clone();
        Ok(Box::new(MemoryCheckout {
            shared,
            work,
            #[cfg(feature = "testing")]
            fail_at: self.fail_at.lock().ok().and_then(|mut slot| slot.take()),
        }))
    }

    async fn order_for_user(&self, user_id: Uuid, order_id: Uuid) -> Result<Option<OrderDetails>> {
        let state = self.state.lock().await;
        Ok(state.orders.iter().find(|o| o.id == order_id && o.user_id == user_id).map(|order| OrderDetails {
            order: order.clone(),
            items: state.order_items.iter().filter(|i| i.order_id == order_id).cloned().collect(),
        }))
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        let mut orders: Vec<Order> = state.orders.iter().filter(|o| o.user_id == user_id).cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn order(&self, order_id: Uuid) -> Result<Option<Order>> {
        Ok(self.state.lock().await.orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn update_order_status(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(match state.orders.iter_mut().find(|o| o.id == order_id && o.status == from) {
            Some(order) => { order.status = to; true }
            None => false,
        })
    }

    async fn user(&self, user_id: Uuid) -> Result<Option<User>> { Ok(self.state.lock().await.users.get(&user_id).cloned()) }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = crate::domain::aggregates::account::normalize_email(email);
        Ok(self.state.lock().await.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == user.email) { return Err(ShopError::DuplicateEmail); }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == user.email && u.id != user.id) { return Err(ShopError::DuplicateEmail); }
        match state.users.get_mut(&user.id) {
            Some(existing) => { *existing = user.clone(); Ok(()) }
            None => Err(ShopError::NotFound("User")),
        }
    }

    async fn wishlist(&self, user_id: Uuid) -> Result<Vec<WishlistEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .wishlist
            .iter()
            .filter(|(u, _, _)| *u == user_id)
            .filter_map(|(_, p, at)| state.products.get(p).map(|product| WishlistEntry { product: product.clone(), created_at: *at }))
            .collect())
    }

    async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.wishlist.iter().any(|(u, p, _)| *u == user_id && *p == product_id) { return Ok(false); }
        state.wishlist.push((user_id, product_id, Utc::now()));
        Ok(true)
    }

    async fn remove_from_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        let before = state.wishlist.len();
        state.wishlist.retain(|(u, p, _)| !(*u == user_id && *p == product_id));
        Ok(state.wishlist.len() != before)
    }

    async fn insert_contact(&self, message: &ContactMessage) -> Result<()> {
        self.state.lock().await.contacts.push(message.clone());
        Ok(())
    }
}
