//! PostgreSQL store backed by sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{num_pages, CheckoutTx, Page, ProductQuery, ProductSort, ShopStore};
use crate::domain::aggregates::{
    CartAddition, CartItem, CartLine, Category, ContactMessage, Coupon, Order, OrderDetails, OrderItem, OrderStatus,
    PaymentMethod, Product, ProductImage, Review, ShippingDetails, User, WishlistEntry,
};
use crate::domain::value_objects::{CouponCode, Money, Percent, Quantity};
use crate::{Result, ShopError};

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.category_id, p.description, p.price, p.stock, p.is_available, p.is_bestseller, p.created_at";
const CART_LINE_SELECT: &str = "SELECT c.id AS item_id, c.user_id, c.quantity, p.id, p.name, p.category_id, p.description, p.price, p.stock, p.is_available, p.is_bestseller, p.created_at FROM cart_items c JOIN products p ON p.id = c.product_id WHERE c.user_id = $1";
const ORDER_COLUMNS: &str = "id, user_id, full_name, email, phone, address, city, state, postcode, subtotal, discount_amount, coupon_code, total_price, shipping_cost, status, payment_method, created_at";

fn corrupt(what: &str) -> ShopError { ShopError::StorageError(format!("corrupt {what} row")) }

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().and_then(|e| e.code()).is_some_and(|code| code == "23505")
}

fn quantity_from_db(q: i32) -> Result<Quantity> { Quantity::new(i64::from(q)).ok_or_else(|| corrupt("quantity")) }

fn quantity_to_db(q: Quantity) -> Result<i32> { i32::try_from(q.value()).map_err(|_| ShopError::InvalidQuantity) }

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[derive(sqlx::FromRow)]
struct ProductRow { id: Uuid, name: String, category_id: Uuid, description: String, price: Decimal, stock: i32, is_available: bool, is_bestseller: bool, created_at: DateTime<Utc> }

impl TryFrom<ProductRow> for Product {
    type Error = ShopError;
    fn try_from(r: ProductRow) -> Result<Self> {
        Ok(Product {
            id: r.id, name: r.name, category_id: r.category_id, description: r.description, price: Money::new(r.price),
            stock: u32::try_from(r.stock).map_err(|_| corrupt("product"))?,
            is_available: r.is_available, is_bestseller: r.is_bestseller, created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    item_id: Uuid, user_id: Uuid, quantity: i32,
    #[sqlx(flatten)]
    product: ProductRow,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = ShopError;
    fn try_from(r: CartLineRow) -> Result<Self> {
        let product = Product::try_from(r.product)?;
        Ok(CartLine {
            item: CartItem { id: r.item_id, user_id: r.user_id, product_id: product.id, quantity: quantity_from_db(r.quantity)? },
            product,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow { id: Uuid, user_id: Uuid, product_id: Uuid, quantity: i32, inserted: bool }

#[derive(sqlx::FromRow)]
struct CouponRow { id: Uuid, code: String, discount_percent: i16, is_active: bool }

impl TryFrom<CouponRow> for Coupon {
    type Error = ShopError;
    fn try_from(r: CouponRow) -> Result<Self> {
        Ok(Coupon {
            id: r.id,
            code: CouponCode::new(r.code).map_err(|_| corrupt("coupon"))?,
            discount_percent: Percent::new(i64::from(r.discount_percent)).map_err(|_| corrupt("coupon"))?,
            is_active: r.is_active,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid, user_id: Uuid, full_name: String, email: String, phone: String, address: String, city: String, state: String, postcode: String,
    subtotal: Decimal, discount_amount: Decimal, coupon_code: Option<String>, total_price: Decimal, shipping_cost: Decimal,
    status: String, payment_method: String, created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = ShopError;
    fn try_from(r: OrderRow) -> Result<Self> {
        Ok(Order {
            id: r.id, user_id: r.user_id,
            shipping: ShippingDetails { full_name: r.full_name, email: r.email, phone: r.phone, address: r.address, city: r.city, state: r.state, postcode: r.postcode },
            subtotal: Money::new(r.subtotal), discount_amount: Money::new(r.discount_amount), coupon_code: r.coupon_code,
            total_price: Money::new(r.total_price), shipping_cost: Money::new(r.shipping_cost),
            status: r.status.parse::<OrderStatus>()?,
            payment_method: r.payment_method.parse::<PaymentMethod>()?,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow { id: Uuid, order_id: Uuid, product_id: Uuid, product_name: String, quantity: i32, price: Decimal }

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = ShopError;
    fn try_from(r: OrderItemRow) -> Result<Self> {
        Ok(OrderItem { id: r.id, order_id: r.order_id, product_id: r.product_id, product_name: r.product_name, quantity: quantity_from_db(r.quantity)?, price: Money::new(r.price) })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow { id: Uuid, email: String, full_name: String, phone: String, is_staff: bool, is_active: bool, date_joined: DateTime<Utc> }

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User { id: r.id, email: r.email, full_name: r.full_name, phone: r.phone, is_staff: r.is_staff, is_active: r.is_active, date_joined: r.date_joined }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow { id: Uuid, product_id: Uuid, user_id: Uuid, rating: i16, comment: String, created_at: DateTime<Utc> }

impl TryFrom<ReviewRow> for Review {
    type Error = ShopError;
    fn try_from(r: ReviewRow) -> Result<Self> {
        Ok(Review { id: r.id, product_id: r.product_id, user_id: r.user_id, rating: u8::try_from(r.rating).map_err(|_| corrupt("review"))?, comment: r.comment, created_at: r.created_at })
    }
}

#[derive(sqlx::FromRow)]
struct WishlistRow {
    wished_at: DateTime<Utc>,
    #[sqlx(flatten)]
    product: ProductRow,
}

fn collect<R, T: TryFrom<R, Error = ShopError>>(rows: Vec<R>) -> Result<Vec<T>> {
    rows.into_iter().map(T::try_from).collect()
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

pub struct PgCheckout {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CheckoutTx for PgCheckout {
    async fn cart(&mut self, user_id: Uuid) -> Result<Vec<CartLine>> {
        let sql = format!("{CART_LINE_SELECT} ORDER BY p.id FOR UPDATE OF c, p");
        let rows = sqlx::query_as::<_, CartLineRow>(&sql).bind(user_id).fetch_all(&mut *self.tx).await?;
        collect(rows)
    }

    async fn active_coupon(&mut self, coupon_id: Uuid) -> Result<Option<Coupon>> {
        sqlx::query_as::<_, CouponRow>("SELECT id, code, discount_percent, is_active FROM coupons WHERE id = $1 AND is_active")
            .bind(coupon_id).fetch_optional(&mut *self.tx).await?.map(Coupon::try_from).transpose()
    }

    async fn reserve_stock(&mut self, product_id: Uuid, quantity: Quantity) -> Result<bool> {
        let result = sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
            .bind(product_id).bind(quantity_to_db(quantity)?).execute(&mut *self.tx).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_order(&mut self, o: &Order) -> Result<()> {
        sqlx::query("INSERT INTO orders (id, user_id, full_name, email, phone, address, city, state, postcode, subtotal, discount_amount, coupon_code, total_price, shipping_cost, status, payment_method, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)")
            .bind(o.id).bind(o.user_id).bind(&o.shipping.full_name).bind(&o.shipping.email).bind(&o.shipping.phone)
            .bind(&o.shipping.address).bind(&o.shipping.city).bind(&o.shipping.state).bind(&o.shipping.postcode)
            .bind(o.subtotal.amount()).bind(o.discount_amount.amount()).bind(&o.coupon_code).bind(o.total_price.amount())
            .bind(o.shipping_cost.amount()).bind(o.status.as_str()).bind(o.payment_method.as_str()).bind(o.created_at)
            .execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn insert_order_items(&mut self, items: &[OrderItem]) -> Result<()> {
        for item in items {
            sqlx::query("INSERT INTO order_items (id, order_id, product_id, product_name, quantity, price) VALUES ($1, $2, $3, $4, $5, $6)")
                .bind(item.id).bind(item.order_id).bind(item.product_id).bind(&item.product_name)
                .bind(quantity_to_db(item.quantity)?).bind(item.price.amount())
                .execute(&mut *self.tx).await?;
        }
        Ok(())
    }

    async fn clear_cart(&mut self, user_id: Uuid, item_ids: &[Uuid]) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id).bind(item_ids).execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn clear_session_coupon(&mut self, user_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE sessions SET coupon_id = NULL WHERE user_id = $1").bind(user_id).execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ShopStore for PgStore {
    async fn active_categories(&self, limit: Option<u32>) -> Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, bool)>("SELECT id, name, image, is_active FROM categories WHERE is_active ORDER BY name LIMIT $1")
            .bind(limit.map(i64::from)).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(id, name, image, is_active)| Category { id, name, image, is_active }).collect())
    }

    async fn search_products(&self, q: &ProductQuery) -> Result<Page<Product>> {
        let pattern = q.search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(|s| format!("%{}%", escape_like(s)));
        let filter = "WHERE ($1::text IS NULL OR p.name ILIKE $1 OR p.description ILIKE $1) AND (cardinality($2::uuid[]) = 0 OR p.category_id = ANY($2))";
        let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM products p {filter}"))
            .bind(&pattern).bind(&q.category_ids).fetch_one(&self.pool).await?;
        let total = u64::try_from(total.0).unwrap_or(0);

        let order_by = match q.sort {
            ProductSort::PriceAsc => "p.price ASC, p.id",
            ProductSort::PriceDesc => "p.price DESC, p.id",
            ProductSort::NameAsc => "p.name ASC, p.id",
            ProductSort::Default => "p.stock DESC, p.created_at DESC, p.id",
        };
        let page = q.resolve_page(total);
        let per_page = q.per_page.max(1);
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p {filter} ORDER BY {order_by} LIMIT $3 OFFSET $4");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&pattern).bind(&q.category_ids).bind(i64::from(per_page)).bind(i64::from(page - 1) * i64::from(per_page))
            .fetch_all(&self.pool).await?;
        Ok(Page { items: collect(rows)?, total, page, num_pages: num_pages(total, per_page) })
    }

    async fn new_arrivals(&self, limit: u32) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.is_available AND p.stock > 0 ORDER BY p.created_at DESC LIMIT $1");
        collect(sqlx::query_as::<_, ProductRow>(&sql).bind(i64::from(limit)).fetch_all(&self.pool).await?)
    }

    async fn product(&self, id: Uuid) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1");
        sqlx::query_as::<_, ProductRow>(&sql).bind(id).fetch_optional(&self.pool).await?.map(Product::try_from).transpose()
    }

    async fn product_images(&self, product_id: Uuid) -> Result<Vec<ProductImage>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, String)>("SELECT id, product_id, image FROM product_images WHERE product_id = $1 ORDER BY id")
            .bind(product_id).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(id, product_id, image)| ProductImage { id, product_id, image }).collect())
    }

    async fn related_products(&self, product: &Product, limit: u32) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.category_id = $1 AND p.id <> $2 ORDER BY p.id LIMIT $3");
        collect(sqlx::query_as::<_, ProductRow>(&sql).bind(product.category_id).bind(product.id).bind(i64::from(limit)).fetch_all(&self.pool).await?)
    }

    async fn reviews(&self, product_id: Uuid) -> Result<Vec<Review>> {
        collect(sqlx::query_as::<_, ReviewRow>("SELECT id, product_id, user_id, rating, comment, created_at FROM reviews WHERE product_id = $1 ORDER BY created_at DESC")
            .bind(product_id).fetch_all(&self.pool).await?)
    }

    async fn insert_review(&self, r: &Review) -> Result<()> {
        sqlx::query("INSERT INTO reviews (id, product_id, user_id, rating, comment, created_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(r.id).bind(r.product_id).bind(r.user_id).bind(i16::from(r.rating)).bind(&r.comment).bind(r.created_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn cart(&self, user_id: Uuid) -> Result<Vec<CartLine>> {
        let sql = format!("{CART_LINE_SELECT} ORDER BY c.id");
        collect(sqlx::query_as::<_, CartLineRow>(&sql).bind(user_id).fetch_all(&self.pool).await?)
    }

    async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: Quantity) -> Result<CartAddition> {
        let row = sqlx::query_as::<_, CartItemRow>("INSERT INTO cart_items (id, user_id, product_id, quantity) VALUES ($1, $2, $3, $4) ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity RETURNING id, user_id, product_id, quantity, (xmax = 0) AS inserted")
            .bind(Uuid::now_v7()).bind(user_id).bind(product_id).bind(quantity_to_db(quantity)?)
            .fetch_one(&self.pool).await?;
        Ok(CartAddition {
            item: CartItem { id: row.id, user_id: row.user_id, product_id: row.product_id, quantity: quantity_from_db(row.quantity)? },
            created: row.inserted,
        })
    }

    async fn set_cart_quantity(&self, user_id: Uuid, item_id: Uuid, quantity: Quantity) -> Result<bool> {
        let result = sqlx::query("UPDATE cart_items SET quantity = $3 WHERE id = $1 AND user_id = $2")
            .bind(item_id).bind(user_id).bind(quantity_to_db(quantity)?).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2").bind(item_id).bind(user_id).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn coupon_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>> {
        sqlx::query_as::<_, CouponRow>("SELECT id, code, discount_percent, is_active FROM coupons WHERE LOWER(code) = $1 AND is_active")
            .bind(code.normalized()).fetch_optional(&self.pool).await?.map(Coupon::try_from).transpose()
    }

    async fn active_coupon(&self, coupon_id: Uuid) -> Result<Option<Coupon>> {
        sqlx::query_as::<_, CouponRow>("SELECT id, code, discount_percent, is_active FROM coupons WHERE id = $1 AND is_active")
            .bind(coupon_id).fetch_optional(&self.pool).await?.map(Coupon::try_from).transpose()
    }

    async fn session_coupon(&self, user_id: Uuid) -> Result<Option<Uuid>> {
        let row: Option<(Option<Uuid>,)> = sqlx::query_as("SELECT coupon_id FROM sessions WHERE user_id = $1").bind(user_id).fetch_optional(&self.pool).await?;
        Ok(row.and_then(|(id,)| id))
    }

    async fn set_session_coupon(&self, user_id: Uuid, coupon_id: Option<Uuid>) -> Result<()> {
        sqlx::query("INSERT INTO sessions (user_id, coupon_id) VALUES ($1, $2) ON CONFLICT (user_id) DO UPDATE SET coupon_id = EXCLUDED.coupon_id")
            .bind(user_id).bind(coupon_id).execute(&self.pool).await?;
        Ok(())
    }

    async fn begin_checkout(&self) -> Result<Box<dyn CheckoutTx>> {
        Ok(Box::new(PgCheckout { tx: self.pool.begin().await? }))
    }

    async fn order_for_user(&self, user_id: Uuid, order_id: Uuid) -> Result<Option<OrderDetails>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2");
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql).bind(order_id).bind(user_id).fetch_optional(&self.pool).await? else {
            return Ok(None);
        };
        let items = sqlx::query_as::<_, OrderItemRow>("SELECT id, order_id, product_id, product_name, quantity, price FROM order_items WHERE order_id = $1 ORDER BY id")
            .bind(order_id).fetch_all(&self.pool).await?;
        Ok(Some(OrderDetails { order: Order::try_from(row)?, items: collect(items)? }))
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC");
        collect(sqlx::query_as::<_, OrderRow>(&sql).bind(user_id).fetch_all(&self.pool).await?)
    }

    async fn order(&self, order_id: Uuid) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, OrderRow>(&sql).bind(order_id).fetch_optional(&self.pool).await?.map(Order::try_from).transpose()
    }

    async fn update_order_status(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
            .bind(order_id).bind(from.as_str()).bind(to.as_str()).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, UserRow>("SELECT id, email, full_name, phone, is_staff, is_active, date_joined FROM users WHERE id = $1")
            .bind(user_id).fetch_optional(&self.pool).await?.map(User::from))
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, UserRow>("SELECT id, email, full_name, phone, is_staff, is_active, date_joined FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email.trim()).fetch_optional(&self.pool).await?.map(User::from))
    }

    async fn insert_user(&self, u: &User) -> Result<()> {
        sqlx::query("INSERT INTO users (id, email, full_name, phone, is_staff, is_active, date_joined) VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(u.id).bind(&u.email).bind(&u.full_name).bind(&u.phone).bind(u.is_staff).bind(u.is_active).bind(u.date_joined)
            .execute(&self.pool).await
            .map_err(|e| if is_unique_violation(&e) { ShopError::DuplicateEmail } else { e.into() })?;
        Ok(())
    }

    async fn update_user(&self, u: &User) -> Result<()> {
        let result = sqlx::query("UPDATE users SET email = $2, full_name = $3, phone = $4 WHERE id = $1")
            .bind(u.id).bind(&u.email).bind(&u.full_name).bind(&u.phone)
            .execute(&self.pool).await
            .map_err(|e| if is_unique_violation(&e) { ShopError::DuplicateEmail } else { e.into() })?;
        if result.rows_affected() == 0 { return Err(ShopError::NotFound("User")); }
        Ok(())
    }

    async fn wishlist(&self, user_id: Uuid) -> Result<Vec<WishlistEntry>> {
        let sql = format!("SELECT w.created_at AS wished_at, {PRODUCT_COLUMNS} FROM wishlist w JOIN products p ON p.id = w.product_id WHERE w.user_id = $1 ORDER BY w.created_at");
        let rows = sqlx::query_as::<_, WishlistRow>(&sql).bind(user_id).fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|r| Ok(WishlistEntry { product: Product::try_from(r.product)?, created_at: r.wished_at }))
            .collect()
    }

    async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
        let result = sqlx::query("INSERT INTO wishlist (user_id, product_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id).bind(product_id).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_from_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wishlist WHERE user_id = $1 AND product_id = $2").bind(user_id).bind(product_id).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_contact(&self, m: &ContactMessage) -> Result<()> {
        sqlx::query("INSERT INTO contacts (id, name, email, subject, message, created_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(m.id).bind(&m.name).bind(&m.email).bind(&m.subject).bind(&m.message).bind(m.created_at)
            .execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
