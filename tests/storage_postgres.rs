//! PostgreSQL store tests using testcontainers.
//!
//! Run with: cargo test --test storage_postgres --features testing -- --nocapture
//!
//! Each test starts PostgreSQL in a container, runs the migrations and drives
//! `PgStore` either through the storefront or through a checkout transaction.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use uuid::Uuid;

use plantshop::domain::aggregates::{Order, OrderItem, ShippingDetails, User};
use plantshop::domain::pricing::{self, CouponLookup};
use plantshop::domain::value_objects::Quantity;
use plantshop::publisher::EventPublisher;
use plantshop::services::{AddToCart, ListingParams, Storefront};
use plantshop::store::{CheckoutTx, PgStore, ShopStore};
use plantshop::ShopError;

struct Pg {
    _container: ContainerAsync<GenericImage>,
    pool: PgPool,
    store: PgStore,
    shop: Storefront,
    category: Uuid,
}

/// Start PostgreSQL, connect and migrate.
async fn start_postgres() -> Pg {
    let container = GenericImage::new("postgres", "16")
        .with_exposed_port(5432.tcp())
        .with_wait_for(WaitFor::message_on_stdout("database system is ready to accept connections"))
        .with_env_var("POSTGRES_USER", "plantshop")
        .with_env_var("POSTGRES_PASSWORD", "plantshop")
        .with_env_var("POSTGRES_DB", "plantshop")
        .with_startup_timeout(Duration::from_secs(60))
        .start()
        .await
        .expect("Failed to start postgres container");

    let host = container.get_host().await.expect("Failed to get container host");
    let port = container.get_host_port_ipv4(5432).await.expect("Failed to get mapped port");
    let url = format!("postgres://plantshop:plantshop@{host}:{port}/plantshop");

    // The server restarts once after initdb; retry until it stays up.
    let mut attempts = 0;
    let pool = loop {
        match PgPool::connect(&url).await {
            Ok(pool) => break pool,
            Err(e) if attempts < 30 => {
                attempts += 1;
                println!("waiting for PostgreSQL: {e}");
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Err(e) => panic!("Failed to connect to PostgreSQL: {e}"),
        }
    };
    sqlx::migrate!("./migrations").run(&pool).await.expect("Failed to run migrations");

    let category = Uuid::now_v7();
    sqlx::query("INSERT INTO categories (id, name) VALUES ($1, 'Indoor Plants')").bind(category).execute(&pool).await.unwrap();

    let store = PgStore::new(pool.clone());
    let shop = Storefront::new(Arc::new(store.clone()), EventPublisher::default(), 6);
    Pg { _container: container, pool, store, shop, category }
}

impl Pg {
    async fn product(&self, name: &str, price: Decimal, stock: i32) -> Uuid {
        let id = Uuid::now_v7();
        sqlx::query("INSERT INTO products (id, name, category_id, price, stock) VALUES ($1, $2, $3, $4, $5)")
            .bind(id).bind(name).bind(self.category).bind(price).bind(stock)
            .execute(&self.pool).await.unwrap();
        id
    }

    async fn coupon(&self, code: &str, percent: i16) -> Uuid {
        let id = Uuid::now_v7();
        sqlx::query("INSERT INTO coupons (id, code, discount_percent) VALUES ($1, $2, $3)")
            .bind(id).bind(code).bind(percent)
            .execute(&self.pool).await.unwrap();
        id
    }

    async fn stock_of(&self, product_id: Uuid) -> i32 {
        let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1").bind(product_id).fetch_one(&self.pool).await.unwrap();
        stock
    }

    async fn count(&self, table: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}")).fetch_one(&self.pool).await.unwrap();
        n
    }

    async fn add(&self, user: Uuid, product_id: Uuid, quantity: i64) {
        self.shop.add_to_cart(user, AddToCart { product_id, quantity: Some(quantity) }).await.unwrap();
    }
}

fn shipping() -> ShippingDetails {
    ShippingDetails {
        full_name: "Fern Gully".into(),
        email: "fern@example.com".into(),
        phone: "555-0100".into(),
        address: "12 Greenhouse Lane".into(),
        city: "Portland".into(),
        state: "OR".into(),
        postcode: "97201".into(),
    }
}

#[tokio::test]
async fn test_users_without_local_record_can_shop() {
    let pg = start_postgres().await;
    let fern = pg.product("Boston Fern", dec!(12.50), 5).await;
    let user = Uuid::now_v7();

    pg.add(user, fern, 1).await;
    let err = pg.shop.apply_coupon(user, "NOPE").await.unwrap_err();
    assert!(matches!(err, ShopError::InvalidCoupon));

    let coupon = pg.coupon("SPRING20", 20).await;
    pg.shop.apply_coupon(user, "spring20").await.unwrap();
    assert_eq!(pg.shop.session_coupon(user).await.unwrap(), Some(coupon));

    let receipt = pg.shop.checkout(user, Some(coupon), shipping()).await.unwrap();
    assert_eq!(receipt.order.order.user_id, user);
    assert_eq!(receipt.order.order.total_price.amount(), dec!(10.00));
    assert_eq!(pg.shop.session_coupon(user).await.unwrap(), None);
    assert_eq!(pg.count("orders").await, 1);
}

#[tokio::test]
async fn test_cart_upsert_accumulates() {
    let pg = start_postgres().await;
    let fern = pg.product("Boston Fern", dec!(12.50), 5).await;
    let user = Uuid::now_v7();

    let first = pg.store.add_to_cart(user, fern, Quantity::new(2).unwrap()).await.unwrap();
    let second = pg.store.add_to_cart(user, fern, Quantity::new(3).unwrap()).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.item.id, second.item.id);
    assert_eq!(second.item.quantity.value(), 5);
    assert_eq!(pg.count("cart_items").await, 1);
}

#[tokio::test]
async fn test_concurrent_checkouts_for_last_unit() {
    let pg = start_postgres().await;
    let rare = pg.product("Variegated Monstera", dec!(150.00), 1).await;
    let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
    pg.add(alice, rare, 1).await;
    pg.add(bob, rare, 1).await;

    let (a, b) = tokio::join!(pg.shop.checkout(alice, None, shipping()), pg.shop.checkout(bob, None, shipping()));

    assert_eq!([a.is_ok(), b.is_ok()].into_iter().filter(|ok| *ok).count(), 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(ShopError::OutOfStock { .. })));
    assert_eq!(pg.stock_of(rare).await, 0);
    assert_eq!(pg.count("orders").await, 1);
    assert_eq!(pg.count("order_items").await, 1);
}

#[tokio::test]
async fn test_dropped_checkout_rolls_back() {
    let pg = start_postgres().await;
    let fern = pg.product("Boston Fern", dec!(12.50), 5).await;
    let user = Uuid::now_v7();
    pg.add(user, fern, 2).await;

    let mut tx = pg.store.begin_checkout().await.unwrap();
    let lines = tx.cart(user).await.unwrap();
    let order = Order::place(user, shipping(), &pricing::quote(&lines, &CouponLookup::None));
    tx.insert_order(&order).await.unwrap();
    tx.insert_order_items(&[OrderItem::snapshot(order.id, &lines[0])]).await.unwrap();
    assert!(tx.reserve_stock(fern, Quantity::new(2).unwrap()).await.unwrap());
    drop(tx);

    assert_eq!(pg.stock_of(fern).await, 5);
    assert_eq!(pg.count("orders").await, 0);
    assert_eq!(pg.count("order_items").await, 0);
    assert_eq!(pg.count("cart_items").await, 1);
}

#[tokio::test]
async fn test_conditional_decrement_refuses_oversell() {
    let pg = start_postgres().await;
    let fern = pg.product("Boston Fern", dec!(12.50), 2).await;

    let mut tx = pg.store.begin_checkout().await.unwrap();
    assert!(!tx.reserve_stock(fern, Quantity::new(3).unwrap()).await.unwrap());
    assert!(tx.reserve_stock(fern, Quantity::new(2).unwrap()).await.unwrap());
    tx.commit().await.unwrap();

    assert_eq!(pg.stock_of(fern).await, 0);
}

#[tokio::test]
async fn test_lines_added_during_checkout_survive() {
    let pg = start_postgres().await;
    let fern = pg.product("Boston Fern", dec!(12.50), 5).await;
    let pothos = pg.product("Golden Pothos", dec!(19.75), 5).await;
    let user = Uuid::now_v7();
    pg.add(user, fern, 1).await;

    let mut tx = pg.store.begin_checkout().await.unwrap();
    let lines = tx.cart(user).await.unwrap();

    // A second tab adds another plant while the checkout is in flight.
    pg.store.add_to_cart(user, pothos, Quantity::new(2).unwrap()).await.unwrap();

    let order = Order::place(user, shipping(), &pricing::quote(&lines, &CouponLookup::None));
    let items: Vec<OrderItem> = lines.iter().map(|l| OrderItem::snapshot(order.id, l)).collect();
    tx.insert_order(&order).await.unwrap();
    tx.insert_order_items(&items).await.unwrap();
    for line in &lines {
        assert!(tx.reserve_stock(line.product.id, line.item.quantity).await.unwrap());
    }
    let ordered: Vec<Uuid> = lines.iter().map(|l| l.item.id).collect();
    tx.clear_cart(user, &ordered).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(pg.count("order_items").await, 1);
    let left = pg.store.cart(user).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].product.id, pothos);
    assert_eq!(left[0].item.quantity.value(), 2);
}

#[tokio::test]
async fn test_duplicate_email_is_a_domain_error() {
    let pg = start_postgres().await;
    pg.store.insert_user(&User::register("ivy@example.com", "Ivy", "")).await.unwrap();

    let shouty = User { email: "IVY@EXAMPLE.COM".into(), ..User::register("other@example.com", "Ivy Too", "") };
    let err = pg.store.insert_user(&shouty).await.unwrap_err();
    assert!(matches!(err, ShopError::DuplicateEmail));
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let pg = start_postgres().await;
    pg.product("50% Off Fern", dec!(6.00), 5).await;
    pg.product("500 Ferns", dec!(600.00), 5).await;
    pg.product("Snake_Plant", dec!(22.00), 5).await;
    pg.product("Snake Plant", dec!(22.00), 5).await;

    for (needle, expected) in [("50%", "50% Off Fern"), ("e_p", "Snake_Plant")] {
        let params = ListingParams { search: Some(needle.into()), ..Default::default() };
        let listing = pg.shop.list_products(params, None).await.unwrap();
        let names: Vec<&str> = listing.page.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, [expected], "search {needle:?}");
    }
}
