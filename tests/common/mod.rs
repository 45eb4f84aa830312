// Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use plantshop::domain::aggregates::{Category, Coupon, Product, ShippingDetails, User};
use plantshop::domain::value_objects::{CouponCode, Money, Percent};
use plantshop::publisher::EventPublisher;
use plantshop::services::Storefront;
use plantshop::store::{MemoryStore, ShopStore};

pub struct Shop {
    pub store: MemoryStore,
    pub shop: Storefront,
    pub category: Category,
}

pub async fn shop() -> Shop {
    let store = MemoryStore::new();
    let category = Category { id: Uuid::now_v7(), name: "Indoor Plants".into(), image: "categories/indoor.jpg".into(), is_active: true };
    store.insert_category(category.clone()).await;
    let shop = Storefront::new(Arc::new(store.clone()), EventPublisher::default(), 6);
    Shop { store, shop, category }
}

impl Shop {
    pub async fn product(&self, name: &str, price: Decimal, stock: u32) -> Product {
        let product = Product::create(name, self.category.id, Money::new(price), stock);
        self.store.insert_product(product.clone()).await;
        product
    }

    pub async fn coupon(&self, code: &str, percent: i64) -> Coupon {
        let coupon = Coupon::new(CouponCode::new(code).unwrap(), Percent::new(percent).unwrap());
        self.store.insert_coupon(coupon.clone()).await;
        coupon
    }

    pub async fn customer(&self, email: &str) -> User {
        let user = User::register(email, "Fern Gully", "555-0100");
        self.store.insert_user(&user).await.unwrap();
        user
    }

    pub async fn staff(&self, email: &str) -> User {
        let user = User { is_staff: true, ..User::register(email, "Shop Staff", "") };
        self.store.insert_user(&user).await.unwrap();
        user
    }

    pub async fn stock_of(&self, product_id: Uuid) -> u32 {
        self.store.product(product_id).await.unwrap().unwrap().stock
    }
}

pub fn shipping() -> ShippingDetails {
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
