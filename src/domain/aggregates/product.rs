//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{Money, Quantity};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub is_active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category_id: Uuid,
    pub description: String,
    pub price: Money,
    pub stock: u32,
    pub is_available: bool,
    pub is_bestseller: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)] pub struct ProductImage { pub id: Uuid, pub product_id: Uuid, pub image: String }

impl Product {
    pub fn create(name: impl Into<String>, category_id: Uuid, price: Money, stock: u32) -> Self {
        Self {
            id: Uuid::now_v7(), name: name.into(), category_id, description: String::new(),
            price, stock, is_available: true, is_bestseller: false, created_at: Utc::now(),
        }
    }

    pub fn is_in_stock(&self) -> bool { self.stock > 0 }
    pub fn can_supply(&self, qty: Quantity) -> bool { self.stock >= qty.value() }

    pub fn remove_inventory(&mut self, qty: Quantity) -> Result<(), ProductError> {
        self.stock = self.stock.checked_sub(qty.value()).ok_or(ProductError::InsufficientInventory)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { InsufficientInventory }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "Insufficient inventory") }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregated review statistics shown on the product page.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RatingSummary {
    pub average: f64,
    pub count: usize,
    /// Share of 1..=5 star reviews, in percent, indexed from one star.
    pub breakdown: [f64; 5],
}

impl RatingSummary {
    pub fn from_reviews(reviews: &[Review]) -> Self {
        if reviews.is_empty() { return Self::default(); }
        let count = reviews.len();
        let mut stars = [0usize; 5];
        for r in reviews {
            if let Some(slot) = usize::from(r.rating).checked_sub(1).and_then(|i| stars.get_mut(i)) {
                *slot += 1;
            }
        }
        let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
        let breakdown = stars.map(|n| n as f64 / count as f64 * 100.0);
        Self { average: f64::from(total) / count as f64, count, breakdown }
    }
}
