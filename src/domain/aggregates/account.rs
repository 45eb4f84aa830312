//! Customer accounts, wishlists and contact messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::product::Product;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn register(email: &str, full_name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(), email: normalize_email(email), full_name: full_name.into(), phone: phone.into(),
            is_staff: false, is_active: true, date_joined: Utc::now(),
        }
    }
}

/// Emails are unique regardless of case.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

#[derive(Clone, Debug, Serialize)]
pub struct WishlistEntry {
    pub product: Product,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
