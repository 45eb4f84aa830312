//! PlantShop storefront
//!
//! Online plant shop service.
//!
//! ## Features
//! - Catalog browsing, search and reviews
//! - Shopping cart with percentage coupons
//! - Atomic checkout with stock reservation
//! - Order history and status tracking
//! - Wishlist and customer profiles

pub mod config;
pub mod domain;
pub mod publisher;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::OrderStatus;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Your cart is empty.")]
    EmptyCart,

    #[error("Sorry, '{name}' is out of stock.")]
    OutOfStock { product_id: Uuid, name: String },

    #[error("Sorry, only {available} of '{name}' left in stock.")]
    InsufficientStock { product_id: Uuid, name: String, requested: u32, available: u32 },

    #[error("This coupon is invalid or has expired.")]
    InvalidCoupon,

    #[error("Invalid quantity")]
    InvalidQuantity,

    #[error("{0}")]
    Validation(String),

    #[error("An account with this email already exists.")]
    DuplicateEmail,

    #[error("Cannot move order from {from} to {to}.")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order was modified concurrently, please retry.")]
    Conflict,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Permission denied")]
    Forbidden,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<validator::ValidationErrors> for ShopError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(m) => m.to_string(),
                    None => format!("Invalid value for '{field}'."),
                })
            })
            .collect();
        messages.sort();
        ShopError::Validation(messages.join(" "))
    }
}

impl From<domain::aggregates::OrderError> for ShopError {
    fn from(err: domain::aggregates::OrderError) -> Self {
        match err {
            domain::aggregates::OrderError::IllegalTransition { from, to } => ShopError::IllegalTransition { from, to },
            other => ShopError::StorageError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;
