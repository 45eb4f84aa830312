//! Storefront operations.
//!
//! [`Storefront`] owns the store handle and the event publisher; each submodule
//! adds one area of operations to it. Callers pass identity and the session
//! coupon reference in explicitly.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

use serde::Serialize;
use std::sync::Arc;

use crate::publisher::EventPublisher;
use crate::store::ShopStore;

pub use account::{ContactForm, Profile, ProfileForm};
pub use cart::{AddToCart, BulkUpdate, CartView, LineView};
pub use catalog::{Home, ListingParams, ProductDetail, ProductListing, ReviewForm};
pub use checkout::{CheckoutReceipt, CheckoutSummary};
pub use orders::StatusChange;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level { Success, Warning }

/// A one-shot message for the user, attached to a single response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: Level,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self { Self { level: Level::Success, text: text.into() } }
    pub fn warning(text: impl Into<String>) -> Self { Self { level: Level::Warning, text: text.into() } }
}

#[derive(Clone)]
pub struct Storefront {
    store: Arc<dyn ShopStore>,
    events: EventPublisher,
    page_size: u32,
}

impl Storefront {
    pub fn new(store: Arc<dyn ShopStore>, events: EventPublisher, page_size: u32) -> Self {
        Self { store, events, page_size: page_size.max(1) }
    }
}
