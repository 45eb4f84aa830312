//! Cart mutations, coupon application and cart pricing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::{Notice, Storefront};
use crate::domain::aggregates::cart::{item_count, parse_line_changes};
use crate::domain::aggregates::{CartAddition, CartLine, LineChange};
use crate::domain::pricing::{self, CouponLookup, Quote};
use crate::domain::value_objects::{CouponCode, Money, Quantity};
use crate::{Result, ShopError};

#[derive(Debug, Deserialize)]
pub struct AddToCart {
    pub product_id: Uuid,
    pub quantity: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LineView {
    #[serde(flatten)]
    pub line: CartLine,
    pub line_total: Money,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<LineView>,
    pub item_count: u32,
    #[serde(flatten)]
    pub quote: Quote,
}

impl CartView {
    pub fn new(lines: Vec<CartLine>, quote: Quote) -> Self {
        Self {
            item_count: item_count(&lines),
            lines: lines.into_iter().map(|line| LineView { line_total: line.line_total(), line }).collect(),
            quote,
        }
    }
}

/// Outcome of a bulk update.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct BulkUpdate {
    pub updated: usize,
    pub removed: usize,
    pub skipped: usize,
}

impl Storefront {
    /// Resolves a stored coupon reference into a lookup result.
    pub(crate) async fn resolve_coupon(&self, reference: Option<Uuid>) -> Result<CouponLookup> {
        let found = match reference {
            Some(id) => self.store.active_coupon(id).await?,
            None => None,
        };
        Ok(CouponLookup::from_reference(reference, found))
    }

    /// Prices the user's cart against the given coupon reference. The quote's
    /// `clear_coupon_reference` flag tells the caller to forget a stale reference.
    pub async fn view_cart(&self, user_id: Uuid, coupon_ref: Option<Uuid>) -> Result<CartView> {
        let lines = self.store.cart(user_id).await?;
        let quote = pricing::quote(&lines, &self.resolve_coupon(coupon_ref).await?);
        Ok(CartView::new(lines, quote))
    }

    pub async fn cart_item_count(&self, user_id: Uuid) -> Result<u32> {
        Ok(item_count(&self.store.cart(user_id).await?))
    }

    pub async fn add_to_cart(&self, user_id: Uuid, req: AddToCart) -> Result<(CartAddition, Notice)> {
        let product = self.store.product(req.product_id).await?.ok_or(ShopError::NotFound("Product"))?;
        if !product.is_in_stock() {
            return Err(ShopError::OutOfStock { product_id: product.id, name: product.name });
        }
        let quantity = match req.quantity {
            Some(q) => Quantity::new(q).ok_or(ShopError::InvalidQuantity)?,
            None => Quantity::ONE,
        };
        let addition = self.store.add_to_cart(user_id, product.id, quantity).await?;
        tracing::info!(%user_id, product_id = %product.id, quantity = addition.item.quantity.value(), created = addition.created, "cart updated");
        let notice = if addition.created {
            Notice::success(format!("'{}' was added to your cart.", product.name))
        } else {
            Notice::success(format!("Quantity of '{}' was updated.", product.name))
        };
        Ok((addition, notice))
    }

    pub async fn remove_from_cart(&self, user_id: Uuid, item_id: Uuid) -> Result<Notice> {
        if !self.store.remove_cart_item(user_id, item_id).await? {
            return Err(ShopError::NotFound("Cart item"));
        }
        Ok(Notice::success("Item removed from cart."))
    }

    /// Applies every parsable entry; unknown or foreign lines are skipped.
    pub async fn update_cart(&self, user_id: Uuid, form: &HashMap<String, serde_json::Value>) -> Result<(BulkUpdate, Notice)> {
        let changes = parse_line_changes(form);
        let mut outcome = BulkUpdate { skipped: form.len() - changes.len(), ..BulkUpdate::default() };
        for change in changes {
            let applied = match change {
                LineChange::Set(id, qty) => self.store.set_cart_quantity(user_id, id, qty).await?,
                LineChange::Remove(id) => self.store.remove_cart_item(user_id, id).await?,
            };
            match (applied, change) {
                (true, LineChange::Set(..)) => outcome.updated += 1,
                (true, LineChange::Remove(_)) => outcome.removed += 1,
                (false, _) => outcome.skipped += 1,
            }
        }
        tracing::debug!(%user_id, ?outcome, "bulk cart update");
        Ok((outcome, Notice::success("Cart updated.")))
    }

    /// Looks the code up and replaces the session's coupon reference. An unknown
    /// or inactive code clears the reference and fails with `InvalidCoupon`.
    pub async fn apply_coupon(&self, user_id: Uuid, code: &str) -> Result<Notice> {
        let coupon = match CouponCode::new(code) {
            Ok(code) => self.store.coupon_by_code(&code).await?,
            Err(_) => None,
        };
        match coupon {
            Some(coupon) => {
                self.store.set_session_coupon(user_id, Some(coupon.id)).await?;
                tracing::info!(%user_id, code = %coupon.code, "coupon applied");
                Ok(Notice::success("Coupon applied successfully!"))
            }
            None => {
                self.store.set_session_coupon(user_id, None).await?;
                Err(ShopError::InvalidCoupon)
            }
        }
    }

    pub async fn session_coupon(&self, user_id: Uuid) -> Result<Option<Uuid>> { self.store.session_coupon(user_id).await }

    pub async fn forget_coupon(&self, user_id: Uuid) -> Result<()> {
        tracing::info!(%user_id, "clearing stale coupon reference");
        self.store.set_session_coupon(user_id, None).await
    }
}
