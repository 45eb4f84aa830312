//! Checkout: turns a cart into an order in one transaction.

use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::cart::CartView;
use super::{Notice, Storefront};
use crate::domain::aggregates::{Order, OrderDetails, OrderItem, ShippingDetails};
use crate::domain::events::ShopEvent;
use crate::domain::pricing::{self, CouponLookup, Quote};
use crate::{Result, ShopError};

#[derive(Debug, Serialize)]
pub struct CheckoutSummary {
    #[serde(flatten)]
    pub cart: CartView,
}

#[derive(Debug, Serialize)]
pub struct CheckoutReceipt {
    pub order: OrderDetails,
    pub notice: Notice,
}

impl Storefront {
    /// The priced cart shown on the checkout page. An empty cart is an error.
    pub async fn checkout_summary(&self, user_id: Uuid, coupon_ref: Option<Uuid>) -> Result<CheckoutSummary> {
        let cart = self.view_cart(user_id, coupon_ref).await?;
        if cart.lines.is_empty() {
            return Err(ShopError::EmptyCart);
        }
        Ok(CheckoutSummary { cart })
    }

    /// Places the order.
    ///
    /// Inside one transaction: reads and locks the cart, rejects an empty one
    /// before looking at the form, reprices, checks stock for every line, writes
    /// the order and its items, decrements stock with a conditional update, then
    /// deletes the ordered lines and the session coupon. Any error drops the
    /// transaction, leaving the store untouched.
    pub async fn checkout(&self, user_id: Uuid, coupon_ref: Option<Uuid>, shipping: ShippingDetails) -> Result<CheckoutReceipt> {
        let mut tx = self.store.begin_checkout().await?;
        let lines = tx.cart(user_id).await?;
        if lines.is_empty() {
            return Err(ShopError::EmptyCart);
        }
        let shipping = shipping.trimmed();
        shipping.validate()?;

        let coupon = match coupon_ref {
            Some(id) => CouponLookup::from_reference(Some(id), tx.active_coupon(id).await?),
            None => CouponLookup::None,
        };
        let quote: Quote = pricing::quote(&lines, &coupon);

        if let Some(short) = lines.iter().find(|l| !l.product.can_supply(l.item.quantity)) {
            tracing::info!(%user_id, product_id = %short.product.id, requested = short.item.quantity.value(), available = short.product.stock, "checkout rejected, insufficient stock");
            return Err(insufficient(short));
        }

        let order = Order::place(user_id, shipping, &quote);
        let items: Vec<OrderItem> = lines.iter().map(|l| OrderItem::snapshot(order.id, l)).collect();
        tx.insert_order(&order).await?;
        tx.insert_order_items(&items).await?;

        for line in &lines {
            if !tx.reserve_stock(line.product.id, line.item.quantity).await? {
                tracing::warn!(%user_id, product_id = %line.product.id, "stock changed during checkout");
                return Err(insufficient(line));
            }
        }

        let ordered: Vec<Uuid> = lines.iter().map(|l| l.item.id).collect();
        tx.clear_cart(user_id, &ordered).await?;
        tx.clear_session_coupon(user_id).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, %user_id, total = %order.total_price, items = items.len(), "order placed");
        self.events
            .publish(ShopEvent::OrderPlaced {
                order_id: order.id, user_id, total: order.total_price.amount(), items: items.len(), coupon_code: order.coupon_code.clone(),
            })
            .await;
        for line in lines.iter().filter(|l| l.product.stock == l.item.quantity.value()) {
            self.events.publish(ShopEvent::StockDepleted { product_id: line.product.id, name: line.product.name.clone() }).await;
        }

        Ok(CheckoutReceipt {
            order: OrderDetails { order, items },
            notice: Notice::success("Your order has been placed successfully!"),
        })
    }
}

fn insufficient(line: &crate::domain::aggregates::CartLine) -> ShopError {
    if line.product.is_in_stock() {
        ShopError::InsufficientStock {
            product_id: line.product.id, name: line.product.name.clone(),
            requested: line.item.quantity.value(), available: line.product.stock,
        }
    } else {
        ShopError::OutOfStock { product_id: line.product.id, name: line.product.name.clone() }
    }
}
