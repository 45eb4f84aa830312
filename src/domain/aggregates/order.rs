//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::cart::CartLine;
use crate::domain::pricing::Quote;
use crate::domain::value_objects::{Money, Quantity};

/// Contact and delivery details captured at checkout. Every field is required.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ShippingDetails {
    #[validate(length(min = 1, message = "Full name is required."))]
    pub full_name: String,
    #[validate(length(min = 1, message = "Email is required."))]
    pub email: String,
    #[validate(length(min = 1, message = "Phone is required."))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required."))]
    pub address: String,
    #[validate(length(min = 1, message = "City is required."))]
    pub city: String,
    #[validate(length(min = 1, message = "State is required."))]
    pub state: String,
    #[validate(length(min = 1, message = "Postcode is required."))]
    pub postcode: String,
}

impl ShippingDetails {
    /// Trims surrounding whitespace so blank fields fail validation.
    pub fn trimmed(self) -> Self {
        let t = |s: String| s.trim().to_string();
        Self {
            full_name: t(self.full_name), email: t(self.email), phone: t(self.phone), address: t(self.address),
            city: t(self.city), state: t(self.state), postcode: t(self.postcode),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "Cash on Delivery")]
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::CashOnDelivery => "Cash on Delivery" }
    }
}

impl FromStr for PaymentMethod {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s { "Cash on Delivery" => Ok(Self::CashOnDelivery), other => Err(OrderError::UnknownPaymentMethod(other.to_string())) }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending", Self::Processing => "Processing", Self::Shipped => "Shipped",
            Self::Delivered => "Delivered", Self::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Delivered | Self::Cancelled) }

    /// Pending -> Processing -> Shipped -> Delivered, and any live state -> Cancelled.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, Processing) | (Processing, Shipped) | (Shipped, Delivered) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending), "Processing" => Ok(Self::Processing), "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered), "Cancelled" => Ok(Self::Cancelled),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping: ShippingDetails,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub coupon_code: Option<String>,
    pub total_price: Money,
    pub shipping_cost: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: Quantity,
    pub price: Money,
}

impl OrderItem {
    /// Snapshots a cart line at its product's current price.
    pub fn snapshot(order_id: Uuid, line: &CartLine) -> Self {
        Self {
            id: Uuid::now_v7(), order_id, product_id: line.product.id, product_name: line.product.name.clone(),
            quantity: line.item.quantity, price: line.product.price,
        }
    }
    pub fn line_total(&self) -> Money { self.price.multiply(self.quantity.value()) }
}

/// An order together with its line items.
#[derive(Clone, Debug, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Builds a pending, cash-on-delivery order from a priced cart. Shipping is free.
    pub fn place(user_id: Uuid, shipping: ShippingDetails, quote: &Quote) -> Self {
        let shipping_cost = Money::zero();
        Self {
            id: Uuid::now_v7(), user_id, shipping,
            subtotal: quote.subtotal, discount_amount: quote.discount,
            coupon_code: quote.coupon.as_ref().map(|c| c.code.clone()),
            total_price: quote.total.add(shipping_cost), shipping_cost,
            status: OrderStatus::Pending, payment_method: PaymentMethod::CashOnDelivery, created_at: Utc::now(),
        }
    }

    pub fn transition(&mut self, next: OrderStatus) -> Result<OrderStatus, OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::IllegalTransition { from: self.status, to: next });
        }
        Ok(std::mem::replace(&mut self.status, next))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError { IllegalTransition { from: OrderStatus, to: OrderStatus }, UnknownStatus(String), UnknownPaymentMethod(String) }
impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalTransition { from, to } => write!(f, "Cannot move order from {from} to {to}"),
            Self::UnknownStatus(s) => write!(f, "Unknown order status '{s}'"),
            Self::UnknownPaymentMethod(s) => write!(f, "Unknown payment method '{s}'"),
        }
    }
}
