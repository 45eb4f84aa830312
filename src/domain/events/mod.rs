//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::OrderStatus;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShopEvent {
    OrderPlaced { order_id: Uuid, user_id: Uuid, total: Decimal, items: usize, coupon_code: Option<String> },
    OrderStatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    StockDepleted { product_id: Uuid, name: String },
}

impl ShopEvent {
    /// NATS subject suffix for this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "orders.placed",
            Self::OrderStatusChanged { .. } => "orders.status_changed",
            Self::StockDepleted { .. } => "inventory.depleted",
        }
    }
}
