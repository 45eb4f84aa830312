//! Order history and status management.

use serde::Deserialize;
use uuid::Uuid;

use super::Storefront;
use crate::domain::aggregates::{Order, OrderDetails, OrderStatus};
use crate::domain::events::ShopEvent;
use crate::{Result, ShopError};

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
}

impl Storefront {
    pub async fn order_history(&self, user_id: Uuid) -> Result<Vec<Order>> { self.store.orders_for_user(user_id).await }

    /// Another user's order is reported exactly like a missing one.
    pub async fn order_details(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderDetails> {
        self.store.order_for_user(user_id, order_id).await?.ok_or(ShopError::NotFound("Order"))
    }

    /// Staff-only. Moves an order along its status machine.
    pub async fn change_order_status(&self, staff_id: Uuid, order_id: Uuid, next: OrderStatus) -> Result<Order> {
        let staff = self.store.user(staff_id).await?.ok_or(ShopError::Forbidden)?;
        if !staff.is_staff || !staff.is_active {
            return Err(ShopError::Forbidden);
        }
        let mut order = self.store.order(order_id).await?.ok_or(ShopError::NotFound("Order"))?;
        let previous = order.transition(next)?;
        if !self.store.update_order_status(order_id, previous, next).await? {
            return Err(ShopError::Conflict);
        }
        tracing::info!(%order_id, from = %previous, to = %next, %staff_id, "order status changed");
        self.events.publish(ShopEvent::OrderStatusChanged { order_id, from: previous, to: next }).await;
        Ok(order)
    }
}
