use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{CurrentUser, Reply};
use crate::domain::aggregates::{Order, OrderDetails, ShippingDetails};
use crate::services::{CheckoutSummary, StatusChange};
use crate::state::AppState;
use crate::ShopError;

pub async fn checkout_summary(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<CheckoutSummary>, ShopError> {
    let coupon_ref = s.shop.session_coupon(user).await?;
    Ok(Json(s.shop.checkout_summary(user, coupon_ref).await?))
}

pub async fn checkout(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(shipping): Json<ShippingDetails>,
) -> Result<(StatusCode, Json<Reply<OrderDetails>>), ShopError> {
    let coupon_ref = s.shop.session_coupon(user).await?;
    let receipt = s.shop.checkout(user, coupon_ref, shipping).await?;
    Ok((StatusCode::CREATED, Json(Reply::with(receipt.notice, receipt.order))))
}

pub async fn list_orders(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Vec<Order>>, ShopError> {
    Ok(Json(s.shop.order_history(user).await?))
}

pub async fn get_order(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(id): Path<Uuid>) -> Result<Json<OrderDetails>, ShopError> {
    Ok(Json(s.shop.order_details(user, id).await?))
}

pub async fn change_status(
    State(s): State<AppState>,
    CurrentUser(staff): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChange>,
) -> Result<Json<Order>, ShopError> {
    Ok(Json(s.shop.change_order_status(staff, id, req.status).await?))
}
