use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::{CurrentUser, Reply};
use crate::domain::aggregates::CartAddition;
use crate::services::{AddToCart, BulkUpdate, CartView, Notice};
use crate::state::AppState;
use crate::ShopError;

/// Prices the cart and drops a coupon reference that no longer resolves.
pub async fn view_cart(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Reply<CartView>>, ShopError> {
    let coupon_ref = s.shop.session_coupon(user).await?;
    let cart = s.shop.view_cart(user, coupon_ref).await?;
    let mut reply = Reply::new(cart);
    if reply.data.quote.clear_coupon_reference {
        s.shop.forget_coupon(user).await?;
        reply.messages.push(Notice::warning("The coupon on your cart is no longer valid and was removed."));
    }
    Ok(Json(reply))
}

pub async fn item_count(State(s): State<AppState>, user: Option<CurrentUser>) -> Result<Json<serde_json::Value>, ShopError> {
    let count = match user {
        Some(CurrentUser(id)) => s.shop.cart_item_count(id).await?,
        None => 0,
    };
    Ok(Json(serde_json::json!({"cart_item_count": count})))
}

pub async fn add_to_cart(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<AddToCart>,
) -> Result<(StatusCode, Json<Reply<CartAddition>>), ShopError> {
    let (addition, notice) = s.shop.add_to_cart(user, req).await?;
    let status = if addition.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(Reply::with(notice, addition))))
}

pub async fn remove_from_cart(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Reply<serde_json::Value>>, ShopError> {
    let notice = s.shop.remove_from_cart(user, id).await?;
    Ok(Json(Reply::with(notice, serde_json::json!({"removed": id}))))
}

pub async fn update_cart(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(form): Json<HashMap<String, serde_json::Value>>,
) -> Result<Json<Reply<BulkUpdate>>, ShopError> {
    let (outcome, notice) = s.shop.update_cart(user, &form).await?;
    Ok(Json(Reply::with(notice, outcome)))
}

#[derive(Debug, Deserialize)]
pub struct CouponRequest {
    #[serde(default)]
    pub code: String,
}

pub async fn apply_coupon(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CouponRequest>,
) -> Result<Json<Reply<CartView>>, ShopError> {
    let notice = s.shop.apply_coupon(user, &req.code).await?;
    let coupon_ref = s.shop.session_coupon(user).await?;
    Ok(Json(Reply::with(notice, s.shop.view_cart(user, coupon_ref).await?)))
}
