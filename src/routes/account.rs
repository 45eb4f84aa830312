use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{CurrentUser, Reply};
use crate::domain::aggregates::{User, WishlistEntry};
use crate::services::{ContactForm, Profile, ProfileForm};
use crate::state::AppState;
use crate::ShopError;

pub async fn register(State(s): State<AppState>, Json(form): Json<ProfileForm>) -> Result<(StatusCode, Json<Reply<User>>), ShopError> {
    let (user, notice) = s.shop.register(form).await?;
    Ok((StatusCode::CREATED, Json(Reply::with(notice, user))))
}

pub async fn profile(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Profile>, ShopError> {
    Ok(Json(s.shop.profile(user).await?))
}

pub async fn update_profile(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(form): Json<ProfileForm>,
) -> Result<Json<Reply<User>>, ShopError> {
    let (user, notice) = s.shop.update_profile(user, form).await?;
    Ok(Json(Reply::with(notice, user)))
}

pub async fn wishlist(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Vec<WishlistEntry>>, ShopError> {
    Ok(Json(s.shop.wishlist(user).await?))
}

pub async fn add_to_wishlist(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Reply<serde_json::Value>>, ShopError> {
    let notice = s.shop.add_to_wishlist(user, product_id).await?;
    Ok(Json(Reply::with(notice, serde_json::json!({"status": "success"}))))
}

pub async fn remove_from_wishlist(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Reply<serde_json::Value>>, ShopError> {
    let notice = s.shop.remove_from_wishlist(user, product_id).await?;
    Ok(Json(Reply::with(notice, serde_json::json!({"status": "success"}))))
}

pub async fn contact(State(s): State<AppState>, Json(form): Json<ContactForm>) -> Result<(StatusCode, Json<Reply<serde_json::Value>>), ShopError> {
    let notice = s.shop.send_contact(form).await?;
    Ok((StatusCode::CREATED, Json(Reply::with(notice, serde_json::json!({"status": "received"})))))
}
