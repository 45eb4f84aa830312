use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{CurrentUser, Reply};
use crate::domain::aggregates::Category;
use crate::services::{Home, ListingParams, ProductDetail, ProductListing, ReviewForm};
use crate::state::AppState;
use crate::ShopError;

pub async fn home(State(s): State<AppState>) -> Result<Json<Home>, ShopError> {
    Ok(Json(s.shop.home().await?))
}

pub async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>, ShopError> {
    Ok(Json(s.shop.categories().await?))
}

pub async fn list_products(
    State(s): State<AppState>,
    viewer: Option<CurrentUser>,
    Query(params): Query<ListingParams>,
) -> Result<Json<ProductListing>, ShopError> {
    Ok(Json(s.shop.list_products(params, viewer.map(|u| u.0)).await?))
}

pub async fn get_product(
    State(s): State<AppState>,
    viewer: Option<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductDetail>, ShopError> {
    Ok(Json(s.shop.product_detail(id, viewer.map(|u| u.0)).await?))
}

pub async fn submit_review(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(form): Json<ReviewForm>,
) -> Result<(StatusCode, Json<Reply<serde_json::Value>>), ShopError> {
    let notice = s.shop.submit_review(user, id, form).await?;
    Ok((StatusCode::CREATED, Json(Reply::with(notice, serde_json::json!({"product_id": id})))))
}
