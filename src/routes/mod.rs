//! HTTP surface: router, identity extraction and error mapping.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod orders;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::services::Notice;
use crate::state::AppState;
use crate::ShopError;

/// Header carrying the id of the user already authenticated upstream.
pub const USER_HEADER: &str = "x-user-id";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "plantshop"})) }))
        .route("/api/v1/home", get(catalog::home))
        .route("/api/v1/categories", get(catalog::list_categories))
        .route("/api/v1/products", get(catalog::list_products))
        .route("/api/v1/products/:id", get(catalog::get_product))
        .route("/api/v1/products/:id/reviews", post(catalog::submit_review))
        .route("/api/v1/cart", get(cart::view_cart))
        .route("/api/v1/cart/count", get(cart::item_count))
        .route("/api/v1/cart/items", post(cart::add_to_cart))
        .route("/api/v1/cart/items/:id", delete(cart::remove_from_cart))
        .route("/api/v1/cart/update", post(cart::update_cart))
        .route("/api/v1/cart/coupon", post(cart::apply_coupon))
        .route("/api/v1/checkout", get(orders::checkout_summary).post(orders::checkout))
        .route("/api/v1/orders", get(orders::list_orders))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/orders/:id/status", put(orders::change_status))
        .route("/api/v1/accounts", post(account::register))
        .route("/api/v1/profile", get(account::profile).put(account::update_profile))
        .route("/api/v1/wishlist", get(account::wishlist))
        .route("/api/v1/wishlist/:product_id", post(account::add_to_wishlist).delete(account::remove_from_wishlist))
        .route("/api/v1/contact", post(account::contact))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The authenticated user. Requests without a valid identity get 401.
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(CurrentUser)
            .ok_or(ShopError::Unauthenticated)
    }
}

/// Response body: payload plus the messages produced while handling the request.
#[derive(Debug, Serialize)]
pub struct Reply<T: Serialize> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Notice>,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> Reply<T> {
    pub fn new(data: T) -> Self { Self { messages: Vec::new(), data } }
    pub fn with(notice: Notice, data: T) -> Self { Self { messages: vec![notice], data } }
}

impl ShopError {
    pub fn status(&self) -> StatusCode {
        match self {
            ShopError::NotFound(_) => StatusCode::NOT_FOUND,
            ShopError::EmptyCart | ShopError::InvalidQuantity => StatusCode::BAD_REQUEST,
            ShopError::OutOfStock { .. } | ShopError::InsufficientStock { .. } => StatusCode::CONFLICT,
            ShopError::DuplicateEmail | ShopError::IllegalTransition { .. } | ShopError::Conflict => StatusCode::CONFLICT,
            ShopError::InvalidCoupon | ShopError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ShopError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ShopError::Forbidden => StatusCode::FORBIDDEN,
            ShopError::StorageError(_) | ShopError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ShopError::StorageError(_) | ShopError::Database(_) => {
                tracing::error!(error = %self, "request failed");
                serde_json::json!({"error": "Something went wrong, please try again."})
            }
            ShopError::OutOfStock { product_id, .. } | ShopError::InsufficientStock { product_id, .. } => {
                serde_json::json!({"error": self.to_string(), "product_id": product_id})
            }
            ShopError::EmptyCart => serde_json::json!({"error": self.to_string(), "level": "warning"}),
            _ => serde_json::json!({"error": self.to_string()}),
        };
        (status, Json(body)).into_response()
    }
}
