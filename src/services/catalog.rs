//! Catalog browsing and reviews.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{Notice, Storefront};
use crate::domain::aggregates::{Category, Product, ProductImage, RatingSummary, Review};
use crate::store::{Page, ProductQuery, ProductSort};
use crate::{Result, ShopError};

const NEW_ARRIVALS: u32 = 4;
const FEATURED_CATEGORIES: u32 = 3;
const RELATED_PRODUCTS: u32 = 4;

#[derive(Debug, Serialize)]
pub struct Home {
    pub new_arrivals: Vec<Product>,
    pub featured_categories: Vec<Category>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListingParams {
    pub search: Option<String>,
    /// Comma-separated category ids; unparsable entries are ignored.
    pub categories: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ProductListing {
    #[serde(flatten)]
    pub page: Page<Product>,
    pub categories: Vec<Category>,
    pub selected_categories: Vec<Uuid>,
    pub search: Option<String>,
    pub sort: ProductSort,
    pub wishlist_product_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    pub images: Vec<ProductImage>,
    pub related_products: Vec<Product>,
    pub reviews: Vec<Review>,
    pub rating: RatingSummary,
    pub in_wishlist: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewForm {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5."))]
    #[serde(default = "default_rating")]
    pub rating: i64,
    #[validate(length(min = 1, message = "Please write a comment."))]
    pub comment: String,
}

fn default_rating() -> i64 { 5 }

impl Storefront {
    pub async fn home(&self) -> Result<Home> {
        Ok(Home {
            new_arrivals: self.store.new_arrivals(NEW_ARRIVALS).await?,
            featured_categories: self.store.active_categories(Some(FEATURED_CATEGORIES)).await?,
        })
    }

    pub async fn categories(&self) -> Result<Vec<Category>> { self.store.active_categories(None).await }

    pub async fn list_products(&self, params: ListingParams, viewer: Option<Uuid>) -> Result<ProductListing> {
        let selected_categories: Vec<Uuid> = params
            .categories
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| Uuid::parse_str(s.trim()).ok())
            .collect();
        let search = params.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let query = ProductQuery {
            search: search.clone(),
            category_ids: selected_categories.clone(),
            sort: params.sort,
            page: params.page.unwrap_or(1),
            per_page: self.page_size,
        };
        let page = self.store.search_products(&query).await?;
        let wishlist_product_ids = match viewer {
            Some(user_id) => self.store.wishlist(user_id).await?.into_iter().map(|w| w.product.id).collect(),
            None => Vec::new(),
        };
        Ok(ProductListing {
            page, categories: self.categories().await?, selected_categories, search, sort: params.sort, wishlist_product_ids,
        })
    }

    pub async fn product_detail(&self, product_id: Uuid, viewer: Option<Uuid>) -> Result<ProductDetail> {
        let product = self.store.product(product_id).await?.ok_or(ShopError::NotFound("Product"))?;
        let reviews = self.store.reviews(product_id).await?;
        let in_wishlist = match viewer {
            Some(user_id) => self.store.wishlist(user_id).await?.iter().any(|w| w.product.id == product_id),
            None => false,
        };
        Ok(ProductDetail {
            images: self.store.product_images(product_id).await?,
            related_products: self.store.related_products(&product, RELATED_PRODUCTS).await?,
            rating: RatingSummary::from_reviews(&reviews),
            reviews,
            product,
            in_wishlist,
        })
    }

    pub async fn submit_review(&self, user_id: Uuid, product_id: Uuid, form: ReviewForm) -> Result<Notice> {
        let form = ReviewForm { comment: form.comment.trim().to_string(), ..form };
        form.validate()?;
        if self.store.product(product_id).await?.is_none() {
            return Err(ShopError::NotFound("Product"));
        }
        let rating = u8::try_from(form.rating).map_err(|_| ShopError::Validation("Rating must be between 1 and 5.".into()))?;
        let review = Review { id: Uuid::now_v7(), product_id, user_id, rating, comment: form.comment, created_at: Utc::now() };
        self.store.insert_review(&review).await?;
        tracing::info!(%product_id, %user_id, rating, "review submitted");
        Ok(Notice::success("Your review has been submitted."))
    }
}
