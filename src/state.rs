use std::sync::Arc;

use crate::config::Config;
use crate::publisher::EventPublisher;
use crate::services::Storefront;
use crate::store::ShopStore;

#[derive(Clone)]
pub struct AppState {
    pub shop: Storefront,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn ShopStore>, events: EventPublisher) -> Self {
        Self { shop: Storefront::new(store, events, config.page_size) }
    }
}
