//! Coupon Aggregate

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{CouponCode, Percent};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    pub code: CouponCode,
    pub discount_percent: Percent,
    pub is_active: bool,
}

impl Coupon {
    pub fn new(code: CouponCode, discount_percent: Percent) -> Self {
        Self { id: Uuid::now_v7(), code, discount_percent, is_active: true }
    }

    /// Whether a submitted code redeems this coupon.
    pub fn redeemable_with(&self, code: &str) -> bool { self.is_active && self.code.matches(code) }
}
