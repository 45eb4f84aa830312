//! Cart pricing
//!
//! Subtotal is the exact sum of `quantity * price` over the cart lines. At most
//! one coupon applies; its discount is `subtotal * percent / 100`, rounded
//! half-up to cents, and the total is `subtotal - discount`.

use serde::Serialize;
use crate::domain::aggregates::{CartLine, Coupon};
use crate::domain::value_objects::{Money, Percent};

/// Result of resolving the session's coupon reference.
#[derive(Clone, Debug)]
pub enum CouponLookup {
    /// No reference stored.
    None,
    /// Reference resolved to an active coupon.
    Active(Coupon),
    /// Reference points at a coupon that is gone or inactive.
    Stale,
}

impl CouponLookup {
    pub fn from_reference(reference: Option<uuid::Uuid>, found: Option<Coupon>) -> Self {
        match (reference, found) {
            (None, _) => Self::None,
            (Some(_), Some(coupon)) if coupon.is_active => Self::Active(coupon),
            (Some(_), _) => Self::Stale,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub percent: Percent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub coupon: Option<AppliedCoupon>,
    /// Set when the stored coupon reference no longer resolves; the caller clears it.
    #[serde(skip)]
    pub clear_coupon_reference: bool,
}

pub fn subtotal(lines: &[CartLine]) -> Money {
    lines.iter().map(CartLine::line_total).sum()
}

pub fn quote(lines: &[CartLine], coupon: &CouponLookup) -> Quote {
    let subtotal = subtotal(lines);
    match coupon {
        CouponLookup::Active(c) => {
            let discount = subtotal.percentage(c.discount_percent);
            Quote {
                subtotal, discount, total: subtotal.subtract(discount),
                coupon: Some(AppliedCoupon { code: c.code.as_str().to_string(), percent: c.discount_percent }),
                clear_coupon_reference: false,
            }
        }
        CouponLookup::None | CouponLookup::Stale => Quote {
            subtotal, discount: Money::zero(), total: subtotal, coupon: None,
            clear_coupon_reference: matches!(coupon, CouponLookup::Stale),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{CartItem, Product};
    use crate::domain::value_objects::{CouponCode, Quantity};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn line(price: rust_decimal::Decimal, qty: i64) -> CartLine {
        let product = Product::create("Plant", Uuid::nil(), Money::new(price), 50);
        CartLine { item: CartItem::new(Uuid::nil(), product.id, Quantity::new(qty).unwrap()), product }
    }

    fn coupon(percent: i64) -> Coupon {
        Coupon::new(CouponCode::new("GREEN").unwrap(), Percent::new(percent).unwrap())
    }

    #[test]
    fn test_subtotal_is_exact() {
        let lines = [line(dec!(12.50), 3), line(dec!(7.25), 1)];
        assert_eq!(subtotal(&lines).amount(), dec!(44.75));
    }

    #[test]
    fn test_percentage_coupon() {
        let lines = [line(dec!(25.00), 4)];
        let q = quote(&lines, &CouponLookup::Active(coupon(20)));
        assert_eq!(q.subtotal.amount(), dec!(100.00));
        assert_eq!(q.discount.amount(), dec!(20.00));
        assert_eq!(q.total.amount(), dec!(80.00));
        assert_eq!(q.coupon.unwrap().code, "GREEN");
    }

    #[test]
    fn test_stale_coupon_signals_clear() {
        let lines = [line(dec!(9.99), 2)];
        let q = quote(&lines, &CouponLookup::Stale);
        assert_eq!(q.total.amount(), dec!(19.98));
        assert_eq!(q.discount, Money::zero());
        assert!(q.clear_coupon_reference);
        assert!(!quote(&lines, &CouponLookup::None).clear_coupon_reference);
    }

    #[test]
    fn test_discount_rounding() {
        // 33% of 0.50 = 0.165
        let q = quote(&[line(dec!(0.50), 1)], &CouponLookup::Active(coupon(33)));
        assert_eq!(q.discount.amount(), dec!(0.17));
        assert_eq!(q.total.amount(), dec!(0.33));
    }

    #[test]
    fn test_lookup_from_reference() {
        let mut c = coupon(10);
        assert!(matches!(CouponLookup::from_reference(None, Some(c.clone())), CouponLookup::None));
        assert!(matches!(CouponLookup::from_reference(Some(c.id), Some(c.clone())), CouponLookup::Active(_)));
        c.is_active = false;
        assert!(matches!(CouponLookup::from_reference(Some(c.id), Some(c)), CouponLookup::Stale));
        assert!(matches!(CouponLookup::from_reference(Some(Uuid::nil()), None), CouponLookup::Stale));
    }
}
