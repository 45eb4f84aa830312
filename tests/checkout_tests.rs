mod common;

use rust_decimal_macros::dec;
use uuid::Uuid;

use plantshop::domain::aggregates::{OrderStatus, ShippingDetails};
use plantshop::services::AddToCart;
use plantshop::ShopError;

async fn fill_cart(t: &common::Shop, user: Uuid, product_id: Uuid, quantity: i64) {
    t.shop.add_to_cart(user, AddToCart { product_id, quantity: Some(quantity) }).await.unwrap();
}

#[tokio::test]
async fn test_checkout_places_order() {
    let t = common::shop().await;
    let monstera = t.product("Monstera", dec!(50.00), 5).await;
    let fern = t.product("Boston Fern", dec!(12.50), 3).await;
    let user = Uuid::now_v7();
    fill_cart(&t, user, monstera.id, 2).await;
    fill_cart(&t, user, fern.id, 1).await;
    t.coupon("SPRING20", 20).await;
    t.shop.apply_coupon(user, "SPRING20").await.unwrap();
    let coupon_ref = t.shop.session_coupon(user).await.unwrap();

    let receipt = t.shop.checkout(user, coupon_ref, common::shipping()).await.unwrap();
    let order = &receipt.order.order;

    assert_eq!(order.user_id, user);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.subtotal.amount(), dec!(112.50));
    assert_eq!(order.discount_amount.amount(), dec!(22.50));
    assert_eq!(order.total_price.amount(), dec!(90.00));
    assert_eq!(order.coupon_code.as_deref(), Some("SPRING20"));
    assert_eq!(receipt.order.items.len(), 2);
    assert_eq!(receipt.notice.text, "Your order has been placed successfully!");

    assert_eq!(t.stock_of(monstera.id).await, 3);
    assert_eq!(t.stock_of(fern.id).await, 2);
    assert!(t.shop.view_cart(user, None).await.unwrap().lines.is_empty());
    assert_eq!(t.shop.session_coupon(user).await.unwrap(), None);

    let history = t.shop.order_history(user).await.unwrap();
    assert_eq!(history.len(), 1);
    let details = t.shop.order_details(user, order.id).await.unwrap();
    assert_eq!(details.items.len(), 2);
}

#[tokio::test]
async fn test_order_items_keep_price_at_purchase() {
    let t = common::shop().await;
    let mut fern = t.product("Boston Fern", dec!(12.50), 3).await;
    let user = Uuid::now_v7();
    fill_cart(&t, user, fern.id, 2).await;

    let receipt = t.shop.checkout(user, None, common::shipping()).await.unwrap();

    fern.price = plantshop::domain::value_objects::Money::new(dec!(99.00));
    t.store.insert_product(fern.clone()).await;

    let details = t.shop.order_details(user, receipt.order.order.id).await.unwrap();
    let item = &details.items[0];
    assert_eq!(item.price.amount(), dec!(12.50));
    assert_eq!(item.product_name, "Boston Fern");
    assert_eq!(item.line_total().amount(), dec!(25.00));
    assert_eq!(details.order.total_price.amount(), dec!(25.00));
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let t = common::shop().await;
    let user = Uuid::now_v7();

    let err = t.shop.checkout(user, None, common::shipping()).await.unwrap_err();
    assert!(matches!(err, ShopError::EmptyCart));
    let err = t.shop.checkout_summary(user, None).await.unwrap_err();
    assert!(matches!(err, ShopError::EmptyCart));
    assert_eq!(t.store.order_count().await, 0);
}

#[tokio::test]
async fn test_empty_cart_wins_over_blank_form() {
    let t = common::shop().await;
    let user = Uuid::now_v7();

    let err = t.shop.checkout(user, None, ShippingDetails::default()).await.unwrap_err();
    assert!(matches!(err, ShopError::EmptyCart));
}

#[tokio::test]
async fn test_missing_shipping_fields_are_rejected() {
    let t = common::shop().await;
    let fern = t.product("Boston Fern", dec!(12.50), 3).await;
    let user = Uuid::now_v7();
    fill_cart(&t, user, fern.id, 1).await;

    let shipping = ShippingDetails { city: "   ".into(), ..common::shipping() };
    let err = t.shop.checkout(user, None, shipping).await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(ref m) if m.contains("City is required.")));
    assert_eq!(t.store.order_count().await, 0);
    assert_eq!(t.shop.cart_item_count(user).await.unwrap(), 1);
}

#[tokio::test]
async fn test_insufficient_stock_changes_nothing() {
    let t = common::shop().await;
    let fern = t.product("Boston Fern", dec!(12.50), 2).await;
    let pothos = t.product("Golden Pothos", dec!(19.75), 10).await;
    let user = Uuid::now_v7();
    fill_cart(&t, user, pothos.id, 1).await;
    fill_cart(&t, user, fern.id, 3).await;

    let err = t.shop.checkout(user, None, common::shipping()).await.unwrap_err();
    match err {
        ShopError::InsufficientStock { product_id, requested, available, .. } => {
            assert_eq!(product_id, fern.id);
            assert_eq!((requested, available), (3, 2));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(t.store.order_count().await, 0);
    assert_eq!(t.store.order_item_count().await, 0);
    assert_eq!(t.stock_of(fern.id).await, 2);
    assert_eq!(t.stock_of(pothos.id).await, 10);
    assert_eq!(t.shop.cart_item_count(user).await.unwrap(), 4);
}

#[tokio::test]
async fn test_concurrent_checkouts_for_last_unit() {
    let t = common::shop().await;
    let rare = t.product("Variegated Monstera", dec!(150.00), 1).await;
    let alice = Uuid::now_v7();
    let bob = Uuid::now_v7();
    fill_cart(&t, alice, rare.id, 1).await;
    fill_cart(&t, bob, rare.id, 1).await;

    let (a, b) = tokio::join!(
        t.shop.checkout(alice, None, common::shipping()),
        t.shop.checkout(bob, None, common::shipping()),
    );

    let successes = [a.is_ok(), b.is_ok()].into_iter().filter(|ok| *ok).count();
    assert_eq!(successes, 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(ShopError::OutOfStock { .. })));
    assert_eq!(t.stock_of(rare.id).await, 0);
    assert_eq!(t.store.order_count().await, 1);
}

#[tokio::test]
async fn test_stale_coupon_at_checkout_charges_full_price() {
    let t = common::shop().await;
    let fern = t.product("Boston Fern", dec!(12.50), 5).await;
    let user = Uuid::now_v7();
    fill_cart(&t, user, fern.id, 2).await;
    let coupon = t.coupon("SPRING20", 20).await;
    t.shop.apply_coupon(user, "SPRING20").await.unwrap();
    t.store.remove_coupon(coupon.id).await;

    let receipt = t.shop.checkout(user, Some(coupon.id), common::shipping()).await.unwrap();
    assert_eq!(receipt.order.order.total_price.amount(), dec!(25.00));
    assert_eq!(receipt.order.order.coupon_code, None);
    assert_eq!(t.shop.session_coupon(user).await.unwrap(), None);
}

#[tokio::test]
async fn test_other_users_orders_are_hidden() {
    let t = common::shop().await;
    let fern = t.product("Boston Fern", dec!(12.50), 5).await;
    let user = Uuid::now_v7();
    fill_cart(&t, user, fern.id, 1).await;
    let receipt = t.shop.checkout(user, None, common::shipping()).await.unwrap();

    let err = t.shop.order_details(Uuid::now_v7(), receipt.order.order.id).await.unwrap_err();
    assert!(matches!(err, ShopError::NotFound("Order")));
}
