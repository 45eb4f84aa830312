mod common;

use rust_decimal_macros::dec;
use uuid::Uuid;

use plantshop::services::AddToCart;
use plantshop::store::memory::FailPoint;
use plantshop::ShopError;

#[tokio::test]
async fn test_failed_write_rolls_back_everything() {
    for point in [FailPoint::InsertOrderItems, FailPoint::ClearCart] {
        let t = common::shop().await;
        let fern = t.product("Boston Fern", dec!(12.50), 5).await;
        let user = Uuid::now_v7();
        t.shop.add_to_cart(user, AddToCart { product_id: fern.id, quantity: Some(2) }).await.unwrap();
        t.coupon("SPRING20", 20).await;
        t.shop.apply_coupon(user, "SPRING20").await.unwrap();
        let coupon_ref = t.shop.session_coupon(user).await.unwrap();

        t.store.fail_next_checkout_at(point);
        let err = t.shop.checkout(user, coupon_ref, common::shipping()).await.unwrap_err();
        assert!(matches!(err, ShopError::StorageError(_)), "{point:?}");

        assert_eq!(t.store.order_count().await, 0, "{point:?}");
        assert_eq!(t.store.order_item_count().await, 0, "{point:?}");
        assert_eq!(t.stock_of(fern.id).await, 5, "{point:?}");
        assert_eq!(t.shop.cart_item_count(user).await.unwrap(), 2, "{point:?}");
        assert_eq!(t.shop.session_coupon(user).await.unwrap(), coupon_ref, "{point:?}");

        // The failure is one-shot; a retry goes through.
        t.shop.checkout(user, coupon_ref, common::shipping()).await.unwrap();
        assert_eq!(t.stock_of(fern.id).await, 3);
    }
}
