//! # Order Commands
//!
//! Checkout and order history for the signed-in shopper.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Cart ──checkout──► PENDING ──confirm_payment──► PAID                 │
//! │                         │                          │                    │
//! │                   cancel_order               (admin) ship               │
//! │                         │                          │                    │
//! │                         ▼                          ▼                    │
//! │                     CANCELLED ◄──cancel_order── SHIPPED ──► DELIVERED  │
//! │                                    (paid only)                          │
//! │                                                                         │
//! │  Transitions only move forward; stock is taken at checkout and put     │
//! │  back on cancel.                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bazaar_core::{Order, OrderItem, OrderStatus};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::{CartState, ConfigState, DbState, SessionState};

/// An order with its line snapshots.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Turns the cart into a pending order and empties the cart.
///
/// ## Flow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Require a signed-in user                                            │
/// │  2. Price the cart with the store's rules                               │
/// │  3. One transaction: check + decrement stock, insert order + lines      │
/// │  4. Clear the cart (only if the order was written)                      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// ## Arguments
/// * `shipping_address` - Defaults to the address on the user's profile
pub async fn checkout(
    db: &DbState,
    cart: &CartState,
    config: &ConfigState,
    session: &SessionState,
    shipping_address: Option<&str>,
) -> ApiResult<OrderDetail> {
    let user = session.require_user()?;
    debug!(user_id = %user.id, "checkout command");

    let (snapshot, totals) = cart.with_cart(|c| -> ApiResult<_> {
        Ok((c.clone(), c.totals(&config.pricing)?))
    })?;

    let address = shipping_address
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .or(user.address);

    let order = db
        .inner()
        .orders()
        .create_from_cart(&user.id, &snapshot, &totals, address.as_deref())
        .await?;

    cart.with_cart_mut(|c| c.clear());
    info!(order_id = %order.id, total_cents = order.total_cents, "Checkout complete");

    order_detail(db, order).await
}

/// Records a successful payment for one of the user's pending orders.
///
/// ## Arguments
/// * `payment_reference` - The gateway's transaction reference
pub async fn confirm_payment(
    db: &DbState,
    session: &SessionState,
    order_id: &str,
    payment_reference: &str,
) -> ApiResult<Order> {
    debug!(order_id = %order_id, "confirm_payment command");

    let payment_reference = payment_reference.trim();
    if payment_reference.is_empty() {
        return Err(ApiError::validation("payment reference is required"));
    }

    owned_order(db, session, order_id).await?;
    Ok(db.inner().orders().mark_paid(order_id, payment_reference).await?)
}

/// The user's orders, newest first.
pub async fn list_my_orders(db: &DbState, session: &SessionState) -> ApiResult<Vec<Order>> {
    let user = session.require_user()?;
    debug!(user_id = %user.id, "list_my_orders command");

    Ok(db.inner().orders().list_for_user(&user.id).await?)
}

/// One of the user's orders with its lines. Admins may read any order.
pub async fn get_order(
    db: &DbState,
    session: &SessionState,
    order_id: &str,
) -> ApiResult<OrderDetail> {
    debug!(order_id = %order_id, "get_order command");

    let order = if session.inner().is_admin() {
        db.inner()
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Order", order_id))?
    } else {
        owned_order(db, session, order_id).await?
    };

    order_detail(db, order).await
}

/// Cancels one of the user's pending or paid orders. Stock is restored.
pub async fn cancel_order(
    db: &DbState,
    session: &SessionState,
    order_id: &str,
) -> ApiResult<Order> {
    debug!(order_id = %order_id, "cancel_order command");

    owned_order(db, session, order_id).await?;
    Ok(db
        .inner()
        .orders()
        .update_status(order_id, OrderStatus::Cancelled)
        .await?)
}

/// Loads an order that belongs to the signed-in user.
///
/// Someone else's order reads as not found.
async fn owned_order(db: &DbState, session: &SessionState, order_id: &str) -> ApiResult<Order> {
    let user = session.require_user()?;

    db.inner()
        .orders()
        .get_by_id(order_id)
        .await?
        .filter(|o| o.user_id == user.id)
        .ok_or_else(|| ApiError::not_found("Order", order_id))
}

async fn order_detail(db: &DbState, order: Order) -> ApiResult<OrderDetail> {
    let items = db.inner().orders().get_items(&order.id).await?;
    Ok(OrderDetail { order, items })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart::add_to_cart;
    use crate::error::ErrorCode;
    use crate::state::test_support::*;
    use crate::state::AppState;
    use bazaar_core::Product;

    /// An approved vendor with one product, then a signed-in shopper.
    async fn shop_with_product(stock: i64) -> (AppState, Product) {
        let state = test_state().await;
        let vendor = signed_in_vendor(&state, "kente@example.com", true).await;
        let product = listed_product(&state, &vendor, "Kente Stole", 4500, stock).await;
        state.session.inner().sign_out().await.unwrap();

        signed_in(&state, "ada@example.com").await;
        (state, product)
    }

    #[tokio::test]
    async fn test_checkout_creates_order_and_takes_stock() {
        let (state, product) = shop_with_product(5).await;
        add_to_cart(&state.db, &state.cart, &state.config, &product.id, Some(2))
            .await
            .unwrap();

        let detail = checkout(
            &state.db,
            &state.cart,
            &state.config,
            &state.session,
            Some("12 Marina Road, Lagos"),
        )
        .await
        .unwrap();

        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert_eq!(detail.order.total_cents, 10_175);
        assert_eq!(detail.order.shipping_address.as_deref(), Some("12 Marina Road, Lagos"));
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].name_snapshot, "Kente Stole");

        assert!(state.cart.with_cart(|c| c.is_empty()));
        let stock = state
            .db
            .inner()
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap()
            .stock;
        assert_eq!(stock, 3);
    }

    #[tokio::test]
    async fn test_checkout_requires_sign_in() {
        let (state, product) = shop_with_product(5).await;
        add_to_cart(&state.db, &state.cart, &state.config, &product.id, None)
            .await
            .unwrap();
        state.session.inner().sign_out().await.unwrap();

        let err = checkout(&state.db, &state.cart, &state.config, &state.session, None)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert!(!state.cart.with_cart(|c| c.is_empty()));
    }

    #[tokio::test]
    async fn test_stock_gone_before_checkout_keeps_cart() {
        let (state, product) = shop_with_product(2).await;
        add_to_cart(&state.db, &state.cart, &state.config, &product.id, Some(2))
            .await
            .unwrap();

        let vendor_id = product.vendor_id.clone();
        state
            .db
            .inner()
            .products()
            .set_stock(&product.id, &vendor_id, 1)
            .await
            .unwrap();

        let err = checkout(&state.db, &state.cart, &state.config, &state.session, None)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(!state.cart.with_cart(|c| c.is_empty()));
        assert!(list_my_orders(&state.db, &state.session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_payment_then_cancel_restores_stock() {
        let (state, product) = shop_with_product(5).await;
        add_to_cart(&state.db, &state.cart, &state.config, &product.id, Some(3))
            .await
            .unwrap();
        let detail = checkout(&state.db, &state.cart, &state.config, &state.session, None)
            .await
            .unwrap();

        let paid = confirm_payment(&state.db, &state.session, &detail.order.id, "PSK-001")
            .await
            .unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(paid.payment_reference.as_deref(), Some("PSK-001"));

        // Paying twice is not a forward move.
        let err = confirm_payment(&state.db, &state.session, &detail.order.id, "PSK-002")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        let cancelled = cancel_order(&state.db, &state.session, &detail.order.id)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let stock = state
            .db
            .inner()
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap()
            .stock;
        assert_eq!(stock, 5);
    }

    #[tokio::test]
    async fn test_other_users_order_is_not_found() {
        let (state, product) = shop_with_product(5).await;
        add_to_cart(&state.db, &state.cart, &state.config, &product.id, None)
            .await
            .unwrap();
        let detail = checkout(&state.db, &state.cart, &state.config, &state.session, None)
            .await
            .unwrap();
        state.session.inner().sign_out().await.unwrap();

        signed_in(&state, "mallory@example.com").await;
        let err = get_order(&state.db, &state.session, &detail.order.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = cancel_order(&state.db, &state.session, &detail.order.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
