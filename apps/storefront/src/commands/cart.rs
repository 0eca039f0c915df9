//! # Cart Commands
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Checkout │────►│ Pending  │       │
//! │  │  Cart    │     │          │     │          │     │  Order   │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │           (orders.rs)                          │
//! │                   add_to_cart                                           │
//! │                   update_cart_item                                      │
//! │                   remove_from_cart                                      │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   clear_cart ──────────────────────► (back to empty)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cart does not need a signed-in user; checkout does.

use bazaar_core::{Cart, CartItem, CartTotals, PricingRules};
use serde::Serialize;
use tracing::debug;

use crate::commands::catalog;
use crate::error::ApiResult;
use crate::state::{CartState, ConfigState, DbState};

/// Cart response including items and totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub totals: CartTotals,
}

impl CartResponse {
    pub fn new(cart: &Cart, rules: &PricingRules) -> ApiResult<Self> {
        Ok(CartResponse {
            items: cart.items.clone(),
            totals: cart.totals(rules)?,
        })
    }
}

/// Gets the current cart contents with totals.
pub fn get_cart(cart: &CartState, config: &ConfigState) -> ApiResult<CartResponse> {
    debug!("get_cart command");
    cart.with_cart(|c| CartResponse::new(c, &config.pricing))
}

/// Adds a product to the cart.
///
/// ## Behavior
/// - Already in cart: quantity increases
/// - Not in cart: added as a new line
/// - Price is frozen at the moment of adding
///
/// ## Arguments
/// * `product_id` - Listed product id
/// * `quantity` - Quantity to add (default: 1)
pub async fn add_to_cart(
    db: &DbState,
    cart: &CartState,
    config: &ConfigState,
    product_id: &str,
    quantity: Option<i64>,
) -> ApiResult<CartResponse> {
    let quantity = quantity.unwrap_or(1);
    debug!(product_id = %product_id, quantity, "add_to_cart command");

    // Only listed products can be added; get_product enforces that.
    let product = catalog::get_product(db, product_id).await?;

    cart.with_cart_mut(|c| -> ApiResult<CartResponse> {
        c.add_item(&product, quantity)?;
        CartResponse::new(c, &config.pricing)
    })
}

/// Sets the quantity of a line. Zero removes it.
pub fn update_cart_item(
    cart: &CartState,
    config: &ConfigState,
    product_id: &str,
    quantity: i64,
) -> ApiResult<CartResponse> {
    debug!(product_id = %product_id, quantity, "update_cart_item command");

    cart.with_cart_mut(|c| -> ApiResult<CartResponse> {
        c.update_quantity(product_id, quantity)?;
        CartResponse::new(c, &config.pricing)
    })
}

pub fn remove_from_cart(
    cart: &CartState,
    config: &ConfigState,
    product_id: &str,
) -> ApiResult<CartResponse> {
    debug!(product_id = %product_id, "remove_from_cart command");

    cart.with_cart_mut(|c| -> ApiResult<CartResponse> {
        c.remove_item(product_id)?;
        CartResponse::new(c, &config.pricing)
    })
}

pub fn clear_cart(cart: &CartState, config: &ConfigState) -> ApiResult<CartResponse> {
    debug!("clear_cart command");

    cart.with_cart_mut(|c| {
        c.clear();
        CartResponse::new(c, &config.pricing)
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::state::test_support::*;

    #[tokio::test]
    async fn test_totals_follow_store_pricing() {
        let state = test_state().await;
        let vendor = signed_in_vendor(&state, "kente@example.com", true).await;
        let stole = listed_product(&state, &vendor, "Kente Stole", 4500, 10).await;

        let response = add_to_cart(&state.db, &state.cart, &state.config, &stole.id, Some(2))
            .await
            .unwrap();

        // 9000 subtotal, 7.5% tax, flat 500 shipping below the 10000 threshold
        assert_eq!(response.totals.subtotal_cents, 9000);
        assert_eq!(response.totals.tax_cents, 675);
        assert_eq!(response.totals.shipping_cents, 500);
        assert_eq!(response.totals.total_cents, 10_175);

        let response = update_cart_item(&state.cart, &state.config, &stole.id, 3).unwrap();
        assert_eq!(response.totals.subtotal_cents, 13_500);
        assert_eq!(response.totals.shipping_cents, 0);
    }

    #[tokio::test]
    async fn test_cannot_add_more_than_stock() {
        let state = test_state().await;
        let vendor = signed_in_vendor(&state, "kente@example.com", true).await;
        let stole = listed_product(&state, &vendor, "Kente Stole", 4500, 2).await;

        add_to_cart(&state.db, &state.cart, &state.config, &stole.id, Some(2))
            .await
            .unwrap();
        let err = add_to_cart(&state.db, &state.cart, &state.config, &stole.id, None)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(get_cart(&state.cart, &state.config).unwrap().totals.total_quantity, 2);
    }

    #[tokio::test]
    async fn test_unknown_product_and_missing_line() {
        let state = test_state().await;

        let err = add_to_cart(&state.db, &state.cart, &state.config, "nope", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = remove_from_cart(&state.cart, &state.config, "nope").unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
    }

    #[tokio::test]
    async fn test_clear_cart() {
        let state = test_state().await;
        let vendor = signed_in_vendor(&state, "kente@example.com", true).await;
        let stole = listed_product(&state, &vendor, "Kente Stole", 4500, 10).await;
        add_to_cart(&state.db, &state.cart, &state.config, &stole.id, None)
            .await
            .unwrap();

        let response = clear_cart(&state.cart, &state.config).unwrap();
        assert!(response.items.is_empty());
        assert_eq!(response.totals.total_cents, 0);
    }
}
