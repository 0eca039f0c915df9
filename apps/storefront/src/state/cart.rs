//! # Cart State
//!
//! Holds the shopper's cart between commands.
//!
//! ## Thread Safety
//! The cart sits behind a `Mutex`: several commands may touch it, and only
//! one may modify it at a time. Cart math itself lives in `bazaar_core::Cart`.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Shell Command          Command Function         Cart State Change      │
//! │  ─────────────          ────────────────         ─────────────────      │
//! │                                                                         │
//! │  add <id> [qty] ──────► add_to_cart() ─────────► items.push(item)      │
//! │  update <id> <qty> ───► update_cart_item() ────► items[i].qty = n      │
//! │  remove <id> ─────────► remove_from_cart() ────► items.remove(i)       │
//! │  clear ───────────────► clear_cart() ──────────► items.clear()         │
//! │  checkout ────────────► checkout() ────────────► items.clear() on ok   │
//! │  cart ────────────────► get_cart() ────────────► (read only)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Mutex, MutexGuard};

use bazaar_core::Cart;

/// Thread-safe wrapper for the current cart.
#[derive(Debug)]
pub struct CartState {
    cart: Mutex<Cart>,
}

impl CartState {
    /// Creates a new empty cart state.
    pub fn new() -> Self {
        CartState {
            cart: Mutex::new(Cart::new()),
        }
    }

    /// Executes a function with read access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let totals = cart_state.with_cart(|cart| cart.totals(&rules))?;
    /// ```
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.lock();
        f(&cart)
    }

    /// Executes a function with write access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// cart_state.with_cart_mut(|cart| cart.add_item(&product, 1))?;
    /// ```
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.lock();
        f(&mut cart)
    }

    // Cart edits are all-or-nothing; a poisoned lock still holds a whole cart.
    fn lock(&self) -> MutexGuard<'_, Cart> {
        self.cart
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for CartState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::Product;
    use chrono::Utc;

    fn test_product(id: &str, price_cents: i64) -> Product {
        Product {
            id: id.to_string(),
            vendor_id: "vendor-1".to_string(),
            name: format!("Product {}", id),
            description: None,
            price_cents,
            stock: 50,
            image_url: None,
            category: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cart_state_edits_are_visible() {
        let state = CartState::new();
        let product = test_product("1", 999);

        state.with_cart_mut(|c| c.add_item(&product, 2)).unwrap();

        assert_eq!(state.with_cart(|c| c.total_quantity()), 2);
        assert_eq!(state.with_cart(|c| c.subtotal().unwrap().cents()), 1998);
    }

    #[test]
    fn test_failed_edit_leaves_cart_unchanged() {
        let state = CartState::new();
        let product = test_product("1", 999);

        state.with_cart_mut(|c| c.add_item(&product, 2)).unwrap();
        assert!(state.with_cart_mut(|c| c.add_item(&product, 100)).is_err());

        assert_eq!(state.with_cart(|c| c.total_quantity()), 2);
    }
}
