//! # Cart
//!
//! The shopper's cart and its totals.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Shopper Action           Operation               Cart Change           │
//! │  ──────────────           ─────────               ───────────           │
//! │                                                                         │
//! │  Add to cart ────────────► add_item() ──────────► push / qty += n      │
//! │  Change quantity ────────► update_quantity() ───► items[i].qty = n     │
//! │  Remove ─────────────────► remove_item() ───────► items.remove(i)      │
//! │  Checkout done ──────────► clear() ─────────────► items.clear()        │
//! │  View cart ──────────────► totals(&rules) ──────► (read only)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Totals
//! ```text
//! subtotal = Σ unit_price × qty           (prices frozen at add time)
//! tax      = subtotal × store rate        (round half up)
//! shipping = flat fee, 0 when subtotal >= free-shipping threshold, 0 if empty
//! total    = subtotal + tax + shipping
//! ```
//!
//! Every sum and product is checked. A cart whose total would not fit is
//! refused at `add_item` / `update_quantity` with `CoreError::AmountOverflow`
//! and left as it was.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Product, TaxRate};
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Item
// =============================================================================

/// An item in the shopping cart.
///
/// `unit_price_cents` is captured when the product is added. If the vendor
/// changes the price afterwards, the cart keeps the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub vendor_id: String,
    /// Product name at time of adding (frozen)
    pub name: String,
    /// Price in cents at time of adding (frozen)
    pub unit_price_cents: i64,
    pub quantity: i64,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartItem {
            product_id: product.id.clone(),
            vendor_id: product.vendor_id.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            added_at: Utc::now(),
        }
    }

    /// Unit price × quantity.
    pub fn line_total(&self) -> CoreResult<Money> {
        Money::from_cents(self.unit_price_cents)
            .checked_mul(self.quantity)
            .ok_or(CoreError::AmountOverflow)
    }
}

// =============================================================================
// Pricing Rules
// =============================================================================

/// Store-wide pricing applied on top of the cart subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingRules {
    pub tax_rate: TaxRate,
    /// Flat shipping fee in cents.
    pub shipping_cents: i64,
    /// Subtotal at or above which shipping is free. `None` never waives it.
    pub free_shipping_threshold_cents: Option<i64>,
}

impl Default for PricingRules {
    fn default() -> Self {
        PricingRules {
            tax_rate: TaxRate::zero(),
            shipping_cents: 0,
            free_shipping_threshold_cents: None,
        }
    }
}

impl PricingRules {
    fn shipping_for(&self, subtotal: Money) -> Money {
        if subtotal.is_zero() {
            return Money::zero();
        }
        match self.free_shipping_threshold_cents {
            Some(threshold) if subtotal.cents() >= threshold => Money::zero(),
            _ => Money::from_cents(self.shipping_cents),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding the same product increases quantity)
/// - Every quantity is in `1..=MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_ITEMS` lines
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<CartItem>,
    /// When the cart was created/last cleared
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds a product or increases its quantity if already present.
    ///
    /// ## Errors
    /// - `ProductNotFound` when the product is no longer listed
    /// - `QuantityTooLarge` when the line would exceed 999
    /// - `InsufficientStock` when the line would exceed current stock
    /// - `CartTooLarge` when a new line would exceed 100 lines
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if !product.is_active {
            return Err(CoreError::ProductNotFound(product.id.clone()));
        }

        let existing = self
            .items
            .iter()
            .position(|i| i.product_id == product.id);

        let new_qty = match existing {
            Some(idx) => self.items[idx].quantity + quantity,
            None => quantity,
        };

        if new_qty > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: new_qty,
                max: MAX_ITEM_QUANTITY,
            });
        }

        if !product.can_sell(new_qty) {
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
                requested: new_qty,
            });
        }

        match existing {
            Some(idx) => {
                let previous = self.items[idx].quantity;
                self.items[idx].quantity = new_qty;
                if let Err(e) = self.subtotal() {
                    self.items[idx].quantity = previous;
                    return Err(e);
                }
            }
            None => {
                if self.items.len() >= MAX_CART_ITEMS {
                    return Err(CoreError::CartTooLarge {
                        max: MAX_CART_ITEMS,
                    });
                }
                self.items.push(CartItem::from_product(product, quantity));
                if let Err(e) = self.subtotal() {
                    self.items.pop();
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Sets the quantity of a line. Zero removes it.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }

        validate_quantity(quantity)?;

        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::NotInCart(product_id.to_string()))?;
        let previous = std::mem::replace(&mut item.quantity, quantity);

        if let Err(e) = self.subtotal() {
            if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
                item.quantity = previous;
            }
            return Err(e);
        }
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.items.len();
        self.items.retain(|i| i.product_id != product_id);

        if self.items.len() == initial_len {
            Err(CoreError::NotInCart(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.created_at = Utc::now();
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn subtotal(&self) -> CoreResult<Money> {
        self.items.iter().try_fold(Money::zero(), |acc, item| {
            acc.checked_add(item.line_total()?)
                .ok_or(CoreError::AmountOverflow)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Computes the full totals under `rules`.
    ///
    /// ## Errors
    /// - `AmountOverflow` when any line or the grand total does not fit
    pub fn totals(&self, rules: &PricingRules) -> CoreResult<CartTotals> {
        let subtotal = self.subtotal()?;
        let tax = subtotal.calculate_tax(rules.tax_rate);
        let shipping = rules.shipping_for(subtotal);

        let total = subtotal
            .checked_add(tax)
            .and_then(|t| t.checked_add(shipping))
            .ok_or(CoreError::AmountOverflow)?;

        Ok(CartTotals {
            item_count: self.item_count(),
            total_quantity: self.total_quantity(),
            subtotal_cents: subtotal.cents(),
            tax_cents: tax.cents(),
            shipping_cents: shipping.cents(),
            total_cents: total.cents(),
        })
    }
}

/// Cart totals summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
