//! # Order Repository
//!
//! Checkout and order lifecycle.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CHECKOUT (one transaction)                                         │
//! │     └── create_from_cart() → Order { status: Pending }                 │
//! │         ├── decrement stock per line (fails if it would go negative)   │
//! │         ├── insert order row with totals                               │
//! │         └── insert order_items with name/price snapshots               │
//! │                                                                         │
//! │  2. PAYMENT CALLBACK                                                   │
//! │     └── mark_paid(reference) → Order { status: Paid }                  │
//! │                                                                         │
//! │  3. FULFILMENT                                                         │
//! │     └── update_status(Shipped) → update_status(Delivered)              │
//! │                                                                         │
//! │  (OPTIONAL) CANCEL from Pending or Paid                                │
//! │     └── update_status(Cancelled) → stock restored in same transaction  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bazaar_core::{Cart, CartTotals, CoreError, Order, OrderItem, OrderStatus};
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const ORDER_COLUMNS: &str = r#"
    id, user_id, status, subtotal_cents, tax_cents, shipping_cents, total_cents,
    shipping_address, payment_reference, created_at, updated_at
"#;

const ITEM_COLUMNS: &str = r#"
    id, order_id, product_id, vendor_id, name_snapshot, unit_price_cents,
    quantity, line_total_cents, created_at
"#;

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Turns a cart into a pending order.
    ///
    /// Stock is decremented for every line in the same transaction as the
    /// order insert. If any line no longer has enough stock (or was
    /// deactivated), nothing is written.
    ///
    /// ## Returns
    /// * `Err(DbError::Domain(CoreError::EmptyCart))`
    /// * `Err(DbError::Domain(CoreError::ProductNotFound))`
    /// * `Err(DbError::Domain(CoreError::InsufficientStock))`
    pub async fn create_from_cart(
        &self,
        user_id: &str,
        cart: &Cart,
        totals: &CartTotals,
        shipping_address: Option<&str>,
    ) -> DbResult<Order> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            status: OrderStatus::Pending,
            subtotal_cents: totals.subtotal_cents,
            tax_cents: totals.tax_cents,
            shipping_cents: totals.shipping_cents,
            total_cents: totals.total_cents,
            shipping_address: shipping_address.map(str::to_string),
            payment_reference: None,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %order.id, lines = cart.item_count(), "Creating order");

        let mut tx = self.pool.begin().await?;

        for item in &cart.items {
            let row: Option<(i64, bool)> =
                sqlx::query_as("SELECT stock, is_active FROM products WHERE id = ?1")
                    .bind(&item.product_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            match row {
                Some((_, false)) | None => {
                    return Err(CoreError::ProductNotFound(item.product_id.clone()).into())
                }
                Some((stock, true)) if stock < item.quantity => {
                    return Err(CoreError::InsufficientStock {
                        product: item.name.clone(),
                        available: stock,
                        requested: item.quantity,
                    }
                    .into())
                }
                Some(_) => {}
            }

            sqlx::query("UPDATE products SET stock = stock - ?2, updated_at = ?3 WHERE id = ?1")
                .bind(&item.product_id)
                .bind(item.quantity)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, status, subtotal_cents, tax_cents, shipping_cents,
                total_cents, shipping_address, payment_reference, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(order.status)
        .bind(order.subtotal_cents)
        .bind(order.tax_cents)
        .bind(order.shipping_cents)
        .bind(order.total_cents)
        .bind(&order.shipping_address)
        .bind(&order.payment_reference)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in &cart.items {
            let line_total = item.line_total()?;
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, vendor_id, name_snapshot,
                    unit_price_cents, quantity, line_total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&order.id)
            .bind(&item.product_id)
            .bind(&item.vendor_id)
            .bind(&item.name)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(line_total.cents())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(id = %order.id, total_cents = order.total_cents, "Order created");
        Ok(order)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE id = ?1",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {} FROM order_items WHERE order_id = ?1 ORDER BY name_snapshot",
            ITEM_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// A shopper's orders, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE user_id = ?1 ORDER BY created_at DESC",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Order lines for a vendor's products, newest first.
    pub async fn list_items_for_vendor(&self, vendor_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {} FROM order_items WHERE vendor_id = ?1 ORDER BY created_at DESC",
            ITEM_COLUMNS
        ))
        .bind(vendor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Records the payment gateway's success callback.
    pub async fn mark_paid(&self, id: &str, payment_reference: &str) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;
        let current = Self::status_in(&mut tx, id).await?;
        Self::check_transition(id, current, OrderStatus::Paid)?;

        sqlx::query(
            r#"
            UPDATE orders SET status = ?2, payment_reference = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(OrderStatus::Paid)
        .bind(payment_reference)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(id = %id, "Order paid");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    /// Moves an order forward. Cancelling puts the stock back.
    pub async fn update_status(&self, id: &str, next: OrderStatus) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;
        let current = Self::status_in(&mut tx, id).await?;
        Self::check_transition(id, current, next)?;

        let now = Utc::now();

        if next == OrderStatus::Cancelled {
            sqlx::query(
                r#"
                UPDATE products SET
                    stock = stock + (
                        SELECT COALESCE(SUM(oi.quantity), 0) FROM order_items oi
                        WHERE oi.order_id = ?1 AND oi.product_id = products.id
                    ),
                    updated_at = ?2
                WHERE id IN (SELECT product_id FROM order_items WHERE order_id = ?1)
                "#,
            )
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(next)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(id = %id, from = %current, to = %next, "Order status changed");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    async fn status_in(tx: &mut Transaction<'_, Sqlite>, id: &str) -> DbResult<OrderStatus> {
        let status: Option<OrderStatus> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;

        status.ok_or_else(|| DbError::not_found("Order", id))
    }

    fn check_transition(id: &str, current: OrderStatus, next: OrderStatus) -> DbResult<()> {
        if current.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::InvalidOrderTransition {
                order_id: id.to_string(),
                current: current.to_string(),
                requested: next.to_string(),
            }
            .into())
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{seed_product, seed_user, seed_vendor, test_db};
    use bazaar_core::cart::PricingRules;
    use bazaar_core::TaxRate;

    fn rules() -> PricingRules {
        PricingRules {
            tax_rate: TaxRate::from_bps(750),
            shipping_cents: 500,
            free_shipping_threshold_cents: None,
        }
    }

    #[tokio::test]
    async fn test_checkout_snapshots_and_decrements_stock() {
        let db = test_db().await;
        let vendor = seed_vendor(&db, "v@example.com", true).await;
        let shopper = seed_user(&db, "s@example.com").await;
        let pot = seed_product(&db, &vendor.id, "Clay Pot", 3000, 5).await;

        let mut cart = Cart::new();
        cart.add_item(&pot, 2).unwrap();
        let totals = cart.totals(&rules()).unwrap();

        let order = db
            .orders()
            .create_from_cart(&shopper.id, &cart, &totals, Some("1 Broad St"))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_cents, 6000 + 450 + 500);

        let items = db.orders().get_items(&order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name_snapshot, "Clay Pot");
        assert_eq!(items[0].line_total_cents, 6000);
        assert_eq!(items[0].vendor_id, vendor.id);

        let stock = db.products().get_by_id(&pot.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 3);

        assert_eq!(db.orders().list_for_user(&shopper.id).await.unwrap().len(), 1);
        assert_eq!(
            db.orders()
                .list_items_for_vendor(&vendor.id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_checkout_rolls_back_when_stock_runs_out() {
        let db = test_db().await;
        let vendor = seed_vendor(&db, "v@example.com", true).await;
        let shopper = seed_user(&db, "s@example.com").await;
        let pot = seed_product(&db, &vendor.id, "Clay Pot", 3000, 5).await;
        let bead = seed_product(&db, &vendor.id, "Bead", 100, 5).await;

        let mut cart = Cart::new();
        cart.add_item(&pot, 1).unwrap();
        cart.add_item(&bead, 4).unwrap();

        // Someone else bought the beads meanwhile.
        db.products().set_stock(&bead.id, &vendor.id, 1).await.unwrap();

        let result = db
            .orders()
            .create_from_cart(&shopper.id, &cart, &cart.totals(&rules()).unwrap(), None)
            .await;

        assert!(matches!(
            result,
            Err(DbError::Domain(CoreError::InsufficientStock { available: 1, .. }))
        ));
        let pot_stock = db.products().get_by_id(&pot.id).await.unwrap().unwrap().stock;
        assert_eq!(pot_stock, 5);
        assert!(db.orders().list_for_user(&shopper.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_checkout() {
        let db = test_db().await;
        let shopper = seed_user(&db, "s@example.com").await;
        let cart = Cart::new();

        let result = db
            .orders()
            .create_from_cart(&shopper.id, &cart, &cart.totals(&rules()).unwrap(), None)
            .await;
        assert!(matches!(result, Err(DbError::Domain(CoreError::EmptyCart))));
    }

    #[tokio::test]
    async fn test_payment_then_forward_only_transitions() {
        let db = test_db().await;
        let vendor = seed_vendor(&db, "v@example.com", true).await;
        let shopper = seed_user(&db, "s@example.com").await;
        let pot = seed_product(&db, &vendor.id, "Clay Pot", 3000, 5).await;

        let mut cart = Cart::new();
        cart.add_item(&pot, 1).unwrap();
        let order = db
            .orders()
            .create_from_cart(&shopper.id, &cart, &cart.totals(&rules()).unwrap(), None)
            .await
            .unwrap();

        let paid = db.orders().mark_paid(&order.id, "PSK_ref_123").await.unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(paid.payment_reference.as_deref(), Some("PSK_ref_123"));

        assert!(matches!(
            db.orders().mark_paid(&order.id, "again").await,
            Err(DbError::Domain(CoreError::InvalidOrderTransition { .. }))
        ));

        let shipped = db
            .orders()
            .update_status(&order.id, OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);

        assert!(db
            .orders()
            .update_status(&order.id, OrderStatus::Cancelled)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let db = test_db().await;
        let vendor = seed_vendor(&db, "v@example.com", true).await;
        let shopper = seed_user(&db, "s@example.com").await;
        let pot = seed_product(&db, &vendor.id, "Clay Pot", 3000, 5).await;

        let mut cart = Cart::new();
        cart.add_item(&pot, 3).unwrap();
        let order = db
            .orders()
            .create_from_cart(&shopper.id, &cart, &cart.totals(&rules()).unwrap(), None)
            .await
            .unwrap();

        db.orders()
            .update_status(&order.id, OrderStatus::Cancelled)
            .await
            .unwrap();

        let stock = db.products().get_by_id(&pot.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 5);
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let db = test_db().await;
        assert!(matches!(
            db.orders().update_status("ghost", OrderStatus::Paid).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
