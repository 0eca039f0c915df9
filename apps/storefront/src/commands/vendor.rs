//! # Vendor Dashboard Commands
//!
//! Product management and sales for the signed-in vendor.
//!
//! ## Access
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  session.vendor                                                         │
//! │     │                                                                   │
//! │     ├── None ───────────────────────────────► Forbidden                 │
//! │     │                                                                   │
//! │     ├── is_approved = false ──► refresh_profile                         │
//! │     │                              │                                    │
//! │     │                              ├── still pending ──► Forbidden      │
//! │     │                              └── approved ───────┐                │
//! │     │                                                  ▼                │
//! │     └── is_approved = true ─────────────────────► run the command       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Product writes are scoped by vendor id in SQL, so a vendor can never touch
//! another vendor's products even with a guessed id.

use bazaar_core::validation::{validate_new_product, validate_stock};
use bazaar_core::{CoreError, NewProduct, OrderItem, Product, VendorProfile};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::{DbState, SessionState};

/// All of the vendor's products, including deactivated ones.
pub async fn my_products(db: &DbState, session: &SessionState) -> ApiResult<Vec<Product>> {
    let vendor = approved_vendor(session).await?;
    debug!(vendor_id = %vendor.id, "my_products command");

    Ok(db.inner().products().list_by_vendor(&vendor.id).await?)
}

/// Lists a new product.
pub async fn create_product(
    db: &DbState,
    session: &SessionState,
    product: NewProduct,
) -> ApiResult<Product> {
    let vendor = approved_vendor(session).await?;
    debug!(vendor_id = %vendor.id, name = %product.name, "create_product command");

    validate_new_product(&product)?;
    let created = db.inner().products().insert(&vendor.id, &product).await?;

    info!(vendor_id = %vendor.id, product_id = %created.id, "Product listed");
    Ok(created)
}

/// Sets the stock level of one of the vendor's products.
pub async fn set_stock(
    db: &DbState,
    session: &SessionState,
    product_id: &str,
    stock: i64,
) -> ApiResult<Product> {
    let vendor = approved_vendor(session).await?;
    debug!(vendor_id = %vendor.id, product_id = %product_id, stock, "set_stock command");

    validate_stock(stock)?;
    db.inner()
        .products()
        .set_stock(product_id, &vendor.id, stock)
        .await?;

    db.inner()
        .products()
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", product_id))
}

/// Takes a product off the storefront. Past order lines keep referencing it.
pub async fn deactivate_product(
    db: &DbState,
    session: &SessionState,
    product_id: &str,
) -> ApiResult<()> {
    let vendor = approved_vendor(session).await?;
    debug!(vendor_id = %vendor.id, product_id = %product_id, "deactivate_product command");

    db.inner()
        .products()
        .soft_delete(product_id, &vendor.id)
        .await?;

    info!(vendor_id = %vendor.id, product_id = %product_id, "Product deactivated");
    Ok(())
}

/// Order lines for the vendor's products, newest first.
pub async fn my_order_lines(db: &DbState, session: &SessionState) -> ApiResult<Vec<OrderItem>> {
    let vendor = approved_vendor(session).await?;
    debug!(vendor_id = %vendor.id, "my_order_lines command");

    Ok(db.inner().orders().list_items_for_vendor(&vendor.id).await?)
}

/// The signed-in user's vendor row, if approved.
///
/// A pending row is re-read once so an approval granted since sign-in is
/// picked up without signing in again.
async fn approved_vendor(session: &SessionState) -> ApiResult<VendorProfile> {
    let vendor = session.require_vendor()?;
    if vendor.is_approved {
        return Ok(vendor);
    }

    session.inner().refresh_profile().await?;
    match session.require_vendor()? {
        vendor if vendor.is_approved => Ok(vendor),
        _ => Err(CoreError::VendorNotApproved.into()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
