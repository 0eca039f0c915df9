//! # Catalog Commands
//!
//! What shoppers can browse.
//!
//! ## Visibility
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Listed to shoppers  =  product.is_active  AND  vendor.is_approved      │
//! │                                                                         │
//! │  search_products ──► products JOIN vendors (name/category LIKE)         │
//! │  get_product ──────► same rule, by id                                   │
//! │  vendor_storefront ► approved vendor + its active products              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A vendor's own dashboard (vendor.rs) sees deactivated products too.

use std::time::Instant;

use bazaar_core::validation::validate_search_query;
use bazaar_core::{Product, VendorProfile};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::DbState;

/// Default number of search results.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Upper bound on requested search results.
pub const MAX_SEARCH_LIMIT: u32 = 100;

/// A vendor's public page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorStorefront {
    pub vendor: VendorProfile,
    pub products: Vec<Product>,
}

/// Searches listed products by name or category.
///
/// ## Arguments
/// * `query` - Substring to match; empty lists everything
/// * `limit` - Max results (default 20, capped at 100)
pub async fn search_products(
    db: &DbState,
    query: &str,
    limit: Option<u32>,
) -> ApiResult<Vec<Product>> {
    let query = validate_search_query(query)?;
    let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);
    debug!(query = %query, limit, "search_products command");

    let start = Instant::now();
    let products = db.inner().products().search(&query, limit).await?;

    info!(
        query = %query,
        results = products.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Product search"
    );

    Ok(products)
}

/// Gets one listed product.
pub async fn get_product(db: &DbState, product_id: &str) -> ApiResult<Product> {
    debug!(product_id = %product_id, "get_product command");

    db.inner()
        .products()
        .get_listed(product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", product_id))
}

/// An approved vendor and its active products.
pub async fn vendor_storefront(db: &DbState, vendor_id: &str) -> ApiResult<VendorStorefront> {
    debug!(vendor_id = %vendor_id, "vendor_storefront command");

    let vendor = db
        .inner()
        .vendors()
        .get_by_id(vendor_id)
        .await?
        .filter(|v| v.is_approved)
        .ok_or_else(|| ApiError::not_found("Vendor", vendor_id))?;

    let products = db
        .inner()
        .products()
        .list_by_vendor(&vendor.id)
        .await?
        .into_iter()
        .filter(|p| p.is_active)
        .collect();

    Ok(VendorStorefront { vendor, products })
}

/// Approved vendors, by name.
pub async fn list_vendors(db: &DbState) -> ApiResult<Vec<VendorProfile>> {
    debug!("list_vendors command");
    Ok(db.inner().vendors().list_approved().await?)
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
    async fn test_pending_vendor_products_hidden() {
        let state = test_state().await;
        let approved = signed_in_vendor(&state, "kente@example.com", true).await;
        listed_product(&state, &approved, "Kente Stole", 4500, 10).await;
        state.session.inner().sign_out().await.unwrap();

        let pending = signed_in_vendor(&state, "clay@example.com", false).await;
        let hidden = listed_product(&state, &pending, "Kente Bowl", 3000, 10).await;

        let results = search_products(&state.db, "kente", None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Kente Stole");

        let err = get_product(&state.db, &hidden.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = vendor_storefront(&state.db, &pending.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_storefront_skips_deactivated() {
        let state = test_state().await;
        let vendor = signed_in_vendor(&state, "kente@example.com", true).await;
        let keep = listed_product(&state, &vendor, "Kente Stole", 4500, 10).await;
        let gone = listed_product(&state, &vendor, "Kente Runner", 3800, 10).await;
        state
            .db
            .inner()
            .products()
            .soft_delete(&gone.id, &vendor.id)
            .await
            .unwrap();

        let page = vendor_storefront(&state.db, &vendor.id).await.unwrap();
        let ids: Vec<_> = page.products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![keep.id.as_str()]);
    }

    #[tokio::test]
    async fn test_overlong_query_rejected() {
        let state = test_state().await;
        let err = search_products(&state.db, &"x".repeat(101), None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
