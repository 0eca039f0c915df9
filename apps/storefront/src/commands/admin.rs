//! # Admin Dashboard Commands
//!
//! Every command here requires the session's admin flag, granted by
//! `admin_login` (auth.rs) and kept across restarts.
//!
//! ## Security
//! The admin password is a plaintext value in the `settings` table, compared
//! by exact equality. It gates the dashboard in this client only; anyone with
//! database access can read it.

use bazaar_core::validation::validate_password;
use bazaar_core::{Order, OrderStatus, VendorProfile, MIN_PASSWORD_LENGTH};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::{DbState, SessionState};

/// Vendors awaiting approval, oldest first.
pub async fn list_pending_vendors(
    db: &DbState,
    session: &SessionState,
) -> ApiResult<Vec<VendorProfile>> {
    session.require_admin()?;
    debug!("list_pending_vendors command");

    Ok(db.inner().vendors().list_pending().await?)
}

/// Approves a vendor so its products are listed.
pub async fn approve_vendor(
    db: &DbState,
    session: &SessionState,
    vendor_id: &str,
) -> ApiResult<VendorProfile> {
    session.require_admin()?;
    debug!(vendor_id = %vendor_id, "approve_vendor command");

    db.inner().vendors().set_approved(vendor_id, true).await?;
    info!(vendor_id = %vendor_id, "Vendor approved");

    db.inner()
        .vendors()
        .get_by_id(vendor_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Vendor", vendor_id))
}

/// Replaces the admin password setting.
pub async fn set_admin_password(
    db: &DbState,
    session: &SessionState,
    new_password: &str,
) -> ApiResult<()> {
    session.require_admin()?;
    debug!("set_admin_password command");

    validate_password(new_password, MIN_PASSWORD_LENGTH)?;
    db.inner().settings().set_admin_password(new_password).await?;

    info!("Admin password changed");
    Ok(())
}

/// Moves any order forward (ship, deliver, cancel).
pub async fn update_order_status(
    db: &DbState,
    session: &SessionState,
    order_id: &str,
    status: &str,
) -> ApiResult<Order> {
    session.require_admin()?;
    debug!(order_id = %order_id, status = %status, "update_order_status command");

    let next: OrderStatus = status.parse()?;
    Ok(db.inner().orders().update_status(order_id, next).await?)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{cart, orders};
    use crate::error::ErrorCode;
    use crate::state::test_support::*;

    #[tokio::test]
    async fn test_requires_admin_flag() {
        let state = test_state().await;

        let err = list_pending_vendors(&state.db, &state.session)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        state
            .session
            .inner()
            .admin_login(ADMIN_PASSWORD)
            .await
            .unwrap();
        assert!(list_pending_vendors(&state.db, &state.session)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_approve_pending_vendor() {
        let state = test_state().await;
        let vendor = signed_in_vendor(&state, "kente@example.com", false).await;
        state
            .session
            .inner()
            .admin_login(ADMIN_PASSWORD)
            .await
            .unwrap();

        let pending = list_pending_vendors(&state.db, &state.session).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, vendor.id);

        let approved = approve_vendor(&state.db, &state.session, &vendor.id)
            .await
            .unwrap();
        assert!(approved.is_approved);
        assert!(list_pending_vendors(&state.db, &state.session)
            .await
            .unwrap()
            .is_empty());

        let err = approve_vendor(&state.db, &state.session, "missing")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_change_admin_password() {
        let state = test_state().await;
        let store = state.session.inner();
        store.admin_login(ADMIN_PASSWORD).await.unwrap();

        let err = set_admin_password(&state.db, &state.session, "abc")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        set_admin_password(&state.db, &state.session, "Kofi2024")
            .await
            .unwrap();
        store.sign_out().await.unwrap();

        assert!(store.admin_login(ADMIN_PASSWORD).await.is_err());
        store.admin_login("Kofi2024").await.unwrap();
        assert!(store.is_admin());
    }

    #[tokio::test]
    async fn test_ship_and_deliver_order() {
        let state = test_state().await;
        let vendor = signed_in_vendor(&state, "kente@example.com", true).await;
        let product = listed_product(&state, &vendor, "Kente Stole", 4500, 5).await;
        state.session.inner().sign_out().await.unwrap();

        signed_in(&state, "ada@example.com").await;
        cart::add_to_cart(&state.db, &state.cart, &state.config, &product.id, None)
            .await
            .unwrap();
        let detail = orders::checkout(&state.db, &state.cart, &state.config, &state.session, None)
            .await
            .unwrap();
        let order_id = detail.order.id;

        state
            .session
            .inner()
            .admin_login(ADMIN_PASSWORD)
            .await
            .unwrap();

        // Pending orders must be paid before they ship.
        let err = update_order_status(&state.db, &state.session, &order_id, "shipped")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        orders::confirm_payment(&state.db, &state.session, &order_id, "PSK-9")
            .await
            .unwrap();
        let shipped = update_order_status(&state.db, &state.session, &order_id, "shipped")
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);

        let delivered = update_order_status(&state.db, &state.session, &order_id, "Delivered")
            .await
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);

        let err = update_order_status(&state.db, &state.session, &order_id, "lost")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
