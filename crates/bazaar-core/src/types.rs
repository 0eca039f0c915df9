//! # Domain Types
//!
//! Core domain types used throughout the Bazaar storefront.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Identity (mirrored rows)            Commerce                          │
//! │  ┌─────────────────┐                 ┌─────────────────┐               │
//! │  │  UserProfile    │ 1 ─────── 0..1  │    Product      │               │
//! │  │  ─────────────  │   ┌──────────┐  │  ─────────────  │               │
//! │  │  id (auth uid)  │   │ Vendor   │  │  vendor_id (FK) │               │
//! │  │  email          │──►│ Profile  │─►│  price_cents    │               │
//! │  │  full_name      │   │ approved?│  │  stock          │               │
//! │  └─────────────────┘   └──────────┘  └─────────────────┘               │
//! │                                                                         │
//! │  Auth provider shapes                ┌─────────────────┐               │
//! │  ┌─────────────────┐                 │     Order       │               │
//! │  │ AuthUser        │                 │  status         │               │
//! │  │ AuthSession     │                 │  OrderItem[]    │               │
//! │  │ AuthEvent       │                 │  (snapshots)    │               │
//! │  └─────────────────┘                 └─────────────────┘               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity Rule
//! A `UserProfile.id` is the auth provider's user id. A `VendorProfile` is
//! tied to exactly one user through `user_id` and is only ever held by the
//! session while that user is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 750 bps = 7.5%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// User Profile
// =============================================================================

/// Mirror of a row in the hosted `users` table.
///
/// The session holds a read-through copy. It is only mutated locally after
/// the hosted row has accepted the same write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct UserProfile {
    /// Auth provider user id.
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub avatar_url: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a [`UserProfile`].
///
/// `None` means "leave untouched", so an optional field that is already set
/// (phone, address, avatar) cannot be cleared back to empty through this
/// type. Email and id are not editable here; the email belongs to the auth
/// provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.avatar_url.is_none()
    }

    /// Merges the set fields into `profile`, leaving every other field as is.
    pub fn apply_to(&self, profile: &mut UserProfile) {
        if let Some(full_name) = &self.full_name {
            profile.full_name = full_name.clone();
        }
        if let Some(phone) = &self.phone {
            profile.phone = Some(phone.clone());
        }
        if let Some(address) = &self.address {
            profile.address = Some(address.clone());
        }
        if let Some(avatar_url) = &self.avatar_url {
            profile.avatar_url = Some(avatar_url.clone());
        }
    }
}

// =============================================================================
// Vendor Profile
// =============================================================================

/// Mirror of a row in the hosted `vendors` table.
///
/// ## Lifecycle
/// ```text
///  become_vendor()          admin approval
///  ──────────────► unapproved ─────────────► approved
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct VendorProfile {
    pub id: String,
    pub user_id: String,
    pub business_name: String,
    pub business_email: String,
    pub business_phone: Option<String>,
    pub business_address: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    /// Set out of band by an admin. Never settable by the vendor.
    pub is_approved: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Fields a user submits to become a vendor.
///
/// Carries no approval flag: new vendor rows always start unapproved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VendorApplication {
    pub business_name: String,
    pub business_email: String,
    pub business_phone: Option<String>,
    pub business_address: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A product listed by a vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub vendor_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Price in cents (smallest currency unit).
    pub price_cents: i64,
    pub stock: i64,
    pub image_url: Option<String>,
    pub category: Option<String>,
    /// Soft delete flag.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units can be sold right now.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && self.stock >= quantity
    }
}

/// Fields a vendor submits to list a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i64,
    pub image_url: Option<String>,
    pub category: Option<String>,
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of a customer order.
///
/// ## Transitions
/// ```text
/// Pending ──► Paid ──► Shipped ──► Delivered
///    │          │
///    └──────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created at checkout, awaiting payment.
    Pending,
    /// Payment gateway reported success.
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Returns true when an order may move from `self` to `next`.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Paid, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Paid, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("unknown order status '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A customer order created at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub shipping_address: Option<String>,
    /// Payment gateway reference recorded on success.
    pub payment_reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line in an order.
/// Uses snapshot pattern to freeze product data at time of checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Vendor owning the product (frozen).
    pub vendor_id: String,
    /// Product name at time of checkout (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at time of checkout (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Auth Provider Shapes
// =============================================================================

/// The auth provider's view of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

/// An authenticated provider session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AuthSession {
    pub access_token: String,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

/// OAuth identity providers offered on the sign-in page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
        }
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            other => Err(ValidationError::InvalidFormat {
                field: "provider".to_string(),
                reason: format!("unsupported OAuth provider '{}'", other),
            }),
        }
    }
}

/// Session change pushed by the auth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "event", content = "session", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn(AuthSession),
    SignedOut,
    /// User followed a password recovery link and holds a session again.
    PasswordRecovery(AuthSession),
    UserUpdated(AuthSession),
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> UserProfile {
        UserProfile {
            id: "u-1".to_string(),
            email: "ada@example.com".to_string(),
            full_name: "Ada Obi".to_string(),
            phone: Some("0800".to_string()),
            address: None,
            avatar_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(750);
        assert_eq!(rate.bps(), 750);
        assert!((rate.percentage() - 7.5).abs() < 0.001);
    }

    #[test]
    fn test_profile_update_touches_only_set_fields() {
        let mut user = test_user();
        let update = ProfileUpdate {
            address: Some("12 Marina Road".to_string()),
            ..Default::default()
        };

        update.apply_to(&mut user);

        assert_eq!(user.address.as_deref(), Some("12 Marina Road"));
        assert_eq!(user.full_name, "Ada Obi");
        assert_eq!(user.phone.as_deref(), Some("0800"));
        assert_eq!(user.email, "ada@example.com");
    }

    #[test]
    fn test_profile_update_none_does_not_clear() {
        let mut user = test_user();
        assert_eq!(user.phone.as_deref(), Some("0800"));

        ProfileUpdate::default().apply_to(&mut user);

        assert_eq!(user.phone.as_deref(), Some("0800"));
        assert_eq!(user.full_name, "Ada Obi");
    }

    #[test]
    fn test_profile_update_is_empty() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate {
            phone: Some("1".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_order_status_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Cancelled));

        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
    }

    #[test]
    fn test_order_status_parse() {
        assert_eq!("Paid".parse::<OrderStatus>().unwrap(), OrderStatus::Paid);
        assert!("refunded".parse::<OrderStatus>().is_err());
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_oauth_provider_parse() {
        assert_eq!(
            "google".parse::<OAuthProvider>().unwrap(),
            OAuthProvider::Google
        );
        assert!("myspace".parse::<OAuthProvider>().is_err());
    }

    #[test]
    fn test_product_can_sell() {
        let product = Product {
            id: "p-1".to_string(),
            vendor_id: "v-1".to_string(),
            name: "Adire Scarf".to_string(),
            description: None,
            price_cents: 4500,
            stock: 2,
            image_url: None,
            category: Some("fashion".to_string()),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(product.can_sell(2));
        assert!(!product.can_sell(3));
    }
}
