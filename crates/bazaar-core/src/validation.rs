//! # Validation Module
//!
//! Input validation for storefront operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront command (apps/storefront)                         │
//! │  └── Parses arguments into typed values                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rule validation (lengths, ranges, formats)               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Backend / database                                           │
//! │  ├── UNIQUE (one account per email, one vendor per user)               │
//! │  └── Foreign keys and CHECK constraints                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bazaar_core::validation::{validate_email, validate_quantity};
//!
//! assert!(validate_email("ada@example.com").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! ```

use crate::error::ValidationError;
use crate::types::{NewProduct, ProfileUpdate, VendorApplication};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// ## Rules
/// - Must not be empty, at most 254 characters
/// - Exactly one `@` with a non-empty local part
/// - Domain contains a dot that is neither first nor last
///
/// Deliverability is the auth provider's problem.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    required("email", email, 254)?;

    let email = email.trim();
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("missing '@'"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must look like name@domain.tld"));
    }

    if domain.starts_with('.') || domain.ends_with('.') || !domain.contains('.') {
        return Err(invalid("domain must contain a dot"));
    }

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    Ok(())
}

/// Validates a password against the minimum length.
pub fn validate_password(password: &str, min_length: usize) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password.chars().count() < min_length {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: min_length,
        });
    }

    Ok(())
}

/// Validates a person's display name.
pub fn validate_full_name(name: &str) -> ValidationResult<()> {
    required("full_name", name, 120)
}

/// Validates a partial profile update.
///
/// ## Rules
/// - At least one field set
/// - `full_name`, when set, must not be blank
pub fn validate_profile_update(update: &ProfileUpdate) -> ValidationResult<()> {
    if update.is_empty() {
        return Err(ValidationError::EmptyUpdate);
    }

    if let Some(name) = &update.full_name {
        validate_full_name(name)?;
    }

    Ok(())
}

/// Validates a become-vendor request.
pub fn validate_vendor_application(app: &VendorApplication) -> ValidationResult<()> {
    required("business_name", &app.business_name, 120)?;
    validate_email(&app.business_email).map_err(|err| match err {
        ValidationError::Required { .. } => ValidationError::Required {
            field: "business_email".to_string(),
        },
        ValidationError::InvalidFormat { reason, .. } => ValidationError::InvalidFormat {
            field: "business_email".to_string(),
            reason,
        },
        other => other,
    })?;
    Ok(())
}

/// Validates a product name.
///
/// ## Example
/// ```rust
/// use bazaar_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Adire Scarf").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required("name", name, 200)
}

/// Validates a new product listing.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    validate_price_cents(product.price_cents)?;
    validate_stock(product.stock)?;
    Ok(())
}

/// Validates a search query and returns it trimmed.
///
/// Empty is allowed (lists everything).
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Zero is allowed (free items)
/// - Must not exceed MAX_PRICE_CENTS
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a stock level. Zero is allowed (sold out).
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more line fits in the cart.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use bazaar_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("  ada@shop.co.uk ").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("ada.example.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ada@example").is_err());
        assert!(validate_email("ada@@example.com").is_err());
        assert!(validate_email("ada b@example.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret", 6).is_ok());
        assert!(matches!(
            validate_password("abc", 6),
            Err(ValidationError::TooShort { min: 6, .. })
        ));
        assert!(matches!(
            validate_password("", 6),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_profile_update() {
        assert!(matches!(
            validate_profile_update(&ProfileUpdate::default()),
            Err(ValidationError::EmptyUpdate)
        ));

        let blank_name = ProfileUpdate {
            full_name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(validate_profile_update(&blank_name).is_err());

        let phone = ProfileUpdate {
            phone: Some("0803".to_string()),
            ..Default::default()
        };
        assert!(validate_profile_update(&phone).is_ok());
    }

    #[test]
    fn test_validate_vendor_application() {
        let mut app = VendorApplication {
            business_name: "Kente House".to_string(),
            business_email: "sales@kente.example".to_string(),
            ..Default::default()
        };
        assert!(validate_vendor_application(&app).is_ok());

        app.business_email = "nope".to_string();
        match validate_vendor_application(&app) {
            Err(ValidationError::InvalidFormat { field, .. }) => {
                assert_eq!(field, "business_email")
            }
            other => panic!("unexpected: {:?}", other),
        }

        app.business_name.clear();
        assert!(validate_vendor_application(&app).is_err());
    }

    #[test]
    fn test_validate_new_product() {
        let mut product = NewProduct {
            name: "Shea Butter 250g".to_string(),
            price_cents: 1200,
            stock: 10,
            ..Default::default()
        };
        assert!(validate_new_product(&product).is_ok());

        product.stock = -1;
        assert!(validate_new_product(&product).is_err());

        product.stock = 0;
        product.price_cents = -5;
        assert!(validate_new_product(&product).is_err());
    }

    #[test]
    fn test_validate_price_ceiling() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(MAX_PRICE_CENTS).is_ok());

        assert!(validate_price_cents(MAX_PRICE_CENTS + 1).is_err());
        assert!(validate_price_cents(i64::MAX / 2 + 1).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  scarf ").unwrap(), "scarf");
        assert!(validate_search_query(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(750).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
