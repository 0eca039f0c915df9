//! # Seed Data Generator
//!
//! Populates a storefront database with demo accounts, vendors and products.
//!
//! ## Usage
//! ```bash
//! # Seed the default database from storefront.toml / BAZAAR_DB_PATH
//! cargo run -p bazaar-session --bin seed
//!
//! # Specify database path and admin password
//! cargo run -p bazaar-session --bin seed -- --db ./bazaar_dev.db --admin-password Dara2002
//! ```
//!
//! ## Generated Data
//! - Admin password setting (only if none is set)
//! - One shopper: `shopper@bazaar.test` / `shopper123`
//! - One account per vendor below (`<slug>@bazaar.test` / `vendor123`), each
//!   with an approved vendor row, except the last which stays pending
//! - A handful of products per approved vendor
//!
//! Accounts go through `LocalBackend` so their passwords are hashed exactly
//! as a real sign-up would.

use std::env;

use bazaar_core::{NewProduct, UserProfile, VendorApplication};
use bazaar_db::{Database, DbConfig};
use bazaar_session::{AuthApi, LocalBackend, ProfileApi, StorefrontConfig};
use chrono::Utc;

/// (business name, slug, category, products as (name, price cents, stock))
const VENDORS: &[(&str, &str, &str, &[(&str, i64, i64)])] = &[
    (
        "Kente House",
        "kente",
        "textiles",
        &[
            ("Kente Stole", 4500, 25),
            ("Kente Table Runner", 3800, 12),
            ("Kente Cushion Cover", 2900, 30),
            ("Adinkra Print Scarf", 2200, 40),
        ],
    ),
    (
        "Clay & Kiln",
        "claykiln",
        "ceramics",
        &[
            ("Terracotta Water Pot", 6500, 8),
            ("Glazed Serving Bowl", 3400, 15),
            ("Hand-thrown Mug", 1800, 50),
        ],
    ),
    (
        "Beadwork Collective",
        "beadwork",
        "jewelry",
        &[
            ("Krobo Bead Necklace", 2500, 35),
            ("Recycled Glass Bracelet", 1200, 60),
            ("Brass Bead Earrings", 1500, 45),
            ("Waist Beads Set", 2000, 20),
        ],
    ),
    (
        "Shea Naturals",
        "shea",
        "beauty",
        &[
            ("Raw Shea Butter 250g", 1400, 80),
            ("African Black Soap", 900, 100),
        ],
    ),
    // Left pending so the admin dashboard has something to approve.
    ("Basket Weavers Guild", "baskets", "home", &[]),
];

const DEFAULT_ADMIN_PASSWORD: &str = "Dara2002";
const SHOPPER_EMAIL: &str = "shopper@bazaar.test";
const SHOPPER_PASSWORD: &str = "shopper123";
const VENDOR_PASSWORD: &str = "vendor123";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::load_or_default(None);

    let args: Vec<String> = env::args().collect();
    let mut db_path = config.data.db_path.to_string_lossy().to_string();
    let mut admin_password = DEFAULT_ADMIN_PASSWORD.to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--admin-password" | "-a" => {
                if i + 1 < args.len() {
                    admin_password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bazaar Storefront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>              Database file path");
                println!("  -a, --admin-password <PW>    Admin password (default: {})", DEFAULT_ADMIN_PASSWORD);
                println!("  -h, --help                   Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Bazaar Storefront Seed Data Generator");
    println!("========================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    if db.settings().admin_password().await?.is_none() {
        db.settings().set_admin_password(&admin_password).await?;
        println!("✓ Admin password set");
    } else {
        println!("• Admin password already set, leaving it alone");
    }

    let backend = LocalBackend::new(db.clone(), &config.auth);

    create_account(&backend, SHOPPER_EMAIL, SHOPPER_PASSWORD, "Demo Shopper").await?;
    println!("✓ Shopper {} / {}", SHOPPER_EMAIL, SHOPPER_PASSWORD);

    let mut product_count = 0;
    for (business_name, slug, category, products) in VENDORS {
        let email = format!("{}@bazaar.test", slug);
        let owner = format!("{} Owner", business_name);
        let user = create_account(&backend, &email, VENDOR_PASSWORD, &owner).await?;

        // Vendor rows are owner-only writes; sign in as the owner.
        backend.sign_in_with_password(&email, VENDOR_PASSWORD).await?;
        let vendor = backend
            .insert_vendor(
                &user.id,
                &VendorApplication {
                    business_name: business_name.to_string(),
                    business_email: email.clone(),
                    description: Some(format!("Handmade {} from {}", category, business_name)),
                    ..Default::default()
                },
            )
            .await?;
        backend.sign_out().await?;

        if products.is_empty() {
            println!("✓ Vendor {} (pending approval)", business_name);
            continue;
        }

        db.vendors().set_approved(&vendor.id, true).await?;

        for (name, price_cents, stock) in products.iter() {
            db.products()
                .insert(
                    &vendor.id,
                    &NewProduct {
                        name: name.to_string(),
                        description: None,
                        price_cents: *price_cents,
                        stock: *stock,
                        image_url: None,
                        category: Some(category.to_string()),
                    },
                )
                .await?;
            product_count += 1;
        }

        println!("✓ Vendor {} with {} products", business_name, products.len());
    }

    println!();
    println!("Verifying search...");
    let results = db.products().search("kente", 10).await?;
    println!("  Search 'kente': {} results", results.len());

    println!();
    println!("✓ Seed complete! {} products listed.", product_count);

    Ok(())
}

/// Signs up an account and inserts its profile row.
async fn create_account(
    backend: &LocalBackend,
    email: &str,
    password: &str,
    full_name: &str,
) -> Result<UserProfile, Box<dyn std::error::Error>> {
    let account = backend.sign_up(email, password).await?;
    let now = Utc::now();

    let profile = backend
        .insert_user(&UserProfile {
            id: account.id,
            email: account.email,
            full_name: full_name.to_string(),
            phone: None,
            address: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        })
        .await?;

    Ok(profile)
}
