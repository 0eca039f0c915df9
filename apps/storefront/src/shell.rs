//! # Storefront Shell
//!
//! Line-oriented front end: one command per line, results rendered as text.
//!
//! ## Dispatch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "add 3f2a... 2"                                                        │
//! │        │ split_whitespace                                               │
//! │        ▼                                                                │
//! │  ["add", "3f2a...", "2"] ──► match verb ──► commands::cart::add_to_cart │
//! │                                                  │                      │
//! │                           Ok(CartResponse) ──────┼──► render_cart       │
//! │                           Err(ApiError) ─────────┴──► "✗ <message>"     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Session operations also print their own notice through the console
//! notifier, so a successful sign-in shows "✓ Signed in successfully" before
//! the shell's summary line.

use std::fmt::Write as _;

use bazaar_core::{
    Money, NewProduct, Order, OrderItem, Product, ProfileUpdate, SessionPhase, VendorApplication,
    VendorProfile,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::commands::auth::SessionResponse;
use crate::commands::cart::CartResponse;
use crate::commands::orders::OrderDetail;
use crate::commands::{admin, auth, cart, catalog, config, orders, vendor};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const HELP: &str = "\
Account
  signup <email> <password> <full name...>
  signin <email> <password>
  oauth <google|github>                  start an OAuth sign-in
  oauth-callback <state> <email> <name...>
  signout
  forgot <email>                         send a password recovery link
  inbox                                  show recovery emails
  recover <token>                        follow a recovery link
  reset <new password>
  whoami
  profile <name|phone|address|avatar> <value...>
  refresh
  apply <business email> <business name...>

Shopping
  search [query...]
  product <id>
  vendors
  shop <vendor id>
  cart
  add <product id> [qty]
  update <product id> <qty>
  remove <product id>
  clear
  checkout [shipping address...]
  pay <order id> <payment reference>
  orders
  order <order id>
  cancel <order id>

Vendor dashboard
  vendor products
  vendor add <price cents> <stock> <name...>
  vendor stock <product id> <stock>
  vendor remove <product id>
  vendor sales

Admin dashboard
  admin login <password>
  admin pending
  admin approve <vendor id>
  admin password <new password>
  admin status <order id> <pending|paid|shipped|delivered|cancelled>

  store                                  show store settings
  help
  quit";

/// What the shell should do after a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print this and read the next line.
    Output(String),
    Quit,
}

/// The interactive storefront.
pub struct Shell {
    state: AppState,
}

impl Shell {
    pub fn new(state: AppState) -> Self {
        Shell { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Reads commands from stdin until EOF or `quit`.
    pub async fn run_stdin(&self) -> std::io::Result<()> {
        self.run(BufReader::new(tokio::io::stdin())).await
    }

    /// Reads commands from `input` until EOF or `quit`.
    pub async fn run<R>(&self, input: R) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut stdout = tokio::io::stdout();
        let mut lines = input.lines();

        let banner = format!(
            "Welcome to {}. Type `help` for commands.\n",
            self.state.config.store_name
        );
        stdout.write_all(banner.as_bytes()).await?;

        loop {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match self.execute(&line).await {
                Outcome::Output(text) if text.is_empty() => {}
                Outcome::Output(text) => {
                    stdout.write_all(text.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                }
                Outcome::Quit => break,
            }
        }

        stdout.write_all(b"Goodbye.\n").await?;
        stdout.flush().await
    }

    /// Runs one command line.
    pub async fn execute(&self, line: &str) -> Outcome {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, args)) = words.split_first() else {
            return Outcome::Output(String::new());
        };

        if matches!(verb, "quit" | "exit") {
            return Outcome::Quit;
        }

        debug!(verb = %verb, "shell command");

        match self.dispatch(verb, args).await {
            Ok(text) => Outcome::Output(text),
            Err(e) => Outcome::Output(format!("✗ {}", e.message)),
        }
    }

    async fn dispatch(&self, verb: &str, args: &[&str]) -> ApiResult<String> {
        let s = &self.state;

        match (verb, args) {
            ("help", _) => Ok(HELP.to_string()),
            ("store", _) => {
                let store = config::get_config(&s.config);
                Ok(format!(
                    "{}: tax {:.2}%, shipping {}{}",
                    store.store_name,
                    store.pricing.tax_rate.percentage(),
                    Money::from_cents(store.pricing.shipping_cents),
                    store
                        .pricing
                        .free_shipping_threshold_cents
                        .map(|t| format!(" (free from {})", Money::from_cents(t)))
                        .unwrap_or_default()
                ))
            }

            // -----------------------------------------------------------------
            // Account
            // -----------------------------------------------------------------
            ("signup", [email, password, name @ ..]) if !name.is_empty() => {
                let account = auth::sign_up(&s.session, email, password, &name.join(" ")).await?;
                Ok(format!("Account {} created for {}", account.id, account.email))
            }
            ("signin", [email, password]) => {
                let session = auth::sign_in(&s.session, email, password).await?;
                Ok(render_session(&session))
            }
            ("oauth", [provider]) => {
                let url = auth::sign_in_with_oauth(&s.session, provider).await?;
                Ok(format!("Open {}", url))
            }
            ("oauth-callback", [state, email, name @ ..]) if !name.is_empty() => {
                let session =
                    auth::complete_oauth(&s.session, state, email, &name.join(" ")).await?;
                Ok(render_session(&session))
            }
            ("signout", []) => {
                auth::sign_out(&s.session).await?;
                Ok(String::new())
            }
            ("forgot", [email]) => {
                auth::forgot_password(&s.session, email).await?;
                Ok(String::new())
            }
            ("inbox", []) => {
                let mail = auth::recovery_inbox(&s.session);
                if mail.is_empty() {
                    return Ok("No new mail".to_string());
                }
                let mut out = String::new();
                for m in mail {
                    let _ = writeln!(out, "To {}: reset your password at {}", m.email, m.link);
                    let _ = writeln!(out, "  token {}", m.token);
                }
                Ok(out.trim_end().to_string())
            }
            ("recover", [token]) => {
                let session = auth::open_recovery_link(&s.session, token).await?;
                Ok(format!("{}\nChoose a new password with `reset`", render_session(&session)))
            }
            ("reset", [password]) => {
                auth::reset_password(&s.session, password).await?;
                Ok(String::new())
            }
            ("whoami", []) => Ok(render_session(&auth::get_session(&s.session))),
            ("profile", [field, value @ ..]) if !value.is_empty() => {
                let update = profile_update(field, value.join(" "))?;
                let user = auth::update_profile(&s.session, update).await?;
                Ok(format!(
                    "{} <{}> phone: {} address: {}",
                    user.full_name,
                    user.email,
                    user.phone.as_deref().unwrap_or("-"),
                    user.address.as_deref().unwrap_or("-")
                ))
            }
            ("refresh", []) => Ok(render_session(&auth::refresh_profile(&s.session).await?)),
            ("apply", [business_email, name @ ..]) if !name.is_empty() => {
                let vendor = auth::become_vendor(
                    &s.session,
                    VendorApplication {
                        business_name: name.join(" "),
                        business_email: business_email.to_string(),
                        ..Default::default()
                    },
                )
                .await?;
                Ok(render_vendor(&vendor))
            }

            // -----------------------------------------------------------------
            // Shopping
            // -----------------------------------------------------------------
            ("search", query) => {
                let products = catalog::search_products(&s.db, &query.join(" "), None).await?;
                Ok(render_products(&products))
            }
            ("product", [id]) => {
                let p = catalog::get_product(&s.db, id).await?;
                Ok(format!(
                    "{}\n{} | {} in stock | {}\n{}",
                    p.name,
                    p.price(),
                    p.stock,
                    p.category.as_deref().unwrap_or("uncategorized"),
                    p.description.as_deref().unwrap_or("")
                )
                .trim_end()
                .to_string())
            }
            ("vendors", []) => {
                let vendors = catalog::list_vendors(&s.db).await?;
                Ok(vendors.iter().map(render_vendor).collect::<Vec<_>>().join("\n"))
            }
            ("shop", [vendor_id]) => {
                let page = catalog::vendor_storefront(&s.db, vendor_id).await?;
                Ok(format!(
                    "{}\n{}",
                    page.vendor.business_name,
                    render_products(&page.products)
                ))
            }
            ("cart", []) => Ok(render_cart(&cart::get_cart(&s.cart, &s.config)?)),
            ("add", [id]) => {
                let response = cart::add_to_cart(&s.db, &s.cart, &s.config, id, None).await?;
                Ok(render_cart(&response))
            }
            ("add", [id, qty]) => {
                let qty = parse_int("quantity", qty)?;
                let response = cart::add_to_cart(&s.db, &s.cart, &s.config, id, Some(qty)).await?;
                Ok(render_cart(&response))
            }
            ("update", [id, qty]) => {
                let qty = parse_int("quantity", qty)?;
                Ok(render_cart(&cart::update_cart_item(&s.cart, &s.config, id, qty)?))
            }
            ("remove", [id]) => Ok(render_cart(&cart::remove_from_cart(&s.cart, &s.config, id)?)),
            ("clear", []) => Ok(render_cart(&cart::clear_cart(&s.cart, &s.config)?)),
            ("checkout", address) => {
                let address = address.join(" ");
                let address = (!address.is_empty()).then_some(address.as_str());
                let detail = orders::checkout(&s.db, &s.cart, &s.config, &s.session, address).await?;
                Ok(format!(
                    "{}\nPay with `pay {} <reference>`",
                    render_order_detail(&detail),
                    detail.order.id
                ))
            }
            ("pay", [order_id, reference]) => {
                let order = orders::confirm_payment(&s.db, &s.session, order_id, reference).await?;
                Ok(render_order(&order))
            }
            ("orders", []) => {
                let list = orders::list_my_orders(&s.db, &s.session).await?;
                if list.is_empty() {
                    return Ok("No orders yet".to_string());
                }
                Ok(list.iter().map(render_order).collect::<Vec<_>>().join("\n"))
            }
            ("order", [order_id]) => {
                let detail = orders::get_order(&s.db, &s.session, order_id).await?;
                Ok(render_order_detail(&detail))
            }
            ("cancel", [order_id]) => {
                let order = orders::cancel_order(&s.db, &s.session, order_id).await?;
                Ok(render_order(&order))
            }

            // -----------------------------------------------------------------
            // Vendor dashboard
            // -----------------------------------------------------------------
            ("vendor", ["products"]) => {
                let products = vendor::my_products(&s.db, &s.session).await?;
                Ok(render_products(&products))
            }
            ("vendor", ["add", price, stock, name @ ..]) if !name.is_empty() => {
                let product = vendor::create_product(
                    &s.db,
                    &s.session,
                    NewProduct {
                        name: name.join(" "),
                        price_cents: parse_int("price", price)?,
                        stock: parse_int("stock", stock)?,
                        ..Default::default()
                    },
                )
                .await?;
                Ok(format!("Listed {} ({})", product.name, product.id))
            }
            ("vendor", ["stock", id, stock]) => {
                let stock = parse_int("stock", stock)?;
                let product = vendor::set_stock(&s.db, &s.session, id, stock).await?;
                Ok(format!("{} now has {} in stock", product.name, product.stock))
            }
            ("vendor", ["remove", id]) => {
                vendor::deactivate_product(&s.db, &s.session, id).await?;
                Ok(format!("Product {} deactivated", id))
            }
            ("vendor", ["sales"]) => {
                let lines = vendor::my_order_lines(&s.db, &s.session).await?;
                if lines.is_empty() {
                    return Ok("No sales yet".to_string());
                }
                Ok(lines.iter().map(render_order_item).collect::<Vec<_>>().join("\n"))
            }

            // -----------------------------------------------------------------
            // Admin dashboard
            // -----------------------------------------------------------------
            ("admin", ["login", password]) => {
                auth::admin_login(&s.session, password).await?;
                Ok(String::new())
            }
            ("admin", ["pending"]) => {
                let pending = admin::list_pending_vendors(&s.db, &s.session).await?;
                if pending.is_empty() {
                    return Ok("No vendors awaiting approval".to_string());
                }
                Ok(pending.iter().map(render_vendor).collect::<Vec<_>>().join("\n"))
            }
            ("admin", ["approve", vendor_id]) => {
                let vendor = admin::approve_vendor(&s.db, &s.session, vendor_id).await?;
                Ok(render_vendor(&vendor))
            }
            ("admin", ["password", password]) => {
                admin::set_admin_password(&s.db, &s.session, password).await?;
                Ok("Admin password changed".to_string())
            }
            ("admin", ["status", order_id, status]) => {
                let order = admin::update_order_status(&s.db, &s.session, order_id, status).await?;
                Ok(render_order(&order))
            }

            _ => Err(ApiError::validation(format!(
                "Unknown command or wrong arguments: `{}`. Type `help`.",
                verb
            ))),
        }
    }
}

// =============================================================================
// Parsing
// =============================================================================

fn parse_int(field: &str, raw: &str) -> ApiResult<i64> {
    raw.parse()
        .map_err(|_| ApiError::validation(format!("{} must be a whole number", field)))
}

fn profile_update(field: &str, value: String) -> ApiResult<ProfileUpdate> {
    let mut update = ProfileUpdate::default();
    match field {
        "name" => update.full_name = Some(value),
        "phone" => update.phone = Some(value),
        "address" => update.address = Some(value),
        "avatar" => update.avatar_url = Some(value),
        other => {
            return Err(ApiError::validation(format!(
                "unknown profile field '{}'",
                other
            )))
        }
    }
    Ok(update)
}

// =============================================================================
// Rendering
// =============================================================================

fn render_session(session: &SessionResponse) -> String {
    let mut out = match &session.user {
        Some(user) => format!("Signed in as {} <{}>", user.full_name, user.email),
        None => "Not signed in".to_string(),
    };

    match (session.phase, &session.vendor) {
        (SessionPhase::VendorPending, Some(v)) => {
            let _ = write!(out, " | vendor {} (pending approval)", v.business_name);
        }
        (SessionPhase::VendorApproved, Some(v)) => {
            let _ = write!(out, " | vendor {}", v.business_name);
        }
        _ => {}
    }

    if session.is_admin {
        out.push_str(" | admin");
    }
    out
}

fn render_vendor(vendor: &VendorProfile) -> String {
    format!(
        "{}  {} <{}>{}",
        vendor.id,
        vendor.business_name,
        vendor.business_email,
        if vendor.is_approved { "" } else { " (pending)" }
    )
}

fn render_products(products: &[Product]) -> String {
    if products.is_empty() {
        return "No products found".to_string();
    }

    products
        .iter()
        .map(|p| {
            format!(
                "{}  {:<32} {:>10}  {:>4} left{}",
                p.id,
                p.name,
                p.price().to_string(),
                p.stock,
                if p.is_active { "" } else { "  (inactive)" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_cart(response: &CartResponse) -> String {
    if response.items.is_empty() {
        return "Cart is empty".to_string();
    }

    let mut out = String::new();
    for item in &response.items {
        let _ = writeln!(
            out,
            "{:<32} x{:<4} {:>10}",
            item.name,
            item.quantity,
            item.line_total()
                .map(|total| total.to_string())
                .unwrap_or_default()
        );
    }

    let t = &response.totals;
    let _ = writeln!(out, "{:<38} {:>10}", "Subtotal", Money::from_cents(t.subtotal_cents).to_string());
    let _ = writeln!(out, "{:<38} {:>10}", "Tax", Money::from_cents(t.tax_cents).to_string());
    let _ = writeln!(out, "{:<38} {:>10}", "Shipping", Money::from_cents(t.shipping_cents).to_string());
    let _ = write!(out, "{:<38} {:>10}", "TOTAL", Money::from_cents(t.total_cents).to_string());
    out
}

fn render_order(order: &Order) -> String {
    format!(
        "{}  {:<10} {:>10}  {}",
        order.id,
        order.status.to_string(),
        order.total().to_string(),
        order.created_at.format("%Y-%m-%d %H:%M")
    )
}

fn render_order_item(item: &OrderItem) -> String {
    format!(
        "{}  {:<32} x{:<4} {:>10}",
        item.order_id,
        item.name_snapshot,
        item.quantity,
        Money::from_cents(item.line_total_cents).to_string()
    )
}

fn render_order_detail(detail: &OrderDetail) -> String {
    let mut out = render_order(&detail.order);
    for item in &detail.items {
        let _ = write!(
            out,
            "\n  {:<32} x{:<4} {:>10}",
            item.name_snapshot,
            item.quantity,
            Money::from_cents(item.line_total_cents).to_string()
        );
    }
    if let Some(address) = &detail.order.shipping_address {
        let _ = write!(out, "\n  Ship to: {}", address);
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
