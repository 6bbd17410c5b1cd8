//! # Seed Data Generator
//!
//! Populates the database with demo clients, stock and orders for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default development database
//! cargo run -p meridian-db --bin seed
//!
//! # Specify database path
//! cargo run -p meridian-db --bin seed -- --db ./data/meridian.db
//!
//! # Generate a custom number of orders
//! cargo run -p meridian-db --bin seed -- --orders 50
//! ```
//!
//! ## Generated Data
//! - A handful of clients (people and companies)
//! - A warehouse snapshot imported through the real reconciliation path,
//!   with markup rules pricing the stock
//! - Orders with line items and partial payments, so every settlement
//!   status (Debt / Paid / Overpaid) shows up in the UI immediately

use chrono::Utc;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use meridian_core::reconcile::{IncomingEntry, ReconcileOptions};
use meridian_core::{LineItemStatus, MarkupRule, Money, OrderLineItem};
use meridian_db::{Database, DbConfig};

/// Demo clients: (first name, last name, company)
const CLIENTS: &[(&str, &str, Option<&str>)] = &[
    ("Anna", "Schmidt", Some("Schmidt GmbH")),
    ("Jan", "Novak", None),
    ("Marta", "Kowalska", None),
    ("Petr", "Svoboda", Some("Svoboda Auto s.r.o.")),
    ("Elena", "Horvath", None),
    ("Tomas", "Dvorak", None),
];

/// Demo stock: (article, manufacturer, name, category, purchase cents)
const PARTS: &[(&str, &str, &str, &str, i64)] = &[
    ("0986452041", "Bosch", "Oil filter", "Filters", 450),
    ("W950/26", "Mann", "Oil filter HD", "Filters", 890),
    ("C25114", "Mann", "Air filter", "Filters", 1150),
    ("P85-2517", "Brembo", "Brake pad set front", "Brakes", 3200),
    ("09.9772.11", "Brembo", "Brake disc", "Brakes", 4100),
    ("24.0122-0158.1", "ATE", "Brake disc vented", "Brakes", 3950),
    ("5750XS", "Gates", "Timing belt", "Engine", 2300),
    ("KP15578XS", "Gates", "Timing belt kit", "Engine", 7800),
    ("06A145710P", "Febi", "Bypass valve", "Engine", 1650),
    ("VKBA3544", "SKF", "Wheel bearing kit", "Suspension", 3400),
    ("31306852167", "Sachs", "Shock absorber", "Suspension", 5600),
    ("ES3571", "Lemforder", "Tie rod end", "Suspension", 1450),
];

/// Warehouse cells the demo stock is spread across.
const CELLS: &[&str] = &["A-01", "A-02", "B-01", "B-02", "C-01"];

/// Markup rule table: cheap parts carry a bigger margin.
const RULES: &[MarkupRule] = &[
    MarkupRule {
        from_cents: 0,
        to_cents: 999,
        markup_bps: 6000,
    },
    MarkupRule {
        from_cents: 1000,
        to_cents: 2999,
        markup_bps: 4000,
    },
    MarkupRule {
        from_cents: 3000,
        to_cents: i64::MAX,
        markup_bps: 2500,
    },
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut order_count: usize = 12;
    let mut db_path = String::from("./meridian_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--orders" | "-o" => {
                if i + 1 < args.len() {
                    order_count = args[i + 1].parse().unwrap_or(12);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            other => {
                eprintln!("Unknown argument: {other}");
                eprintln!("Usage: seed [--orders N] [--db PATH]");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    info!(db = %db_path, orders = order_count, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    // -------------------------------------------------------------------------
    // Clients
    // -------------------------------------------------------------------------
    let mut client_ids = Vec::new();
    for (first, last, company) in CLIENTS {
        let client = db.clients().create(first, last, *company, None).await?;
        client_ids.push(client.id);
    }
    info!(count = client_ids.len(), "Clients created");

    // -------------------------------------------------------------------------
    // Warehouse stock, through the real import path
    // -------------------------------------------------------------------------
    let entries: Vec<IncomingEntry> = PARTS
        .iter()
        .enumerate()
        .map(|(idx, (article, manufacturer, name, category, purchase))| IncomingEntry {
            name: name.to_string(),
            article: Some(article.to_string()),
            manufacturer: Some(manufacturer.to_string()),
            supplier: Some("AutoParts Ltd".to_string()),
            purchase_cents: *purchase,
            quantity: (idx as i64 % 8) + 2,
            price_cents: None,
            warehouse_cell: Some(CELLS[idx % CELLS.len()].to_string()),
            category: Some(category.to_string()),
        })
        .collect();

    let options = ReconcileOptions {
        apply_markup_rules: true,
        create_missing_categories: true,
        import_supplier: true,
        import_cell: true,
    };

    let outcome = db.warehouse().reconcile(&entries, RULES, &options).await?;
    info!(
        created = outcome.created,
        categories = outcome.new_categories.len(),
        "Warehouse stock imported"
    );

    // -------------------------------------------------------------------------
    // Orders with items and payments
    // -------------------------------------------------------------------------
    let mut seeded = 0usize;
    for n in 0..order_count {
        let client_id = &client_ids[n % client_ids.len()];
        let channel = if n % 3 == 0 { "storefront" } else { "phone" };
        let order = db.orders().create(client_id, Some(channel)).await?;

        // Two parts per order, cycling through the catalog
        let mut total = 0i64;
        for k in 0..2 {
            let (article, manufacturer, name, _, purchase) = PARTS[(n * 2 + k) % PARTS.len()];
            let quantity = (k as i64) + 1;
            let price = Money::from_cents(purchase).apply_markup_bps(3500).cents();
            let now = Utc::now();

            let item = OrderLineItem {
                id: Uuid::new_v4().to_string(),
                order_id: order.id.clone(),
                name: name.to_string(),
                article: Some(article.to_string()),
                manufacturer: Some(manufacturer.to_string()),
                supplier: Some("AutoParts Ltd".to_string()),
                price_cents: price,
                quantity,
                purchase_cents: purchase,
                markup_cents: (price - purchase) * quantity,
                total_cents: price * quantity,
                status: LineItemStatus::Created,
                warehouse_cell: None,
                category_id: None,
                term_days: Some(3),
                received_at: None,
                created_at: now,
                updated_at: now,
            };
            total += item.total_cents;
            db.orders().add_item(&item).await?;
        }

        // Vary the settlement picture: a third unpaid, a third exact,
        // a third overpaid by a round hundred
        let paid = match n % 3 {
            0 => 0,
            1 => total,
            _ => total + 10_000,
        };
        if paid > 0 {
            db.orders()
                .add_payment(&order.id, Money::from_cents(paid), Utc::now())
                .await?;
        }

        seeded += 1;
    }

    info!(orders = seeded, "Seed complete");
    println!(
        "Seeded {} clients, {} stock positions, {} orders into {}",
        client_ids.len(),
        outcome.created,
        seeded,
        db_path
    );

    Ok(())
}
