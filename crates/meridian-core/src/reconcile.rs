//! # Stock Reconciler
//!
//! Merges a batch of received line entries into the current warehouse
//! snapshot, matching on a normalized (article, manufacturer) key.
//!
//! ## Reconciliation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Stock Reconciliation                                │
//! │                                                                         │
//! │  Import row: { article: "a-1", manufacturer: "BOSCH", qty: 10 }        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  stock_key = normalize("a-1") + normalize("BOSCH") = "a1bosch"         │
//! │       │                                                                 │
//! │       ├── key found in snapshot?                                       │
//! │       │        │                                                        │
//! │       │   YES ─┤ REPLACE quantity (5 → 10, never 5 + 10)               │
//! │       │        │ take incoming purchase, resolve sale price            │
//! │       │        │ overwrite supplier/cell/category per option flags     │
//! │       │        │ stamp received_at                                     │
//! │       │        │                                                        │
//! │       │   NO ──┤ INSERT as a new InStock item                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Outcome: next snapshot + created/updated counts + minted categories   │
//! │                                                                         │
//! │  Same data in twice → same snapshot out. No duplicate insertion.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The reconciler itself is a pure function; whoever persists the outcome
//! must do so under a single-writer transaction (see meridian-db, which
//! upserts per key inside one transaction).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;
use crate::types::{Category, LineItemStatus, MarkupRule, OrderLineItem};

// =============================================================================
// Key Normalization
// =============================================================================

/// Normalizes one half of the stock matching key: lowercase, with
/// whitespace, hyphens and all other punctuation stripped.
///
/// Import files spell the same part a dozen ways ("ABC-123", "abc 123",
/// "ABC.123"); after normalization they all collapse to one key.
///
/// ## Example
/// ```rust
/// use meridian_core::reconcile::normalize;
///
/// assert_eq!(normalize("ABC-123"), "abc123");
/// assert_eq!(normalize("abc 123"), "abc123");
/// assert_eq!(normalize("ABC123"), "abc123");
/// ```
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Builds the stock matching key from an item's article and manufacturer.
///
/// An empty key (both halves blank) never matches anything: such entries
/// always insert, since there is nothing to identify them by.
pub fn stock_key(article: Option<&str>, manufacturer: Option<&str>) -> String {
    let mut key = normalize(article.unwrap_or(""));
    key.push_str(&normalize(manufacturer.unwrap_or("")));
    key
}

// =============================================================================
// Inputs
// =============================================================================

/// One received line from an import file or a supplier delivery form.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct IncomingEntry {
    pub name: String,
    pub article: Option<String>,
    pub manufacturer: Option<String>,
    pub supplier: Option<String>,
    /// Purchase cost per unit, in cents.
    pub purchase_cents: i64,
    /// Received unit count. REPLACES the stored quantity on match.
    pub quantity: i64,
    /// Explicit sale price, when the import carries one.
    pub price_cents: Option<i64>,
    pub warehouse_cell: Option<String>,
    /// Category name as spelled in the import.
    pub category: Option<String>,
}

/// Flags controlling what an import is allowed to touch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReconcileOptions {
    /// Default sale prices from the markup-rule table when no explicit
    /// price is given.
    pub apply_markup_rules: bool,
    /// Mint categories that the import names but the catalog lacks.
    pub create_missing_categories: bool,
    /// Overwrite the stored supplier on matched items.
    pub import_supplier: bool,
    /// Overwrite the stored warehouse cell on matched items.
    pub import_cell: bool,
}

// =============================================================================
// Outcome
// =============================================================================

/// The result of one reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReconcileOutcome {
    /// The next snapshot: untouched survivors plus updated and inserted
    /// items, at most one per stock key.
    pub items: Vec<OrderLineItem>,
    /// Entries that inserted a new item.
    pub created: usize,
    /// Entries that replaced an existing item's data.
    pub updated: usize,
    /// Categories minted during this pass (only with
    /// `create_missing_categories`).
    pub new_categories: Vec<Category>,
}

// =============================================================================
// Sale Price Defaulting
// =============================================================================

/// Resolves the sale price for a received entry.
///
/// Explicit price wins. Otherwise, with `apply_rules`, the first markup
/// rule whose band contains the purchase cost is applied. No rule (or
/// rules disabled) leaves the sale price equal to the purchase cost.
pub fn resolve_sale_price(
    explicit: Option<Money>,
    purchase: Money,
    rules: &[MarkupRule],
    apply_rules: bool,
) -> Money {
    if let Some(price) = explicit {
        return price;
    }

    if apply_rules {
        if let Some(rule) = rules.iter().find(|r| r.matches(purchase)) {
            return purchase.apply_markup_bps(rule.markup_bps);
        }
    }

    purchase
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Merges `entries` into `existing` and returns the next snapshot.
///
/// ## Arguments
/// * `existing` - current warehouse snapshot items
/// * `entries` - received lines to merge in
/// * `categories` - known categories, for name → id resolution
/// * `rules` - markup-rule table for sale price defaulting
/// * `options` - what the import may touch
/// * `order_id` - the stock pseudo-order inserted items attach to
/// * `received_at` - timestamp stamped on every touched item
///
/// ## Semantics
/// - Match on stock key → replace quantity (never add), take the incoming
///   purchase cost, resolve the sale price, overwrite supplier / cell per
///   option flags, re-resolve the category, stamp `received_at`.
/// - No match → insert a new item with status `InStock`.
/// - A key occurring twice in one batch collapses onto one item: the
///   second occurrence updates what the first inserted.
pub fn reconcile(
    existing: &[OrderLineItem],
    entries: &[IncomingEntry],
    categories: &[Category],
    rules: &[MarkupRule],
    options: &ReconcileOptions,
    order_id: &str,
    received_at: DateTime<Utc>,
) -> ReconcileOutcome {
    let mut items: Vec<OrderLineItem> = existing.to_vec();
    let mut new_categories: Vec<Category> = Vec::new();
    let mut created = 0usize;
    let mut updated = 0usize;

    // Index the snapshot by stock key. Duplicate keys in a corrupted
    // snapshot resolve to the first occurrence; empty keys are unmatchable.
    let mut index: HashMap<String, usize> = HashMap::new();
    for (pos, item) in items.iter().enumerate() {
        let key = stock_key(item.article.as_deref(), item.manufacturer.as_deref());
        if !key.is_empty() {
            index.entry(key).or_insert(pos);
        }
    }

    for entry in entries {
        let key = stock_key(entry.article.as_deref(), entry.manufacturer.as_deref());
        let category_id = resolve_category(
            entry.category.as_deref(),
            categories,
            &mut new_categories,
            options.create_missing_categories,
        );

        let purchase = Money::from_cents(entry.purchase_cents);
        let price = resolve_sale_price(
            entry.price_cents.map(Money::from_cents),
            purchase,
            rules,
            options.apply_markup_rules,
        );

        let matched = if key.is_empty() {
            None
        } else {
            index.get(&key).copied()
        };

        match matched {
            Some(pos) => {
                let item = &mut items[pos];

                // Replacement, not accumulation: the import states what is
                // on the shelf, it does not describe a delta.
                item.quantity = entry.quantity;
                item.purchase_cents = purchase.cents();
                item.price_cents = price.cents();
                item.total_cents = item.price_cents * item.quantity;
                item.markup_cents = (item.price_cents - item.purchase_cents) * item.quantity;

                if options.import_supplier && entry.supplier.is_some() {
                    item.supplier = entry.supplier.clone();
                }
                if options.import_cell && entry.warehouse_cell.is_some() {
                    item.warehouse_cell = entry.warehouse_cell.clone();
                }
                if category_id.is_some() {
                    item.category_id = category_id;
                }

                item.received_at = Some(received_at);
                item.updated_at = received_at;

                updated += 1;
            }
            None => {
                let quantity = entry.quantity;
                let item = OrderLineItem {
                    id: Uuid::new_v4().to_string(),
                    order_id: order_id.to_string(),
                    name: entry.name.clone(),
                    article: entry.article.clone(),
                    manufacturer: entry.manufacturer.clone(),
                    supplier: entry.supplier.clone(),
                    price_cents: price.cents(),
                    quantity,
                    purchase_cents: purchase.cents(),
                    markup_cents: (price.cents() - purchase.cents()) * quantity,
                    total_cents: price.cents() * quantity,
                    status: LineItemStatus::InStock,
                    warehouse_cell: entry.warehouse_cell.clone(),
                    category_id,
                    term_days: None,
                    received_at: Some(received_at),
                    created_at: received_at,
                    updated_at: received_at,
                };

                if !key.is_empty() {
                    index.insert(key, items.len());
                }
                items.push(item);

                created += 1;
            }
        }
    }

    ReconcileOutcome {
        items,
        created,
        updated,
        new_categories,
    }
}

/// Resolves an import's category name to a category id.
///
/// Matches known and freshly minted categories case-insensitively on the
/// trimmed name. An unmatched name mints a new category only when the
/// import says so; otherwise the reference defaults to `None`.
fn resolve_category(
    name: Option<&str>,
    categories: &[Category],
    new_categories: &mut Vec<Category>,
    create_missing: bool,
) -> Option<String> {
    let name = name?.trim();
    if name.is_empty() {
        return None;
    }

    let wanted = name.to_lowercase();
    let found = categories
        .iter()
        .chain(new_categories.iter())
        .find(|c| c.name.trim().to_lowercase() == wanted);

    if let Some(category) = found {
        return Some(category.id.clone());
    }

    if !create_missing {
        return None;
    }

    let minted = Category {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
    };
    let id = minted.id.clone();
    new_categories.push(minted);
    Some(id)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn stock_item(article: &str, manufacturer: &str, quantity: i64) -> OrderLineItem {
        let now = Utc::now();
        OrderLineItem {
            id: Uuid::new_v4().to_string(),
            order_id: "stock-order".to_string(),
            name: format!("{article} {manufacturer}"),
            article: Some(article.to_string()),
            manufacturer: Some(manufacturer.to_string()),
            supplier: Some("Old Supplier".to_string()),
            price_cents: 1500,
            quantity,
            purchase_cents: 1000,
            markup_cents: 500 * quantity,
            total_cents: 1500 * quantity,
            status: LineItemStatus::InStock,
            warehouse_cell: Some("A-01".to_string()),
            category_id: None,
            term_days: None,
            received_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn entry(article: &str, manufacturer: &str, quantity: i64) -> IncomingEntry {
        IncomingEntry {
            name: format!("{article} {manufacturer}"),
            article: Some(article.to_string()),
            manufacturer: Some(manufacturer.to_string()),
            supplier: None,
            purchase_cents: 1200,
            quantity,
            price_cents: None,
            warehouse_cell: None,
            category: None,
        }
    }

    #[test]
    fn test_normalize_equivalences() {
        assert_eq!(normalize("ABC-123"), normalize("abc 123"));
        assert_eq!(normalize("abc 123"), normalize("ABC123"));
        assert_eq!(normalize("a.b/c_1-2 3"), "abc123");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_stock_key_combines_both_halves() {
        assert_eq!(stock_key(Some("A-1"), Some("BOSCH")), "a1bosch");
        assert_eq!(stock_key(Some("A1"), None), "a1");
        assert_eq!(stock_key(None, None), "");
    }

    /// Existing {A1, Bosch, qty 5} + incoming {a-1, BOSCH, qty 10}
    /// → quantity replaced to 10, created 0, updated 1.
    #[test]
    fn test_match_replaces_quantity() {
        let existing = vec![stock_item("A1", "Bosch", 5)];
        let incoming = vec![entry("a-1", "BOSCH", 10)];

        let outcome = reconcile(
            &existing,
            &incoming,
            &[],
            &[],
            &ReconcileOptions::default(),
            "stock-order",
            Utc::now(),
        );

        assert_eq!(outcome.created, 0);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].quantity, 10);
        // Replaced, never summed
        assert_ne!(outcome.items[0].quantity, 15);
        // Incoming purchase taken, invariants re-established
        assert_eq!(outcome.items[0].purchase_cents, 1200);
        assert_eq!(
            outcome.items[0].total_cents,
            outcome.items[0].price_cents * 10
        );
        assert!(outcome.items[0].received_at.is_some());
    }

    #[test]
    fn test_no_match_inserts_in_stock() {
        let existing = vec![stock_item("A1", "Bosch", 5)];
        let incoming = vec![entry("B2", "Mann", 3)];

        let outcome = reconcile(
            &existing,
            &incoming,
            &[],
            &[],
            &ReconcileOptions::default(),
            "stock-order",
            Utc::now(),
        );

        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.updated, 0);
        assert_eq!(outcome.items.len(), 2);

        let inserted = &outcome.items[1];
        assert_eq!(inserted.status, LineItemStatus::InStock);
        assert_eq!(inserted.order_id, "stock-order");
        assert_eq!(inserted.quantity, 3);
        // No explicit price, no rules: sale price falls back to purchase
        assert_eq!(inserted.price_cents, 1200);
    }

    #[test]
    fn test_idempotent_across_passes() {
        let incoming = vec![entry("A1", "Bosch", 7)];
        let options = ReconcileOptions::default();

        let first = reconcile(
            &[],
            &incoming,
            &[],
            &[],
            &options,
            "stock-order",
            Utc::now(),
        );
        assert_eq!(first.created, 1);

        let second = reconcile(
            &first.items,
            &incoming,
            &[],
            &[],
            &options,
            "stock-order",
            Utc::now(),
        );

        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 1);
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].quantity, 7);
        assert_eq!(second.items[0].id, first.items[0].id);
    }

    #[test]
    fn test_duplicate_keys_in_one_batch_collapse() {
        let incoming = vec![entry("A1", "Bosch", 5), entry("a 1", "bosch", 9)];

        let outcome = reconcile(
            &[],
            &incoming,
            &[],
            &[],
            &ReconcileOptions::default(),
            "stock-order",
            Utc::now(),
        );

        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.updated, 1);
        // Last occurrence wins
        assert_eq!(outcome.items[0].quantity, 9);
    }

    #[test]
    fn test_empty_key_never_matches() {
        let mut nameless = entry("", "", 2);
        nameless.article = None;
        nameless.manufacturer = None;

        let first = reconcile(
            &[],
            &[nameless.clone()],
            &[],
            &[],
            &ReconcileOptions::default(),
            "stock-order",
            Utc::now(),
        );

        let second = reconcile(
            &first.items,
            &[nameless],
            &[],
            &[],
            &ReconcileOptions::default(),
            "stock-order",
            Utc::now(),
        );

        // Unidentifiable entries insert every time; nothing to match on
        assert_eq!(second.items.len(), 2);
        assert_eq!(second.created, 1);
    }

    #[test]
    fn test_markup_rule_prices_new_stock() {
        let rules = vec![
            MarkupRule {
                from_cents: 0,
                to_cents: 999,
                markup_bps: 5000,
            },
            MarkupRule {
                from_cents: 1000,
                to_cents: 99999,
                markup_bps: 2500,
            },
        ];
        let options = ReconcileOptions {
            apply_markup_rules: true,
            ..Default::default()
        };

        let outcome = reconcile(
            &[],
            &[entry("A1", "Bosch", 1)],
            &[],
            &rules,
            &options,
            "stock-order",
            Utc::now(),
        );

        // purchase 1200 falls in the second band: +25% = 1500
        assert_eq!(outcome.items[0].price_cents, 1500);
    }

    #[test]
    fn test_explicit_price_beats_rules() {
        let rules = vec![MarkupRule {
            from_cents: 0,
            to_cents: 99999,
            markup_bps: 2500,
        }];

        let price = resolve_sale_price(
            Some(Money::from_cents(9900)),
            Money::from_cents(1200),
            &rules,
            true,
        );
        assert_eq!(price.cents(), 9900);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = vec![
            MarkupRule {
                from_cents: 0,
                to_cents: 5000,
                markup_bps: 4000,
            },
            MarkupRule {
                from_cents: 0,
                to_cents: 5000,
                markup_bps: 1000,
            },
        ];

        let price = resolve_sale_price(None, Money::from_cents(1000), &rules, true);
        assert_eq!(price.cents(), 1400);
    }

    #[test]
    fn test_no_rule_match_leaves_price_at_purchase() {
        let rules = vec![MarkupRule {
            from_cents: 0,
            to_cents: 500,
            markup_bps: 5000,
        }];

        let price = resolve_sale_price(None, Money::from_cents(1200), &rules, true);
        assert_eq!(price.cents(), 1200);
    }

    #[test]
    fn test_supplier_and_cell_respect_flags() {
        let existing = vec![stock_item("A1", "Bosch", 5)];
        let mut incoming = entry("A1", "Bosch", 5);
        incoming.supplier = Some("New Supplier".to_string());
        incoming.warehouse_cell = Some("B-07".to_string());

        // Flags off: stored values survive
        let outcome = reconcile(
            &existing,
            &[incoming.clone()],
            &[],
            &[],
            &ReconcileOptions::default(),
            "stock-order",
            Utc::now(),
        );
        assert_eq!(outcome.items[0].supplier.as_deref(), Some("Old Supplier"));
        assert_eq!(outcome.items[0].warehouse_cell.as_deref(), Some("A-01"));

        // Flags on: incoming values overwrite
        let options = ReconcileOptions {
            import_supplier: true,
            import_cell: true,
            ..Default::default()
        };
        let outcome = reconcile(
            &existing,
            &[incoming],
            &[],
            &[],
            &options,
            "stock-order",
            Utc::now(),
        );
        assert_eq!(outcome.items[0].supplier.as_deref(), Some("New Supplier"));
        assert_eq!(outcome.items[0].warehouse_cell.as_deref(), Some("B-07"));
    }

    #[test]
    fn test_category_matching_is_case_insensitive() {
        let categories = vec![Category {
            id: "cat-1".to_string(),
            name: "Filters".to_string(),
        }];
        let mut incoming = entry("A1", "Bosch", 1);
        incoming.category = Some("  filters ".to_string());

        let outcome = reconcile(
            &[],
            &[incoming],
            &categories,
            &[],
            &ReconcileOptions::default(),
            "stock-order",
            Utc::now(),
        );

        assert_eq!(outcome.items[0].category_id.as_deref(), Some("cat-1"));
        assert!(outcome.new_categories.is_empty());
    }

    #[test]
    fn test_missing_category_minted_only_when_allowed() {
        let mut incoming = entry("A1", "Bosch", 1);
        incoming.category = Some("Brakes".to_string());

        // Flag off: reference defaults to None
        let outcome = reconcile(
            &[],
            &[incoming.clone()],
            &[],
            &[],
            &ReconcileOptions::default(),
            "stock-order",
            Utc::now(),
        );
        assert!(outcome.items[0].category_id.is_none());
        assert!(outcome.new_categories.is_empty());

        // Flag on: one category minted and referenced; a second entry with
        // the same name reuses it
        let options = ReconcileOptions {
            create_missing_categories: true,
            ..Default::default()
        };
        let mut second = entry("B2", "Mann", 1);
        second.category = Some("brakes".to_string());

        let outcome = reconcile(
            &[],
            &[incoming, second],
            &[],
            &[],
            &options,
            "stock-order",
            Utc::now(),
        );
        assert_eq!(outcome.new_categories.len(), 1);
        assert_eq!(outcome.new_categories[0].name, "Brakes");
        let minted_id = outcome.new_categories[0].id.clone();
        assert_eq!(outcome.items[0].category_id.as_deref(), Some(&minted_id[..]));
        assert_eq!(outcome.items[1].category_id.as_deref(), Some(&minted_id[..]));
    }
}
