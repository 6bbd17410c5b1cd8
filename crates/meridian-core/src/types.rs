//! # Domain Types
//!
//! Core domain types used throughout Meridian.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │  OrderLineItem  │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  order_number   │   │  article, manuf │   │  order_id (FK)  │       │
//! │  │  status         │   │  price_cents    │   │  amount_cents   │       │
//! │  │  remaining      │   │  status         │   │  paid_at        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Client      │   │ LineItemStatus  │   │   OrderStatus   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  name fields    │   │  Created        │   │  Paid           │       │
//! │  │  derived balance│   │  InStock        │   │  Debt           │       │
//! │  └─────────────────┘   │  Sold, Rejected │   │  Overpaid       │       │
//! │                        │  WrittenOff     │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (order_number, article, etc.) - human-readable, potentially mutable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Line Item Status
// =============================================================================

/// Lifecycle status of a single order line item.
///
/// ## State Machine
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │   Created ──► InStock ──► Sold                                          │
/// │                  │                                                       │
/// │                  └──────► WrittenOff                                    │
/// │                                                                         │
/// │   any state ──► Rejected ──► Created (explicit restore)                 │
/// │                                                                         │
/// │   Rejected items are excluded from every financial total but kept      │
/// │   for audit and undo.                                                   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineItemStatus {
    /// Item ordered from a supplier but not yet received.
    Created,
    /// Item sits in the warehouse (counts toward stock).
    InStock,
    /// Item handed over to the client (counts toward revenue).
    Sold,
    /// Item excluded from the order (refused, mis-ordered). Reversible.
    Rejected,
    /// Item lost or damaged; removed from stock without a sale.
    WrittenOff,
}

impl LineItemStatus {
    /// Whether an item in this status counts toward financial totals.
    ///
    /// Rejected items stay on the order for audit but contribute nothing.
    #[inline]
    pub const fn is_billable(&self) -> bool {
        !matches!(self, LineItemStatus::Rejected)
    }

    /// Checks whether `next` is a legal transition from this status.
    ///
    /// ## Example
    /// ```rust
    /// use meridian_core::types::LineItemStatus;
    ///
    /// assert!(LineItemStatus::Created.can_transition_to(LineItemStatus::InStock));
    /// assert!(LineItemStatus::Rejected.can_transition_to(LineItemStatus::Created));
    /// assert!(!LineItemStatus::Sold.can_transition_to(LineItemStatus::InStock));
    /// ```
    pub fn can_transition_to(&self, next: LineItemStatus) -> bool {
        use LineItemStatus::*;

        match (self, next) {
            // Rejection is always available, from any live status
            (s, Rejected) if *s != Rejected => true,
            // Restore puts a rejected item back at the start of its life
            (Rejected, Created) => true,
            // The forward chain
            (Created, InStock) => true,
            (InStock, Sold) => true,
            (InStock, WrittenOff) => true,
            _ => false,
        }
    }
}

impl Default for LineItemStatus {
    fn default() -> Self {
        LineItemStatus::Created
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Settlement label of an order, derived from its remaining amount.
///
/// The label never drives computation; it is re-derived from
/// `amount_remaining` after every payment or item change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Remaining amount is exactly zero.
    Paid,
    /// Remaining amount is positive; the client still owes.
    Debt,
    /// Remaining amount is negative; the client prepaid too much.
    Overpaid,
}

impl Default for OrderStatus {
    fn default() -> Self {
        // A freshly checked-out order owes its full total
        OrderStatus::Debt
    }
}

// =============================================================================
// Order Line Item
// =============================================================================

/// A single position on an order: one article, a quantity, and the money
/// attached to it.
///
/// ## Invariants
/// - `total_cents == price_cents * quantity`
/// - `markup_cents == (price_cents - purchase_cents) * quantity`
///
/// Both are re-established by [`crate::ledger::apply_line_item_edit`] after
/// every field edit; rows loaded from storage are trusted to satisfy them.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLineItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Order this item belongs to. The warehouse snapshot is the set of
    /// items attached to the internal stock pseudo-order.
    pub order_id: String,

    /// Display name shown in tables and on documents.
    pub name: String,

    /// Manufacturer part number. Half of the stock matching key.
    pub article: Option<String>,

    /// Manufacturer name. The other half of the stock matching key.
    pub manufacturer: Option<String>,

    /// Supplier reference (free-form: name or external id).
    pub supplier: Option<String>,

    /// Sale price per unit, in cents.
    pub price_cents: i64,

    /// Unit count. Zero is legal for stock positions that ran dry.
    pub quantity: i64,

    /// Purchase cost per unit, in cents.
    pub purchase_cents: i64,

    /// Margin over the whole line: `(price - purchase) * quantity`.
    pub markup_cents: i64,

    /// Line total: `price * quantity`.
    pub total_cents: i64,

    /// Lifecycle status; drives which aggregate the item counts toward.
    pub status: LineItemStatus,

    /// Warehouse cell/bin label, when the item is physically placed.
    pub warehouse_cell: Option<String>,

    /// Category reference.
    pub category_id: Option<String>,

    /// Supplier lead time in days, when known.
    pub term_days: Option<i64>,

    /// When the item was last received into stock (stamped by reconciliation).
    #[ts(as = "Option<String>")]
    pub received_at: Option<DateTime<Utc>>,

    /// When the item was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the item was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl OrderLineItem {
    /// Returns the unit sale price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the unit purchase cost as Money.
    #[inline]
    pub fn purchase(&self) -> Money {
        Money::from_cents(self.purchase_cents)
    }

    /// Returns the line markup as Money.
    #[inline]
    pub fn markup(&self) -> Money {
        Money::from_cents(self.markup_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Whether this item counts toward financial totals.
    #[inline]
    pub fn is_billable(&self) -> bool {
        self.status.is_billable()
    }
}

// =============================================================================
// Order
// =============================================================================

/// A client order with stored payment aggregates.
///
/// `amount_paid_cents`, `amount_remaining_cents`, `status` and
/// `status_amount_cents` are denormalized copies of what
/// [`crate::ledger::ledger_state`] derives from the items and payment
/// history; the repository rewrites them inside the same transaction as any
/// mutation that can move them.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Human-readable business number, e.g. `20260805-0042`.
    pub order_number: String,
    pub client_id: String,
    /// Sales channel the order came through (storefront, phone, web).
    pub channel: Option<String>,
    pub status: OrderStatus,
    /// Magnitude of the debt or overpayment, always non-negative.
    pub status_amount_cents: i64,
    pub amount_paid_cents: i64,
    pub amount_remaining_cents: i64,
    /// Soft-delete flag; archived orders keep their history.
    pub active: bool,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the paid amount as Money.
    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    /// Returns the remaining amount as Money.
    #[inline]
    pub fn amount_remaining(&self) -> Money {
        Money::from_cents(self.amount_remaining_cents)
    }

    /// Returns the status magnitude as Money.
    #[inline]
    pub fn status_amount(&self) -> Money {
        Money::from_cents(self.status_amount_cents)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A payment accepted against an order.
/// An order can accumulate any number of payments; deleting one re-derives
/// the order aggregates from the survivors.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    /// Amount paid in cents.
    pub amount_cents: i64,
    /// Business date of the payment (may differ from created_at).
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Client
// =============================================================================

/// A client who places orders. Balance is derived from orders, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Display name: "Last First" or the company when the person fields
    /// are blank (internal accounts use company only).
    pub fn display_name(&self) -> String {
        let person = format!("{} {}", self.last_name, self.first_name);
        let person = person.trim();

        if person.is_empty() {
            self.company.clone().unwrap_or_default()
        } else {
            person.to_string()
        }
    }
}

// =============================================================================
// Category
// =============================================================================

/// A product category. Items reference categories by id; the stock
/// reconciler may mint new ones from an import file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Markup Rule
// =============================================================================

/// A sale-price defaulting band: purchases falling inside `[from, to]`
/// get `markup_bps` applied when the import carries no explicit price.
/// First matching rule wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MarkupRule {
    /// Inclusive lower bound of the purchase price band, in cents.
    pub from_cents: i64,
    /// Inclusive upper bound of the purchase price band, in cents.
    pub to_cents: i64,
    /// Markup in basis points (2500 = 25%).
    pub markup_bps: u32,
}

impl MarkupRule {
    /// Checks whether a purchase price falls inside this band.
    #[inline]
    pub fn matches(&self, purchase: Money) -> bool {
        let cents = purchase.cents();
        cents >= self.from_cents && cents <= self.to_cents
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_item_status_forward_chain() {
        use LineItemStatus::*;

        assert!(Created.can_transition_to(InStock));
        assert!(InStock.can_transition_to(Sold));
        assert!(InStock.can_transition_to(WrittenOff));

        // No skipping the warehouse
        assert!(!Created.can_transition_to(Sold));
        // No un-selling
        assert!(!Sold.can_transition_to(InStock));
        assert!(!WrittenOff.can_transition_to(InStock));
    }

    #[test]
    fn test_line_item_status_rejection_and_restore() {
        use LineItemStatus::*;

        for s in [Created, InStock, Sold, WrittenOff] {
            assert!(s.can_transition_to(Rejected), "{s:?} must be rejectable");
        }
        assert!(!Rejected.can_transition_to(Rejected));

        // Restore goes back to the start, nowhere else
        assert!(Rejected.can_transition_to(Created));
        assert!(!Rejected.can_transition_to(InStock));
        assert!(!Rejected.can_transition_to(Sold));
    }

    #[test]
    fn test_billable_statuses() {
        use LineItemStatus::*;

        assert!(Created.is_billable());
        assert!(InStock.is_billable());
        assert!(Sold.is_billable());
        assert!(WrittenOff.is_billable());
        assert!(!Rejected.is_billable());
    }

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Debt);
    }

    /// The frontend round-trips statuses as snake_case strings.
    #[test]
    fn test_status_json_is_snake_case() {
        let json = serde_json::to_string(&LineItemStatus::WrittenOff).unwrap();
        assert_eq!(json, "\"written_off\"");

        let back: LineItemStatus = serde_json::from_str("\"in_stock\"").unwrap();
        assert_eq!(back, LineItemStatus::InStock);

        let json = serde_json::to_string(&OrderStatus::Overpaid).unwrap();
        assert_eq!(json, "\"overpaid\"");
    }

    #[test]
    fn test_client_display_name() {
        let mut client = Client {
            id: "c1".to_string(),
            first_name: "Anna".to_string(),
            last_name: "Schmidt".to_string(),
            company: Some("Schmidt GmbH".to_string()),
            phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(client.display_name(), "Schmidt Anna");

        client.first_name = String::new();
        client.last_name = String::new();
        assert_eq!(client.display_name(), "Schmidt GmbH");
    }

    #[test]
    fn test_markup_rule_bounds_inclusive() {
        let rule = MarkupRule {
            from_cents: 1000,
            to_cents: 5000,
            markup_bps: 3000,
        };

        assert!(rule.matches(Money::from_cents(1000)));
        assert!(rule.matches(Money::from_cents(5000)));
        assert!(rule.matches(Money::from_cents(2500)));
        assert!(!rule.matches(Money::from_cents(999)));
        assert!(!rule.matches(Money::from_cents(5001)));
    }
}
