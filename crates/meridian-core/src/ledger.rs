//! # Order Ledger Calculator
//!
//! Pure computations over an order's line items and payment history:
//! running totals, margins, remaining balance, and the settlement label.
//!
//! ## Derivation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Order Ledger Derivation                            │
//! │                                                                         │
//! │  items ──► compute_order_totals ──► total / purchase / markup / bps    │
//! │    │                                    │                               │
//! │    │         payments ──► Σ amount      │                               │
//! │    │              │                     │                               │
//! │    ▼              ▼                     ▼                               │
//! │  ledger_state: remaining = billable total − paid                       │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  settle(remaining):                                                     │
//! │    remaining > 0  → Debt(remaining)                                     │
//! │    remaining == 0 → Paid                                                │
//! │    remaining < 0  → Overpaid(|remaining|)                               │
//! │                                                                         │
//! │  Every mutation re-derives from scratch. Nothing increments.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Deriving from scratch is the whole design: deleting a payment cannot
//! drift, because there is no incremental state to drift from.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{OrderLineItem, OrderStatus, Payment};

// =============================================================================
// Order Totals
// =============================================================================

/// Aggregate money figures over an order's billable items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    /// Sum of line totals (sale side).
    pub total: Money,
    /// Sum of purchase cost × quantity (cost side).
    pub purchase_total: Money,
    /// Sum of line markups.
    pub markup_total: Money,
    /// Margin as basis points of the purchase total; 0 when cost is zero.
    pub markup_bps: i64,
}

/// Computes the order totals over billable (non-Rejected) items.
///
/// ## Example
/// ```rust
/// # use meridian_core::ledger::compute_order_totals;
/// let totals = compute_order_totals(&[]);
/// assert!(totals.total.is_zero());
/// ```
pub fn compute_order_totals(items: &[OrderLineItem]) -> OrderTotals {
    let billable = items.iter().filter(|i| i.is_billable());

    let mut total = Money::zero();
    let mut purchase_total = Money::zero();
    let mut markup_total = Money::zero();

    for item in billable {
        total += item.total();
        purchase_total += item.purchase().multiply_quantity(item.quantity);
        markup_total += item.markup();
    }

    OrderTotals {
        total,
        purchase_total,
        markup_total,
        markup_bps: markup_total.ratio_bps(purchase_total),
    }
}

// =============================================================================
// Settlement
// =============================================================================

/// The settlement label plus its magnitude.
///
/// `amount` is what the UI prints next to the label: the outstanding debt,
/// the overpaid credit, or zero for a settled order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settlement {
    pub status: OrderStatus,
    pub amount: Money,
}

/// Derives the settlement label from a remaining amount.
///
/// This is the single status policy in the system. Payment acceptance,
/// payment deletion and item edits all go through it; none of them carry
/// their own special case.
pub fn settle(remaining: Money) -> Settlement {
    if remaining.is_negative() {
        Settlement {
            status: OrderStatus::Overpaid,
            amount: remaining.abs(),
        }
    } else if remaining.is_zero() {
        Settlement {
            status: OrderStatus::Paid,
            amount: Money::zero(),
        }
    } else {
        Settlement {
            status: OrderStatus::Debt,
            amount: remaining,
        }
    }
}

// =============================================================================
// Ledger State
// =============================================================================

/// Everything the order row stores about money, derived in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerState {
    pub amount_paid: Money,
    pub amount_remaining: Money,
    pub settlement: Settlement,
}

/// Derives the full ledger state from items and payment history.
pub fn ledger_state(items: &[OrderLineItem], payments: &[Payment]) -> LedgerState {
    let billable_total = compute_order_totals(items).total;
    let amount_paid: Money = payments.iter().map(|p| p.amount()).sum();
    let amount_remaining = billable_total - amount_paid;

    LedgerState {
        amount_paid,
        amount_remaining,
        settlement: settle(amount_remaining),
    }
}

/// Applies one more payment on top of the existing history.
///
/// The new payment is not yet in `payments`; its amount is added to the
/// historical sum and the state is re-derived.
///
/// ## Example
/// ```rust
/// # use meridian_core::ledger::apply_payment;
/// # use meridian_core::money::Money;
/// let state = apply_payment(&[], &[], Money::from_cents(1000));
/// assert_eq!(state.amount_remaining.cents(), -1000);
/// ```
pub fn apply_payment(items: &[OrderLineItem], payments: &[Payment], amount: Money) -> LedgerState {
    let billable_total = compute_order_totals(items).total;
    let historical: Money = payments.iter().map(|p| p.amount()).sum();
    let amount_paid = historical + amount;
    let amount_remaining = billable_total - amount_paid;

    LedgerState {
        amount_paid,
        amount_remaining,
        settlement: settle(amount_remaining),
    }
}

/// Removes one payment from the history and re-derives the state.
///
/// This reverses exactly that payment's contribution because the state is
/// recomputed from the surviving payments, not decremented. Errors with
/// [`CoreError::PaymentNotFound`] when the id is not in the history.
pub fn remove_payment(
    items: &[OrderLineItem],
    payments: &[Payment],
    payment_id: &str,
) -> CoreResult<LedgerState> {
    if !payments.iter().any(|p| p.id == payment_id) {
        return Err(CoreError::PaymentNotFound(payment_id.to_string()));
    }

    let survivors: Vec<Payment> = payments
        .iter()
        .filter(|p| p.id != payment_id)
        .cloned()
        .collect();

    Ok(ledger_state(items, &survivors))
}

// =============================================================================
// Line Item Edits
// =============================================================================

/// A single-field edit on a line item, as it arrives from an editable
/// table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemEdit {
    /// Sale price per unit changed.
    Price(Money),
    /// Unit count changed.
    Quantity(i64),
    /// Purchase cost per unit changed.
    Purchase(Money),
    /// Line markup edited directly; price is back-solved.
    Markup(Money),
}

/// Applies a single-field edit and re-establishes the line invariants:
/// `total == price * quantity` and `markup == (price - purchase) * quantity`.
///
/// A direct markup edit back-solves `price = markup / quantity + purchase`.
/// Integer division means the stored markup may land a few cents under the
/// requested one (it is recomputed from the solved price); a zero quantity
/// cannot be divided through, so price falls back to the purchase cost.
pub fn apply_line_item_edit(item: &mut OrderLineItem, edit: LineItemEdit) {
    match edit {
        LineItemEdit::Price(price) => item.price_cents = price.cents(),
        LineItemEdit::Quantity(quantity) => item.quantity = quantity,
        LineItemEdit::Purchase(purchase) => item.purchase_cents = purchase.cents(),
        LineItemEdit::Markup(markup) => {
            item.price_cents = if item.quantity == 0 {
                item.purchase_cents
            } else {
                markup.cents() / item.quantity + item.purchase_cents
            };
        }
    }

    item.total_cents = item.price_cents * item.quantity;
    item.markup_cents = (item.price_cents - item.purchase_cents) * item.quantity;
}

// =============================================================================
// Unit Tests
// =============================================================================
