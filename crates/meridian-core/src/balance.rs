//! # Client Balance Aggregator
//!
//! Derives a client's signed balance from all of their orders.
//!
//! ## Sign Convention
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Client Balance                                     │
//! │                                                                         │
//! │  per order:  remaining = billable total − amount paid                  │
//! │                                                                         │
//! │  balance = −Σ remaining                                                 │
//! │                                                                         │
//! │  balance > 0  → prepaid credit (client overpaid somewhere)             │
//! │  balance < 0  → debt (client still owes)                               │
//! │                                                                         │
//! │  available-to-apply on an order:                                       │
//! │    min(max(0, balance), max(0, order remaining))                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The balance is always derived, never stored; the repository assembles
//! the order views and calls in here.

use crate::ledger::compute_order_totals;
use crate::money::Money;
use crate::types::{OrderLineItem, Payment};

// =============================================================================
// Input View
// =============================================================================

/// One order's contribution to the balance: its items and what was paid.
///
/// A borrowed view rather than the full [`crate::types::Order`], so callers
/// can aggregate straight over rows they already loaded.
#[derive(Debug, Clone, Copy)]
pub struct ClientOrder<'a> {
    pub items: &'a [OrderLineItem],
    pub amount_paid: Money,
}

impl<'a> ClientOrder<'a> {
    /// Builds the view from loaded items and payment rows.
    pub fn from_history(items: &'a [OrderLineItem], payments: &[Payment]) -> Self {
        ClientOrder {
            items,
            amount_paid: payments.iter().map(|p| p.amount()).sum(),
        }
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// Computes the signed client balance across all of the client's orders.
///
/// Orders with no items contribute nothing: an empty order is a draft the
/// client never owed anything on, whatever payments may claim.
pub fn compute_client_balance(orders: &[ClientOrder<'_>]) -> Money {
    let owed: Money = orders
        .iter()
        .filter(|o| !o.items.is_empty())
        .map(|o| compute_order_totals(o.items).total - o.amount_paid)
        .sum();

    -owed
}

/// How much of a client's credit can be applied to one order.
///
/// Debt never applies (negative balance clamps to zero), and credit never
/// exceeds what the order still needs.
pub fn available_credit(balance: Money, order_remaining: Money) -> Money {
    balance.max_zero().min(order_remaining.max_zero())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LineItemStatus;
    use chrono::Utc;

    fn item(price_cents: i64, quantity: i64, status: LineItemStatus) -> OrderLineItem {
        let now = Utc::now();
        OrderLineItem {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: "order-1".to_string(),
            name: "Test item".to_string(),
            article: None,
            manufacturer: None,
            supplier: None,
            price_cents,
            quantity,
            purchase_cents: 0,
            markup_cents: price_cents * quantity,
            total_cents: price_cents * quantity,
            status,
            warehouse_cell: None,
            category_id: None,
            term_days: None,
            received_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Two orders: remaining $1,000.00 and remaining -$500.00 (overpaid)
    /// → balance = -(1000 + (-500)) = -$500.00, net debt.
    #[test]
    fn test_balance_spans_debt_and_credit() {
        let debt_items = vec![item(100_000, 1, LineItemStatus::Created)];
        let credit_items = vec![item(100_000, 1, LineItemStatus::Created)];

        let orders = [
            // owes 1000.00, paid nothing
            ClientOrder {
                items: &debt_items,
                amount_paid: Money::zero(),
            },
            // owes 1000.00, paid 1500.00 → remaining -500.00
            ClientOrder {
                items: &credit_items,
                amount_paid: Money::from_cents(150_000),
            },
        ];

        let balance = compute_client_balance(&orders);
        assert_eq!(balance.cents(), -50_000);
    }

    #[test]
    fn test_pure_credit_is_positive() {
        let items = vec![item(100_000, 1, LineItemStatus::Created)];
        let orders = [ClientOrder {
            items: &items,
            amount_paid: Money::from_cents(120_000),
        }];

        assert_eq!(compute_client_balance(&orders).cents(), 20_000);
    }

    #[test]
    fn test_empty_orders_are_skipped() {
        let items: Vec<OrderLineItem> = Vec::new();
        let orders = [ClientOrder {
            items: &items,
            // A stray payment on an empty draft must not mint credit
            amount_paid: Money::from_cents(99_999),
        }];

        assert!(compute_client_balance(&orders).is_zero());
    }

    #[test]
    fn test_rejected_items_do_not_owe() {
        let items = vec![
            item(100_000, 1, LineItemStatus::Created),
            item(700_000, 1, LineItemStatus::Rejected),
        ];
        let orders = [ClientOrder {
            items: &items,
            amount_paid: Money::zero(),
        }];

        assert_eq!(compute_client_balance(&orders).cents(), -100_000);
    }

    #[test]
    fn test_available_credit_caps_both_sides() {
        // Credit 500, order needs 300 → apply 300
        assert_eq!(
            available_credit(Money::from_cents(500), Money::from_cents(300)).cents(),
            300
        );
        // Credit 200, order needs 300 → apply 200
        assert_eq!(
            available_credit(Money::from_cents(200), Money::from_cents(300)).cents(),
            200
        );
        // Debt never applies
        assert!(available_credit(Money::from_cents(-500), Money::from_cents(300)).is_zero());
        // Overpaid order needs nothing
        assert!(available_credit(Money::from_cents(500), Money::from_cents(-100)).is_zero());
    }

    #[test]
    fn test_from_history_sums_payments() {
        let items = vec![item(100_000, 1, LineItemStatus::Created)];
        let now = Utc::now();
        let payments = vec![
            Payment {
                id: "p1".to_string(),
                order_id: "order-1".to_string(),
                amount_cents: 30_000,
                paid_at: now,
                created_at: now,
            },
            Payment {
                id: "p2".to_string(),
                order_id: "order-1".to_string(),
                amount_cents: 20_000,
                paid_at: now,
                created_at: now,
            },
        ];

        let view = ClientOrder::from_history(&items, &payments);
        assert_eq!(view.amount_paid.cents(), 50_000);

        let balance = compute_client_balance(&[view]);
        assert_eq!(balance.cents(), -50_000);
    }
}
