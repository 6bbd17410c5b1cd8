//! # Order Repository
//!
//! Database operations for orders, line items and payments.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create() → Order { status: Debt, everything zero }             │
//! │                                                                         │
//! │  2. FILL                                                               │
//! │     └── add_item() / update_item() / set_item_status()                 │
//! │         (each one re-derives the stored aggregates in its own tx)      │
//! │                                                                         │
//! │  3. SETTLE                                                             │
//! │     └── add_payment() → status Debt / Paid / Overpaid                  │
//! │     └── remove_payment() → full re-derivation, never a decrement       │
//! │                                                                         │
//! │  4. (OPTIONAL) ARCHIVE                                                 │
//! │     └── archive() → active = 0, history retained                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation that can move the order's money runs inside one
//! transaction together with the aggregate rewrite, so readers never see
//! an order row that disagrees with its items or payments.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::ledger::{
    apply_line_item_edit, ledger_state, remove_payment, LedgerState, LineItemEdit,
};
use meridian_core::validation::{
    validate_item_name, validate_order_size, validate_payment_amount, validate_quantity,
};
use meridian_core::{CoreError, LineItemStatus, Money, Order, OrderLineItem, Payment};

/// Column list shared by every order SELECT.
const ORDER_COLUMNS: &str = "id, order_number, client_id, channel, status, \
     status_amount_cents, amount_paid_cents, amount_remaining_cents, \
     active, notes, created_at, updated_at";

/// Column list shared by every line item SELECT.
const ITEM_COLUMNS: &str = "id, order_id, name, article, manufacturer, supplier, \
     price_cents, quantity, purchase_cents, markup_cents, total_cents, status, \
     warehouse_cell, category_id, term_days, received_at, created_at, updated_at";

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Creates a new empty order for a client.
    ///
    /// ## Returns
    /// The created order with generated ID and order number. A fresh order
    /// has no items, so its ledger is all zeros and its status is Paid the
    /// moment anything derives it; the stored default stays Debt until the
    /// first aggregate refresh, matching what checkout immediately does.
    pub async fn create(&self, client_id: &str, channel: Option<&str>) -> DbResult<Order> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let order_number = generate_order_number();

        debug!(id = %id, order_number = %order_number, "Creating order");

        let order = Order {
            id: id.clone(),
            order_number,
            client_id: client_id.to_string(),
            channel: channel.map(str::to_string),
            status: meridian_core::OrderStatus::Debt,
            status_amount_cents: 0,
            amount_paid_cents: 0,
            amount_remaining_cents: 0,
            active: true,
            notes: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, client_id, channel, status,
                status_amount_cents, amount_paid_cents, amount_remaining_cents,
                active, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.client_id)
        .bind(&order.channel)
        .bind(order.status)
        .bind(order.status_amount_cents)
        .bind(order.amount_paid_cents)
        .bind(order.amount_remaining_cents)
        .bind(order.active)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Lists a client's active orders, newest first.
    pub async fn list_for_client(&self, client_id: &str) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE client_id = ?1 AND active = 1 \
             ORDER BY created_at DESC"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// Gets all line items of an order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderLineItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_items(&mut conn, order_id).await
    }

    /// Gets all payments of an order, oldest first.
    pub async fn get_payments(&self, order_id: &str) -> DbResult<Vec<Payment>> {
        let mut conn = self.pool.acquire().await?;
        fetch_payments(&mut conn, order_id).await
    }

    /// Adds a line item to an order and refreshes the order aggregates.
    ///
    /// The item arrives fully computed (the caller goes through the ledger
    /// edit helpers); this method validates, persists and re-derives.
    pub async fn add_item(&self, item: &OrderLineItem) -> DbResult<()> {
        validate_item_name(&item.name).map_err(CoreError::from)?;
        validate_quantity(item.quantity).map_err(CoreError::from)?;

        debug!(order_id = %item.order_id, name = %item.name, "Adding line item");

        let mut tx = self.pool.begin().await?;

        let current: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = ?1")
            .bind(&item.order_id)
            .fetch_one(&mut *tx)
            .await?;
        validate_order_size(current as usize).map_err(CoreError::from)?;

        insert_item(&mut tx, item).await?;
        refresh_order_aggregates(&mut tx, &item.order_id).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Applies a single-field edit to a line item.
    ///
    /// Routes through the ledger calculator so `total` and `markup` are
    /// re-established, then rewrites the item row and the order aggregates
    /// in one transaction.
    pub async fn update_item(&self, item_id: &str, edit: LineItemEdit) -> DbResult<OrderLineItem> {
        let mut tx = self.pool.begin().await?;

        let mut item = fetch_item(&mut tx, item_id).await?;
        apply_line_item_edit(&mut item, edit);
        item.updated_at = Utc::now();

        debug!(item_id = %item.id, ?edit, "Updating line item");

        sqlx::query(
            r#"
            UPDATE order_items SET
                price_cents = ?2,
                quantity = ?3,
                purchase_cents = ?4,
                markup_cents = ?5,
                total_cents = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&item.id)
        .bind(item.price_cents)
        .bind(item.quantity)
        .bind(item.purchase_cents)
        .bind(item.markup_cents)
        .bind(item.total_cents)
        .bind(item.updated_at)
        .execute(&mut *tx)
        .await?;

        refresh_order_aggregates(&mut tx, &item.order_id).await?;

        tx.commit().await?;
        Ok(item)
    }

    /// Moves a line item to a new lifecycle status.
    ///
    /// Illegal transitions are rejected before any write happens; a
    /// rejection or restore also re-derives the order aggregates, because
    /// rejected items stop counting.
    pub async fn set_item_status(
        &self,
        item_id: &str,
        next: LineItemStatus,
    ) -> DbResult<OrderLineItem> {
        let mut tx = self.pool.begin().await?;

        let mut item = fetch_item(&mut tx, item_id).await?;

        if !item.status.can_transition_to(next) {
            return Err(CoreError::IllegalTransition {
                from: item.status,
                to: next,
            }
            .into());
        }

        debug!(item_id = %item.id, from = ?item.status, to = ?next, "Line item status change");

        item.status = next;
        item.updated_at = Utc::now();

        sqlx::query("UPDATE order_items SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(&item.id)
            .bind(item.status)
            .bind(item.updated_at)
            .execute(&mut *tx)
            .await?;

        refresh_order_aggregates(&mut tx, &item.order_id).await?;

        tx.commit().await?;
        Ok(item)
    }

    /// Accepts a payment against an order.
    ///
    /// Inserts the payment row and re-derives the stored aggregates in the
    /// same transaction.
    pub async fn add_payment(
        &self,
        order_id: &str,
        amount: Money,
        paid_at: chrono::DateTime<Utc>,
    ) -> DbResult<Payment> {
        validate_payment_amount(amount.cents()).map_err(CoreError::from)?;

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            amount_cents: amount.cents(),
            paid_at,
            created_at: now,
        };

        debug!(order_id = %order_id, amount = %amount, "Accepting payment");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, amount_cents, paid_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.order_id)
        .bind(payment.amount_cents)
        .bind(payment.paid_at)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        refresh_order_aggregates(&mut tx, order_id).await?;

        tx.commit().await?;
        Ok(payment)
    }

    /// Deletes a payment and reverses exactly its contribution.
    ///
    /// The new state is recomputed from the surviving payments via the
    /// ledger calculator, never decremented, so repeated add/remove cycles
    /// cannot drift.
    pub async fn remove_payment(&self, order_id: &str, payment_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let items = fetch_items(&mut tx, order_id).await?;
        let payments = fetch_payments(&mut tx, order_id).await?;

        // Validates the payment id and derives the post-delete state
        let state = remove_payment(&items, &payments, payment_id)?;

        debug!(order_id = %order_id, payment_id = %payment_id, "Deleting payment");

        sqlx::query("DELETE FROM payments WHERE id = ?1")
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;

        store_ledger_state(&mut tx, order_id, &state).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Archives an order (soft delete).
    pub async fn archive(&self, order_id: &str) -> DbResult<()> {
        self.set_active(order_id, false).await
    }

    /// Restores an archived order.
    pub async fn restore(&self, order_id: &str) -> DbResult<()> {
        self.set_active(order_id, true).await
    }

    async fn set_active(&self, order_id: &str, active: bool) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query("UPDATE orders SET active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(order_id)
            .bind(active)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        Ok(())
    }
}

// =============================================================================
// Shared Fetch/Store Helpers
// =============================================================================
// Free functions over a raw connection so the warehouse repository can call
// them from inside its own transactions.

/// Fetches all line items of an order.
pub(crate) async fn fetch_items(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Vec<OrderLineItem>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY created_at"
    );
    let items = sqlx::query_as::<_, OrderLineItem>(&sql)
        .bind(order_id)
        .fetch_all(conn)
        .await?;

    Ok(items)
}

/// Fetches one line item by id.
pub(crate) async fn fetch_item(
    conn: &mut SqliteConnection,
    item_id: &str,
) -> DbResult<OrderLineItem> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE id = ?1");
    sqlx::query_as::<_, OrderLineItem>(&sql)
        .bind(item_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::not_found("Line item", item_id))
}

/// Fetches all payments of an order, oldest first.
pub(crate) async fn fetch_payments(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Vec<Payment>> {
    let payments = sqlx::query_as::<_, Payment>(
        "SELECT id, order_id, amount_cents, paid_at, created_at \
         FROM payments WHERE order_id = ?1 ORDER BY paid_at, created_at",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;

    Ok(payments)
}

/// Inserts one line item row.
pub(crate) async fn insert_item(
    conn: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    item: &OrderLineItem,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, name, article, manufacturer, supplier,
            price_cents, quantity, purchase_cents, markup_cents, total_cents,
            status, warehouse_cell, category_id, term_days,
            received_at, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.name)
    .bind(&item.article)
    .bind(&item.manufacturer)
    .bind(&item.supplier)
    .bind(item.price_cents)
    .bind(item.quantity)
    .bind(item.purchase_cents)
    .bind(item.markup_cents)
    .bind(item.total_cents)
    .bind(item.status)
    .bind(&item.warehouse_cell)
    .bind(&item.category_id)
    .bind(item.term_days)
    .bind(item.received_at)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(&mut **conn)
    .await?;

    Ok(())
}

/// Re-derives an order's ledger state from its rows and stores it.
pub(crate) async fn refresh_order_aggregates(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: &str,
) -> DbResult<LedgerState> {
    let items = fetch_items(tx, order_id).await?;
    let payments = fetch_payments(tx, order_id).await?;

    let state = ledger_state(&items, &payments);
    store_ledger_state(tx, order_id, &state).await?;

    Ok(state)
}

/// Writes a derived ledger state onto the order row.
pub(crate) async fn store_ledger_state(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: &str,
    state: &LedgerState,
) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE orders SET
            amount_paid_cents = ?2,
            amount_remaining_cents = ?3,
            status = ?4,
            status_amount_cents = ?5,
            updated_at = ?6
        WHERE id = ?1
        "#,
    )
    .bind(order_id)
    .bind(state.amount_paid.cents())
    .bind(state.amount_remaining.cents())
    .bind(state.settlement.status)
    .bind(state.settlement.amount.cents())
    .bind(now)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order", order_id));
    }

    Ok(())
}

/// Generates an order number in format: YYYYMMDD-NNNN
///
/// ## Format
/// - YYYYMMDD: Date
/// - NNNN: Sequential-looking number (padded to 4 digits)
///
/// ## Example
/// `20260805-0417`
fn generate_order_number() -> String {
    let now = Utc::now();
    let date_part = now.format("%Y%m%d");

    // TODO: replace with a proper per-day counter once multi-terminal
    // checkout lands; millisecond slices are unique enough for one desk
    let seq = (now.timestamp_millis() % 10000) as u32;

    format!("{}-{:04}", date_part, seq)
}

// =============================================================================
// Integration Tests
// =============================================================================
