//! # Warehouse Repository
//!
//! Database operations for the warehouse stock snapshot.
//!
//! ## Reconciliation Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                Reconciliation, Persisted                                │
//! │                                                                         │
//! │  reconcile(entries, rules, options)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN TRANSACTION  ← SQLite's single writer = the mutual exclusion    │
//! │       │               a reconciliation pass requires                   │
//! │       ▼                                                                 │
//! │  load snapshot + categories                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  meridian_core::reconcile (pure merge, counts, minted categories)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT minted categories                                              │
//! │  UPSERT items per key (ON CONFLICT(id) DO UPDATE)                      │
//! │  touch the stock pseudo-order                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT (all-or-nothing; a failed write leaves the old snapshot)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per-key upserts, not delete-and-reinsert: an unmatched stock row is
//! simply left alone, so a crashed import can never eat the shelf.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::order::{fetch_item, fetch_items, refresh_order_aggregates};
use meridian_core::reconcile::{reconcile, IncomingEntry, ReconcileOptions, ReconcileOutcome};
use meridian_core::{Category, MarkupRule, OrderLineItem, WAREHOUSE_ORDER_ID};

/// Repository for warehouse stock operations.
#[derive(Debug, Clone)]
pub struct WarehouseRepository {
    pool: SqlitePool,
}

impl WarehouseRepository {
    /// Creates a new WarehouseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WarehouseRepository { pool }
    }

    /// Loads the current warehouse snapshot.
    pub async fn stock_items(&self) -> DbResult<Vec<OrderLineItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_items(&mut conn, WAREHOUSE_ORDER_ID).await
    }

    /// Lists all known categories.
    pub async fn categories(&self) -> DbResult<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(categories)
    }

    /// Creates a category by hand (outside an import).
    pub async fn create_category(&self, name: &str) -> DbResult<Category> {
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
        };

        sqlx::query("INSERT INTO categories (id, name) VALUES (?1, ?2)")
            .bind(&category.id)
            .bind(&category.name)
            .execute(&self.pool)
            .await?;

        Ok(category)
    }

    /// Merges received entries into the warehouse snapshot.
    ///
    /// Runs the pure reconciler over the loaded snapshot, then commits the
    /// outcome in one transaction: minted categories first, then one upsert
    /// per item. Matching and replacement semantics live entirely in
    /// [`meridian_core::reconcile`]; this method only persists its result.
    pub async fn reconcile(
        &self,
        entries: &[IncomingEntry],
        rules: &[MarkupRule],
        options: &ReconcileOptions,
    ) -> DbResult<ReconcileOutcome> {
        debug!(entries = entries.len(), "Starting stock reconciliation");

        let mut tx = self.pool.begin().await?;

        let existing = fetch_items(&mut tx, WAREHOUSE_ORDER_ID).await?;
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
                .fetch_all(&mut *tx)
                .await?;

        let outcome = reconcile(
            &existing,
            entries,
            &categories,
            rules,
            options,
            WAREHOUSE_ORDER_ID,
            Utc::now(),
        );

        for category in &outcome.new_categories {
            sqlx::query("INSERT INTO categories (id, name) VALUES (?1, ?2)")
                .bind(&category.id)
                .bind(&category.name)
                .execute(&mut *tx)
                .await?;
        }

        for item in &outcome.items {
            upsert_item(&mut tx, item).await?;
        }

        // Touch the pseudo-order so "stock last changed" is queryable
        sqlx::query("UPDATE orders SET updated_at = ?2 WHERE id = ?1")
            .bind(WAREHOUSE_ORDER_ID)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            created = outcome.created,
            updated = outcome.updated,
            new_categories = outcome.new_categories.len(),
            "Stock reconciliation committed"
        );

        Ok(outcome)
    }

    /// Moves a stock item from the warehouse snapshot onto a client order.
    ///
    /// The item keeps its `InStock` status (selling it is a separate status
    /// transition on the order); both orders' aggregates are re-derived in
    /// the same transaction.
    pub async fn transfer_item(
        &self,
        item_id: &str,
        target_order_id: &str,
    ) -> DbResult<OrderLineItem> {
        let mut tx = self.pool.begin().await?;

        let mut item = fetch_item(&mut tx, item_id).await?;
        if item.order_id != WAREHOUSE_ORDER_ID {
            return Err(DbError::not_found("Stock item", item_id));
        }

        let target_exists: Option<String> =
            sqlx::query_scalar("SELECT id FROM orders WHERE id = ?1 AND active = 1")
                .bind(target_order_id)
                .fetch_optional(&mut *tx)
                .await?;
        if target_exists.is_none() {
            return Err(DbError::not_found("Order", target_order_id));
        }

        debug!(item_id = %item_id, target = %target_order_id, "Transferring stock item");

        item.order_id = target_order_id.to_string();
        item.updated_at = Utc::now();

        sqlx::query("UPDATE order_items SET order_id = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(item.updated_at)
            .execute(&mut *tx)
            .await?;

        refresh_order_aggregates(&mut tx, target_order_id).await?;
        refresh_order_aggregates(&mut tx, WAREHOUSE_ORDER_ID).await?;

        tx.commit().await?;
        Ok(item)
    }
}

// =============================================================================
// Upsert
// =============================================================================

/// Per-key upsert of one snapshot item.
///
/// `created_at` and `order_id` are insert-only; everything the reconciler
/// may touch is replaced on conflict. Rewriting an untouched survivor with
/// its own values is a no-op, which keeps the loop simple.
async fn upsert_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
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
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            article = excluded.article,
            manufacturer = excluded.manufacturer,
            supplier = excluded.supplier,
            price_cents = excluded.price_cents,
            quantity = excluded.quantity,
            purchase_cents = excluded.purchase_cents,
            markup_cents = excluded.markup_cents,
            total_cents = excluded.total_cents,
            status = excluded.status,
            warehouse_cell = excluded.warehouse_cell,
            category_id = excluded.category_id,
            term_days = excluded.term_days,
            received_at = excluded.received_at,
            updated_at = excluded.updated_at
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
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Integration Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use meridian_core::{LineItemStatus, Money, OrderStatus};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn entry(article: &str, manufacturer: &str, quantity: i64) -> IncomingEntry {
        IncomingEntry {
            name: format!("{article} {manufacturer}"),
            article: Some(article.to_string()),
            manufacturer: Some(manufacturer.to_string()),
            supplier: Some("AutoParts Ltd".to_string()),
            purchase_cents: 1200,
            quantity,
            price_cents: None,
            warehouse_cell: Some("A-01".to_string()),
            category: None,
        }
    }

    #[tokio::test]
    async fn test_snapshot_starts_empty() {
        let db = test_db().await;
        assert!(db.warehouse().stock_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_inserts_then_replaces() {
        let db = test_db().await;
        let options = ReconcileOptions::default();

        // First delivery: 5 units of A1/Bosch
        let outcome = db
            .warehouse()
            .reconcile(&[entry("A1", "Bosch", 5)], &[], &options)
            .await
            .unwrap();
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.updated, 0);

        // Second delivery spells the key differently; quantity is replaced
        let outcome = db
            .warehouse()
            .reconcile(&[entry("a-1", "BOSCH", 10)], &[], &options)
            .await
            .unwrap();
        assert_eq!(outcome.created, 0);
        assert_eq!(outcome.updated, 1);

        let stock = db.warehouse().stock_items().await.unwrap();
        assert_eq!(stock.len(), 1);
        assert_eq!(stock[0].quantity, 10);
        assert_eq!(stock[0].status, LineItemStatus::InStock);
        assert!(stock[0].received_at.is_some());
    }

    #[tokio::test]
    async fn test_reconcile_commits_categories_atomically() {
        let db = test_db().await;
        let options = ReconcileOptions {
            create_missing_categories: true,
            ..Default::default()
        };

        let mut import = entry("F-22", "Mann", 4);
        import.category = Some("Filters".to_string());

        let outcome = db
            .warehouse()
            .reconcile(&[import], &[], &options)
            .await
            .unwrap();
        assert_eq!(outcome.new_categories.len(), 1);

        // The category row landed in the same commit as the item
        let categories = db.warehouse().categories().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Filters");

        let stock = db.warehouse().stock_items().await.unwrap();
        assert_eq!(stock[0].category_id.as_deref(), Some(&categories[0].id[..]));
    }

    #[tokio::test]
    async fn test_reconcile_applies_markup_rules() {
        let db = test_db().await;
        let rules = vec![MarkupRule {
            from_cents: 0,
            to_cents: 99_999,
            markup_bps: 2500,
        }];
        let options = ReconcileOptions {
            apply_markup_rules: true,
            ..Default::default()
        };

        db.warehouse()
            .reconcile(&[entry("A1", "Bosch", 2)], &rules, &options)
            .await
            .unwrap();

        let stock = db.warehouse().stock_items().await.unwrap();
        // purchase 1200 + 25% = 1500; invariants hold on the stored row
        assert_eq!(stock[0].price_cents, 1500);
        assert_eq!(stock[0].total_cents, 3000);
        assert_eq!(stock[0].markup_cents, 600);
    }

    #[tokio::test]
    async fn test_transfer_item_moves_stock_onto_order() {
        let db = test_db().await;
        db.warehouse()
            .reconcile(&[entry("A1", "Bosch", 1)], &[], &ReconcileOptions::default())
            .await
            .unwrap();
        let stock = db.warehouse().stock_items().await.unwrap();

        let client = db.clients().create("Jan", "Novak", None, None).await.unwrap();
        let order = db.orders().create(&client.id, None).await.unwrap();

        let moved = db
            .warehouse()
            .transfer_item(&stock[0].id, &order.id)
            .await
            .unwrap();
        assert_eq!(moved.order_id, order.id);

        // Snapshot no longer holds the item; the order owes its total
        assert!(db.warehouse().stock_items().await.unwrap().is_empty());
        let order = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(order.amount_remaining_cents, moved.total_cents);
        assert_eq!(order.status, OrderStatus::Debt);

        // The moved item can now be sold through the normal transition
        db.orders()
            .set_item_status(&moved.id, LineItemStatus::Sold)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_transfer_rejects_non_stock_items() {
        let db = test_db().await;
        let client = db.clients().create("Jan", "Novak", None, None).await.unwrap();
        let order = db.orders().create(&client.id, None).await.unwrap();
        let other = db.orders().create(&client.id, None).await.unwrap();

        // An item already on a client order is not transferable stock
        let now = Utc::now();
        let item = OrderLineItem {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            name: "Wiper blade".to_string(),
            article: None,
            manufacturer: None,
            supplier: None,
            price_cents: 900,
            quantity: 1,
            purchase_cents: 500,
            markup_cents: 400,
            total_cents: 900,
            status: LineItemStatus::Created,
            warehouse_cell: None,
            category_id: None,
            term_days: None,
            received_at: None,
            created_at: now,
            updated_at: now,
        };
        db.orders().add_item(&item).await.unwrap();

        let err = db
            .warehouse()
            .transfer_item(&item.id, &other.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_sell_and_rebuy_keeps_money_consistent() {
        let db = test_db().await;

        // Receive stock, move one position to a client order, pay it off
        db.warehouse()
            .reconcile(
                &[entry("A1", "Bosch", 1), entry("B2", "Mann", 2)],
                &[],
                &ReconcileOptions::default(),
            )
            .await
            .unwrap();

        let stock = db.warehouse().stock_items().await.unwrap();
        assert_eq!(stock.len(), 2);
        let source = stock
            .iter()
            .find(|i| i.article.as_deref() == Some("A1"))
            .unwrap();

        let client = db.clients().create("Jan", "Novak", None, None).await.unwrap();
        let order = db.orders().create(&client.id, None).await.unwrap();
        let moved = db
            .warehouse()
            .transfer_item(&source.id, &order.id)
            .await
            .unwrap();

        db.orders()
            .add_payment(&order.id, Money::from_cents(moved.total_cents), Utc::now())
            .await
            .unwrap();

        let order = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(db.clients().balance(&client.id).await.unwrap().is_zero());

        // The other position is untouched by all of this
        let stock = db.warehouse().stock_items().await.unwrap();
        assert_eq!(stock.len(), 1);
        assert_eq!(stock[0].quantity, 2);
    }
}
