//! # Client Repository
//!
//! Database operations for clients and their derived balances.
//!
//! ## Balance Derivation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Client Balance                                      │
//! │                                                                         │
//! │  balance(client_id)                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load active orders ──► load each order's items + payments             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  meridian_core::balance::compute_client_balance                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  signed Money: > 0 prepaid credit, < 0 debt                            │
//! │                                                                         │
//! │  Nothing is stored. The balance is re-derived on every call, so it     │
//! │  can never disagree with the order history.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::order::{fetch_items, fetch_payments};
use meridian_core::balance::{available_credit, compute_client_balance, ClientOrder};
use meridian_core::{Client, Money, OrderLineItem, WAREHOUSE_CLIENT_ID};

/// Column list shared by every client SELECT.
const CLIENT_COLUMNS: &str =
    "id, first_name, last_name, company, phone, created_at, updated_at";

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Creates a new client.
    pub async fn create(
        &self,
        first_name: &str,
        last_name: &str,
        company: Option<&str>,
        phone: Option<&str>,
    ) -> DbResult<Client> {
        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4().to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            company: company.map(str::to_string),
            phone: phone.map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %client.id, name = %client.display_name(), "Creating client");

        sqlx::query(
            r#"
            INSERT INTO clients (id, first_name, last_name, company, phone, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&client.id)
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.company)
        .bind(&client.phone)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(client)
    }

    /// Gets a client by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    /// Lists all clients, excluding the internal warehouse account.
    pub async fn list(&self) -> DbResult<Vec<Client>> {
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients \
             WHERE id != ?1 \
             ORDER BY last_name, first_name"
        );
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(WAREHOUSE_CLIENT_ID)
            .fetch_all(&self.pool)
            .await?;

        Ok(clients)
    }

    /// Updates a client's name and contact fields.
    pub async fn update(&self, client: &Client) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE clients SET
                first_name = ?2,
                last_name = ?3,
                company = ?4,
                phone = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&client.id)
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.company)
        .bind(&client.phone)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", client.id.as_str()));
        }

        Ok(())
    }

    /// Derives the client's signed balance across their active orders.
    ///
    /// Positive means prepaid credit; negative means outstanding debt.
    pub async fn balance(&self, client_id: &str) -> DbResult<Money> {
        let mut conn = self.pool.acquire().await?;

        let order_ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM orders WHERE client_id = ?1 AND active = 1",
        )
        .bind(client_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut histories: Vec<(Vec<OrderLineItem>, Money)> = Vec::new();
        for order_id in &order_ids {
            let items = fetch_items(&mut conn, order_id).await?;
            let payments = fetch_payments(&mut conn, order_id).await?;
            let paid: Money = payments.iter().map(|p| p.amount()).sum();
            histories.push((items, paid));
        }

        let views: Vec<ClientOrder<'_>> = histories
            .iter()
            .map(|(items, paid)| ClientOrder {
                items,
                amount_paid: *paid,
            })
            .collect();

        Ok(compute_client_balance(&views))
    }

    /// How much of the client's credit can be applied to one order.
    ///
    /// `min(max(0, balance), max(0, order remaining))`: debt applies
    /// nothing, and credit never exceeds what the order still needs.
    pub async fn applicable_credit(&self, client_id: &str, order_id: &str) -> DbResult<Money> {
        let balance = self.balance(client_id).await?;

        let remaining: Option<i64> =
            sqlx::query_scalar("SELECT amount_remaining_cents FROM orders WHERE id = ?1")
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?;

        let remaining = remaining.ok_or_else(|| DbError::not_found("Order", order_id))?;

        Ok(available_credit(balance, Money::from_cents(remaining)))
    }
}

// =============================================================================
// Integration Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use meridian_core::LineItemStatus;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn stock_free_item(order_id: &str, price_cents: i64) -> OrderLineItem {
        let now = Utc::now();
        OrderLineItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            name: "Timing belt".to_string(),
            article: Some("TB-7".to_string()),
            manufacturer: Some("Gates".to_string()),
            supplier: None,
            price_cents,
            quantity: 1,
            purchase_cents: 0,
            markup_cents: price_cents,
            total_cents: price_cents,
            status: LineItemStatus::Created,
            warehouse_cell: None,
            category_id: None,
            term_days: None,
            received_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_update_and_list() {
        let db = test_db().await;

        let mut client = db
            .clients()
            .create("Anna", "Schmidt", Some("Schmidt GmbH"), None)
            .await
            .unwrap();

        client.phone = Some("+49 170 000000".to_string());
        db.clients().update(&client).await.unwrap();

        let fetched = db.clients().get_by_id(&client.id).await.unwrap().unwrap();
        assert_eq!(fetched.phone.as_deref(), Some("+49 170 000000"));

        // The internal warehouse account stays out of listings
        let listed = db.clients().list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, client.id);
    }

    /// Two orders, remaining 1000.00 and -500.00 → balance -500.00.
    #[tokio::test]
    async fn test_balance_nets_debt_against_credit() {
        let db = test_db().await;
        let client = db.clients().create("Jan", "Novak", None, None).await.unwrap();

        // Order 1: owes 1000.00
        let debt_order = db.orders().create(&client.id, None).await.unwrap();
        db.orders()
            .add_item(&stock_free_item(&debt_order.id, 100_000))
            .await
            .unwrap();

        // Order 2: owes 1000.00, paid 1500.00 → remaining -500.00
        let credit_order = db.orders().create(&client.id, None).await.unwrap();
        db.orders()
            .add_item(&stock_free_item(&credit_order.id, 100_000))
            .await
            .unwrap();
        db.orders()
            .add_payment(&credit_order.id, Money::from_cents(150_000), Utc::now())
            .await
            .unwrap();

        let balance = db.clients().balance(&client.id).await.unwrap();
        assert_eq!(balance.cents(), -50_000);
    }

    #[tokio::test]
    async fn test_payment_on_empty_order_mints_no_credit() {
        let db = test_db().await;
        let client = db.clients().create("Jan", "Novak", None, None).await.unwrap();

        let order = db.orders().create(&client.id, None).await.unwrap();
        db.orders()
            .add_payment(&order.id, Money::from_cents(99_000), Utc::now())
            .await
            .unwrap();

        // The order itself shows overpaid, but the aggregated balance
        // skips item-less drafts
        let balance = db.clients().balance(&client.id).await.unwrap();
        assert!(balance.is_zero());
    }

    #[tokio::test]
    async fn test_archived_orders_leave_the_balance() {
        let db = test_db().await;
        let client = db.clients().create("Jan", "Novak", None, None).await.unwrap();

        let order = db.orders().create(&client.id, None).await.unwrap();
        db.orders()
            .add_item(&stock_free_item(&order.id, 100_000))
            .await
            .unwrap();

        assert_eq!(db.clients().balance(&client.id).await.unwrap().cents(), -100_000);

        db.orders().archive(&order.id).await.unwrap();
        assert!(db.clients().balance(&client.id).await.unwrap().is_zero());
    }

    #[tokio::test]
    async fn test_applicable_credit_is_capped_by_order_need() {
        let db = test_db().await;
        let client = db.clients().create("Jan", "Novak", None, None).await.unwrap();

        // Overpaid order gives the client 500.00 of credit
        let paid_order = db.orders().create(&client.id, None).await.unwrap();
        db.orders()
            .add_item(&stock_free_item(&paid_order.id, 100_000))
            .await
            .unwrap();
        db.orders()
            .add_payment(&paid_order.id, Money::from_cents(150_000), Utc::now())
            .await
            .unwrap();

        // New order needs 300.00
        let open_order = db.orders().create(&client.id, None).await.unwrap();
        db.orders()
            .add_item(&stock_free_item(&open_order.id, 30_000))
            .await
            .unwrap();

        // Net balance: +500 credit − 300 debt = +200 → apply 200
        let credit = db
            .clients()
            .applicable_credit(&client.id, &open_order.id)
            .await
            .unwrap();
        assert_eq!(credit.cents(), 20_000);
    }
}
