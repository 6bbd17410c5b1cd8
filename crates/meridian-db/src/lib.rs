//! # meridian-db: Database Layer for Meridian
//!
//! This crate provides database access for the Meridian back office.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Meridian Data Flow                               │
//! │                                                                         │
//! │  Host command (accept_payment, import_stock, ...)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    meridian-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (order.rs,   │    │  (embedded)  │  │   │
//! │  │   │               │    │   client.rs,  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ warehouse.rs) │    │ 001_init.sql │  │   │
//! │  │   │ Connection    │    │               │    │ ...          │  │   │
//! │  │   │ Management    │    └───────┬───────┘    └──────────────┘  │   │
//! │  │   └───────────────┘            │                               │   │
//! │  │                                ▼                               │   │
//! │  │                  meridian-core calculators                     │   │
//! │  │           (ledger, reconcile, balance - pure, no SQL)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL mode, foreign keys on)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (order, client, warehouse)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_db::{Database, DbConfig};
//!
//! // Create database with default config (runs migrations)
//! let db = Database::new(DbConfig::new("path/to/meridian.db")).await?;
//!
//! // Use repositories
//! let order = db.orders().create(&client_id, Some("storefront")).await?;
//! let balance = db.clients().balance(&client_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::client::ClientRepository;
pub use repository::order::OrderRepository;
pub use repository::warehouse::WarehouseRepository;
