//! # Repository Module
//!
//! Database repository implementations for Meridian.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Host command                                                          │
//! │       │                                                                 │
//! │       │  db.orders().add_payment(order_id, amount, date)               │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── create(&self, client_id, channel)                                 │
//! │  ├── add_payment(&self, order_id, amount, paid_at)                     │
//! │  ├── remove_payment(&self, order_id, payment_id)                       │
//! │  └── set_item_status(&self, item_id, next)                             │
//! │       │                                                                 │
//! │       │  SQL, inside one transaction per mutation                       │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • Pure calculators stay in meridian-core; SQL stays here              │
//! │  • Aggregates re-derived next to the rows they summarize               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`order::OrderRepository`] - Orders, line items, payments
//! - [`client::ClientRepository`] - Clients and derived balances
//! - [`warehouse::WarehouseRepository`] - Stock snapshot and reconciliation

pub mod client;
pub mod order;
pub mod warehouse;
