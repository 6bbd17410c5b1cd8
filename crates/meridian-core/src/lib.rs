//! # meridian-core: Pure Business Logic for Meridian
//!
//! This crate is the **heart** of Meridian. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Meridian Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     Web Frontend                                │   │
//! │  │    Orders UI ──► Warehouse UI ──► Finance UI ──► Clients UI    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ host layer (HTTP / IPC)                │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ meridian-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  ledger   │  │ reconcile │  │   │
//! │  │   │   Order   │  │   Money   │  │  totals   │  │ stock key │  │   │
//! │  │   │   Client  │  │  markup   │  │ payments  │  │   merge   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                      ┌───────────┐  ┌───────────┐              │   │
//! │  │                      │  balance  │  │ validation│              │   │
//! │  │                      └───────────┘  └───────────┘              │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   meridian-db (Database Layer)                  │   │
//! │  │             SQLite queries, migrations, repositories            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, OrderLineItem, Payment, Client, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`ledger`] - Order totals, payments, settlement status
//! - [`reconcile`] - Warehouse stock reconciliation
//! - [`balance`] - Client balance aggregation
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation and numeric coercion
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every calculator is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Derived, not incremented**: aggregates are recomputed from source rows,
//!    so deleting a payment or rejecting an item can never drift
//!
//! ## Example Usage
//!
//! ```rust
//! use meridian_core::ledger::apply_payment;
//! use meridian_core::money::Money;
//! use meridian_core::types::OrderStatus;
//!
//! // An empty order paid $10.00 is overpaid by $10.00
//! let state = apply_payment(&[], &[], Money::from_cents(1000));
//! assert_eq!(state.settlement.status, OrderStatus::Overpaid);
//! assert_eq!(state.settlement.amount.cents(), 1000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod balance;
pub mod error;
pub mod ledger;
pub mod money;
pub mod reconcile;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use meridian_core::Money` instead of
// `use meridian_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Client id of the internal account the warehouse snapshot hangs off.
///
/// ## Why a sentinel client?
/// The warehouse snapshot is materialized as a pseudo-order so that stock
/// rows share the line-item table, queries and editing UI with real orders.
/// That pseudo-order needs an owner; this sentinel is it. It is seeded by
/// migration and excluded from every client-facing listing and balance.
pub const WAREHOUSE_CLIENT_ID: &str = "warehouse-stock";

/// Fixed id of the warehouse stock pseudo-order.
///
/// Single-warehouse runtime with a multi-warehouse-shaped schema: the id is
/// a constant today and becomes a lookup when more warehouses arrive.
pub const WAREHOUSE_ORDER_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum line items allowed on a single order.
///
/// ## Business Reason
/// Prevents runaway orders and ensures reasonable document sizes.
/// Can be made configurable in future versions.
pub const MAX_ORDER_ITEMS: usize = 200;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
/// Stock imports are exempt; they state observed shelf counts.
pub const MAX_ITEM_QUANTITY: i64 = 9999;
