//! # till-core: Pure Domain Logic for the Till POS Register
//!
//! This crate is the **heart** of the cash register subsystem. It contains
//! the domain model and all pure logic with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Till POS Architecture                           │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │            HTTP layer (outside this workspace)              │   │
//! │  │    open_session, post_transaction, close_session, ...       │   │
//! │  └─────────────────────────────┬───────────────────────────────┘   │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼───────────────────────────────┐   │
//! │  │                till-db (register engines)                   │   │
//! │  │    lifecycle · ledger · reconciliation · reports            │   │
//! │  └─────────────────────────────┬───────────────────────────────┘   │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼───────────────────────────────┐   │
//! │  │              ★ till-core (THIS CRATE) ★                     │   │
//! │  │                                                             │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐              │   │
//! │  │   │   types   │  │   money   │  │ validation│              │   │
//! │  │   │ Session   │  │   Money   │  │   rules   │              │   │
//! │  │   │ Transact. │  │  (cents)  │  │  checks   │              │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘              │   │
//! │  │                                                             │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS       │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (CashSession, CashTransaction, CashReport, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Validation error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every function is deterministic
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are cents (i64), never floats
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example
//!
//! ```rust
//! use till_core::{Money, TransactionType};
//!
//! // An expense of $25.00 is always stored as an outflow,
//! // regardless of the sign the caller supplied.
//! let stored = TransactionType::Expense.normalize_amount(Money::from_cents(2500));
//! assert_eq!(stored.cents(), -2500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use till_core::Money` instead of
// `use till_core::money::Money`

pub use error::{ValidationError, ValidationResult};
pub use money::Money;
pub use types::*;
