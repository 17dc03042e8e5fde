//! # till-db: Database Layer for the Cash Register Engine
//!
//! This crate provides persistence and the business engines for cash
//! register sessions, their transaction ledgers, and reconciliation
//! reports. It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Cash Register Data Flow                            │
//! │                                                                         │
//! │  Caller (API handler, demo binary)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      till-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────────┐   ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │    Engines     │   │  Repositories  │   │  Migrations  │  │   │
//! │  │   │  (register/)   │   │ (repository/)  │   │  (embedded)  │  │   │
//! │  │   │                │   │                │   │              │  │   │
//! │  │   │ Lifecycle      │──►│ SessionRepo    │   │ 001_cash_    │  │   │
//! │  │   │ Ledger         │   │ TransactionRepo│   │ register.sql │  │   │
//! │  │   │ Reconciliation │   │ ReportRepo     │   │              │  │   │
//! │  │   │ Reports        │   │                │   │              │  │   │
//! │  │   └────────────────┘   └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      SQLite Database                            │   │
//! │  │   WAL mode, foreign keys on, single-writer semantics            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Engines own the business rules (state machine guards, sign
//! normalization, tenant scoping) and compose repository calls inside a
//! single write transaction per operation. Repositories are thin SQL
//! wrappers with no business logic.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Row-level SQL (session, transaction, report)
//! - [`register`] - Business engines (lifecycle, ledger, reconciliation,
//!   reports)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_db::{Database, DbConfig};
//! use till_core::Money;
//!
//! let db = Database::new(DbConfig::new("path/to/till.db")).await?;
//! db.run_migrations().await?;
//!
//! let session = db
//!     .lifecycle()
//!     .open_session(tenant_id, manager_id, cashier_id, Money::from_cents(10_000), None)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod register;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Engine re-exports for convenience
pub use register::ledger::{NewTransaction, TransactionLedger};
pub use register::lifecycle::SessionLifecycle;
pub use register::reconciliation::ReconciliationEngine;
pub use register::reports::ReportAggregator;
pub use register::{ErrorKind, RegisterError, RegisterResult};

// Repository re-exports for callers that need raw row access
pub use repository::report::{ReportFilter, ReportRepository};
pub use repository::session::{SessionFilter, SessionRepository};
pub use repository::transaction::TransactionRepository;
