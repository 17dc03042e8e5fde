//! # Register Engines
//!
//! The four engines implementing the cash register subsystem on top of the
//! repositories:
//!
//! - [`lifecycle::SessionLifecycle`] - open → closed state machine,
//!   session numbering, one-open-session-per-cashier invariant
//! - [`ledger::TransactionLedger`] - append-only transaction posting with
//!   sign normalization and the cached balance increment
//! - [`reconciliation::ReconciliationEngine`] - expected vs. counted
//!   balance, payment breakdowns
//! - [`reports::ReportAggregator`] - daily summaries and snapshot listings
//!
//! ## Transaction Boundaries
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Each public write operation runs inside ONE sqlx transaction:      │
//! │                                                                     │
//! │  open_session:     pre-check → number scan → insert                 │
//! │  post_transaction: status check → ledger insert → balance bump      │
//! │  close_session:    status check → guarded close UPDATE              │
//! │                                                                     │
//! │  All writes within one operation commit or roll back atomically.    │
//! │  SQLite's single-writer rule serializes the sequences; guarded      │
//! │  UPDATEs and the partial unique index catch what slips through.     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;

use crate::error::DbError;
use till_core::ValidationError;

pub mod ledger;
pub mod lifecycle;
pub mod reconciliation;
pub mod reports;

/// Begins an engine write transaction with immediate (write) intent.
///
/// SQLite's default deferred BEGIN takes a read snapshot first; under WAL,
/// a transaction that later upgrades to a write from a stale snapshot
/// fails with SQLITE_BUSY_SNAPSHOT instead of waiting. BEGIN IMMEDIATE
/// takes the write lock up front, so concurrent engine writes queue on the
/// busy timeout and serialize. The unique indexes remain the backstop for
/// anything that still races.
pub(crate) async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, DbError> {
    pool.begin_with("BEGIN IMMEDIATE").await.map_err(DbError::from)
}

// =============================================================================
// Error Taxonomy
// =============================================================================

/// The transport-facing classification of a register error.
///
/// The excluded HTTP layer maps these to status codes:
/// NotFound → 404, Conflict → 409, Validation → 422, Internal → 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced session/report does not exist or is tombstoned.
    NotFound,
    /// Action violates a state-machine rule.
    Conflict,
    /// Malformed input reaching the core directly.
    Validation,
    /// Storage or serialization failure.
    Internal,
}

/// Errors raised by the register engines.
///
/// Domain errors propagate unmodified to the caller; the engines never
/// retry and never swallow a failure. Storage constraint violations (the
/// unique-open-session index) are translated into the corresponding
/// Conflict rather than leaking a raw [`DbError`].
#[derive(Debug, Error)]
pub enum RegisterError {
    /// Session does not exist for this tenant, or is tombstoned.
    ///
    /// Also raised when a caller supplies a `session_id` belonging to a
    /// different tenant - existence of other tenants' sessions is never
    /// confirmed.
    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    /// Report snapshot does not exist for this tenant, or is tombstoned.
    #[error("Report not found: {id}")]
    ReportNotFound { id: String },

    /// An OPEN session already exists for this (tenant, cashier) pair.
    #[error("Cashier {cashier_id} already has an open session for tenant {tenant_id}")]
    SessionAlreadyOpen { tenant_id: i64, cashier_id: i64 },

    /// Closing a session that is already closed. Not idempotent by design.
    #[error("Session {id} is already closed")]
    SessionAlreadyClosed { id: String },

    /// Posting a transaction against a closed session. The single most
    /// important guard in the subsystem: any write path that forgot this
    /// check would silently corrupt reconciliation.
    #[error("Cannot add to closed session {id}")]
    SessionClosed { id: String },

    /// A cash difference report was requested for a session that has not
    /// been closed and counted yet.
    #[error("Session {id} is still open; close it before reconciling")]
    SessionStillOpen { id: String },

    /// Tombstoning an open drawer is not allowed.
    #[error("Cannot delete session {id} while it is open")]
    DeleteOpenSession { id: String },

    /// Business-rule input validation failure.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Report payload serialization failure.
    #[error("Failed to serialize report payload: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying storage failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl RegisterError {
    /// Classifies the error for transport mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegisterError::SessionNotFound { .. } | RegisterError::ReportNotFound { .. } => {
                ErrorKind::NotFound
            }
            RegisterError::SessionAlreadyOpen { .. }
            | RegisterError::SessionAlreadyClosed { .. }
            | RegisterError::SessionClosed { .. }
            | RegisterError::DeleteOpenSession { .. } => ErrorKind::Conflict,
            RegisterError::SessionStillOpen { .. } | RegisterError::Validation(_) => {
                ErrorKind::Validation
            }
            RegisterError::Serialization(_) | RegisterError::Db(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for register engine operations.
pub type RegisterResult<T> = Result<T, RegisterError>;

// =============================================================================
// Test Support
// =============================================================================


// =============================================================================
// Unit Tests
// =============================================================================
