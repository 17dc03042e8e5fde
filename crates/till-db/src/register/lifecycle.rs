//! # Session Lifecycle Manager
//!
//! The open → closed state machine for cash register sessions.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Session Lifecycle                              │
//! │                                                                     │
//! │   open_session()                    close_session(actual)           │
//! │        │                                    │                       │
//! │        ▼                                    ▼                       │
//! │   ┌────────┐                          ┌──────────┐                  │
//! │   │  OPEN  │ ───────────────────────► │  CLOSED  │  (terminal)     │
//! │   └────────┘                          └──────────┘                  │
//! │        │                                    │                       │
//! │        │ accepts transactions               │ no reopen,            │
//! │        │ (ledger engine)                    │ no further posting    │
//! │                                                                     │
//! │  Invariants:                                                        │
//! │  • one OPEN session per (tenant, cashier)                           │
//! │  • session_number = max(tenant's) + 1, never reused                 │
//! │  • closed_at and actual_balance set together, exactly once          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::DbError;
use crate::register::{begin_write, RegisterError, RegisterResult};
use crate::repository::session::{SessionFilter, SessionRepository};
use till_core::validation::{validate_counted_balance, validate_notes};
use till_core::{CashSession, Money, SessionStatus};

/// State machine manager for session open/close.
#[derive(Debug, Clone)]
pub struct SessionLifecycle {
    pool: SqlitePool,
    sessions: SessionRepository,
}

impl SessionLifecycle {
    /// Creates a new SessionLifecycle.
    pub fn new(pool: SqlitePool) -> Self {
        let sessions = SessionRepository::new(pool.clone());
        SessionLifecycle { pool, sessions }
    }

    /// Opens a new session for a cashier.
    ///
    /// ## Preconditions
    /// - `initial_balance >= 0`
    /// - no OPEN session exists for this (tenant, cashier) pair
    ///
    /// ## Concurrency
    /// The pre-check, the session number scan and the insert share one
    /// write transaction. Two concurrent opens racing past the pre-check
    /// cannot both commit: the partial unique index over
    /// (tenant_id, cashier_id) WHERE status = 'open' rejects the loser,
    /// which surfaces as the same Conflict.
    pub async fn open_session(
        &self,
        tenant_id: i64,
        opened_by: i64,
        cashier_id: i64,
        initial_balance: Money,
        notes: Option<String>,
    ) -> RegisterResult<CashSession> {
        validate_counted_balance("initial_balance", initial_balance)?;
        validate_notes(notes.as_deref())?;

        let mut tx = begin_write(&self.pool).await?;

        if self
            .sessions
            .open_for_cashier_with(&mut tx, tenant_id, cashier_id)
            .await?
            .is_some()
        {
            return Err(RegisterError::SessionAlreadyOpen {
                tenant_id,
                cashier_id,
            });
        }

        let session_number = self.sessions.next_session_number(&mut tx, tenant_id).await?;
        let now = Utc::now();

        let session = CashSession {
            id: Uuid::new_v4().to_string(),
            tenant_id,
            session_number,
            cashier_id,
            opened_by,
            status: SessionStatus::Open,
            initial_balance_cents: initial_balance.cents(),
            // The drawer starts out containing exactly its float.
            expected_balance_cents: initial_balance.cents(),
            actual_balance_cents: None,
            notes,
            opened_at: now,
            closed_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        match self.sessions.insert(&mut tx, &session).await {
            Ok(()) => {}
            // A concurrent open slipped past the pre-check and landed on a
            // unique index (one-open-session or session-number).
            Err(err) if err.is_unique_violation() => {
                return Err(RegisterError::SessionAlreadyOpen {
                    tenant_id,
                    cashier_id,
                });
            }
            Err(err) => return Err(err.into()),
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            tenant_id,
            cashier_id,
            session_number,
            initial_balance = %initial_balance,
            "Opened cash session"
        );

        Ok(session)
    }

    /// Closes an open session with the physically counted balance.
    ///
    /// Freezes the cached expected balance at whatever the ledger
    /// accumulated; any transaction posted after this call is rejected by
    /// the ledger engine. Closing an already-closed session is a Conflict,
    /// not idempotent.
    pub async fn close_session(
        &self,
        tenant_id: i64,
        session_id: &str,
        actual_balance: Money,
        notes: Option<String>,
    ) -> RegisterResult<CashSession> {
        validate_counted_balance("actual_balance", actual_balance)?;
        validate_notes(notes.as_deref())?;

        let mut tx = begin_write(&self.pool).await?;

        let session = self
            .sessions
            .get_with(&mut tx, tenant_id, session_id)
            .await?
            .ok_or_else(|| RegisterError::SessionNotFound {
                id: session_id.to_string(),
            })?;

        if !session.is_open() {
            return Err(RegisterError::SessionAlreadyClosed {
                id: session_id.to_string(),
            });
        }

        let now = Utc::now();
        let rows = self
            .sessions
            .close(
                &mut tx,
                tenant_id,
                session_id,
                actual_balance.cents(),
                notes.as_deref(),
                now,
            )
            .await?;
        if rows == 0 {
            // Lost a race with another close.
            return Err(RegisterError::SessionAlreadyClosed {
                id: session_id.to_string(),
            });
        }

        let closed = self
            .sessions
            .get_with(&mut tx, tenant_id, session_id)
            .await?
            .ok_or_else(|| RegisterError::SessionNotFound {
                id: session_id.to_string(),
            })?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            tenant_id,
            session_number = closed.session_number,
            expected_balance = %closed.expected_balance(),
            actual_balance = %actual_balance,
            "Closed cash session"
        );

        Ok(closed)
    }

    /// The single OPEN session for a (tenant, cashier) pair, if any.
    ///
    /// Used by the UI to resume a shift and by callers to detect whether a
    /// drawer is active.
    pub async fn get_current_session(
        &self,
        tenant_id: i64,
        cashier_id: i64,
    ) -> RegisterResult<Option<CashSession>> {
        Ok(self.sessions.open_for_cashier(tenant_id, cashier_id).await?)
    }

    /// Gets a session by ID within the tenant.
    pub async fn get_session(&self, tenant_id: i64, session_id: &str) -> RegisterResult<CashSession> {
        self.sessions
            .get(tenant_id, session_id)
            .await?
            .ok_or_else(|| RegisterError::SessionNotFound {
                id: session_id.to_string(),
            })
    }

    /// Lists sessions for a tenant, most recently opened first.
    pub async fn list_sessions(
        &self,
        tenant_id: i64,
        filter: &SessionFilter,
    ) -> RegisterResult<Vec<CashSession>> {
        Ok(self.sessions.list(tenant_id, filter).await?)
    }

    /// Tombstones a CLOSED session for audit retention.
    ///
    /// The session vanishes from lookups, listings and summaries, but its
    /// session number is never reused.
    pub async fn delete_session(&self, tenant_id: i64, session_id: &str) -> RegisterResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        let session = self
            .sessions
            .get_with(&mut tx, tenant_id, session_id)
            .await?
            .ok_or_else(|| RegisterError::SessionNotFound {
                id: session_id.to_string(),
            })?;

        if session.is_open() {
            return Err(RegisterError::DeleteOpenSession {
                id: session_id.to_string(),
            });
        }

        let rows = self
            .sessions
            .soft_delete(&mut tx, tenant_id, session_id, Utc::now())
            .await?;
        if rows == 0 {
            return Err(RegisterError::SessionNotFound {
                id: session_id.to_string(),
            });
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(tenant_id, session_id, "Tombstoned cash session");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::testutil::test_db;
    use crate::register::ErrorKind;

    #[tokio::test]
    async fn test_open_session_assigns_sequential_numbers() {
        let db = test_db().await;
        let lifecycle = db.lifecycle();

        let first = lifecycle
            .open_session(1, 10, 10, Money::from_cents(10_000), None)
            .await
            .unwrap();
        assert_eq!(first.session_number, 1);
        assert_eq!(first.status, SessionStatus::Open);
        assert_eq!(first.expected_balance_cents, 10_000);

        // Different cashier, same tenant: next number.
        let second = lifecycle
            .open_session(1, 11, 11, Money::from_cents(5_000), None)
            .await
            .unwrap();
        assert_eq!(second.session_number, 2);

        // Numbering is independent per tenant.
        let other_tenant = lifecycle
            .open_session(2, 10, 10, Money::zero(), None)
            .await
            .unwrap();
        assert_eq!(other_tenant.session_number, 1);
    }

    #[tokio::test]
    async fn test_open_session_conflict_for_same_cashier() {
        let db = test_db().await;
        let lifecycle = db.lifecycle();

        let original = lifecycle
            .open_session(1, 10, 10, Money::from_cents(10_000), None)
            .await
            .unwrap();

        let err = lifecycle
            .open_session(1, 10, 10, Money::from_cents(5_000), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // No second row appeared; the current session is still the original.
        let current = lifecycle.get_current_session(1, 10).await.unwrap().unwrap();
        assert_eq!(current.id, original.id);

        let all = lifecycle
            .list_sessions(1, &SessionFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_open_session_rejects_negative_float() {
        let db = test_db().await;

        let err = db
            .lifecycle()
            .open_session(1, 10, 10, Money::from_cents(-1), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_close_session_sets_fields_together() {
        let db = test_db().await;
        let lifecycle = db.lifecycle();

        let session = lifecycle
            .open_session(1, 10, 10, Money::from_cents(10_000), None)
            .await
            .unwrap();

        let closed = lifecycle
            .close_session(1, &session.id, Money::from_cents(10_000), Some("end of shift".into()))
            .await
            .unwrap();

        assert_eq!(closed.status, SessionStatus::Closed);
        assert_eq!(closed.actual_balance_cents, Some(10_000));
        assert!(closed.closed_at.is_some());
        // Expected balance frozen at the ledger's accumulation (no
        // transactions here, so still the float).
        assert_eq!(closed.expected_balance_cents, 10_000);
        assert_eq!(closed.notes.as_deref(), Some("end of shift"));

        // The drawer is no longer current.
        assert!(lifecycle.get_current_session(1, 10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_twice_is_conflict() {
        let db = test_db().await;
        let lifecycle = db.lifecycle();

        let session = lifecycle
            .open_session(1, 10, 10, Money::from_cents(10_000), None)
            .await
            .unwrap();
        lifecycle
            .close_session(1, &session.id, Money::from_cents(10_000), None)
            .await
            .unwrap();

        let err = lifecycle
            .close_session(1, &session.id, Money::from_cents(9_000), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // The first close's count stands.
        let reloaded = lifecycle.get_session(1, &session.id).await.unwrap();
        assert_eq!(reloaded.actual_balance_cents, Some(10_000));
    }

    #[tokio::test]
    async fn test_close_missing_session_is_not_found() {
        let db = test_db().await;

        let err = db
            .lifecycle()
            .close_session(1, "no-such-session", Money::zero(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_cross_tenant_session_is_not_found() {
        let db = test_db().await;
        let lifecycle = db.lifecycle();

        let session = lifecycle
            .open_session(1, 10, 10, Money::from_cents(10_000), None)
            .await
            .unwrap();

        // Tenant 2 must not even learn the session exists.
        let err = lifecycle
            .close_session(2, &session.id, Money::zero(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = lifecycle.get_session(2, &session.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_open_session_is_conflict() {
        let db = test_db().await;
        let lifecycle = db.lifecycle();

        let session = lifecycle
            .open_session(1, 10, 10, Money::from_cents(10_000), None)
            .await
            .unwrap();

        let err = lifecycle.delete_session(1, &session.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_deleted_session_number_is_not_reused() {
        let db = test_db().await;
        let lifecycle = db.lifecycle();

        let session = lifecycle
            .open_session(1, 10, 10, Money::from_cents(10_000), None)
            .await
            .unwrap();
        assert_eq!(session.session_number, 1);

        lifecycle
            .close_session(1, &session.id, Money::from_cents(10_000), None)
            .await
            .unwrap();
        lifecycle.delete_session(1, &session.id).await.unwrap();

        // Gone from lookups...
        let err = lifecycle.get_session(1, &session.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // ...but its number stays burned.
        let next = lifecycle
            .open_session(1, 10, 10, Money::from_cents(10_000), None)
            .await
            .unwrap();
        assert_eq!(next.session_number, 2);
    }

    #[tokio::test]
    async fn test_concurrent_opens_for_different_cashiers_both_succeed() {
        // Two terminals opening drawers at the same time must serialize on
        // the write lock, not fail with a busy error. Needs a file-backed
        // pool so the opens really run on separate connections.
        let fixture = crate::register::testutil::file_test_db().await;
        let lifecycle = fixture.db.lifecycle();

        let (first, second) = tokio::join!(
            lifecycle.open_session(1, 10, 10, Money::from_cents(10_000), None),
            lifecycle.open_session(1, 20, 20, Money::from_cents(5_000), None),
        );
        let first = first.unwrap();
        let second = second.unwrap();

        let mut numbers = [first.session_number, second.session_number];
        numbers.sort_unstable();
        assert_eq!(numbers, [1, 2]);

        fixture.db.close().await;
    }
}
