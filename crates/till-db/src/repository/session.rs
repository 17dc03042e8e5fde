//! # Session Repository
//!
//! Persistence for cash register sessions (the Session Store).
//!
//! ## Scoping Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Every query filters by tenant_id - cross-tenant leakage is a      │
//! │  correctness violation, not just a privacy concern, because         │
//! │  session numbering and "current open session" are tenant-scoped.    │
//! │                                                                     │
//! │  Every default query appends `deleted_at IS NULL`. Tombstoned rows  │
//! │  are visible only through the explicit *_including_deleted audit    │
//! │  variants.                                                          │
//! │                                                                     │
//! │  Exception: session numbering scans INCLUDE tombstones, so a        │
//! │  number is never reused after a soft delete.                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Write-path methods take a `&mut SqliteConnection` so the lifecycle and
//! ledger engines can compose them inside one transaction; read-path
//! methods run against the pool.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use till_core::{CashSession, SessionStatus};

/// Column list shared by every session SELECT.
const SESSION_COLUMNS: &str = "id, tenant_id, session_number, cashier_id, opened_by, \
     status, initial_balance_cents, expected_balance_cents, actual_balance_cents, \
     notes, opened_at, closed_at, created_at, updated_at, deleted_at";

/// Filters for session listings.
///
/// All fields optional; `Default` is "every live session for the tenant".
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    /// Only sessions in this state.
    pub status: Option<SessionStatus>,
    /// Only sessions owned by this cashier.
    pub cashier_id: Option<i64>,
    /// Only sessions opened on or after this date (UTC).
    pub date_from: Option<NaiveDate>,
    /// Only sessions opened on or before this date (UTC).
    pub date_to: Option<NaiveDate>,
}

/// Repository for cash session database operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Reads (pool)
    // -------------------------------------------------------------------------

    /// Gets a live session by ID, scoped to the tenant.
    ///
    /// A session belonging to another tenant is simply not found - the
    /// caller must not be able to confirm its existence.
    pub async fn get(&self, tenant_id: i64, session_id: &str) -> DbResult<Option<CashSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM cash_sessions \
             WHERE id = ?1 AND tenant_id = ?2 AND deleted_at IS NULL"
        );

        let session = sqlx::query_as::<_, CashSession>(&sql)
            .bind(session_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Gets a session by ID including tombstoned rows. Audit tooling only.
    pub async fn get_including_deleted(
        &self,
        tenant_id: i64,
        session_id: &str,
    ) -> DbResult<Option<CashSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM cash_sessions \
             WHERE id = ?1 AND tenant_id = ?2"
        );

        let session = sqlx::query_as::<_, CashSession>(&sql)
            .bind(session_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Gets the single live OPEN session for a (tenant, cashier) pair.
    ///
    /// The partial unique index guarantees at most one row matches.
    pub async fn open_for_cashier(
        &self,
        tenant_id: i64,
        cashier_id: i64,
    ) -> DbResult<Option<CashSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM cash_sessions \
             WHERE tenant_id = ?1 AND cashier_id = ?2 \
               AND status = 'open' AND deleted_at IS NULL"
        );

        let session = sqlx::query_as::<_, CashSession>(&sql)
            .bind(tenant_id)
            .bind(cashier_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Lists live sessions for a tenant, most recently opened first.
    pub async fn list(&self, tenant_id: i64, filter: &SessionFilter) -> DbResult<Vec<CashSession>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {SESSION_COLUMNS} FROM cash_sessions \
             WHERE deleted_at IS NULL AND tenant_id = "
        ));
        qb.push_bind(tenant_id);

        if let Some(status) = filter.status {
            qb.push(" AND status = ");
            qb.push_bind(status);
        }
        if let Some(cashier_id) = filter.cashier_id {
            qb.push(" AND cashier_id = ");
            qb.push_bind(cashier_id);
        }
        if let Some(date_from) = filter.date_from {
            qb.push(" AND date(opened_at) >= ");
            qb.push_bind(date_from);
        }
        if let Some(date_to) = filter.date_to {
            qb.push(" AND date(opened_at) <= ");
            qb.push_bind(date_to);
        }

        qb.push(" ORDER BY opened_at DESC");

        let sessions = qb
            .build_query_as::<CashSession>()
            .fetch_all(&self.pool)
            .await?;

        Ok(sessions)
    }

    // -------------------------------------------------------------------------
    // Writes (composable within an engine transaction)
    // -------------------------------------------------------------------------

    /// In-transaction variant of [`get`](Self::get).
    pub async fn get_with(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: i64,
        session_id: &str,
    ) -> DbResult<Option<CashSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM cash_sessions \
             WHERE id = ?1 AND tenant_id = ?2 AND deleted_at IS NULL"
        );

        let session = sqlx::query_as::<_, CashSession>(&sql)
            .bind(session_id)
            .bind(tenant_id)
            .fetch_optional(conn)
            .await?;

        Ok(session)
    }

    /// In-transaction variant of [`open_for_cashier`](Self::open_for_cashier),
    /// used by the lifecycle manager's conflict pre-check.
    pub async fn open_for_cashier_with(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: i64,
        cashier_id: i64,
    ) -> DbResult<Option<CashSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM cash_sessions \
             WHERE tenant_id = ?1 AND cashier_id = ?2 \
               AND status = 'open' AND deleted_at IS NULL"
        );

        let session = sqlx::query_as::<_, CashSession>(&sql)
            .bind(tenant_id)
            .bind(cashier_id)
            .fetch_optional(conn)
            .await?;

        Ok(session)
    }

    /// Computes the next session number for a tenant.
    ///
    /// ## Important
    /// Tombstoned sessions are deliberately INCLUDED: a session number is
    /// never reused, even after a soft delete. The scan runs inside the
    /// caller's write transaction, and the unique index over
    /// (tenant_id, session_number) catches any concurrent assignment of the
    /// same number.
    pub async fn next_session_number(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: i64,
    ) -> DbResult<i64> {
        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(session_number), 0) + 1 FROM cash_sessions \
             WHERE tenant_id = ?1",
        )
        .bind(tenant_id)
        .fetch_one(conn)
        .await?;

        Ok(next)
    }

    /// Inserts a session row.
    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        session: &CashSession,
    ) -> DbResult<()> {
        debug!(
            id = %session.id,
            session_number = session.session_number,
            "Inserting cash session"
        );

        sqlx::query(
            "INSERT INTO cash_sessions (
                id, tenant_id, session_number, cashier_id, opened_by,
                status, initial_balance_cents, expected_balance_cents, actual_balance_cents,
                notes, opened_at, closed_at, created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )
        .bind(&session.id)
        .bind(session.tenant_id)
        .bind(session.session_number)
        .bind(session.cashier_id)
        .bind(session.opened_by)
        .bind(session.status)
        .bind(session.initial_balance_cents)
        .bind(session.expected_balance_cents)
        .bind(session.actual_balance_cents)
        .bind(&session.notes)
        .bind(session.opened_at)
        .bind(session.closed_at)
        .bind(session.created_at)
        .bind(session.updated_at)
        .bind(session.deleted_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Adds a signed ledger amount to the cached expected balance.
    ///
    /// Guarded by `status = 'open'`: returns the number of rows affected so
    /// the ledger can detect a session that was closed concurrently and
    /// abort its transaction. The increment happens in SQL, so concurrent
    /// posts can never lose an update.
    pub async fn apply_ledger_amount(
        &self,
        conn: &mut SqliteConnection,
        session_id: &str,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE cash_sessions SET
                expected_balance_cents = expected_balance_cents + ?2,
                updated_at = ?3
             WHERE id = ?1 AND status = 'open' AND deleted_at IS NULL",
        )
        .bind(session_id)
        .bind(amount_cents)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Closes an open session: freezes the expected balance and records the
    /// counted cash.
    ///
    /// Guarded by `status = 'open'` so a second close affects zero rows;
    /// the lifecycle manager turns that into a Conflict.
    pub async fn close(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: i64,
        session_id: &str,
        actual_balance_cents: i64,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE cash_sessions SET
                status = 'closed',
                actual_balance_cents = ?3,
                closed_at = ?4,
                updated_at = ?4,
                notes = COALESCE(?5, notes)
             WHERE id = ?1 AND tenant_id = ?2 AND status = 'open' AND deleted_at IS NULL",
        )
        .bind(session_id)
        .bind(tenant_id)
        .bind(actual_balance_cents)
        .bind(now)
        .bind(notes)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Tombstones a session for audit retention.
    ///
    /// Guarded by `status = 'closed'`: an open drawer cannot be deleted.
    pub async fn soft_delete(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: i64,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE cash_sessions SET
                deleted_at = ?3,
                updated_at = ?3
             WHERE id = ?1 AND tenant_id = ?2 AND status = 'closed' AND deleted_at IS NULL",
        )
        .bind(session_id)
        .bind(tenant_id)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
