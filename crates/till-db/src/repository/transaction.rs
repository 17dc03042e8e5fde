//! # Transaction Repository
//!
//! Persistence for the append-only cash transaction ledger.
//!
//! ## Aggregation Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Every aggregate here is the SOURCE OF TRUTH for reconciliation.    │
//! │                                                                     │
//! │  The session row caches expected_balance_cents for fast reads, but  │
//! │  the reconciliation engine always recomputes from these sums - the  │
//! │  cache is an optimization hint only.                                │
//! │                                                                     │
//! │  Every query joins through cash_sessions for tenant scoping and     │
//! │  filters tombstones on BOTH tables.                                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::DbResult;
use till_core::{CashTransaction, Money, PaymentMethod, TransactionType};

/// Column list shared by every transaction SELECT.
const TRANSACTION_COLUMNS: &str = "t.id, t.session_id, t.transaction_type, t.amount_cents, \
     t.payment_method, t.description, t.order_id, t.created_by, t.created_at, t.deleted_at";

/// Live-rows join through the owning session, tenant-scoped.
const FROM_SESSION_JOIN: &str = "FROM cash_transactions t \
     JOIN cash_sessions s ON s.id = t.session_id \
     WHERE s.tenant_id = ?1 AND t.session_id = ?2 \
       AND t.deleted_at IS NULL AND s.deleted_at IS NULL";

/// Repository for cash transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Inserts a ledger row. The ledger is append-only: there is no update
    /// and no hard delete.
    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        transaction: &CashTransaction,
    ) -> DbResult<()> {
        debug!(
            id = %transaction.id,
            session_id = %transaction.session_id,
            amount_cents = transaction.amount_cents,
            "Inserting cash transaction"
        );

        sqlx::query(
            "INSERT INTO cash_transactions (
                id, session_id, transaction_type, amount_cents, payment_method,
                description, order_id, created_by, created_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&transaction.id)
        .bind(&transaction.session_id)
        .bind(transaction.transaction_type)
        .bind(transaction.amount_cents)
        .bind(transaction.payment_method)
        .bind(&transaction.description)
        .bind(&transaction.order_id)
        .bind(transaction.created_by)
        .bind(transaction.created_at)
        .bind(transaction.deleted_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Lists a session's live transactions in posting order (audit trail).
    pub async fn list_for_session(
        &self,
        tenant_id: i64,
        session_id: &str,
    ) -> DbResult<Vec<CashTransaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} {FROM_SESSION_JOIN} ORDER BY t.created_at, t.id"
        );

        let transactions = sqlx::query_as::<_, CashTransaction>(&sql)
            .bind(tenant_id)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(transactions)
    }

    /// Sum of all signed live amounts for a session - the ledger's side of
    /// `expected = initial + Σ(amount)`.
    pub async fn sum_amounts(&self, tenant_id: i64, session_id: &str) -> DbResult<Money> {
        let sql = format!("SELECT COALESCE(SUM(t.amount_cents), 0) {FROM_SESSION_JOIN}");

        let cents: i64 = sqlx::query_scalar(&sql)
            .bind(tenant_id)
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(Money::from_cents(cents))
    }

    /// Count of live transactions for a session.
    pub async fn count(&self, tenant_id: i64, session_id: &str) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) {FROM_SESSION_JOIN}");

        let count: i64 = sqlx::query_scalar(&sql)
            .bind(tenant_id)
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Sum of signed live amounts of one transaction type.
    pub async fn sum_by_type(
        &self,
        tenant_id: i64,
        session_id: &str,
        transaction_type: TransactionType,
    ) -> DbResult<Money> {
        let sql = format!(
            "SELECT COALESCE(SUM(t.amount_cents), 0) {FROM_SESSION_JOIN} \
             AND t.transaction_type = ?3"
        );

        let cents: i64 = sqlx::query_scalar(&sql)
            .bind(tenant_id)
            .bind(session_id)
            .bind(transaction_type)
            .fetch_one(&self.pool)
            .await?;

        Ok(Money::from_cents(cents))
    }

    /// Sums of signed live amounts grouped by payment method.
    ///
    /// Rows without a payment method (expenses, manual moves) are excluded:
    /// they are drawer adjustments, not tendered payments.
    pub async fn sums_by_payment_method(
        &self,
        tenant_id: i64,
        session_id: &str,
    ) -> DbResult<BTreeMap<PaymentMethod, Money>> {
        let sql = format!(
            "SELECT t.payment_method, COALESCE(SUM(t.amount_cents), 0) \
             {FROM_SESSION_JOIN} \
             AND t.payment_method IS NOT NULL \
             GROUP BY t.payment_method"
        );

        let rows: Vec<(PaymentMethod, i64)> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(method, cents)| (method, Money::from_cents(cents)))
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
