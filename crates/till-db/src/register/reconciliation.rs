//! # Reconciliation Engine
//!
//! Expected vs. counted balance for closed sessions, and payment method
//! breakdowns for open drawers.
//!
//! ## Source of Truth
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  The session row caches expected_balance_cents, but this engine     │
//! │  ALWAYS recomputes expected from the transaction ledger:            │
//! │                                                                     │
//! │      expected   = initial_balance + Σ(signed amounts)               │
//! │      difference = actual - expected                                 │
//! │                                                                     │
//! │  negative ⇒ shortage · positive ⇒ overage · zero ⇒ reconciled      │
//! │                                                                     │
//! │  The cached field is an optimization hint; a reconciliation-        │
//! │  critical number never trusts it, so any cache drift bug cannot     │
//! │  corrupt the difference report.                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

use crate::error::DbError;
use crate::register::{begin_write, RegisterError, RegisterResult};
use crate::repository::report::ReportRepository;
use crate::repository::session::SessionRepository;
use crate::repository::transaction::TransactionRepository;
use till_core::{CashDifference, CashReport, CashSession, Money, PaymentMethod, ReportType};

/// Computes drawer reconciliation from the ledger.
#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    pool: SqlitePool,
    sessions: SessionRepository,
    transactions: TransactionRepository,
    reports: ReportRepository,
}

impl ReconciliationEngine {
    /// Creates a new ReconciliationEngine.
    pub fn new(pool: SqlitePool) -> Self {
        let sessions = SessionRepository::new(pool.clone());
        let transactions = TransactionRepository::new(pool.clone());
        let reports = ReportRepository::new(pool.clone());
        ReconciliationEngine {
            pool,
            sessions,
            transactions,
            reports,
        }
    }

    /// Generates the cash difference report for a CLOSED session.
    ///
    /// Recomputes `expected` from the ledger, compares it to the counted
    /// balance, persists a CASH_DIFFERENCE snapshot and returns the
    /// computed figures. Pure given fixed ledger state: generating twice
    /// with no intervening writes yields identical numbers.
    ///
    /// ## Errors
    /// - `SessionNotFound` if the session does not exist for this tenant
    /// - `SessionStillOpen` (validation) if it has not been counted yet
    pub async fn generate_cash_difference_report(
        &self,
        tenant_id: i64,
        session_id: &str,
    ) -> RegisterResult<CashDifference> {
        let session = self.require_session(tenant_id, session_id).await?;

        let actual_cents = match session.actual_balance_cents {
            Some(cents) if !session.is_open() => cents,
            _ => {
                return Err(RegisterError::SessionStillOpen {
                    id: session_id.to_string(),
                })
            }
        };

        let ledger_sum = self.transactions.sum_amounts(tenant_id, session_id).await?;
        let transaction_count = self.transactions.count(tenant_id, session_id).await?;

        let expected = session.initial_balance() + ledger_sum;
        let difference = Money::from_cents(actual_cents) - expected;

        let summary = CashDifference {
            session_id: session.id.clone(),
            session_number: session.session_number,
            initial_balance_cents: session.initial_balance_cents,
            expected_cents: expected.cents(),
            actual_cents,
            difference_cents: difference.cents(),
            transaction_count,
        };

        self.persist_snapshot(&session.id, ReportType::CashDifference, &summary)
            .await?;

        info!(
            tenant_id,
            session_number = session.session_number,
            expected = %expected,
            actual = %Money::from_cents(actual_cents),
            difference = %difference,
            "Generated cash difference report"
        );

        Ok(summary)
    }

    /// Transaction sums grouped by payment method.
    ///
    /// Works for open and closed sessions - this backs the live "how much
    /// is in the drawer right now" display. Read-only; nothing persisted.
    pub async fn generate_payment_breakdown(
        &self,
        tenant_id: i64,
        session_id: &str,
    ) -> RegisterResult<BTreeMap<PaymentMethod, Money>> {
        self.require_session(tenant_id, session_id).await?;
        Ok(self
            .transactions
            .sums_by_payment_method(tenant_id, session_id)
            .await?)
    }

    /// Persists a PAYMENT_BREAKDOWN snapshot of the current breakdown and
    /// returns the stored report.
    pub async fn snapshot_payment_breakdown(
        &self,
        tenant_id: i64,
        session_id: &str,
    ) -> RegisterResult<CashReport> {
        let session = self.require_session(tenant_id, session_id).await?;

        let breakdown = self
            .transactions
            .sums_by_payment_method(tenant_id, session_id)
            .await?;

        self.persist_snapshot(&session.id, ReportType::PaymentBreakdown, &breakdown)
            .await
    }

    async fn require_session(
        &self,
        tenant_id: i64,
        session_id: &str,
    ) -> RegisterResult<CashSession> {
        self.sessions
            .get(tenant_id, session_id)
            .await?
            .ok_or_else(|| RegisterError::SessionNotFound {
                id: session_id.to_string(),
            })
    }

    async fn persist_snapshot<T: serde::Serialize>(
        &self,
        session_id: &str,
        report_type: ReportType,
        payload: &T,
    ) -> RegisterResult<CashReport> {
        let report = CashReport {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            report_type,
            data: serde_json::to_string(payload)?,
            generated_at: Utc::now(),
            deleted_at: None,
        };

        let mut tx = begin_write(&self.pool).await?;
        self.reports.insert(&mut tx, &report).await?;
        tx.commit().await.map_err(DbError::from)?;

        Ok(report)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::ledger::NewTransaction;
    use crate::register::testutil::test_db;
    use crate::register::ErrorKind;
    use crate::repository::report::ReportFilter;
    use till_core::TransactionType;

    #[tokio::test]
    async fn test_full_shift_reconciliation_with_shortage() {
        // Scenario: open at $100.00, one $50.00 cash sale, count $145.00.
        let db = test_db().await;
        let session = db
            .lifecycle()
            .open_session(1, 7, 7, Money::from_cents(10_000), None)
            .await
            .unwrap();

        db.ledger()
            .post_transaction(
                1,
                NewTransaction {
                    session_id: session.id.clone(),
                    transaction_type: TransactionType::Sale,
                    amount: Money::from_cents(5_000),
                    payment_method: Some(PaymentMethod::Cash),
                    description: "table 4".to_string(),
                    created_by: 7,
                    category: None,
                    order_id: None,
                },
            )
            .await
            .unwrap();

        let closed = db
            .lifecycle()
            .close_session(1, &session.id, Money::from_cents(14_500), None)
            .await
            .unwrap();
        assert_eq!(closed.expected_balance_cents, 15_000);

        let diff = db
            .reconciliation()
            .generate_cash_difference_report(1, &session.id)
            .await
            .unwrap();

        assert_eq!(diff.expected_cents, 15_000);
        assert_eq!(diff.actual_cents, 14_500);
        assert_eq!(diff.difference_cents, -500);
        assert!(diff.is_shortage());
        assert_eq!(diff.transaction_count, 1);

        // A snapshot was persisted.
        let snapshots = db
            .report_aggregator()
            .get_reports(
                1,
                &ReportFilter {
                    session_id: Some(session.id.clone()),
                    report_type: Some(ReportType::CashDifference),
                },
            )
            .await
            .unwrap();
        assert_eq!(snapshots.len(), 1);
        let parsed: CashDifference = snapshots[0].payload().unwrap();
        assert_eq!(parsed, diff);
    }

    #[tokio::test]
    async fn test_reconciled_when_count_matches() {
        let db = test_db().await;
        let session = db
            .lifecycle()
            .open_session(1, 7, 7, Money::from_cents(10_000), None)
            .await
            .unwrap();

        // Zero transactions, counted exactly the float.
        db.lifecycle()
            .close_session(1, &session.id, Money::from_cents(10_000), None)
            .await
            .unwrap();

        let diff = db
            .reconciliation()
            .generate_cash_difference_report(1, &session.id)
            .await
            .unwrap();
        assert!(diff.is_reconciled());
        assert_eq!(diff.difference_cents, 0);
        assert_eq!(diff.transaction_count, 0);
    }

    #[tokio::test]
    async fn test_difference_report_requires_closed_session() {
        let db = test_db().await;
        let session = db
            .lifecycle()
            .open_session(1, 7, 7, Money::from_cents(10_000), None)
            .await
            .unwrap();

        let err = db
            .reconciliation()
            .generate_cash_difference_report(1, &session.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_difference_report_missing_session_is_not_found() {
        let db = test_db().await;

        let err = db
            .reconciliation()
            .generate_cash_difference_report(1, "no-such-session")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_generation_is_pure_given_fixed_ledger() {
        let db = test_db().await;
        let session = db
            .lifecycle()
            .open_session(1, 7, 7, Money::from_cents(10_000), None)
            .await
            .unwrap();
        db.ledger()
            .post_transaction(
                1,
                NewTransaction {
                    session_id: session.id.clone(),
                    transaction_type: TransactionType::Expense,
                    amount: Money::from_cents(2_500),
                    payment_method: None,
                    description: "Office supplies".to_string(),
                    created_by: 7,
                    category: None,
                    order_id: None,
                },
            )
            .await
            .unwrap();
        db.lifecycle()
            .close_session(1, &session.id, Money::from_cents(7_000), None)
            .await
            .unwrap();

        let engine = db.reconciliation();
        let first = engine
            .generate_cash_difference_report(1, &session.id)
            .await
            .unwrap();
        let second = engine
            .generate_cash_difference_report(1, &session.id)
            .await
            .unwrap();

        // Two snapshot rows, identical numbers.
        assert_eq!(first, second);
        assert_eq!(first.expected_cents, 7_500);
        assert_eq!(first.difference_cents, -500);
    }

    #[tokio::test]
    async fn test_expected_recomputed_from_ledger_not_cache() {
        let db = test_db().await;
        let session = db
            .lifecycle()
            .open_session(1, 7, 7, Money::from_cents(10_000), None)
            .await
            .unwrap();
        db.ledger()
            .post_transaction(
                1,
                NewTransaction {
                    session_id: session.id.clone(),
                    transaction_type: TransactionType::Sale,
                    amount: Money::from_cents(5_000),
                    payment_method: Some(PaymentMethod::Cash),
                    description: "sale".to_string(),
                    created_by: 7,
                    category: None,
                    order_id: None,
                },
            )
            .await
            .unwrap();
        db.lifecycle()
            .close_session(1, &session.id, Money::from_cents(15_000), None)
            .await
            .unwrap();

        // Simulate cache drift: corrupt the cached field directly.
        sqlx::query("UPDATE cash_sessions SET expected_balance_cents = 99 WHERE id = ?1")
            .bind(&session.id)
            .execute(db.pool())
            .await
            .unwrap();

        let diff = db
            .reconciliation()
            .generate_cash_difference_report(1, &session.id)
            .await
            .unwrap();

        // The report trusts the ledger, not the drifted cache.
        assert_eq!(diff.expected_cents, 15_000);
        assert!(diff.is_reconciled());
    }

    #[tokio::test]
    async fn test_tombstoned_transaction_is_excluded_from_difference_report() {
        let db = test_db().await;
        let session = db
            .lifecycle()
            .open_session(1, 7, 7, Money::from_cents(10_000), None)
            .await
            .unwrap();

        db.ledger()
            .post_transaction(
                1,
                NewTransaction {
                    session_id: session.id.clone(),
                    transaction_type: TransactionType::Sale,
                    amount: Money::from_cents(5_000),
                    payment_method: Some(PaymentMethod::Cash),
                    description: "table 4".to_string(),
                    created_by: 7,
                    category: None,
                    order_id: None,
                },
            )
            .await
            .unwrap();
        let voided = db
            .ledger()
            .post_transaction(
                1,
                NewTransaction {
                    session_id: session.id.clone(),
                    transaction_type: TransactionType::Sale,
                    amount: Money::from_cents(2_000),
                    payment_method: Some(PaymentMethod::Cash),
                    description: "rung twice".to_string(),
                    created_by: 7,
                    category: None,
                    order_id: None,
                },
            )
            .await
            .unwrap();

        // Void the duplicate out-of-band, then count the drawer at what the
        // live ledger says.
        sqlx::query("UPDATE cash_transactions SET deleted_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(&voided.id)
            .execute(db.pool())
            .await
            .unwrap();
        db.lifecycle()
            .close_session(1, &session.id, Money::from_cents(15_000), None)
            .await
            .unwrap();

        let diff = db
            .reconciliation()
            .generate_cash_difference_report(1, &session.id)
            .await
            .unwrap();

        // The voided row contributes to neither expected nor the count.
        assert_eq!(diff.expected_cents, 15_000);
        assert_eq!(diff.transaction_count, 1);
        assert!(diff.is_reconciled());
    }

    #[tokio::test]
    async fn test_payment_breakdown_and_snapshot() {
        let db = test_db().await;
        let session = db
            .lifecycle()
            .open_session(1, 7, 7, Money::from_cents(10_000), None)
            .await
            .unwrap();

        for (method, cents) in [
            (PaymentMethod::Cash, 5_000),
            (PaymentMethod::Cash, 3_000),
            (PaymentMethod::Digital, 1_500),
        ] {
            db.ledger()
                .post_transaction(
                    1,
                    NewTransaction {
                        session_id: session.id.clone(),
                        transaction_type: TransactionType::Sale,
                        amount: Money::from_cents(cents),
                        payment_method: Some(method),
                        description: "sale".to_string(),
                        created_by: 7,
                        category: None,
                        order_id: None,
                    },
                )
                .await
                .unwrap();
        }

        // Works on an OPEN session (live drawer display).
        let breakdown = db
            .reconciliation()
            .generate_payment_breakdown(1, &session.id)
            .await
            .unwrap();
        assert_eq!(breakdown[&PaymentMethod::Cash].cents(), 8_000);
        assert_eq!(breakdown[&PaymentMethod::Digital].cents(), 1_500);
        assert!(!breakdown.contains_key(&PaymentMethod::Card));

        let snapshot = db
            .reconciliation()
            .snapshot_payment_breakdown(1, &session.id)
            .await
            .unwrap();
        assert_eq!(snapshot.report_type, ReportType::PaymentBreakdown);
        let parsed: BTreeMap<PaymentMethod, Money> = snapshot.payload().unwrap();
        assert_eq!(parsed, breakdown);
    }
}
