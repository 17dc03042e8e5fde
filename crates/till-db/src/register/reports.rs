//! # Report Aggregator
//!
//! Cross-session reporting: daily summaries computed live from closed
//! sessions, plus access to the persisted snapshot store.
//!
//! ## Two Report Flavors
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  LIVE        get_daily_summary_reports() aggregates straight from   │
//! │              the session + transaction tables on every call.        │
//! │              Always current, never stale.                           │
//! │                                                                     │
//! │  SNAPSHOT    cash_reports rows written at reconciliation time       │
//! │              (or via snapshot_daily_summary). Frozen JSON; what     │
//! │              the numbers were when the drawer was counted.          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::error::DbError;
use crate::register::{begin_write, RegisterError, RegisterResult};
use crate::repository::report::{ReportFilter, ReportRepository};
use crate::repository::session::SessionRepository;
use till_core::{CashReport, DailySummary, ReportType};

/// Aggregates closed sessions into business-facing reports.
#[derive(Debug, Clone)]
pub struct ReportAggregator {
    pool: SqlitePool,
    sessions: SessionRepository,
    reports: ReportRepository,
}

impl ReportAggregator {
    /// Creates a new ReportAggregator.
    pub fn new(pool: SqlitePool) -> Self {
        let sessions = SessionRepository::new(pool.clone());
        let reports = ReportRepository::new(pool.clone());
        ReportAggregator {
            pool,
            sessions,
            reports,
        }
    }

    /// One summary row per CLOSED session, keyed to the close date.
    ///
    /// Open sessions are excluded (their totals are still moving).
    /// `total_sales` counts only SALE-type transactions; `total_transactions`
    /// counts every live transaction including expenses and adjustments.
    /// Date filters are inclusive on both ends and compare against the
    /// close date. Ordered chronologically: close date, then open time.
    pub async fn get_daily_summary_reports(
        &self,
        tenant_id: i64,
        cashier_id: Option<i64>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> RegisterResult<Vec<DailySummary>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT date(s.closed_at) AS date, \
                    s.id AS session_id, \
                    s.session_number, \
                    s.cashier_id, \
                    COALESCE(SUM(CASE WHEN t.transaction_type = 'sale' \
                                      THEN t.amount_cents END), 0) AS total_sales_cents, \
                    COUNT(t.id) AS total_transactions, \
                    s.opened_at, \
                    s.closed_at \
             FROM cash_sessions s \
             LEFT JOIN cash_transactions t \
                    ON t.session_id = s.id AND t.deleted_at IS NULL \
             WHERE s.tenant_id = ",
        );
        qb.push_bind(tenant_id);
        qb.push(" AND s.status = 'closed' AND s.deleted_at IS NULL");

        if let Some(cashier_id) = cashier_id {
            qb.push(" AND s.cashier_id = ");
            qb.push_bind(cashier_id);
        }
        if let Some(from) = date_from {
            qb.push(" AND date(s.closed_at) >= ");
            qb.push_bind(from.to_string());
        }
        if let Some(to) = date_to {
            qb.push(" AND date(s.closed_at) <= ");
            qb.push_bind(to.to_string());
        }

        qb.push(" GROUP BY s.id ORDER BY date(s.closed_at) ASC, s.opened_at ASC");

        let summaries = qb
            .build_query_as::<DailySummary>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(summaries)
    }

    /// Persisted report snapshots, newest first.
    pub async fn get_reports(
        &self,
        tenant_id: i64,
        filter: &ReportFilter,
    ) -> RegisterResult<Vec<CashReport>> {
        Ok(self.reports.list(tenant_id, filter).await?)
    }

    /// Freezes the daily summary of one CLOSED session into the snapshot
    /// store and returns the stored report.
    pub async fn snapshot_daily_summary(
        &self,
        tenant_id: i64,
        session_id: &str,
    ) -> RegisterResult<CashReport> {
        let session = self
            .sessions
            .get(tenant_id, session_id)
            .await?
            .ok_or_else(|| RegisterError::SessionNotFound {
                id: session_id.to_string(),
            })?;
        if session.is_open() {
            return Err(RegisterError::SessionStillOpen {
                id: session_id.to_string(),
            });
        }

        let summaries = self
            .get_daily_summary_reports(tenant_id, Some(session.cashier_id), None, None)
            .await?;
        let summary = summaries
            .into_iter()
            .find(|s| s.session_id == session.id)
            .ok_or_else(|| RegisterError::SessionNotFound {
                id: session_id.to_string(),
            })?;

        let report = CashReport {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            report_type: ReportType::DailySummary,
            data: serde_json::to_string(&summary)?,
            generated_at: Utc::now(),
            deleted_at: None,
        };

        let mut tx = begin_write(&self.pool).await?;
        self.reports.insert(&mut tx, &report).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            tenant_id,
            session_number = session.session_number,
            "Snapshotted daily summary"
        );

        Ok(report)
    }

    /// Soft-deletes a persisted snapshot.
    ///
    /// ## Errors
    /// - `ReportNotFound` if the report does not exist for this tenant or
    ///   was already deleted
    pub async fn delete_report(&self, tenant_id: i64, report_id: &str) -> RegisterResult<()> {
        let mut tx = begin_write(&self.pool).await?;
        let rows = self
            .reports
            .soft_delete(&mut tx, tenant_id, report_id, Utc::now())
            .await?;
        if rows == 0 {
            return Err(RegisterError::ReportNotFound {
                id: report_id.to_string(),
            });
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(tenant_id, report_id, "Deleted report snapshot");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
