//! # Report Repository
//!
//! Persistence for report snapshots.
//!
//! Reports are point-in-time snapshots: inserted once, never updated,
//! soft-deletable for retention policy. Tenant scoping is transitive
//! through the owning session.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use till_core::{CashReport, ReportType};

/// Column list shared by every report SELECT.
const REPORT_COLUMNS: &str =
    "r.id, r.session_id, r.report_type, r.data, r.generated_at, r.deleted_at";

/// Filters for report listings.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    /// Only snapshots for this session.
    pub session_id: Option<String>,
    /// Only snapshots of this kind.
    pub report_type: Option<ReportType>,
}

/// Repository for report snapshot database operations.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Inserts a snapshot row.
    pub async fn insert(&self, conn: &mut SqliteConnection, report: &CashReport) -> DbResult<()> {
        debug!(
            id = %report.id,
            session_id = %report.session_id,
            report_type = ?report.report_type,
            "Inserting report snapshot"
        );

        sqlx::query(
            "INSERT INTO cash_reports (
                id, session_id, report_type, data, generated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&report.id)
        .bind(&report.session_id)
        .bind(report.report_type)
        .bind(&report.data)
        .bind(report.generated_at)
        .bind(report.deleted_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Gets a live snapshot by ID, tenant-scoped through the session join.
    pub async fn get(&self, tenant_id: i64, report_id: &str) -> DbResult<Option<CashReport>> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM cash_reports r \
             JOIN cash_sessions s ON s.id = r.session_id \
             WHERE r.id = ?1 AND s.tenant_id = ?2 \
               AND r.deleted_at IS NULL AND s.deleted_at IS NULL"
        );

        let report = sqlx::query_as::<_, CashReport>(&sql)
            .bind(report_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(report)
    }

    /// Lists live snapshots for a tenant, most recently generated first.
    pub async fn list(&self, tenant_id: i64, filter: &ReportFilter) -> DbResult<Vec<CashReport>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {REPORT_COLUMNS} FROM cash_reports r \
             JOIN cash_sessions s ON s.id = r.session_id \
             WHERE r.deleted_at IS NULL AND s.deleted_at IS NULL AND s.tenant_id = "
        ));
        qb.push_bind(tenant_id);

        if let Some(session_id) = &filter.session_id {
            qb.push(" AND r.session_id = ");
            qb.push_bind(session_id.clone());
        }
        if let Some(report_type) = filter.report_type {
            qb.push(" AND r.report_type = ");
            qb.push_bind(report_type);
        }

        qb.push(" ORDER BY r.generated_at DESC, r.id DESC");

        let reports = qb
            .build_query_as::<CashReport>()
            .fetch_all(&self.pool)
            .await?;

        Ok(reports)
    }

    /// Tombstones a snapshot. Tombstoned reports vanish from listings.
    pub async fn soft_delete(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: i64,
        report_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE cash_reports SET deleted_at = ?3
             WHERE id = ?1 AND deleted_at IS NULL
               AND session_id IN (
                   SELECT id FROM cash_sessions WHERE tenant_id = ?2
               )",
        )
        .bind(report_id)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use till_core::{CashSession, SessionStatus};

    async fn seed_session(db: &Database, tenant_id: i64) -> CashSession {
        let now = Utc::now();
        let session = CashSession {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id,
            session_number: 1,
            cashier_id: 7,
            opened_by: 7,
            status: SessionStatus::Open,
            initial_balance_cents: 10_000,
            expected_balance_cents: 10_000,
            actual_balance_cents: None,
            notes: None,
            opened_at: now,
            closed_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let mut tx = db.pool().begin().await.unwrap();
        db.sessions().insert(&mut tx, &session).await.unwrap();
        tx.commit().await.unwrap();
        session
    }

    fn sample_report(session_id: &str, report_type: ReportType) -> CashReport {
        CashReport {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            report_type,
            data: "{}".to_string(),
            generated_at: Utc::now(),
            deleted_at: None,
        }
    }

    async fn insert(db: &Database, report: &CashReport) {
        let mut tx = db.pool().begin().await.unwrap();
        db.reports().insert(&mut tx, report).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_list_and_filter() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = seed_session(&db, 1).await;

        insert(&db, &sample_report(&session.id, ReportType::CashDifference)).await;
        insert(&db, &sample_report(&session.id, ReportType::PaymentBreakdown)).await;

        let all = db.reports().list(1, &ReportFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let diffs = db
            .reports()
            .list(
                1,
                &ReportFilter {
                    report_type: Some(ReportType::CashDifference),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(diffs.len(), 1);

        // Other tenants see nothing.
        let other = db.reports().list(2, &ReportFilter::default()).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_soft_delete_hides_snapshot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = seed_session(&db, 1).await;

        let report = sample_report(&session.id, ReportType::CashDifference);
        insert(&db, &report).await;

        let mut tx = db.pool().begin().await.unwrap();
        let rows = db
            .reports()
            .soft_delete(&mut tx, 1, &report.id, Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(rows, 1);

        assert!(db.reports().get(1, &report.id).await.unwrap().is_none());
        assert!(db
            .reports()
            .list(1, &ReportFilter::default())
            .await
            .unwrap()
            .is_empty());
    }
}
