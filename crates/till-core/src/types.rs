//! # Domain Types
//!
//! Core domain types for the cash register subsystem.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                               │
//! │                                                                     │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌─────────────────┐  │
//! │  │  CashSession    │   │ CashTransaction  │   │   CashReport    │  │
//! │  │  ─────────────  │   │  ──────────────  │   │  ─────────────  │  │
//! │  │  id (UUID)      │   │  id (UUID)       │   │  id (UUID)      │  │
//! │  │  session_number │   │  session_id (FK) │   │  session_id(FK) │  │
//! │  │  status         │1:N│  type / amount   │1:N│  report_type    │  │
//! │  │  balances       │◄──│  payment_method  │◄──│  data (JSON)    │  │
//! │  └─────────────────┘   └──────────────────┘   └─────────────────┘  │
//! │                                                                     │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌─────────────────┐  │
//! │  │  SessionStatus  │   │ TransactionType  │   │ PaymentMethod   │  │
//! │  │  Open / Closed  │   │  Sale, Refund,   │   │  Cash, Card,    │  │
//! │  └─────────────────┘   │  Expense, ...    │   │  Digital, Other │  │
//! │                        └──────────────────┘   └─────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: `session_number` - human-readable, sequential per tenant
//!
//! Tenant/actor identifiers (`tenant_id`, `cashier_id`, `opened_by`,
//! `created_by`) are plain i64 values resolved by the excluded auth layer;
//! this crate never infers them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Session Status
// =============================================================================

/// The lifecycle state of a cash register session.
///
/// Two states only, and `Closed` is terminal - there is no reopen.
/// A session that is closed carries `closed_at` and `actual_balance_cents`,
/// set together exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Drawer is open and accepting transactions.
    Open,
    /// Drawer was counted and closed. Terminal state.
    Closed,
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Open
    }
}

// =============================================================================
// Transaction Type
// =============================================================================

/// The kind of monetary movement recorded against a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// A sale rung up against the drawer.
    Sale,
    /// Money returned to a customer. Caller supplies the sign (negative by
    /// convention); the ledger records it verbatim.
    Refund,
    /// A cancelled sale. Sign convention as for refunds.
    Cancellation,
    /// Gratuity added to the drawer.
    Tip,
    /// Manual addition of cash (e.g. change float top-up).
    ManualAdd,
    /// Manual removal of cash. Always stored negative.
    ManualWithdraw,
    /// A cash expense paid from the drawer. Always stored negative.
    Expense,
}

impl TransactionType {
    /// Whether this type is always an outflow regardless of the sign the
    /// caller passed in.
    #[inline]
    pub const fn is_forced_outflow(self) -> bool {
        matches!(self, TransactionType::Expense | TransactionType::ManualWithdraw)
    }

    /// Applies the sign normalization policy.
    ///
    /// ## Policy
    /// - `Expense` and `ManualWithdraw` are coerced to `-abs(amount)`,
    ///   even if the caller supplied a positive magnitude
    /// - every other type is recorded exactly as supplied
    ///
    /// ## Example
    /// ```rust
    /// use till_core::{Money, TransactionType};
    ///
    /// let stored = TransactionType::Expense.normalize_amount(Money::from_cents(2500));
    /// assert_eq!(stored.cents(), -2500);
    ///
    /// let sale = TransactionType::Sale.normalize_amount(Money::from_cents(5000));
    /// assert_eq!(sale.cents(), 5000);
    /// ```
    pub fn normalize_amount(self, amount: Money) -> Money {
        if self.is_forced_outflow() {
            -amount.abs()
        } else {
            amount
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a payment-type transaction was tendered.
///
/// Nullable on the transaction row: adjustments (expenses, manual moves)
/// carry no payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash in the drawer.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Wallet / QR / online payment.
    Digital,
    /// Anything else (vouchers, house accounts).
    Other,
}

// =============================================================================
// Report Type
// =============================================================================

/// The kind of persisted report snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    /// Per-session totals keyed to the close date.
    DailySummary,
    /// Expected vs. counted balance at close.
    CashDifference,
    /// Transaction sums grouped by payment method.
    PaymentBreakdown,
}

// =============================================================================
// Cash Session
// =============================================================================

/// One cashier shift from drawer-open to drawer-close.
///
/// ## Invariants
/// - exactly one session per (tenant, cashier) may be `Open` at any time
/// - `session_number` is assigned at creation as `max(tenant's) + 1` and is
///   never reused, even after a soft delete
/// - `closed_at` and `actual_balance_cents` are set together, once
/// - `expected_balance_cents` is a cached running total; the transaction
///   ledger remains the source of truth for reconciliation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashSession {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant (restaurant) this session belongs to.
    pub tenant_id: i64,

    /// Sequential business number, unique per tenant.
    pub session_number: i64,

    /// The operator who owns the drawer for this shift.
    pub cashier_id: i64,

    /// The principal who performed the open (may differ from the cashier,
    /// e.g. a manager opening a drawer for staff).
    pub opened_by: i64,

    /// Current lifecycle state.
    pub status: SessionStatus,

    /// Counted float at open, in cents. Never negative.
    pub initial_balance_cents: i64,

    /// Cached running total: initial + sum of signed transaction amounts.
    pub expected_balance_cents: i64,

    /// Physically counted cash at close. Null while open.
    pub actual_balance_cents: Option<i64>,

    /// Free-form operator notes.
    pub notes: Option<String>,

    /// When the drawer was opened.
    pub opened_at: DateTime<Utc>,

    /// When the drawer was closed. Null while open.
    pub closed_at: Option<DateTime<Utc>>,

    /// Row bookkeeping.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Tombstone for audit retention. Tombstoned sessions are excluded from
    /// every default query and aggregation.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl CashSession {
    /// Returns the opening float as Money.
    #[inline]
    pub fn initial_balance(&self) -> Money {
        Money::from_cents(self.initial_balance_cents)
    }

    /// Returns the cached expected balance as Money.
    #[inline]
    pub fn expected_balance(&self) -> Money {
        Money::from_cents(self.expected_balance_cents)
    }

    /// Returns the counted balance as Money, if the session was closed.
    #[inline]
    pub fn actual_balance(&self) -> Option<Money> {
        self.actual_balance_cents.map(Money::from_cents)
    }

    /// Checks whether the session is still accepting transactions.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

// =============================================================================
// Cash Transaction
// =============================================================================

/// One monetary movement in a session's ledger.
///
/// Append-only: once created, amount and type are immutable. Corrections are
/// new offsetting transactions, never edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashTransaction {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning session.
    pub session_id: String,

    /// Kind of movement.
    pub transaction_type: TransactionType,

    /// Signed amount in cents: positive inflow, negative outflow.
    /// Sign normalization happened at creation time.
    pub amount_cents: i64,

    /// How the payment was tendered. Null for non-payment adjustments.
    pub payment_method: Option<PaymentMethod>,

    /// Human-readable description. When a category was supplied it is
    /// prefixed as `[Category] text`.
    pub description: String,

    /// Optional link to the originating order.
    pub order_id: Option<String>,

    /// The principal who recorded the movement.
    pub created_by: i64,

    /// When the movement was recorded.
    pub created_at: DateTime<Utc>,

    /// Tombstone. The ledger is append-only in normal operation, but the
    /// exclusion filter is still applied to every aggregation by construction.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl CashTransaction {
    /// Returns the signed amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Builds the stored description from an optional category.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::types::CashTransaction;
    ///
    /// let d = CashTransaction::compose_description(Some("Supplies"), "Printer paper");
    /// assert_eq!(d, "[Supplies] Printer paper");
    ///
    /// let plain = CashTransaction::compose_description(None, "Printer paper");
    /// assert_eq!(plain, "Printer paper");
    /// ```
    pub fn compose_description(category: Option<&str>, description: &str) -> String {
        match category {
            Some(category) if !category.trim().is_empty() => {
                format!("[{}] {}", category.trim(), description)
            }
            _ => description.to_string(),
        }
    }
}

// =============================================================================
// Cash Report
// =============================================================================

/// A persisted point-in-time report snapshot.
///
/// Reports are never recomputed in place; callers regenerate on demand and
/// each generation inserts a new row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashReport {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Session this snapshot describes.
    pub session_id: String,

    /// Kind of snapshot.
    pub report_type: ReportType,

    /// Structured payload, serialized as JSON.
    pub data: String,

    /// When the snapshot was computed.
    pub generated_at: DateTime<Utc>,

    /// Tombstone for retention policy.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl CashReport {
    /// Deserializes the payload into a typed structure.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.data)
    }
}

// =============================================================================
// Cash Difference
// =============================================================================

/// The reconciliation result for a closed session.
///
/// `expected` is recomputed from the ledger, never read from the session's
/// cached field; the cache is an optimization hint only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashDifference {
    pub session_id: String,
    pub session_number: i64,
    pub initial_balance_cents: i64,
    /// `initial_balance + Σ(signed transaction amounts)`, from the ledger.
    pub expected_cents: i64,
    /// Physically counted cash reported at close.
    pub actual_cents: i64,
    /// `actual - expected`. Negative = shortage, positive = overage.
    pub difference_cents: i64,
    /// Number of live transactions that contributed to `expected`.
    pub transaction_count: i64,
}

impl CashDifference {
    #[inline]
    pub fn expected(&self) -> Money {
        Money::from_cents(self.expected_cents)
    }

    #[inline]
    pub fn actual(&self) -> Money {
        Money::from_cents(self.actual_cents)
    }

    #[inline]
    pub fn difference(&self) -> Money {
        Money::from_cents(self.difference_cents)
    }

    /// Drawer contained less than the ledger says it should.
    #[inline]
    pub fn is_shortage(&self) -> bool {
        self.difference_cents < 0
    }

    /// Drawer contained more than the ledger says it should.
    #[inline]
    pub fn is_overage(&self) -> bool {
        self.difference_cents > 0
    }

    /// Counted cash matched the ledger exactly.
    #[inline]
    pub fn is_reconciled(&self) -> bool {
        self.difference_cents == 0
    }
}

// =============================================================================
// Daily Summary
// =============================================================================

/// Per-session sales totals keyed to the close date.
///
/// One entry per closed session; the aggregator orders entries by day
/// ascending, then `opened_at` ascending within a day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DailySummary {
    /// Calendar date of the session's close (UTC).
    pub date: NaiveDate,
    pub session_id: String,
    pub session_number: i64,
    pub cashier_id: i64,
    /// Sum of SALE-type transaction amounts, in cents.
    pub total_sales_cents: i64,
    /// Count of all live transactions in the session.
    pub total_transactions: i64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

impl DailySummary {
    /// Returns the sales total as Money.
    #[inline]
    pub fn total_sales(&self) -> Money {
        Money::from_cents(self.total_sales_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_status_default() {
        assert_eq!(SessionStatus::default(), SessionStatus::Open);
    }

    #[test]
    fn test_forced_outflow_types() {
        assert!(TransactionType::Expense.is_forced_outflow());
        assert!(TransactionType::ManualWithdraw.is_forced_outflow());
        assert!(!TransactionType::Sale.is_forced_outflow());
        assert!(!TransactionType::Refund.is_forced_outflow());
        assert!(!TransactionType::Tip.is_forced_outflow());
    }

    #[test]
    fn test_normalize_amount_coerces_outflows() {
        // Positive magnitude supplied for an expense - stored negative.
        let stored = TransactionType::Expense.normalize_amount(Money::from_cents(2500));
        assert_eq!(stored.cents(), -2500);

        // Already negative stays negative (no double flip).
        let stored = TransactionType::ManualWithdraw.normalize_amount(Money::from_cents(-900));
        assert_eq!(stored.cents(), -900);
    }

    #[test]
    fn test_normalize_amount_trusts_caller_for_other_types() {
        let refund = TransactionType::Refund.normalize_amount(Money::from_cents(-1500));
        assert_eq!(refund.cents(), -1500);

        let sale = TransactionType::Sale.normalize_amount(Money::from_cents(5000));
        assert_eq!(sale.cents(), 5000);
    }

    #[test]
    fn test_compose_description() {
        assert_eq!(
            CashTransaction::compose_description(Some("Supplies"), "Printer paper"),
            "[Supplies] Printer paper"
        );
        assert_eq!(
            CashTransaction::compose_description(None, "Printer paper"),
            "Printer paper"
        );
        // Blank category behaves as no category.
        assert_eq!(
            CashTransaction::compose_description(Some("  "), "Printer paper"),
            "Printer paper"
        );
    }

    #[test]
    fn test_cash_difference_classification() {
        let mut diff = CashDifference {
            session_id: "s".to_string(),
            session_number: 1,
            initial_balance_cents: 10_000,
            expected_cents: 15_000,
            actual_cents: 14_500,
            difference_cents: -500,
            transaction_count: 1,
        };
        assert!(diff.is_shortage());
        assert!(!diff.is_overage());

        diff.difference_cents = 0;
        assert!(diff.is_reconciled());

        diff.difference_cents = 200;
        assert!(diff.is_overage());
    }

    #[test]
    fn test_report_payload_round_trip() {
        let diff = CashDifference {
            session_id: "s".to_string(),
            session_number: 7,
            initial_balance_cents: 10_000,
            expected_cents: 15_000,
            actual_cents: 14_500,
            difference_cents: -500,
            transaction_count: 3,
        };

        let report = CashReport {
            id: "r".to_string(),
            session_id: "s".to_string(),
            report_type: ReportType::CashDifference,
            data: serde_json::to_string(&diff).unwrap(),
            generated_at: Utc::now(),
            deleted_at: None,
        };

        let parsed: CashDifference = report.payload().unwrap();
        assert_eq!(parsed, diff);
    }
}
