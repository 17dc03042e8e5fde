//! # Transaction Ledger
//!
//! Append-only posting of monetary movements against an open session.
//!
//! ## Posting Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     post_transaction()                              │
//! │                                                                     │
//! │  1. Validate amount (non-zero) and description (non-empty)          │
//! │  2. BEGIN transaction                                               │
//! │  3. Load session (tenant-scoped)  ──missing──►  SessionNotFound     │
//! │  4. status == OPEN?               ──closed───►  SessionClosed       │
//! │  5. Normalize sign (EXPENSE / MANUAL_WITHDRAW → -abs)               │
//! │  6. INSERT ledger row                                               │
//! │  7. UPDATE cached expected_balance += amount  (guarded by OPEN)     │
//! │  8. COMMIT  (6 and 7 are never observably split)                    │
//! │                                                                     │
//! │  Once created, amount and type are immutable: corrections are new   │
//! │  offsetting transactions, never edits.                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;
use crate::register::{begin_write, RegisterError, RegisterResult};
use crate::repository::session::SessionRepository;
use crate::repository::transaction::TransactionRepository;
use till_core::validation::{validate_amount, validate_description};
use till_core::{CashTransaction, Money, PaymentMethod, TransactionType};

/// Input for posting a movement to the ledger.
///
/// `amount` is signed as supplied by the caller; the ledger applies the
/// sign normalization policy for forced-outflow types before storing.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub session_id: String,
    pub transaction_type: TransactionType,
    pub amount: Money,
    /// None for non-payment adjustments (expenses, manual moves).
    pub payment_method: Option<PaymentMethod>,
    pub description: String,
    pub created_by: i64,
    /// Prefixed into the description as `[Category] text` when present.
    pub category: Option<String>,
    /// Optional link to the originating order.
    pub order_id: Option<String>,
}

/// Append-only ledger of monetary movements.
#[derive(Debug, Clone)]
pub struct TransactionLedger {
    pool: SqlitePool,
    sessions: SessionRepository,
    transactions: TransactionRepository,
}

impl TransactionLedger {
    /// Creates a new TransactionLedger.
    pub fn new(pool: SqlitePool) -> Self {
        let sessions = SessionRepository::new(pool.clone());
        let transactions = TransactionRepository::new(pool.clone());
        TransactionLedger {
            pool,
            sessions,
            transactions,
        }
    }

    /// Posts a movement against an open session.
    ///
    /// ## Preconditions
    /// - the session exists for this tenant and is OPEN
    /// - `amount != 0`, `description` non-empty
    ///
    /// ## Atomicity
    /// The ledger insert and the cached `expected_balance` increment share
    /// one transaction; the increment is a guarded SQL `+=` so concurrent
    /// terminals posting against the same drawer never lose an update.
    pub async fn post_transaction(
        &self,
        tenant_id: i64,
        new: NewTransaction,
    ) -> RegisterResult<CashTransaction> {
        validate_amount(new.amount)?;
        validate_description(&new.description)?;

        // The length limit applies to the stored form, category prefix
        // included.
        let description = CashTransaction::compose_description(
            new.category.as_deref(),
            new.description.trim(),
        );
        validate_description(&description)?;

        let mut tx = begin_write(&self.pool).await?;

        let session = self
            .sessions
            .get_with(&mut tx, tenant_id, &new.session_id)
            .await?
            .ok_or_else(|| RegisterError::SessionNotFound {
                id: new.session_id.clone(),
            })?;

        if !session.is_open() {
            return Err(RegisterError::SessionClosed {
                id: new.session_id.clone(),
            });
        }

        let amount = new.transaction_type.normalize_amount(new.amount);
        let now = Utc::now();

        let record = CashTransaction {
            id: Uuid::new_v4().to_string(),
            session_id: new.session_id,
            transaction_type: new.transaction_type,
            amount_cents: amount.cents(),
            payment_method: new.payment_method,
            description,
            order_id: new.order_id,
            created_by: new.created_by,
            created_at: now,
            deleted_at: None,
        };

        self.transactions.insert(&mut tx, &record).await?;

        let rows = self
            .sessions
            .apply_ledger_amount(&mut tx, &record.session_id, amount.cents(), now)
            .await?;
        if rows == 0 {
            // Session was closed between our status check and the balance
            // bump; dropping the transaction rolls the insert back.
            return Err(RegisterError::SessionClosed {
                id: record.session_id,
            });
        }

        tx.commit().await.map_err(DbError::from)?;

        debug!(
            tenant_id,
            session_id = %record.session_id,
            transaction_type = ?record.transaction_type,
            amount = %amount,
            "Posted cash transaction"
        );

        Ok(record)
    }

    /// Lists a session's movements in posting order.
    ///
    /// Fails with `SessionNotFound` for unknown or cross-tenant sessions.
    pub async fn list_transactions(
        &self,
        tenant_id: i64,
        session_id: &str,
    ) -> RegisterResult<Vec<CashTransaction>> {
        self.require_session(tenant_id, session_id).await?;
        Ok(self
            .transactions
            .list_for_session(tenant_id, session_id)
            .await?)
    }

    /// Sum of signed amounts of one transaction type for a session.
    pub async fn sum_by_type(
        &self,
        tenant_id: i64,
        session_id: &str,
        transaction_type: TransactionType,
    ) -> RegisterResult<Money> {
        self.require_session(tenant_id, session_id).await?;
        Ok(self
            .transactions
            .sum_by_type(tenant_id, session_id, transaction_type)
            .await?)
    }

    /// Sums of signed amounts grouped by payment method.
    pub async fn sum_by_payment_method(
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

    async fn require_session(&self, tenant_id: i64, session_id: &str) -> RegisterResult<()> {
        self.sessions
            .get(tenant_id, session_id)
            .await?
            .ok_or_else(|| RegisterError::SessionNotFound {
                id: session_id.to_string(),
            })?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
