//! # Validation Module
//!
//! Business-rule validation for the register core.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Validation Layers                             │
//! │                                                                     │
//! │  Layer 1: HTTP layer (excluded from this workspace)                │
//! │  ├── Request schema / type validation                              │
//! │  └── Immediate caller feedback                                     │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: THIS MODULE - business rule validation                   │
//! │  ├── Non-negative balances                                         │
//! │  ├── Non-empty descriptions                                        │
//! │  └── Non-zero ledger amounts                                       │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Database (SQLite)                                        │
//! │  ├── NOT NULL / CHECK constraints                                  │
//! │  └── Partial unique index on the single open session               │
//! │                                                                     │
//! │  Defense in depth: each layer catches different errors             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::money::Money;

/// Maximum length of a transaction description (after category prefixing).
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Maximum length of session notes.
pub const MAX_NOTES_LEN: usize = 1000;

// =============================================================================
// Balance Validators
// =============================================================================

/// Validates a counted drawer balance (opening float or closing count).
///
/// ## Rules
/// - Must not be negative: a physical drawer cannot hold negative cash
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::validation::validate_counted_balance;
///
/// assert!(validate_counted_balance("initial_balance", Money::from_cents(10_000)).is_ok());
/// assert!(validate_counted_balance("initial_balance", Money::from_cents(-1)).is_err());
/// ```
pub fn validate_counted_balance(field: &'static str, balance: Money) -> ValidationResult<()> {
    if balance.is_negative() {
        return Err(ValidationError::Negative { field });
    }
    Ok(())
}

/// Validates a ledger transaction amount.
///
/// ## Rules
/// - Must not be zero: a zero movement has no effect on the drawer and
///   would only pollute the audit trail
pub fn validate_amount(amount: Money) -> ValidationResult<()> {
    if amount.is_zero() {
        return Err(ValidationError::Zero { field: "amount" });
    }
    Ok(())
}

// =============================================================================
// Text Validators
// =============================================================================

/// Validates a transaction description.
///
/// ## Rules
/// - Must not be empty (the ledger is an audit trail; every movement needs
///   a reason)
/// - At most [`MAX_DESCRIPTION_LEN`] characters
pub fn validate_description(description: &str) -> ValidationResult<()> {
    let description = description.trim();

    if description.is_empty() {
        return Err(ValidationError::Required {
            field: "description",
        });
    }

    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description",
            max: MAX_DESCRIPTION_LEN,
        });
    }

    Ok(())
}

/// Validates optional session notes.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    if let Some(notes) = notes {
        if notes.len() > MAX_NOTES_LEN {
            return Err(ValidationError::TooLong {
                field: "notes",
                max: MAX_NOTES_LEN,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
