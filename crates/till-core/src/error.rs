//! # Error Types
//!
//! Domain-level input validation errors for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Error Types                                │
//! │                                                                     │
//! │  till-core errors (this file)                                      │
//! │  └── ValidationError  - Input validation failures                  │
//! │                                                                     │
//! │  till-db errors (separate crate)                                   │
//! │  ├── DbError          - Database operation failures                │
//! │  └── RegisterError    - Engine errors: NotFound/Conflict/Validation│
//! │                                                                     │
//! │  Flow: ValidationError → RegisterError → HTTP layer status code    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include the field name in every message
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Most input shape validation happens upstream in the excluded HTTP layer;
/// the core re-asserts business-level validity defensively before any write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// A balance or magnitude that must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: &'static str },

    /// An amount that must not be zero.
    #[error("{field} must not be zero")]
    Zero { field: &'static str },
}

/// Convenience type alias for validation results.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::Required {
            field: "description",
        };
        assert_eq!(err.to_string(), "description is required");

        let err = ValidationError::Negative {
            field: "initial_balance",
        };
        assert_eq!(err.to_string(), "initial_balance must not be negative");

        let err = ValidationError::Zero { field: "amount" };
        assert_eq!(err.to_string(), "amount must not be zero");
    }
}
