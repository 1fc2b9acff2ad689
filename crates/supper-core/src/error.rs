//! # Error Types
//!
//! Domain-specific error types for supper-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  supper-core errors (this file)                                        │
//! │  ├── CoreError        - Domain errors, lifecycle conflicts             │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  supper-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  ops-api errors (in app)                                               │
//! │  └── ApiError         - HTTP mapping (400 / 409 / 500)                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → client                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (codes, ids, ranges)
//! 3. Validation failures and lifecycle conflicts are distinct variants:
//!    the first maps to a client error, the second to a conflict, and they
//!    are never coerced into one another

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A lifecycle action was requested from a state that does not allow it.
    ///
    /// ## When This Occurs
    /// - `accept` on anything but a pending order
    /// - `deliver` before dispatch
    /// - any action on a delivered or canceled order
    #[error("cannot {action} an order that is {status}")]
    InvalidTransition { action: String, status: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These surface to the caller as client errors with a human-readable
/// reason and are never retried automatically.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A referenced code does not resolve to an active catalog entity.
    #[error("Invalid {field}: {code}")]
    UnknownCode { field: String, code: String },

    /// Style is not registered as allowed for the dinner.
    #[error("Style '{style}' is not allowed for dinner '{dinner}'")]
    StyleNotAllowed { style: String, dinner: String },

    /// Item options that do not belong to the target item, listing every
    /// offending id.
    #[error("Options {option_ids:?} are not valid for item '{item}'")]
    OptionsNotForItem {
        item: String,
        option_ids: Vec<String>,
    },

    /// Dinner options that do not belong to the target dinner's option
    /// groups, listing every offending id.
    #[error("Options {option_ids:?} are not valid for dinner '{dinner}'")]
    OptionsNotForDinner {
        dinner: String,
        option_ids: Vec<String>,
    },

    /// A default-item override names an item that is not a default of the
    /// dinner.
    #[error("Invalid default_overrides.code: {code}")]
    UnknownDefaultOverride { code: String },

    /// Override quantity outside [0, original default quantity].
    #[error("default_overrides.qty must be between 0 and {max} for code={code}")]
    OverrideQuantityOutOfRange { code: String, max: String },

    /// Quantity failed to parse or is out of range.
    #[error("{field} must be a non-negative decimal quantity")]
    InvalidQuantity { field: String },

    /// Unsupported lifecycle action name.
    #[error("Unsupported action: {action}")]
    UnsupportedAction { action: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::StyleNotAllowed {
            style: "grand".to_string(),
            dinner: "valentine".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Style 'grand' is not allowed for dinner 'valentine'"
        );

        let err = CoreError::InvalidTransition {
            action: "accept".to_string(),
            status: "preparing".to_string(),
        };
        assert_eq!(err.to_string(), "cannot accept an order that is preparing");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "customer_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
