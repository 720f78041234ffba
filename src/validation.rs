//! Rule Validation

use thiserror::Error;

/// Malformed rule parameters, rejected before a rule can enter a tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Percentage outside `[0, 1)`.
    #[error("percentage must be at least 0% and below 100%, got {0}%")]
    PercentOutOfRange(String),

    /// Free amount not strictly below the paid amount.
    #[error("free amount ({free}) must be lower than the paid amount ({per_x})")]
    FreeNotBelowPaid {
        /// Units given away.
        free: u32,
        /// Units that must be bought.
        per_x: u32,
    },

    /// A money threshold below zero.
    #[error("threshold for {subject} must not be negative")]
    NegativeThreshold {
        /// Product or category the threshold applies to.
        subject: String,
    },

    /// A money threshold in a currency other than the store's.
    #[error("threshold for {subject} is in {found}, expected {expected}")]
    CurrencyMismatch {
        /// Product or category the threshold applies to.
        subject: String,
        /// Threshold currency.
        found: &'static str,
        /// Store currency.
        expected: &'static str,
    },

    /// Empty product or category name.
    #[error("{0} name must not be empty")]
    EmptyTarget(&'static str),

    /// Quantity range with neither bound.
    #[error("quantity range needs a minimum or a maximum")]
    UnboundedRange,

    /// Quantity range whose minimum exceeds its maximum.
    #[error("quantity range minimum {min} exceeds maximum {max}")]
    InvertedRange {
        /// Lower bound.
        min: u64,
        /// Upper bound.
        max: u64,
    },

    /// Unknown composite operator name.
    #[error("unknown operator {0:?}, expected xor, or or and")]
    UnknownOperator(String),

    /// Unknown weekday name.
    #[error("unknown weekday {0:?}")]
    UnknownWeekday(String),

    /// Combining requires at least one rule.
    #[error("at least one rule id is required to combine")]
    NothingToCombine,
}

/// Reject empty product or category names.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyTarget`] when `name` is blank.
pub fn require_name(what: &'static str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        Err(ValidationError::EmptyTarget(what))
    } else {
        Ok(())
    }
}
