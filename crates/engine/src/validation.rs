//! Per-column value validation
//!
//! Constrains what can be written into a cell by an edit, a paste or a fill:
//! allowed-value lists (enum columns), whole number bounds and text length
//! bounds.
//!
//! ## Case Sensitivity
//!
//! List matching is case-sensitive after trimming. "High" != "high". The
//! server stores enum values verbatim, so anything looser would let an
//! out-of-domain value through.

use std::num::IntErrorKind;

use serde::{Deserialize, Serialize};

// ============================================================================
// Core Types
// ============================================================================

/// A validation rule that constrains cell input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationRule {
    /// No validation (accept any value).
    #[default]
    AnyValue,
    /// Restrict to a list of allowed values.
    List { values: Vec<String> },
    /// Restrict to integers within bounds.
    WholeNumber(NumericConstraint),
    /// Restrict text to character count bounds.
    TextLength(NumericConstraint),
}

impl ValidationRule {
    /// Create a list validation rule from inline values.
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List {
            values: values.into_iter().map(|s| s.into().trim().to_string()).collect(),
        }
    }

    /// Allowed values for list rules.
    pub fn allowed_values(&self) -> Option<&[String]> {
        match self {
            Self::List { values } => Some(values),
            _ => None,
        }
    }

    /// Validate `value` against this rule.
    ///
    /// Blank input is accepted when `allow_blank` is set, regardless of the
    /// rule type.
    pub fn validate(&self, value: &str, allow_blank: bool) -> ValidationResult {
        if value.trim().is_empty() {
            return if allow_blank || matches!(self, Self::AnyValue) {
                ValidationResult::Valid
            } else {
                ValidationResult::invalid("A value is required")
            };
        }

        match self {
            Self::AnyValue => ValidationResult::Valid,
            Self::List { values } => {
                let trimmed = value.trim();
                if values.iter().any(|item| item == trimmed) {
                    ValidationResult::Valid
                } else {
                    ValidationResult::invalid(format!(
                        "'{}' is not one of: {}",
                        trimmed,
                        values.join(", ")
                    ))
                }
            }
            Self::WholeNumber(constraint) => match parse_whole_number(value) {
                Ok(n) if constraint.eval(n as f64) => ValidationResult::Valid,
                Ok(_) => ValidationResult::invalid(format!("Value must be {}", constraint)),
                Err(e) => ValidationResult::invalid(e.to_string()),
            },
            Self::TextLength(constraint) => {
                let len = value.chars().count() as f64;
                if constraint.eval(len) {
                    ValidationResult::Valid
                } else {
                    ValidationResult::invalid(format!("Length must be {}", constraint))
                }
            }
        }
    }
}

/// Numeric constraint for validation (used by WholeNumber and TextLength).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericConstraint {
    /// The comparison operator.
    pub operator: ComparisonOperator,
    /// First value (required for all operators).
    pub value1: f64,
    /// Second value (required for Between/NotBetween).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<f64>,
}

impl NumericConstraint {
    /// Create a "between" constraint (inclusive).
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            operator: ComparisonOperator::Between,
            value1: min,
            value2: Some(max),
        }
    }

    /// Create a "greater than or equal" constraint.
    pub fn greater_than_or_equal(value: f64) -> Self {
        Self {
            operator: ComparisonOperator::GreaterThanOrEqual,
            value1: value,
            value2: None,
        }
    }

    /// Create a "less than or equal" constraint.
    pub fn less_than_or_equal(value: f64) -> Self {
        Self {
            operator: ComparisonOperator::LessThanOrEqual,
            value1: value,
            value2: None,
        }
    }

    pub fn eval(&self, x: f64) -> bool {
        eval_numeric_constraint(x, self.operator, self.value1, self.value2)
    }
}

impl std::fmt::Display for NumericConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let a = self.value1;
        let b = self.value2.unwrap_or(a);
        match self.operator {
            ComparisonOperator::Between => write!(f, "between {} and {}", a, b),
            ComparisonOperator::NotBetween => write!(f, "not between {} and {}", a, b),
            ComparisonOperator::EqualTo => write!(f, "equal to {}", a),
            ComparisonOperator::NotEqualTo => write!(f, "not equal to {}", a),
            ComparisonOperator::GreaterThan => write!(f, "greater than {}", a),
            ComparisonOperator::LessThan => write!(f, "less than {}", a),
            ComparisonOperator::GreaterThanOrEqual => write!(f, "at least {}", a),
            ComparisonOperator::LessThanOrEqual => write!(f, "at most {}", a),
        }
    }
}

/// Comparison operator for numeric constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Between,
    NotBetween,
    EqualTo,
    NotEqualTo,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

// ============================================================================
// Numeric Validation Helpers
// ============================================================================

/// Error when parsing whole number input.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericParseError {
    /// Input is empty (after trimming whitespace).
    Empty,
    /// Input contains invalid characters or format.
    InvalidFormat,
    /// Input has a fractional part.
    FractionalNotAllowed,
    /// Input does not fit a 64-bit integer.
    OutOfRange,
}

impl std::fmt::Display for NumericParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumericParseError::Empty => write!(f, "Value is empty"),
            NumericParseError::InvalidFormat => write!(f, "Value is not a valid number"),
            NumericParseError::FractionalNotAllowed => write!(f, "Whole number required (no decimals)"),
            NumericParseError::OutOfRange => write!(f, "Value is out of range"),
        }
    }
}

/// Parse user input as a whole number.
///
/// # Rules
/// - Whitespace is trimmed
/// - Leading `+` is allowed
/// - Rejects any fractional input (including `3.0`, `3.`), exponents,
///   `NaN` and `inf`
///
/// # Examples
/// ```
/// use casegrid_engine::validation::parse_whole_number;
///
/// assert_eq!(parse_whole_number(" +3 "), Ok(3));
/// assert!(parse_whole_number("3.0").is_err());
/// assert!(parse_whole_number("1e3").is_err());
/// ```
pub fn parse_whole_number(value: &str) -> Result<i64, NumericParseError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(NumericParseError::Empty);
    }
    if trimmed.contains('.') {
        return Err(NumericParseError::FractionalNotAllowed);
    }

    trimmed.parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => NumericParseError::OutOfRange,
        _ => NumericParseError::InvalidFormat,
    })
}

/// Evaluate a numeric constraint.
///
/// # Between Inclusivity
/// - `Between(a, b)`: returns true if `a <= x <= b` (inclusive)
/// - `NotBetween(a, b)`: returns true if `x < a || x > b`
pub fn eval_numeric_constraint(
    x: f64,
    operator: ComparisonOperator,
    a: f64,
    b: Option<f64>,
) -> bool {
    match operator {
        ComparisonOperator::Between => {
            let max = b.unwrap_or(a);
            x >= a && x <= max
        }
        ComparisonOperator::NotBetween => {
            let max = b.unwrap_or(a);
            x < a || x > max
        }
        ComparisonOperator::EqualTo => (x - a).abs() < f64::EPSILON,
        ComparisonOperator::NotEqualTo => (x - a).abs() >= f64::EPSILON,
        ComparisonOperator::GreaterThan => x > a,
        ComparisonOperator::LessThan => x < a,
        ComparisonOperator::GreaterThanOrEqual => x >= a,
        ComparisonOperator::LessThanOrEqual => x <= a,
    }
}

// ============================================================================
// Validation Result
// ============================================================================

/// Result of validating a cell input.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// Input is valid.
    Valid,
    /// Input is invalid.
    Invalid {
        /// Human-readable description of why validation failed.
        reason: String,
    },
}

impl ValidationResult {
    fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid { reason: reason.into() }
    }

    /// Returns true if the result is valid.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Returns true if the result is invalid.
    pub fn is_invalid(&self) -> bool {
        matches!(self, ValidationResult::Invalid { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
