//! # Error Types
//!
//! Domain-specific error types for trace-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  trace-core errors (this file)                                         │
//! │  ├── CoreError        - Contract failures (one per rejected invocation)│
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  ledger errors (ledger.rs)                                             │
//! │  └── LedgerError      - MVCC conflicts, backend failures               │
//! │                                                                         │
//! │  trace-db errors (separate crate)                                      │
//! │  └── DbError          - Transaction log failures                       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → NodeError → wire {code, message}  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error is terminal for the invocation that raised it. Writes are
//! staged in the transaction context and dropped with it, so an error never
//! leaves partial state behind.

use serde::Serialize;
use thiserror::Error;

use crate::ledger::LedgerError;

// =============================================================================
// Error Kind
// =============================================================================

/// Machine-readable category of a [`CoreError`].
///
/// Clients switch on this instead of parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ParseError,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    InvalidState,
    QuantityExceeded,
    Validation,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// Wire code, e.g. `NOT_FOUND`.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ParseError => "PARSE_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::QuantityExceeded => "QUANTITY_EXCEEDED",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Contract-level errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed JSON or numeric argument. Surfaced verbatim.
    #[error("Failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    /// One or more records are absent.
    ///
    /// ## When This Occurs
    /// - Update/Package/Transfer on a key that was never created
    /// - Unknown package code
    /// - Caller has no owner index yet
    /// - Settlement batch references products without a revenue record
    ///   (every missing key is listed)
    #[error("{entity} not found: {}", keys.join(" "))]
    NotFound { entity: String, keys: Vec<String> },

    /// Key already occupied (create, revenue record).
    #[error("Record already exists: {key}")]
    AlreadyExists { key: String },

    /// Packaging batch contains codes that are already issued.
    ///
    /// ## User Workflow
    /// ```text
    /// Package(codes: [C1, C2, C3])
    ///      │
    ///      ▼
    /// Phase 1: C1 free, C2 taken, C3 taken
    ///      │
    ///      ▼
    /// DuplicateCode { codes: [C2, C3] }   ← nothing written, not even C1
    /// ```
    #[error("Package codes already exist: {}", codes.join(" "))]
    DuplicateCode { codes: Vec<String> },

    /// Caller is not allowed to act on the record.
    #[error("Permission denied for {party}: {reason}")]
    PermissionDenied { party: String, reason: String },

    /// Record is in packaging or packaging is complete.
    #[error("Record {key} cannot be modified: {reason}")]
    InvalidState { key: String, reason: String },

    /// Settlement would drive inventory below zero (counterfeit or over-sold batch).
    #[error("Settled quantity exceeds remaining inventory: {}", keys.join(" "))]
    QuantityExceeded { keys: Vec<String> },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Invocation names a function that does not exist.
    #[error(
        "Unknown function: {0} (expected one of {})",
        crate::invocation::FUNCTIONS.join(", ")
    )]
    UnknownFunction(String),

    /// Stored bytes could not be decoded.
    #[error("Stored value at {key} is corrupted: {reason}")]
    Corrupted { key: String, reason: String },

    /// Ledger collaborator failure.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl CoreError {
    /// Creates a NotFound error for a single key.
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            keys: vec![key.into()],
        }
    }

    /// Creates a Parse error.
    pub fn parse(what: impl Into<String>, reason: impl ToString) -> Self {
        CoreError::Parse {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(key: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidState {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a PermissionDenied error.
    pub fn permission_denied(party: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::PermissionDenied {
            party: party.into(),
            reason: reason.into(),
        }
    }

    /// Returns the machine-readable category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Parse { .. } => ErrorKind::ParseError,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::AlreadyExists { .. } | CoreError::DuplicateCode { .. } => {
                ErrorKind::AlreadyExists
            }
            CoreError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            CoreError::InvalidState { .. } => ErrorKind::InvalidState,
            CoreError::QuantityExceeded { .. } => ErrorKind::QuantityExceeded,
            CoreError::Validation(_) | CoreError::UnknownFunction(_) => ErrorKind::Validation,
            CoreError::Corrupted { .. } => ErrorKind::Internal,
            CoreError::Ledger(LedgerError::Conflict { .. }) => ErrorKind::Conflict,
            CoreError::Ledger(_) => ErrorKind::Internal,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when an invocation's parameters parse but don't meet
/// requirements. Raised before any ledger read.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., reserved characters in a key component).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Wrong number of positional arguments.
    #[error("{function} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
