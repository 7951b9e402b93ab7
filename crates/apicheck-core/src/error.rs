//! Error types and error code constants for apicheck.
//!
//! `ApiError` covers ingestion misuse and input failures. It is deliberately
//! separate from [`crate::compat::Diagnostic`]: diagnostics describe API
//! changes and never abort a check, while an `ApiError` means the caller
//! handed the registry something it cannot accept.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad flags, malformed type strings)
//! - `3`: Resolution errors (unknown handles, pending references at freeze)
//! - `4`: Snapshot errors (unreadable or malformed snapshot input)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable error codes used as process exit codes and in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// Resolution errors (unknown type, unresolved references).
    ResolutionError = 3,
    /// Snapshot input could not be read or decoded.
    SnapshotError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Errors raised by graph construction, snapshot loading and the driver.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// A type string could not be parsed.
    #[error("invalid type syntax '{input}': {message}")]
    InvalidTypeSyntax { input: String, message: String },

    /// A full declaration was registered twice under one qualified name.
    #[error("type '{qualified_name}' is already declared")]
    DuplicateType { qualified_name: String },

    /// Two members of one type share a hashable signature.
    #[error("duplicate member '{signature}' in '{owner}'")]
    DuplicateMember { owner: String, signature: String },

    /// A handle does not name a unit in this graph.
    #[error("unknown {what} handle {id}")]
    UnknownHandle { what: &'static str, id: u32 },

    /// Members or links were attached to a type known only as a stub.
    #[error("type '{qualified_name}' is a forward reference and has no declaration yet")]
    NotDeclared { qualified_name: String },

    /// `freeze` was called while superclass/interface references were still pending.
    #[error("graph has {} pending reference(s); call resolve() before freeze()", pending.len())]
    PendingReferences { pending: Vec<String> },

    /// Snapshot input could not be read or decoded.
    #[error("snapshot error at {path}: {message}")]
    Snapshot { path: String, message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&ApiError> for OutputErrorCode {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            ApiError::InvalidTypeSyntax { .. } => OutputErrorCode::InvalidArguments,
            ApiError::DuplicateType { .. } => OutputErrorCode::InvalidArguments,
            ApiError::DuplicateMember { .. } => OutputErrorCode::InvalidArguments,
            ApiError::UnknownHandle { .. } => OutputErrorCode::ResolutionError,
            ApiError::NotDeclared { .. } => OutputErrorCode::ResolutionError,
            ApiError::PendingReferences { .. } => OutputErrorCode::ResolutionError,
            ApiError::Snapshot { .. } => OutputErrorCode::SnapshotError,
            ApiError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<ApiError> for OutputErrorCode {
    fn from(err: ApiError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl ApiError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        ApiError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a snapshot error for `path`.
    pub fn snapshot(path: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Snapshot {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn pending_references_maps_to_resolution_error() {
            let err = ApiError::PendingReferences {
                pending: vec!["com.example.Missing".to_string()],
            };
            assert_eq!(
                OutputErrorCode::from(&err),
                OutputErrorCode::ResolutionError
            );
            assert_eq!(err.error_code().code(), 3);
        }

        #[test]
        fn invalid_type_syntax_maps_to_invalid_arguments() {
            let err = ApiError::InvalidTypeSyntax {
                input: "Map<".to_string(),
                message: "unexpected end".to_string(),
            };
            assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
        }

        #[test]
        fn duplicate_type_maps_to_invalid_arguments() {
            let err = ApiError::DuplicateType {
                qualified_name: "a.B".to_string(),
            };
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn snapshot_maps_to_snapshot_error() {
            let err = ApiError::snapshot("api.json", "expected value");
            assert_eq!(err.error_code(), OutputErrorCode::SnapshotError);
            assert_eq!(err.error_code().code(), 4);
        }

        #[test]
        fn internal_maps_to_internal_error() {
            let err = ApiError::internal("unexpected state");
            assert_eq!(err.error_code().code(), 10);
        }
    }

    mod error_display {
        use super::*;

        #[test]
        fn pending_references_display_counts_entries() {
            let err = ApiError::PendingReferences {
                pending: vec!["a.B -> C".to_string(), "a.B -> D".to_string()],
            };
            assert_eq!(
                err.to_string(),
                "graph has 2 pending reference(s); call resolve() before freeze()"
            );
        }

        #[test]
        fn duplicate_member_display() {
            let err = ApiError::DuplicateMember {
                owner: "a.B".to_string(),
                signature: "foo(int)".to_string(),
            };
            assert_eq!(err.to_string(), "duplicate member 'foo(int)' in 'a.B'");
        }
    }

    mod output_error_code {
        use super::*;

        #[test]
        fn code_values_are_stable() {
            assert_eq!(OutputErrorCode::InvalidArguments.code(), 2);
            assert_eq!(OutputErrorCode::ResolutionError.code(), 3);
            assert_eq!(OutputErrorCode::SnapshotError.code(), 4);
            assert_eq!(OutputErrorCode::InternalError.code(), 10);
        }

        #[test]
        fn display_shows_code() {
            assert_eq!(format!("{}", OutputErrorCode::SnapshotError), "4");
        }
    }
}
