//! Error types for the relicdb engine.
//!
//! All public APIs return `RelicResult<T>` — no panics in library code.
//! The taxonomy is closed: syntax errors from the SQL front end, semantic
//! errors from name resolution, constraint violations from storage, and
//! type mismatches from coercion.

use thiserror::Error;

/// Unified error type for all relicdb operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelicError {
    /// Lexer or parser failure, with a 1-based source position
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        line: u32,
        column: u32,
    },

    /// Valid syntax, invalid meaning (e.g. column/value count mismatch)
    #[error("semantic error: {0}")]
    Semantic(String),

    /// Requested table does not exist
    #[error("table '{0}' does not exist")]
    TableNotFound(String),

    /// Table with the same name already exists
    #[error("table '{0}' already exists")]
    TableExists(String),

    /// Referenced column does not exist
    #[error(
        "column '{column}' does not exist{in_table}",
        in_table = .table.as_ref().map(|t| format!(" in table '{t}'")).unwrap_or_default()
    )]
    ColumnNotFound {
        column: String,
        table: Option<String>,
    },

    /// An unqualified column reference matches more than one table
    #[error("ambiguous column reference: '{0}'")]
    AmbiguousColumn(String),

    /// Duplicate value on a PRIMARY KEY column
    #[error("PRIMARY KEY violation: duplicate value '{value}' for column '{column}'")]
    PrimaryKeyViolation { column: String, value: String },

    /// Duplicate value on a UNIQUE column
    #[error("UNIQUE constraint violation: duplicate value '{value}' for column '{column}'")]
    UniqueViolation { column: String, value: String },

    /// NULL bound to a NOT NULL column
    #[error("NOT NULL constraint violation: column '{column}' cannot be NULL")]
    NotNullViolation { column: String },

    /// A value could not be coerced to the declared column type
    #[error(
        "type error{for_column}: expected {expected}, got {actual}",
        for_column = .column.as_ref().map(|c| format!(" for column '{c}'")).unwrap_or_default()
    )]
    TypeMismatch {
        expected: String,
        actual: String,
        column: Option<String>,
    },
}

/// Result type alias for all relicdb operations.
pub type RelicResult<T> = Result<T, RelicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_syntax() {
        let err = RelicError::Syntax {
            message: "unexpected character: '#'".to_string(),
            line: 2,
            column: 7,
        };
        assert_eq!(
            err.to_string(),
            "syntax error at line 2, column 7: unexpected character: '#'"
        );
    }

    #[test]
    fn error_display_table_not_found() {
        let err = RelicError::TableNotFound("users".to_string());
        assert_eq!(err.to_string(), "table 'users' does not exist");
    }

    #[test]
    fn error_display_column_not_found_with_table() {
        let err = RelicError::ColumnNotFound {
            column: "age".to_string(),
            table: Some("users".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "column 'age' does not exist in table 'users'"
        );
    }

    #[test]
    fn error_display_column_not_found_without_table() {
        let err = RelicError::ColumnNotFound {
            column: "age".to_string(),
            table: None,
        };
        assert_eq!(err.to_string(), "column 'age' does not exist");
    }

    #[test]
    fn error_display_primary_key_violation() {
        let err = RelicError::PrimaryKeyViolation {
            column: "id".to_string(),
            value: "1".to_string(),
        };
        assert!(err.to_string().contains("PRIMARY KEY"));
        assert!(err.to_string().contains("'1'"));
    }

    #[test]
    fn error_display_type_mismatch() {
        let err = RelicError::TypeMismatch {
            expected: "INTEGER".to_string(),
            actual: "BOOLEAN".to_string(),
            column: Some("id".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "type error for column 'id': expected INTEGER, got BOOLEAN"
        );
    }
}
