//! Error types for rusql-crud

use thiserror::Error;

/// Result type alias for rusql-crud operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while building or running a statement.
///
/// Builder errors (`MalformedCondition` through `Unsupported`) are always
/// returned before the executor is touched.
#[derive(Debug, Error)]
pub enum Error {
    /// A condition key or value has a shape that is neither a conjunction nor a column leaf.
    #[error("Malformed condition at `{path}`: {reason}")]
    MalformedCondition { path: String, reason: String },

    /// Condition nesting exceeded [`MAX_CONDITION_DEPTH`](crate::MAX_CONDITION_DEPTH).
    #[error("Condition nested deeper than {limit} levels at `{path}`")]
    ConditionTooDeep { path: String, limit: usize },

    /// No key of the insert map is in the table's allow-list.
    #[error("Nothing to insert into `{table}`: no column survives the allow-list")]
    EmptyInsert { table: String },

    /// No key of the update map is in the table's allow-list.
    #[error("Nothing to update in `{table}`: no column survives the allow-list")]
    EmptyUpdate { table: String },

    /// A column was given an object or an array instead of a scalar.
    #[error("Invalid value for column `{column}`: {reason}")]
    InvalidValue { column: String, reason: String },

    /// Allow-list type name that does not map to a [`ColumnType`](crate::ColumnType).
    #[error("Unknown column type `{0}`")]
    UnknownColumnType(String),

    /// Operation that exists on the API but has no implementation.
    #[error("`{0}` is not supported")]
    Unsupported(&'static str),

    /// Missing or invalid connection settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connecting to the database took longer than the configured timeout
    #[error("Timed out after {0:?} while connecting")]
    Timeout(std::time::Duration),

    /// Failure reported by the executor while running a statement
    #[error("Execution error: {0}")]
    Execution(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "mysql")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Execution(Box::new(err))
    }
}

impl Error {
    pub(crate) fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedCondition {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_value(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Wraps any executor failure; custom [`Executor`](crate::Executor)s report errors through this.
    pub fn execution(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Execution(err.into())
    }

    /// Check if this error was detected before any statement was sent.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedCondition { .. }
                | Self::ConditionTooDeep { .. }
                | Self::EmptyInsert { .. }
                | Self::EmptyUpdate { .. }
                | Self::InvalidValue { .. }
                | Self::UnknownColumnType(_)
                | Self::Unsupported(_)
        )
    }

    /// Check if this is a malformed condition error
    pub fn is_malformed_condition(&self) -> bool {
        matches!(self, Self::MalformedCondition { .. })
    }

    /// Check if the executor failed while running a statement
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }
}
