//! The `db` module provides functionality for interacting with the database.
//!
//! Statements are built by [`query`] as plain SQL text and handed to an
//! [`Executor`]. The crate never keeps a connection of its own: the executor
//! decides how a connection is acquired and released for each statement.

/// The `model` module exposes CRUD on a table: [`Table`] for runtime
/// definitions and the [`Model`] trait for derived ones.
pub mod model;

/// The `query` module turns conditions and column maps into SQL text.
pub mod query;

pub use model::{Model, Table};

use crate::Result;

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Auto-increment id generated by an `INSERT`, when the driver reports one.
    pub last_insert_id: Option<u64>,
}

/// Sends SQL text to a database.
///
/// Implementations own the connection lifecycle: acquire, run exactly the
/// given statement, release on every exit path. Retries, if any, belong here
/// as well.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    type Row: Send;

    /// Runs a statement that returns rows.
    async fn fetch_all(&self, sql: &str) -> Result<Vec<Self::Row>>;

    /// Runs a statement that returns an affected-row count.
    async fn execute(&self, sql: &str) -> Result<ExecResult>;
}

/// Logs a statement right before it is sent.
pub(crate) fn log_sql(sql: &str) {
    tracing::debug!(target: "rusql_crud::sql", sql);

    #[cfg(debug_assertions)]
    {
        if tracing::enabled!(target: "rusql_crud::sql", tracing::Level::TRACE) {
            let formatted_sql = sqlformat::format(
                sql,
                &sqlformat::QueryParams::None,
                &sqlformat::FormatOptions::default(),
            );
            tracing::trace!(target: "rusql_crud::sql", "\n{formatted_sql}");
        }
    }
}
