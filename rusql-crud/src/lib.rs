//! RusQL CRUD: create/read/update on MySQL tables with nested `_and` / `_or`
//! where-clauses.
//!
//! ```
//! use rusql_crud::Filter;
//! use serde_json::json;
//!
//! let filter = Filter::from_json(&json!({
//!     "_and": {"_or": {"username": "a", "email": "b"}, "password": "c"}
//! }))
//! .unwrap();
//! assert_eq!(
//!     filter.to_sql().unwrap(),
//!     r#"(username="a" OR email="b") AND password="c""#
//! );
//! ```

extern crate self as rusql_crud;

/// This module contains the macros used in the crate.
#[macro_use]
mod macros;

/// This module contains the database-related functionality.
pub mod db;

/// This module contains the error type of the crate.
pub mod error;

/// This module contains the prelude for the crate.
pub mod prelude;

/// This module contains the column types and value maps used in the crate.
pub mod types;

pub mod utils;

pub use db::query::{
    build_insert, build_select, build_update, where_clause, Comparison, Condition, Conjunction,
    Filter, Operand, Select, MAX_CONDITION_DEPTH,
};
pub use db::{ExecResult, Executor, Model, Table};
pub use error::{Error, Result};
pub use types::{AllowList, ColumnType, Values};

pub use serde_json;
#[cfg(feature = "mysql")]
pub use sqlx;

use std::time::Duration;

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    /// Upper bound on opening a connection; `None` leaves it to the driver.
    pub connect_timeout: Option<Duration>,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: None,
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Reads `DATABASE_URL` and the optional `DATABASE_CONNECT_TIMEOUT_SECS`,
    /// loading a `.env` file first when there is one.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::Config("DATABASE_URL is not set".to_owned()))?;
        let mut config = Self::new(url);
        if let Some(secs) = lookup("DATABASE_CONNECT_TIMEOUT_SECS") {
            let secs = secs.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!(
                    "DATABASE_CONNECT_TIMEOUT_SECS must be a whole number of seconds, got `{secs}`"
                ))
            })?;
            config = config.connect_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

/// A MySQL database reached through one fresh connection per statement.
#[cfg(feature = "mysql")]
#[derive(Debug, Clone)]
pub struct Database {
    options: sqlx::mysql::MySqlConnectOptions,
    connect_timeout: Option<Duration>,
}

#[cfg(feature = "mysql")]
impl Database {
    /// Parses the connection URL; no connection is opened until a statement runs.
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let options = config
            .url
            .parse::<sqlx::mysql::MySqlConnectOptions>()
            .map_err(|err| Error::Config(format!("invalid DATABASE_URL: {err}")))?;
        Ok(Self {
            options,
            connect_timeout: config.connect_timeout,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&DatabaseConfig::from_env()?)
    }

    /// Opens the connection `sql` will run on; failures are logged like statement failures.
    async fn connect(&self, sql: &str) -> Result<sqlx::MySqlConnection> {
        use sqlx::Connection as _;

        let connecting = sqlx::MySqlConnection::connect_with(&self.options);
        match self.connect_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, connecting).await {
                Ok(conn) => conn.map_err(|err| execution_failed(sql, err)),
                Err(_) => {
                    tracing::error!(?timeout, sql, "timed out while connecting");
                    Err(Error::Timeout(timeout))
                }
            },
            None => connecting.await.map_err(|err| execution_failed(sql, err)),
        }
    }

    async fn release(conn: sqlx::MySqlConnection) {
        use sqlx::Connection as _;

        if let Err(err) = conn.close().await {
            tracing::warn!(%err, "failed to close connection");
        }
    }
}

#[cfg(feature = "mysql")]
fn execution_failed(sql: &str, err: sqlx::Error) -> Error {
    tracing::error!(%err, sql, "statement failed");
    Error::from(err)
}

#[cfg(feature = "mysql")]
#[async_trait::async_trait]
impl Executor for Database {
    type Row = sqlx::mysql::MySqlRow;

    async fn fetch_all(&self, sql: &str) -> Result<Vec<Self::Row>> {
        let mut conn = self.connect(sql).await?;
        let rows = sqlx::query(sql).fetch_all(&mut conn).await;
        Self::release(conn).await;
        rows.map_err(|err| execution_failed(sql, err))
    }

    async fn execute(&self, sql: &str) -> Result<ExecResult> {
        let mut conn = self.connect(sql).await?;
        let done = sqlx::query(sql).execute(&mut conn).await;
        Self::release(conn).await;
        let done = done.map_err(|err| execution_failed(sql, err))?;
        Ok(ExecResult {
            rows_affected: done.rows_affected(),
            last_insert_id: Some(done.last_insert_id()).filter(|id| *id != 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| env.get(key).cloned()
    }

    #[test]
    fn test_config_requires_url() {
        let err = DatabaseConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = DatabaseConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_reads_timeout() {
        let config = DatabaseConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "mysql://root@localhost/app"),
            ("DATABASE_CONNECT_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.url, "mysql://root@localhost/app");
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(5)));

        let err = DatabaseConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "mysql://root@localhost/app"),
            ("DATABASE_CONNECT_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[cfg(feature = "mysql")]
    #[test]
    fn test_database_rejects_bad_url() {
        assert!(matches!(
            Database::new(&DatabaseConfig::new("not a url")),
            Err(Error::Config(_))
        ));
        assert!(Database::new(&DatabaseConfig::new("mysql://root:pw@localhost:3306/app")).is_ok());
    }

    #[cfg(feature = "mysql")]
    #[tokio::test]
    async fn test_connect_failure_is_an_execution_error() {
        let config = DatabaseConfig::new("mysql://root@127.0.0.1:1/app")
            .connect_timeout(Duration::from_secs(5));
        let db = Database::new(&config).unwrap();

        let err = db.execute("SELECT 1").await.unwrap_err();
        assert!(!err.is_build_error());
        assert!(matches!(err, Error::Execution(_) | Error::Timeout(_)));
    }
}
