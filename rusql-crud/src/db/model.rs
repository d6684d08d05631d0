//! CRUD operations on a table.
//!
//! [`Table`] carries a table name and its column allow-list at runtime;
//! the [`Model`] trait carries the same at compile time and is usually
//! implemented with `#[derive(Model)]`.

#[cfg(feature = "mysql")]
use sqlx::FromRow;

use super::query::{builder, Filter, Select};
use super::{log_sql, ExecResult, Executor};
use crate::{AllowList, ColumnType, Error, Result, Values};

/// A table definition: its name and the columns writes may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    allow: AllowList,
}

impl Table {
    pub fn new(name: impl Into<String>, allow: AllowList) -> Self {
        Self {
            name: name.into(),
            allow,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow
    }

    /// Inserts one row built from the allowed keys of `values`.
    ///
    /// # Example
    /// ```no_run
    /// # async fn run(db: &rusql_crud::Database) -> rusql_crud::Result<()> {
    /// use rusql_crud::prelude::*;
    ///
    /// let users = Table::new("users", allow_list!(id: Int, username: String));
    /// users.create(&values!(username = "okjool"), db).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create<E>(&self, values: &Values, executor: &E) -> Result<ExecResult>
    where
        E: Executor + ?Sized,
    {
        let query = builder::build_insert(&self.name, &self.allow, values)?;
        log_sql(&query);
        executor.execute(&query).await
    }

    /// Selects rows according to `select`.
    pub async fn read<E>(&self, select: &Select, executor: &E) -> Result<Vec<E::Row>>
    where
        E: Executor + ?Sized,
    {
        let query = select.to_sql(&self.name)?;
        log_sql(&query);
        executor.fetch_all(&query).await
    }

    /// Updates the rows matching `filter` with the allowed keys of `values`.
    ///
    /// An empty filter updates every row.
    pub async fn update<E>(&self, values: &Values, filter: &Filter, executor: &E) -> Result<ExecResult>
    where
        E: Executor + ?Sized,
    {
        let query = builder::build_update(&self.name, &self.allow, values, filter)?;
        log_sql(&query);
        executor.execute(&query).await
    }

    /// Deleting rows is not implemented; this always fails without running anything.
    pub async fn delete<E>(&self, filter: &Filter, executor: &E) -> Result<ExecResult>
    where
        E: Executor + ?Sized,
    {
        let _ = (filter, executor);
        tracing::warn!(table = self.name.as_str(), "delete called but not implemented");
        Err(Error::Unsupported("delete"))
    }
}

/// Trait for database model operations.
#[async_trait::async_trait]
pub trait Model {
    /// Table name.
    const NAME: &'static str;
    /// Writable columns with their declared types.
    const COLUMNS: &'static [(&'static str, ColumnType)];

    fn table() -> Table
    where
        Self: Sized,
    {
        Table::new(Self::NAME, AllowList::from(Self::COLUMNS))
    }

    /// The writable columns of this instance as a column-value map.
    fn to_values(&self) -> Values;

    /// Inserts the current model instance.
    ///
    /// # Example
    /// ```no_run
    /// # async fn run(db: &rusql_crud::Database) -> rusql_crud::Result<()> {
    /// use rusql_crud::prelude::*;
    ///
    /// #[derive(Model)]
    /// #[model(table = "users")]
    /// struct User {
    ///     #[field(skip = true)]
    ///     id: Option<Integer>,
    ///     username: String,
    /// }
    ///
    /// let user = User { id: None, username: "okjool".to_string() };
    /// user.save(db).await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn save<E>(&self, executor: &E) -> Result<ExecResult>
    where
        Self: Sized + Sync,
        E: Executor + ?Sized,
    {
        let values = self.to_values();
        Self::table().create(&values, executor).await
    }

    async fn create<E>(values: &Values, executor: &E) -> Result<ExecResult>
    where
        Self: Sized,
        E: Executor + ?Sized,
    {
        Self::table().create(values, executor).await
    }

    /// Selects rows and maps each one into `Self`.
    ///
    /// # Example
    /// ```ignore
    /// let users = User::read(
    ///     &Select::new()
    ///         .filter(Filter::from_json(&json!({"_or": {"username": "a", "email": "b"}}))?)
    ///         .order_by(["id"])
    ///         .limit(10),
    ///     &db,
    /// )
    /// .await?;
    /// ```
    #[cfg(feature = "mysql")]
    async fn read<E>(select: &Select, executor: &E) -> Result<Vec<Self>>
    where
        Self: Sized + Send + Unpin + for<'r> FromRow<'r, E::Row>,
        E: Executor + ?Sized,
        E::Row: sqlx::Row,
    {
        let rows = Self::table().read(select, executor).await?;
        let models = rows
            .iter()
            .map(Self::from_row)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;
        Ok(models)
    }

    /// Selects the first row matching `filter`.
    #[cfg(feature = "mysql")]
    async fn get<E>(filter: Filter, executor: &E) -> Result<Option<Self>>
    where
        Self: Sized + Send + Unpin + for<'r> FromRow<'r, E::Row>,
        E: Executor + ?Sized,
        E::Row: sqlx::Row,
    {
        let select = Select::new().filter(filter).limit(1);
        Ok(Self::read(&select, executor).await?.into_iter().next())
    }

    async fn update<E>(values: &Values, filter: &Filter, executor: &E) -> Result<ExecResult>
    where
        Self: Sized,
        E: Executor + ?Sized,
    {
        Self::table().update(values, filter, executor).await
    }

    async fn delete<E>(filter: &Filter, executor: &E) -> Result<ExecResult>
    where
        Self: Sized,
        E: Executor + ?Sized,
    {
        Self::table().delete(filter, executor).await
    }
}
