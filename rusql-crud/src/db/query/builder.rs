use super::condition::{where_clause, Filter};
use crate::{utils, AllowList, Error, Result, Values};

/// Options of a `SELECT`. The defaults select every column of every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    /// Columns to return; empty means `*`.
    pub columns: Vec<String>,
    pub filter: Filter,
    /// `ORDER BY` columns; empty means no ordering.
    pub order_by: Vec<String>,
    /// Row count; `0` means no `LIMIT`.
    pub limit: u64,
    pub offset: u64,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn order_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn to_sql(&self, table: &str) -> Result<String> {
        build_select(
            table,
            &self.columns,
            &self.filter,
            &self.order_by,
            self.limit,
            self.offset,
        )
    }
}

/// Keeps the entries of `values` whose key is in `allow`, in map order.
fn allowed<'v>(table: &str, allow: &AllowList, values: &'v Values) -> Vec<(&'v str, &'v serde_json::Value)> {
    values
        .iter()
        .filter(|(column, _)| {
            let keep = allow.contains(column);
            if !keep {
                tracing::debug!(table, column = column.as_str(), "dropping column not in allow-list");
            }
            keep
        })
        .map(|(column, value)| (column.as_str(), value))
        .collect()
}

/// `INSERT INTO <table> (<cols>) VALUES (<vals>)` for the allowed keys of `values`.
///
/// # Example
/// ```
/// use rusql_crud::{allow_list, build_insert};
/// use serde_json::json;
///
/// let allow = allow_list!(id: Int, name: String);
/// let values = json!({"id": 1, "name": "Bob", "hacked": "x"});
/// let sql = build_insert("users", &allow, values.as_object().unwrap()).unwrap();
/// assert_eq!(sql, "INSERT INTO users (id,name) VALUES (1,'Bob')");
/// ```
pub fn build_insert(table: &str, allow: &AllowList, values: &Values) -> Result<String> {
    let kept = allowed(table, allow, values);
    if kept.is_empty() {
        return Err(Error::EmptyInsert {
            table: table.to_owned(),
        });
    }

    let mut fields = Vec::with_capacity(kept.len());
    let mut placeholders = Vec::with_capacity(kept.len());
    for (column, value) in kept {
        fields.push(column);
        placeholders.push(utils::escape_value(column, value)?);
    }

    Ok(format!(
        "INSERT INTO {table} ({fields}) VALUES ({placeholders})",
        fields = fields.join(","),
        placeholders = placeholders.join(","),
    ))
}

/// `SELECT` text. Column and order names are trusted identifiers and are not escaped.
pub fn build_select<S: AsRef<str>>(
    table: &str,
    select: &[S],
    filter: &Filter,
    order: &[S],
    limit: u64,
    offset: u64,
) -> Result<String> {
    let columns = if select.is_empty() {
        "*".to_owned()
    } else {
        join(select)
    };
    let where_sql = where_clause(filter)?;
    let order_sql = if order.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", join(order))
    };
    let limit_sql = if limit == 0 {
        String::new()
    } else {
        format!(" LIMIT {offset},{limit}")
    };

    Ok(format!(
        "SELECT {columns} FROM {table}{where_sql}{order_sql}{limit_sql}"
    ))
}

/// `UPDATE <table> SET col="val",...` for the allowed keys of `values`, plus the filter.
pub fn build_update(
    table: &str,
    allow: &AllowList,
    values: &Values,
    filter: &Filter,
) -> Result<String> {
    let kept = allowed(table, allow, values);
    if kept.is_empty() {
        return Err(Error::EmptyUpdate {
            table: table.to_owned(),
        });
    }

    let assignments = kept
        .into_iter()
        .map(|(column, value)| {
            utils::quote_value(column, value).map(|literal| format!("{column}={literal}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let where_sql = where_clause(filter)?;
    if where_sql.is_empty() {
        tracing::warn!(table, "UPDATE without WHERE touches every row");
    }

    Ok(format!(
        "UPDATE {table} SET {assignments}{where_sql}",
        assignments = assignments.join(",")
    ))
}

fn join<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}
