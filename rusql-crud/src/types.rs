use std::{fmt, str::FromStr};

use crate::Error;

/// Column-value map used by inserts and updates. Keys keep insertion order.
pub type Values = serde_json::Map<String, serde_json::Value>;

/// Rust-side aliases that `#[derive(Model)]` maps onto [`ColumnType`]s.
pub type Integer = i32;
pub type Text = String;
pub type Float = f64;
pub type Boolean = bool;
pub type Date = String;
pub type DateTime = String;

/// Declared semantic type of a writable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    Float,
    String,
    Text,
    Bool,
    Date,
    DateTime,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Text => "text",
            ColumnType::Bool => "bool",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "int" | "integer" | "bigint" | "smallint" | "tinyint" => Ok(ColumnType::Int),
            "float" | "double" | "decimal" | "real" => Ok(ColumnType::Float),
            "string" | "varchar" | "char" => Ok(ColumnType::String),
            "text" => Ok(ColumnType::Text),
            "bool" | "boolean" => Ok(ColumnType::Bool),
            "date" => Ok(ColumnType::Date),
            "datetime" | "timestamp" => Ok(ColumnType::DateTime),
            _ => Err(Error::UnknownColumnType(s.to_owned())),
        }
    }
}

/// The columns of a table that writes may touch, with their declared types.
///
/// Keys of a [`Values`] map that are not listed here never reach SQL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    columns: Vec<(String, ColumnType)>,
}

impl AllowList {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnType)>,
        S: Into<String>,
    {
        let mut list = Self::default();
        for (name, ty) in columns {
            let name = name.into();
            if !list.contains(&name) {
                list.columns.push((name, ty));
            }
        }
        list
    }

    /// Builds a list from `(column, type name)` pairs, e.g. `("id", "int")`.
    pub fn parse<'a, I>(columns: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let columns = columns
            .into_iter()
            .map(|(name, ty)| Ok((name, ty.parse::<ColumnType>()?)))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Self::new(columns))
    }

    pub fn contains(&self, column: &str) -> bool {
        self.column_type(column).is_some()
    }

    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| *ty)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl From<&[(&'static str, ColumnType)]> for AllowList {
    fn from(columns: &[(&'static str, ColumnType)]) -> Self {
        Self::new(columns.iter().copied())
    }
}
