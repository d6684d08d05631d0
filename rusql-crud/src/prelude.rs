#[cfg(feature = "mysql")]
pub use sqlx::FromRow;

#[cfg(feature = "mysql")]
pub use super::Database;
pub use super::DatabaseConfig;

pub use super::db::query::{Filter, Select};
pub use super::db::{ExecResult, Executor, Model, Table};
pub use super::types::*;
pub use super::{allow_list, values, Error, Result};
pub use async_trait::async_trait;
pub use rusql_crud_derive::Model;
