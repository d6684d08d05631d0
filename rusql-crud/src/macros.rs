/// Builds a [`Values`](crate::Values) column map from `column = value` pairs.
///
/// Values go through `serde_json::json!`, so anything `json!` accepts works.
///
/// # Example
///
/// ```
/// use rusql_crud::values;
///
/// let row = values!(username = "okjool", age = 19, admin = false);
/// assert_eq!(row.keys().collect::<Vec<_>>(), ["username", "age", "admin"]);
/// ```
#[macro_export]
macro_rules! values {
    ($($field:ident = $value:expr),* $(,)?) => {
        {
            #[allow(unused_mut)]
            let mut args = $crate::Values::new();
            $(
                args.insert(
                    stringify!($field).to_string(),
                    $crate::serde_json::json!($value),
                );
            )*
            args
        }
    };
}

/// Builds an [`AllowList`](crate::AllowList) from `column: Type` pairs, where
/// `Type` is a [`ColumnType`](crate::ColumnType) variant.
///
/// # Example
///
/// ```
/// use rusql_crud::{allow_list, ColumnType};
///
/// let allow = allow_list!(id: Int, username: String, created: DateTime);
/// assert_eq!(allow.column_type("created"), Some(ColumnType::DateTime));
/// ```
#[macro_export]
macro_rules! allow_list {
    ($($column:ident : $ty:ident),* $(,)?) => {
        $crate::AllowList::new([
            $((stringify!($column), $crate::ColumnType::$ty)),*
        ])
    };
}
