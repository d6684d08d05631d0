//! Nested `_and` / `_or` conditions and their compilation to SQL.
//!
//! Conditions arrive as loosely-typed JSON such as
//!
//! ```json
//! {"_and": {"_or": {"username": "a", "email": "b"}, "password": "c"}}
//! ```
//!
//! and are converted once into a [`Filter`], a tagged tree of
//! [`Condition`]s. Compiling the tree never re-inspects keys.

use serde_json::Value;

use crate::{utils, Error, Result};

/// Deepest conjunction nesting accepted by [`Filter::from_json`] and [`Filter::compile`].
pub const MAX_CONDITION_DEPTH: usize = 64;

/// Logical operator of a conjunction node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    /// Reserved key that introduces this conjunction in JSON input.
    pub fn marker(&self) -> &'static str {
        match self {
            Conjunction::And => "_and",
            Conjunction::Or => "_or",
        }
    }

    pub fn from_marker(key: &str) -> Option<Self> {
        match key {
            "_and" => Some(Conjunction::And),
            "_or" => Some(Conjunction::Or),
            _ => None,
        }
    }

    fn joiner(&self) -> &'static str {
        match self {
            Conjunction::And => " AND ",
            Conjunction::Or => " OR ",
        }
    }
}

impl std::fmt::Display for Conjunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        };
        f.write_str(name)
    }
}

/// Comparison carried by a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `column="value"`
    Eq,
    /// `column!="value"`, written `{"column": {"_not": value}}` in JSON.
    Ne,
}

/// What a conjunction combines.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `{"_or": [ {...}, {...} ]}`: every element is read under the same operator.
    List(Vec<Operand>),
    /// `{"_or": {...}}`: the entries of the mapping, joined by the operator.
    Map(Filter),
}

/// One entry of a [`Filter`].
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Conjunction { op: Conjunction, operand: Operand },
    Leaf {
        column: String,
        comparison: Comparison,
        value: Value,
    },
}

/// An ordered set of conditions, implicitly joined with `AND`.
///
/// The empty filter produces no `WHERE` clause at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts JSON condition data into a filter.
    ///
    /// `null` is accepted as the empty filter. Unknown `_` markers, non-column
    /// keys, empty groups and non-scalar leaf values are rejected.
    ///
    /// # Example
    /// ```
    /// use rusql_crud::Filter;
    /// use serde_json::json;
    ///
    /// let filter = Filter::from_json(&json!({"age": {"_not": 30}})).unwrap();
    /// assert_eq!(filter.to_sql().unwrap(), r#"age!="30""#);
    /// ```
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            other => parse_filter(other, "$", 0),
        }
    }

    /// Adds `column="value"`.
    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(Condition::Leaf {
            column: column.into(),
            comparison: Comparison::Eq,
            value: value.into(),
        })
    }

    /// Adds `column!="value"`.
    pub fn ne(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(Condition::Leaf {
            column: column.into(),
            comparison: Comparison::Ne,
            value: value.into(),
        })
    }

    /// Adds `(entries of filter joined by AND)`.
    pub fn and(self, filter: Filter) -> Self {
        self.group(Conjunction::And, Operand::Map(filter))
    }

    /// Adds `(entries of filter joined by OR)`.
    pub fn or(self, filter: Filter) -> Self {
        self.group(Conjunction::Or, Operand::Map(filter))
    }

    /// Adds the list form of `_and`.
    pub fn and_list(self, filters: impl IntoIterator<Item = Filter>) -> Self {
        let items = filters.into_iter().map(Operand::Map).collect();
        self.group(Conjunction::And, Operand::List(items))
    }

    /// Adds the list form of `_or`.
    pub fn or_list(self, filters: impl IntoIterator<Item = Filter>) -> Self {
        let items = filters.into_iter().map(Operand::Map).collect();
        self.group(Conjunction::Or, Operand::List(items))
    }

    pub fn push(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    fn group(self, op: Conjunction, operand: Operand) -> Self {
        self.push(Condition::Conjunction { op, operand })
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Compiles every entry to a SQL boolean fragment, in order.
    ///
    /// The caller joins the fragments with `AND`. A conjunction that is the
    /// only entry spans the whole expression and is emitted without outer
    /// parentheses; every other group is parenthesized.
    pub fn compile(&self) -> Result<Vec<String>> {
        compile_filter(self, "$", 0, true)
    }

    /// The compiled fragments joined with `AND`; empty for the empty filter.
    pub fn to_sql(&self) -> Result<String> {
        Ok(self.compile()?.join(" AND "))
    }
}

impl From<Condition> for Filter {
    fn from(condition: Condition) -> Self {
        Self {
            conditions: vec![condition],
        }
    }
}

impl TryFrom<&Value> for Filter {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        Filter::from_json(value)
    }
}

impl TryFrom<Value> for Filter {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Filter::from_json(&value)
    }
}

/// `" WHERE <expr>"`, or an empty string when the filter is empty.
pub fn where_clause(filter: &Filter) -> Result<String> {
    if filter.is_empty() {
        return Ok(String::new());
    }
    Ok(format!(" WHERE {}", filter.to_sql()?))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn too_deep(path: &str) -> Error {
    Error::ConditionTooDeep {
        path: path.to_owned(),
        limit: MAX_CONDITION_DEPTH,
    }
}

fn parse_filter(value: &Value, path: &str, depth: usize) -> Result<Filter> {
    let Value::Object(map) = value else {
        return Err(Error::malformed(
            path,
            format!("expected an object, found {}", kind(value)),
        ));
    };

    let conditions = map
        .iter()
        .map(|(key, value)| parse_entry(key, value, &format!("{path}.{key}"), depth))
        .collect::<Result<Vec<_>>>()?;
    Ok(Filter { conditions })
}

fn parse_entry(key: &str, value: &Value, path: &str, depth: usize) -> Result<Condition> {
    if let Some(op) = Conjunction::from_marker(key) {
        let operand = parse_operand(value, path, depth + 1)?;
        return Ok(Condition::Conjunction { op, operand });
    }
    if key.starts_with('_') {
        return Err(Error::malformed(path, format!("unknown marker `{key}`")));
    }
    if !utils::is_identifier(key) {
        return Err(Error::malformed(path, format!("`{key}` is not a column name")));
    }

    let (comparison, value) = match value {
        Value::Object(inner) => match inner.get("_not") {
            Some(negated) if inner.len() == 1 && is_scalar(negated) => {
                (Comparison::Ne, negated.clone())
            }
            _ => {
                return Err(Error::malformed(
                    path,
                    "expected a scalar or {\"_not\": scalar}",
                ))
            }
        },
        Value::Array(_) => {
            return Err(Error::malformed(
                path,
                "expected a scalar or {\"_not\": scalar}, found an array",
            ))
        }
        scalar => (Comparison::Eq, scalar.clone()),
    };

    Ok(Condition::Leaf {
        column: key.to_owned(),
        comparison,
        value,
    })
}

fn parse_operand(value: &Value, path: &str, depth: usize) -> Result<Operand> {
    if depth > MAX_CONDITION_DEPTH {
        return Err(too_deep(path));
    }
    match value {
        Value::Object(map) if map.is_empty() => Err(Error::malformed(path, "empty group")),
        Value::Object(_) => Ok(Operand::Map(parse_filter(value, path, depth)?)),
        Value::Array(items) if items.is_empty() => Err(Error::malformed(path, "empty group")),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_operand(item, &format!("{path}[{i}]"), depth + 1))
            .collect::<Result<Vec<_>>>()
            .map(Operand::List),
        other => Err(Error::malformed(
            path,
            format!("expected an object or an array, found {}", kind(other)),
        )),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn compile_filter(filter: &Filter, path: &str, depth: usize, top: bool) -> Result<Vec<String>> {
    let bare = top && filter.conditions.len() == 1;
    filter
        .conditions
        .iter()
        .map(|condition| compile_condition(condition, path, depth, bare))
        .collect()
}

fn compile_condition(condition: &Condition, path: &str, depth: usize, bare: bool) -> Result<String> {
    match condition {
        Condition::Conjunction { op, operand } => {
            let path = format!("{path}.{}", op.marker());
            let body = compile_operand(*op, operand, &path, depth + 1)?;
            Ok(if bare { body } else { format!("({body})") })
        }
        Condition::Leaf {
            column,
            comparison,
            value,
        } => compile_leaf(column, *comparison, value, &format!("{path}.{column}")),
    }
}

fn compile_operand(op: Conjunction, operand: &Operand, path: &str, depth: usize) -> Result<String> {
    if depth > MAX_CONDITION_DEPTH {
        return Err(too_deep(path));
    }
    match operand {
        Operand::Map(filter) if filter.is_empty() => Err(Error::malformed(path, "empty group")),
        Operand::Map(filter) => Ok(compile_filter(filter, path, depth, false)?.join(op.joiner())),
        Operand::List(items) if items.is_empty() => Err(Error::malformed(path, "empty group")),
        Operand::List(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{i}]");
                let body = compile_operand(op, item, &item_path, depth + 1)?;
                if fragment_count(item) > 1 {
                    parts.push(format!("({body})"));
                } else {
                    parts.push(body);
                }
            }
            Ok(parts.join(op.joiner()))
        }
    }
}

/// Number of top-level fragments an operand joins together once compiled.
fn fragment_count(operand: &Operand) -> usize {
    match operand {
        Operand::Map(filter) => filter.len(),
        Operand::List(items) if items.len() == 1 => fragment_count(&items[0]),
        Operand::List(items) => items.len(),
    }
}

fn compile_leaf(column: &str, comparison: Comparison, value: &Value, path: &str) -> Result<String> {
    if !utils::is_identifier(column) {
        return Err(Error::malformed(path, format!("`{column}` is not a column name")));
    }
    if value.is_null() {
        return Ok(match comparison {
            Comparison::Eq => format!("{column} IS NULL"),
            Comparison::Ne => format!("{column} IS NOT NULL"),
        });
    }
    let literal = utils::quote_value(column, value)?;
    Ok(match comparison {
        Comparison::Eq => format!("{column}={literal}"),
        Comparison::Ne => format!("{column}!={literal}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(value: Value) -> String {
        Filter::from_json(&value).unwrap().to_sql().unwrap()
    }

    fn balanced(sql: &str) -> bool {
        let mut open = 0i32;
        for c in sql.chars() {
            match c {
                '(' => open += 1,
                ')' => open -= 1,
                _ => {}
            }
            if open < 0 {
                return false;
            }
        }
        open == 0
    }

    #[test]
    fn test_empty_filter_compiles_to_nothing() {
        let filter = Filter::from_json(&json!({})).unwrap();
        assert!(filter.compile().unwrap().is_empty());
        assert_eq!(filter.to_sql().unwrap(), "");
        assert_eq!(where_clause(&filter).unwrap(), "");
        assert!(Filter::from_json(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_nested_map_form() {
        let sql = compile(json!({
            "_and": {"_or": {"username": "a", "email": "b"}, "password": "c"}
        }));
        assert_eq!(sql, r#"(username="a" OR email="b") AND password="c""#);
    }

    #[test]
    fn test_not_leaf() {
        assert_eq!(compile(json!({"age": {"_not": 30}})), r#"age!="30""#);
    }

    #[test]
    fn test_top_level_entries_join_with_and() {
        let filter = Filter::from_json(&json!({
            "status": "active",
            "_or": {"role": "admin", "role_alt": "owner"}
        }))
        .unwrap();
        assert_eq!(
            filter.compile().unwrap(),
            vec![
                r#"status="active""#.to_owned(),
                r#"(role="admin" OR role_alt="owner")"#.to_owned(),
            ]
        );
        assert_eq!(
            where_clause(&filter).unwrap(),
            r#" WHERE status="active" AND (role="admin" OR role_alt="owner")"#
        );
    }

    #[test]
    fn test_list_form_groups_elements_under_the_marker() {
        let sql = compile(json!({
            "deleted": 0,
            "_or": [{"name": "a"}, {"email": "b", "phone": "c"}]
        }));
        assert_eq!(
            sql,
            r#"deleted="0" AND (name="a" OR (email="b" OR phone="c"))"#
        );
    }

    #[test]
    fn test_list_inside_list() {
        let sql = compile(json!({"_and": [[{"a": 1}, {"b": 2}], {"c": 3}]}));
        assert_eq!(sql, r#"(a="1" AND b="2") AND c="3""#);
    }

    #[test]
    fn test_single_fragment_list_element_is_not_wrapped() {
        assert_eq!(
            compile(json!({"_and": [[{"a": 1}], {"b": 2}]})),
            r#"a="1" AND b="2""#
        );
        assert_eq!(
            compile(json!({"_or": [[{"a": 1, "b": 2}], {"c": 3}]})),
            r#"(a="1" OR b="2") OR c="3""#
        );
    }

    #[test]
    fn test_null_leaves() {
        assert_eq!(compile(json!({"email": null})), "email IS NULL");
        assert_eq!(compile(json!({"email": {"_not": null}})), "email IS NOT NULL");
    }

    #[test]
    fn test_leaf_values_are_escaped() {
        let sql = compile(json!({"name": "x\" OR \"1\"=\"1"}));
        assert_eq!(sql, r#"name="x\" OR \"1\"=\"1""#);
        assert!(balanced(&sql));
    }

    #[test]
    fn test_booleans_render_as_tinyint() {
        assert_eq!(compile(json!({"admin": true})), r#"admin="1""#);
    }

    #[test]
    fn test_compile_is_idempotent() {
        let filter = Filter::from_json(&json!({
            "_or": [{"a": 1}, {"_and": {"b": 2, "c": {"_not": 3}}}],
            "d": "x"
        }))
        .unwrap();
        assert_eq!(filter.compile().unwrap(), filter.compile().unwrap());
    }

    #[test]
    fn test_parentheses_balance_and_one_keyword_per_boundary() {
        let cases = [
            (json!({"a": 1}), 0),
            (json!({"a": 1, "b": 2}), 1),
            (json!({"_or": {"a": 1, "b": 2, "c": 3}}), 2),
            (json!({"_and": {"_or": {"a": 1, "b": 2}, "c": 3}, "d": 4}), 3),
            (json!({"_or": [{"a": 1}, {"_and": {"b": 2, "c": 3}}], "d": 4}), 3),
            (json!({"_and": [[{"a": 1}, {"b": 2}], {"_or": {"c": 3, "e": 5}}]}), 3),
        ];
        for (input, boundaries) in cases {
            let sql = compile(input.clone());
            assert!(balanced(&sql), "{sql}");
            let keywords = sql.matches(" AND ").count() + sql.matches(" OR ").count();
            assert_eq!(keywords, boundaries, "{input} -> {sql}");
        }
    }

    #[test]
    fn test_typed_builder_matches_json() {
        let typed = Filter::new()
            .or(Filter::new().eq("username", "a").eq("email", "b"))
            .eq("password", "c")
            .ne("age", 30);
        let parsed = Filter::from_json(&json!({
            "_or": {"username": "a", "email": "b"},
            "password": "c",
            "age": {"_not": 30}
        }))
        .unwrap();
        assert_eq!(typed, parsed);
        assert_eq!(
            typed.to_sql().unwrap(),
            r#"(username="a" OR email="b") AND password="c" AND age!="30""#
        );
    }

    #[test]
    fn test_typed_or_list() {
        let filter = Filter::new().or_list([
            Filter::new().eq("a", 1),
            Filter::new().eq("b", 2),
        ]);
        assert_eq!(filter.to_sql().unwrap(), r#"a="1" OR b="2""#);
    }

    #[test]
    fn test_malformed_shapes_are_rejected() {
        let cases = [
            json!("username"),
            json!([{"a": 1}]),
            json!({"_xor": {"a": 1}}),
            json!({"_and": "a"}),
            json!({"_and": {}}),
            json!({"_or": []}),
            json!({"_or": [1, 2]}),
            json!({"age": {"_gt": 3}}),
            json!({"age": {"_not": 3, "extra": 1}}),
            json!({"age": {"_not": [1]}}),
            json!({"tags": ["a", "b"]}),
            json!({"name = 1 OR 1": 1}),
        ];
        for input in cases {
            let err = Filter::from_json(&input).unwrap_err();
            assert!(err.is_malformed_condition(), "{input} -> {err}");
        }
    }

    #[test]
    fn test_malformed_error_points_at_the_key() {
        let err = Filter::from_json(&json!({"_and": {"_or": {"bad key": 1}}})).unwrap_err();
        match err {
            Error::MalformedCondition { path, .. } => assert_eq!(path, "$._and._or.bad key"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_typed_builder_is_validated_at_compile() {
        let err = Filter::new().eq("id; DROP", 1).compile().unwrap_err();
        assert!(err.is_malformed_condition());
        let err = Filter::new().and(Filter::new()).compile().unwrap_err();
        assert!(err.is_malformed_condition());
        let err = Filter::new().eq("tags", json!([1])).compile().unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
    }

    #[test]
    fn test_deep_nesting_is_an_error_not_a_crash() {
        let mut value = json!({"a": 1});
        for _ in 0..(MAX_CONDITION_DEPTH + 10) {
            value = json!({ "_and": value });
        }
        assert!(matches!(
            Filter::from_json(&value),
            Err(Error::ConditionTooDeep { .. })
        ));

        let mut filter = Filter::new().eq("a", 1);
        for _ in 0..(MAX_CONDITION_DEPTH + 10) {
            filter = Filter::new().and(filter);
        }
        assert!(matches!(
            filter.compile(),
            Err(Error::ConditionTooDeep { .. })
        ));
    }

    #[test]
    fn test_nesting_within_limit_compiles() {
        let mut value = json!({"a": 1});
        for _ in 0..(MAX_CONDITION_DEPTH - 1) {
            value = json!({ "_and": value });
        }
        assert_eq!(Filter::from_json(&value).unwrap().to_sql().unwrap().matches('a').count(), 1);
    }
}
