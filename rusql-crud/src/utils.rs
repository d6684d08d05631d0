use serde_json::Value;

use crate::{Error, Result};

/// Escapes the body of a MySQL string literal.
///
/// Quotes, backslashes and the control characters MySQL treats specially are
/// backslash-escaped, so the result can sit between either `'` or `"`.
pub fn escape_str(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 2);
    for c in raw.chars() {
        match c {
            '\0' => escaped.push_str("\\0"),
            '\u{8}' => escaped.push_str("\\b"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\u{1a}' => escaped.push_str("\\Z"),
            '"' => escaped.push_str("\\\""),
            '\'' => escaped.push_str("\\'"),
            '\\' => escaped.push_str("\\\\"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Text form of a scalar before quoting. Booleans become `1`/`0` like MySQL's `BOOL`.
pub fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::Bool(true) => Some("1".to_owned()),
        Value::Bool(false) => Some("0".to_owned()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn require_scalar(column: &str, value: &Value) -> Result<()> {
    match value {
        Value::Array(_) => Err(Error::invalid_value(column, "arrays are not scalars")),
        Value::Object(_) => Err(Error::invalid_value(column, "objects are not scalars")),
        _ => Ok(()),
    }
}

/// Renders a value for an `INSERT ... VALUES` list.
///
/// Numbers and booleans are emitted bare, strings single-quoted, null as `NULL`.
pub fn escape_value(column: &str, value: &Value) -> Result<String> {
    require_scalar(column, value)?;
    Ok(match value {
        Value::String(s) => format!("'{}'", escape_str(s)),
        other => to_string(other).unwrap_or_else(|| "NULL".to_owned()),
    })
}

/// Renders a value double-quoted, the form used by `WHERE` and `SET`.
pub fn quote_value(column: &str, value: &Value) -> Result<String> {
    require_scalar(column, value)?;
    Ok(match to_string(value) {
        Some(text) => format!("\"{}\"", escape_str(&text)),
        None => "NULL".to_owned(),
    })
}

/// Whether `name` can be spliced into SQL as a column name.
///
/// Accepts dotted paths (`users.id`) whose segments are made of ASCII
/// alphanumerics, `_` and `$`.
pub fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Walks an escaped body and reports whether an unescaped `quote` appears.
    fn closes_literal(body: &str, quote: char) -> bool {
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                chars.next();
            } else if c == quote {
                return true;
            }
        }
        false
    }

    #[test]
    fn test_escape_str_specials() {
        assert_eq!(escape_str("O'Brien"), "O\\'Brien");
        assert_eq!(escape_str("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape_str("C:\\dir"), "C:\\\\dir");
        assert_eq!(escape_str("a\nb\rc\td"), "a\\nb\\rc\\td");
        assert_eq!(escape_str("nul\0sub\u{1a}"), "nul\\0sub\\Z");
        assert_eq!(escape_str("plain; text"), "plain; text");
    }

    #[test]
    fn test_escaped_body_never_closes_literal() {
        let hostile = [
            "'; DROP TABLE users; --",
            "\" OR \"1\"=\"1",
            "\\\" OR 1=1 --",
            "\\'; --",
            "trailing backslash \\",
            "mixed '\"\\;",
        ];
        for input in hostile {
            let body = escape_str(input);
            assert!(!closes_literal(&body, '"'), "{input:?} -> {body:?}");
            assert!(!closes_literal(&body, '\''), "{input:?} -> {body:?}");
            assert!(!body.ends_with('\\') || body.ends_with("\\\\"));
        }
    }

    #[test]
    fn test_escape_value_forms() {
        assert_eq!(escape_value("id", &json!(1)).unwrap(), "1");
        assert_eq!(escape_value("w", &json!(2.5)).unwrap(), "2.5");
        assert_eq!(escape_value("name", &json!("Bob")).unwrap(), "'Bob'");
        assert_eq!(escape_value("admin", &json!(true)).unwrap(), "1");
        assert_eq!(escape_value("email", &json!(null)).unwrap(), "NULL");
        assert!(escape_value("tags", &json!(["a"])).is_err());
    }

    #[test]
    fn test_quote_value_forms() {
        assert_eq!(quote_value("age", &json!(30)).unwrap(), "\"30\"");
        assert_eq!(quote_value("name", &json!("it's")).unwrap(), "\"it\\'s\"");
        assert_eq!(quote_value("admin", &json!(false)).unwrap(), "\"0\"");
        assert_eq!(quote_value("email", &json!(null)).unwrap(), "NULL");
        assert!(matches!(
            quote_value("meta", &json!({"a": 1})),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("username"));
        assert!(is_identifier("users.id"));
        assert!(is_identifier("col_$1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("users."));
        assert!(!is_identifier("id=1 OR 1"));
        assert!(!is_identifier("name`"));
    }
}
