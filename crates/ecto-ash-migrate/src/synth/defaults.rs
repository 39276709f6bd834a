//! Catalog default expression → attribute default.

use crate::catalog::{Column, EnumColumn};
use crate::diagnostics::Diagnostic;
use crate::naming::{atom_literal, string_literal};
use crate::typemap::TargetType;

/// Translated default, or the reason there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    /// Rendered expression, e.g. `"draft"` or `&DateTime.utc_now/0`.
    Literal(String),

    /// No default, or one that is an auto-increment artifact.
    None,

    /// A default that could not be expressed.
    Dropped(Diagnostic),
}

const TIMESTAMP_FUNCTIONS: &[&str] = &[
    "now()",
    "current_timestamp",
    "localtimestamp",
    "transaction_timestamp()",
    "statement_timestamp()",
    "clock_timestamp()",
];

const UUID_FUNCTIONS: &[&str] = &["gen_random_uuid()", "uuid_generate_v4()"];

/// Translate the column's raw default for an attribute of type `target`.
pub fn translate_default(
    column: &Column,
    target: &TargetType,
    enum_column: Option<&EnumColumn>,
) -> DefaultValue {
    let Some(raw) = column.default.as_deref() else {
        return DefaultValue::None;
    };
    let raw = raw.trim();
    let lower = raw.to_lowercase();

    if lower.contains("nextval(") {
        return DefaultValue::None;
    }

    let expr = strip_casts(raw);
    let lower_expr = expr.to_lowercase();
    if lower_expr == "null" {
        return DefaultValue::None;
    }

    let rendered = if let Some(text) = unquote(expr) {
        quoted_default(&text, target, enum_column)
    } else if is_timestamp_call(&lower_expr) {
        now_default(target)
    } else if lower_expr == "current_date" {
        matches!(target, TargetType::Date).then(|| "&Date.utc_today/0".to_string())
    } else if UUID_FUNCTIONS.contains(&lower_expr.as_str()) {
        matches!(target, TargetType::Uuid).then(|| "&Ash.UUID.generate/0".to_string())
    } else if lower_expr == "true" || lower_expr == "false" {
        matches!(target, TargetType::Boolean).then_some(lower_expr)
    } else if is_numeric(target) {
        numeric_default(expr, target)
    } else {
        None
    };

    match rendered {
        Some(value) => DefaultValue::Literal(value),
        None => DefaultValue::Dropped(Diagnostic::DefaultDropped {
            column: column.name.clone(),
            expression: raw.to_string(),
        }),
    }
}

fn is_numeric(target: &TargetType) -> bool {
    matches!(
        target,
        TargetType::Integer | TargetType::Float | TargetType::Decimal
    )
}

fn is_timestamp_call(expr: &str) -> bool {
    TIMESTAMP_FUNCTIONS.contains(&expr)
        || expr
            .strip_prefix("current_timestamp(")
            .or_else(|| expr.strip_prefix("localtimestamp("))
            .is_some_and(|rest| rest.ends_with(')'))
}

fn now_default(target: &TargetType) -> Option<String> {
    match target {
        TargetType::UtcDatetimeUsec => Some("&DateTime.utc_now/0".to_string()),
        TargetType::NaiveDatetime => Some("&NaiveDateTime.utc_now/0".to_string()),
        TargetType::Date => Some("&Date.utc_today/0".to_string()),
        _ => None,
    }
}

fn quoted_default(
    text: &str,
    target: &TargetType,
    enum_column: Option<&EnumColumn>,
) -> Option<String> {
    match target {
        TargetType::Atom => enum_column
            .filter(|e| e.labels.iter().any(|l| l == text))
            .map(|_| atom_literal(text)),
        TargetType::String => Some(string_literal(text)),
        TargetType::Boolean => match text.to_lowercase().as_str() {
            "t" | "true" | "y" | "yes" | "on" | "1" => Some("true".to_string()),
            "f" | "false" | "n" | "no" | "off" | "0" => Some("false".to_string()),
            _ => None,
        },
        TargetType::Map if text.trim() == "{}" => Some("%{}".to_string()),
        TargetType::Array(_) if text.trim() == "{}" => Some("[]".to_string()),
        TargetType::UtcDatetimeUsec | TargetType::NaiveDatetime | TargetType::Date
            if text.eq_ignore_ascii_case("now") =>
        {
            now_default(target)
        }
        t if is_numeric(t) => numeric_default(text, target),
        _ => None,
    }
}

/// Integer first, then floating point.
fn numeric_default(text: &str, target: &TargetType) -> Option<String> {
    let text = text.trim();
    if text.parse::<i64>().is_ok() {
        return Some(match target {
            TargetType::Decimal => format!("Decimal.new(\"{}\")", text),
            TargetType::Float => format!("{}.0", text),
            _ => text.to_string(),
        });
    }

    let value = text.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(match target {
        TargetType::Decimal => format!("Decimal.new(\"{}\")", text),
        _ => float_literal(value),
    })
}

/// Float literal with a mandatory fractional part.
fn float_literal(value: f64) -> String {
    let s = format!("{:?}", value);
    match s.find('e') {
        Some(idx) if !s[..idx].contains('.') => format!("{}.0{}", &s[..idx], &s[idx..]),
        _ => s,
    }
}

/// Remove `::type` casts and redundant wrapping parentheses.
fn strip_casts(expr: &str) -> &str {
    let mut expr = expr.trim();
    loop {
        if let Some(inner) = unwrap_parens(expr) {
            expr = inner.trim();
            continue;
        }
        match top_level_cast(expr) {
            Some(idx) => expr = expr[..idx].trim(),
            None => return expr,
        }
    }
}

fn unwrap_parens(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    let mut in_quote = false;
    for c in inner.chars() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

/// Byte offset of the last `::` outside quotes and parentheses.
fn top_level_cast(expr: &str) -> Option<usize> {
    let b = expr.as_bytes();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut found = None;
    let mut i = 0;
    while i < b.len() {
        match b[i] {
            b'\'' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => depth -= 1,
            b':' if !in_quote && depth == 0 && b.get(i + 1) == Some(&b':') => {
                found = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    found
}

/// Contents of a single-quoted SQL literal with `''` unescaped.
fn unquote(expr: &str) -> Option<String> {
    let inner = expr
        .strip_prefix("E'")
        .or_else(|| expr.strip_prefix('\''))?
        .strip_suffix('\'')?;
    Some(inner.replace("''", "'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(default: &str) -> Column {
        Column {
            name: "c".into(),
            data_type: "text".into(),
            udt_name: "text".into(),
            is_nullable: true,
            default: Some(default.into()),
            max_length: None,
            precision: None,
            scale: None,
            ordinal_pos: 1,
        }
    }

    fn literal(default: &str, target: TargetType) -> DefaultValue {
        translate_default(&column(default), &target, None)
    }

    #[test]
    fn test_sequence_default_is_dropped_silently() {
        assert_eq!(
            literal("nextval('orders_id_seq'::regclass)", TargetType::Integer),
            DefaultValue::None
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            literal("'it''s'::text", TargetType::String),
            DefaultValue::Literal("\"it's\"".into())
        );
        assert_eq!(
            literal("'draft'::character varying", TargetType::String),
            DefaultValue::Literal("\"draft\"".into())
        );
    }

    #[test]
    fn test_enum_default_checked_against_labels() {
        let enum_col = EnumColumn {
            column: "c".into(),
            type_name: "order_status".into(),
            labels: vec!["pending".into(), "active".into()],
        };
        let col = column("'pending'::order_status");
        assert_eq!(
            translate_default(&col, &TargetType::Atom, Some(&enum_col)),
            DefaultValue::Literal(":pending".into())
        );

        let col = column("'archived'::order_status");
        assert!(matches!(
            translate_default(&col, &TargetType::Atom, Some(&enum_col)),
            DefaultValue::Dropped(_)
        ));
    }

    #[test]
    fn test_timestamps() {
        assert_eq!(
            literal("now()", TargetType::UtcDatetimeUsec),
            DefaultValue::Literal("&DateTime.utc_now/0".into())
        );
        assert_eq!(
            literal("CURRENT_TIMESTAMP", TargetType::NaiveDatetime),
            DefaultValue::Literal("&NaiveDateTime.utc_now/0".into())
        );
        assert_eq!(
            literal("('now'::text)::date", TargetType::Date),
            DefaultValue::Literal("&Date.utc_today/0".into())
        );
        assert_eq!(
            literal("CURRENT_DATE", TargetType::Date),
            DefaultValue::Literal("&Date.utc_today/0".into())
        );
        assert!(matches!(literal("now()", TargetType::String), DefaultValue::Dropped(_)));
    }

    #[test]
    fn test_uuid_generators() {
        assert_eq!(
            literal("gen_random_uuid()", TargetType::Uuid),
            DefaultValue::Literal("&Ash.UUID.generate/0".into())
        );
        assert_eq!(
            literal("uuid_generate_v4()", TargetType::Uuid),
            DefaultValue::Literal("&Ash.UUID.generate/0".into())
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(literal("0", TargetType::Integer), DefaultValue::Literal("0".into()));
        assert_eq!(literal("(-1)", TargetType::Integer), DefaultValue::Literal("-1".into()));
        assert_eq!(
            literal("0.00", TargetType::Decimal),
            DefaultValue::Literal("Decimal.new(\"0.00\")".into())
        );
        assert_eq!(
            literal("'9.99'::numeric", TargetType::Decimal),
            DefaultValue::Literal("Decimal.new(\"9.99\")".into())
        );
        assert_eq!(literal("1.5", TargetType::Float), DefaultValue::Literal("1.5".into()));
        assert_eq!(literal("2", TargetType::Float), DefaultValue::Literal("2.0".into()));
        assert!(matches!(literal("abc", TargetType::Integer), DefaultValue::Dropped(_)));
    }

    #[test]
    fn test_booleans_and_collections() {
        assert_eq!(literal("true", TargetType::Boolean), DefaultValue::Literal("true".into()));
        assert_eq!(literal("'f'::boolean", TargetType::Boolean), DefaultValue::Literal("false".into()));
        assert_eq!(literal("'{}'::jsonb", TargetType::Map), DefaultValue::Literal("%{}".into()));
        assert_eq!(
            literal("'{}'::text[]", TargetType::Array(Box::new(TargetType::String))),
            DefaultValue::Literal("[]".into())
        );
    }

    #[test]
    fn test_null_and_unknown_functions() {
        assert_eq!(literal("NULL::text", TargetType::String), DefaultValue::None);
        assert_eq!(
            literal("lower('X')", TargetType::String),
            DefaultValue::Dropped(Diagnostic::DefaultDropped {
                column: "c".into(),
                expression: "lower('X')".into(),
            })
        );
    }
}
