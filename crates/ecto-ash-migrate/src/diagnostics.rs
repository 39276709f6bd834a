//! Non-blocking findings collected during a generation run.
//!
//! A diagnostic never aborts generation. It marks a field or section whose
//! fidelity is lower than the source schema and which the operator should
//! review by hand.

use serde::Serialize;
use std::fmt;

/// One finding produced by a pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Legacy schema file could not be read; generation used an empty model.
    LegacyUnavailable { path: String, reason: String },

    /// Legacy schema file was read but contained no recognizable schema facts.
    LegacyEmpty { path: String },

    /// Legacy `schema "..."` declaration names a different table.
    LegacyTableMismatch { declared: String, table: String },

    /// Column type has no entry in the type map and was degraded to
    /// `fallback` (`:string`, or `{:array, :string}` for arrays).
    UnmappedType {
        column: String,
        native_type: String,
        udt_name: String,
        fallback: String,
    },

    /// Table has no primary key.
    NoPrimaryKey,

    /// Composite primary key; its columns are rendered as plain attributes.
    CompositePrimaryKey { columns: Vec<String> },

    /// Single-column key whose type has no specialized primary-key form.
    UnsupportedPrimaryKeyType { column: String, target_type: String },

    /// Identity over more than one column.
    MultiColumnIdentity { name: String, columns: Vec<String> },

    /// Multi-column foreign key skipped by the catalog reader.
    CompositeForeignKey { constraint: String },

    /// Relationship asserted only by the legacy schema.
    UnresolvedRelationship {
        association: String,
        name: String,
        reason: String,
    },

    /// Catalog default that could not be translated.
    DefaultDropped { column: String, expression: String },

    /// Relationship renamed to avoid a name collision.
    RelationshipRenamed { original: String, renamed: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::LegacyUnavailable { path, reason } => {
                write!(f, "legacy schema {} unavailable ({}); continuing without it", path, reason)
            }
            Diagnostic::LegacyEmpty { path } => {
                write!(f, "legacy schema {} contained no schema facts", path)
            }
            Diagnostic::LegacyTableMismatch { declared, table } => write!(
                f,
                "legacy schema declares table \"{}\" but generating \"{}\"",
                declared, table
            ),
            Diagnostic::UnmappedType {
                column,
                native_type,
                udt_name,
                fallback,
            } => write!(
                f,
                "column {}: unmapped type {} ({}), using {}",
                column, native_type, udt_name, fallback
            ),
            Diagnostic::NoPrimaryKey => write!(f, "table has no primary key"),
            Diagnostic::CompositePrimaryKey { columns } => write!(
                f,
                "composite primary key [{}] rendered as plain attributes",
                columns.join(", ")
            ),
            Diagnostic::UnsupportedPrimaryKeyType {
                column,
                target_type,
            } => write!(
                f,
                "primary key {} has type {}; declared as attribute with primary_key? true",
                column, target_type
            ),
            Diagnostic::MultiColumnIdentity { name, columns } => write!(
                f,
                "identity {} spans multiple columns [{}]",
                name,
                columns.join(", ")
            ),
            Diagnostic::CompositeForeignKey { constraint } => {
                write!(f, "composite foreign key {} skipped", constraint)
            }
            Diagnostic::UnresolvedRelationship {
                association,
                name,
                reason,
            } => write!(f, "unresolved {} :{} ({})", association, name, reason),
            Diagnostic::DefaultDropped { column, expression } => {
                write!(f, "column {}: default {} not translated", column, expression)
            }
            Diagnostic::RelationshipRenamed { original, renamed } => {
                write!(f, "relationship {} renamed to {} to avoid a collision", original, renamed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let d = Diagnostic::UnmappedType {
            column: "addr".into(),
            native_type: "inet".into(),
            udt_name: "inet".into(),
            fallback: ":string".into(),
        };
        assert_eq!(d.to_string(), "column addr: unmapped type inet (inet), using :string");
        let d = Diagnostic::UnmappedType {
            column: "hosts".into(),
            native_type: "ARRAY".into(),
            udt_name: "_inet".into(),
            fallback: "{:array, :string}".into(),
        };
        assert_eq!(
            d.to_string(),
            "column hosts: unmapped type ARRAY (_inet), using {:array, :string}"
        );
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let d = Diagnostic::CompositePrimaryKey {
            columns: vec!["a".into(), "b".into()],
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "composite_primary_key");
        assert_eq!(json["columns"][1], "b");
    }
}
