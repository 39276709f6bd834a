//! Catalog metadata for a single table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Everything the catalog knows about one table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogModel {
    /// Schema name.
    pub schema: String,

    /// Table name.
    pub table: String,

    /// Column definitions, in ascending ordinal position.
    pub columns: Vec<Column>,

    /// Primary key column names, in key order.
    pub primary_key: Vec<String>,

    /// Single-column foreign keys from this table, in local column order.
    pub foreign_keys: Vec<ForeignKeyConstraint>,

    /// Single-column foreign keys from other tables pointing at this one.
    pub reverse_foreign_keys: Vec<ReverseForeignKey>,

    /// Unique constraints and unique indexes, de-duplicated by column set.
    pub unique_constraints: Vec<UniqueConstraint>,

    /// Columns backed by an enumerated type.
    pub enum_columns: Vec<EnumColumn>,

    /// Names of multi-column foreign keys that were not modelled.
    pub skipped_foreign_keys: Vec<String>,
}

impl CatalogModel {
    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Enum labels for a column, if it is enum-typed.
    pub fn enum_for(&self, column: &str) -> Option<&EnumColumn> {
        self.enum_columns.iter().find(|e| e.column == column)
    }

    /// Check if the table has a single-column primary key.
    pub fn has_single_pk(&self) -> bool {
        self.primary_key.len() == 1
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Native type name as reported by the catalog (e.g. "integer",
    /// "character varying", "USER-DEFINED", "ARRAY").
    pub data_type: String,

    /// Underlying type name (e.g. "int4", "varchar", "order_status", "_text").
    pub udt_name: String,

    /// Whether the column allows NULL.
    pub is_nullable: bool,

    /// Raw default expression.
    pub default: Option<String>,

    /// Declared maximum character length.
    pub max_length: Option<i32>,

    /// Declared numeric precision.
    pub precision: Option<i32>,

    /// Declared numeric scale.
    pub scale: Option<i32>,

    /// Ordinal position (1-based).
    pub ordinal_pos: i32,
}

/// Directed edge from a local column to another table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyConstraint {
    /// Constraint name.
    pub name: String,

    /// Local column.
    pub column: String,

    /// Referenced table.
    pub ref_table: String,

    /// Referenced column.
    pub ref_column: String,
}

/// Edge from another table's column into this table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseForeignKey {
    /// Referencing table.
    pub source_table: String,

    /// Referencing column on `source_table`.
    pub source_column: String,

    /// Referenced column on this table.
    pub target_column: String,
}

/// Where a uniqueness guarantee came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniqueOrigin {
    /// Named `UNIQUE` constraint.
    Constraint,
    /// Unique index not owned by a constraint.
    Index,
}

/// A uniqueness guarantee over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    /// Constraint or index name.
    pub name: String,

    /// Column names, in key order.
    pub columns: Vec<String>,

    /// Source of the guarantee.
    pub origin: UniqueOrigin,
}

impl UniqueConstraint {
    /// Whether the constraint spans more than one column.
    pub fn is_multi_column(&self) -> bool {
        self.columns.len() > 1
    }
}

/// An enum-typed column and its labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumColumn {
    /// Column name.
    pub column: String,

    /// Enumerated type name.
    pub type_name: String,

    /// Labels in the catalog's sort order.
    pub labels: Vec<String>,
}

/// Union named unique constraints with unique indexes.
///
/// Entries are de-duplicated by column set, ignoring column order. The
/// first occurrence wins, and constraints are considered before indexes.
pub fn merge_unique_sources(
    constraints: Vec<UniqueConstraint>,
    indexes: Vec<UniqueConstraint>,
) -> Vec<UniqueConstraint> {
    let mut seen: Vec<BTreeSet<String>> = Vec::new();
    let mut merged = Vec::new();

    for unique in constraints.into_iter().chain(indexes) {
        let key: BTreeSet<String> = unique.columns.iter().cloned().collect();
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        merged.push(unique);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique(name: &str, cols: &[&str], origin: UniqueOrigin) -> UniqueConstraint {
        UniqueConstraint {
            name: name.into(),
            columns: cols.iter().map(|c| c.to_string()).collect(),
            origin,
        }
    }

    #[test]
    fn test_merge_dedupes_index_backing_same_columns() {
        let merged = merge_unique_sources(
            vec![unique("users_email_key", &["email"], UniqueOrigin::Constraint)],
            vec![
                unique("users_email_idx", &["email"], UniqueOrigin::Index),
                unique("users_handle_idx", &["handle"], UniqueOrigin::Index),
            ],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "users_email_key");
        assert_eq!(merged[0].origin, UniqueOrigin::Constraint);
        assert_eq!(merged[1].name, "users_handle_idx");
    }

    #[test]
    fn test_merge_treats_column_order_as_set() {
        let merged = merge_unique_sources(
            vec![unique("a", &["tenant_id", "email"], UniqueOrigin::Constraint)],
            vec![unique("b", &["email", "tenant_id"], UniqueOrigin::Index)],
        );
        assert_eq!(merged.len(), 1);
        assert!(merged[0].is_multi_column());
    }

    #[test]
    fn test_merge_skips_empty_column_sets() {
        let merged = merge_unique_sources(vec![], vec![unique("expr", &[], UniqueOrigin::Index)]);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_model_lookups() {
        let model = CatalogModel {
            schema: "public".into(),
            table: "orders".into(),
            primary_key: vec!["id".into()],
            enum_columns: vec![EnumColumn {
                column: "status".into(),
                type_name: "order_status".into(),
                labels: vec!["pending".into()],
            }],
            ..Default::default()
        };
        assert_eq!(model.full_name(), "public.orders");
        assert!(model.has_single_pk());
        assert!(model.enum_for("status").is_some());
        assert!(model.enum_for("notes").is_none());
        assert!(model.column("id").is_none());
    }
}
